fn main() {
    if let Err(error) = deface_shell::run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
