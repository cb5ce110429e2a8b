pub mod env;
pub mod paths;

pub use env::{inherited_search_path, prepend_search_dir, search_path_contains};
pub use paths::AppPaths;
