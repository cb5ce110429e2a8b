use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// `PATH` of the current process, or an empty value when unset.
pub fn inherited_search_path() -> OsString {
    std::env::var_os("PATH").unwrap_or_default()
}

pub fn search_path_contains(search_path: &OsStr, dir: &Path) -> bool {
    std::env::split_paths(search_path).any(|entry| entry == dir)
}

/// Returns `search_path` with `dir` in front, unchanged if `dir` is already listed.
pub fn prepend_search_dir(search_path: &OsStr, dir: &Path) -> OsString {
    if search_path_contains(search_path, dir) {
        return search_path.to_os_string();
    }

    let mut entries: Vec<PathBuf> = vec![dir.to_path_buf()];
    entries.extend(std::env::split_paths(search_path).filter(|entry| !entry.as_os_str().is_empty()));
    std::env::join_paths(entries).unwrap_or_else(|_| search_path.to_os_string())
}
