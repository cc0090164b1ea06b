use std::path::{Component, Path, MAIN_SEPARATOR};

/// Express `path` relative to `root` with `/` separators.
///
/// The root itself becomes the empty string; `.` components and trailing
/// separators are dropped. Paths outside `root`, including relative symlink
/// targets such as `../shared`, are kept verbatim apart from separator
/// conversion.
pub fn normalize_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .filter_map(|c| match c {
                Component::CurDir => None,
                other => Some(other.as_os_str().to_string_lossy()),
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => {
            let raw = path.to_string_lossy();
            if MAIN_SEPARATOR == '/' {
                raw.into_owned()
            } else {
                raw.replace(MAIN_SEPARATOR, "/")
            }
        }
    }
}
