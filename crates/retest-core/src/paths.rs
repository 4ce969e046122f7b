//! Path helpers shared by selection and reporting.

use std::path::{Path, PathBuf};

/// Strip `root` from `path` when it lives under it; otherwise return the path unchanged.
#[must_use]
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

/// Render a path with forward slashes on every platform.
///
/// Test patterns are written against forward-slash paths, so matching must
/// see the same separators regardless of host OS.
#[must_use]
pub fn to_forward_slashes(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.contains('\\') {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}
