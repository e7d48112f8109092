//! Safe temporary directory base so temp dirs are never created under the current working
//! directory (e.g. when TMPDIR=tmp or TMPDIR=./tmp).

use std::env;
use std::path::{Path, PathBuf};

/// Returns a directory path suitable for creating temporary directories.
/// Never returns a relative path.
pub fn temp_dir_base() -> PathBuf {
    let t = env::temp_dir();
    if t.is_absolute() {
        t
    } else {
        PathBuf::from("/tmp")
    }
}

/// Directory downloaded archives are staged in
///
/// A configured directory wins; otherwise a `stackup` directory under the
/// temp base.
pub fn download_dir_base(configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => temp_dir_base().join(dir),
        None => temp_dir_base().join("stackup"),
    }
}
