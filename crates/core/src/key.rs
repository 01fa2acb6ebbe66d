//! Relative-key normalization
//!
//! A file under the mirrored root and its object in the bucket share one
//! identifier: the file's path relative to the root, always forward-slash
//! separated. The key never contains the root prefix.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Normalize a local path to its bucket key.
///
/// Fails when `path` does not live under `root` (or is the root itself) —
/// such paths have no corresponding object.
pub fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| Error::OutsideRoot(path.display().to_string()))?;

    let key = rel.to_string_lossy().replace('\\', "/");
    if key.is_empty() {
        return Err(Error::OutsideRoot(path.display().to_string()));
    }
    Ok(key)
}

/// Resolve a bucket key back to its path under the mirrored root.
pub fn key_path(root: &Path, key: &str) -> PathBuf {
    root.join(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_key_plain_file() {
        let key = relative_key(Path::new("/data"), Path::new("/data/a.txt")).unwrap();
        assert_eq!(key, "a.txt");
    }

    #[test]
    fn test_relative_key_nested_file() {
        let key = relative_key(Path::new("/data"), Path::new("/data/sub/deep/b.txt")).unwrap();
        assert_eq!(key, "sub/deep/b.txt");
    }

    #[test]
    fn test_relative_key_outside_root() {
        let result = relative_key(Path::new("/data"), Path::new("/elsewhere/a.txt"));
        assert!(matches!(result, Err(Error::OutsideRoot(_))));
    }

    #[test]
    fn test_relative_key_root_itself() {
        let result = relative_key(Path::new("/data"), Path::new("/data"));
        assert!(matches!(result, Err(Error::OutsideRoot(_))));
    }

    #[test]
    fn test_key_path_round_trip() {
        let root = Path::new("/data");
        let path = key_path(root, "sub/b.txt");
        assert_eq!(relative_key(root, &path).unwrap(), "sub/b.txt");
    }
}
