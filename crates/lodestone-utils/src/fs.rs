use std::{
    ffi::OsString,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult, FsOp};

/// Returns `path` with `suffix` appended to its final component.
///
/// ```
/// use std::path::Path;
/// use lodestone_utils::fs::sibling_path;
///
/// let part = sibling_path(Path::new("/tmp/pack.zip"), ".part");
/// assert_eq!(part, Path::new("/tmp/pack.zip.part"));
/// ```
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Creates `dir` and its parents unless it already exists as a directory.
pub fn create_dir_all(dir: &Path) -> FileSystemResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(FileSystemError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|err| FileSystemError::io(FsOp::CreateDir, dir, err))
}

/// Creates the parent directory of `path`, if it has one.
pub fn create_parent_dirs(path: &Path) -> FileSystemResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Removes a file or a whole directory tree. A missing path is not an error.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => Err(err),
    };

    match result {
        Err(err) if err.kind() != ErrorKind::NotFound => {
            Err(FileSystemError::io(FsOp::Remove, path, err))
        }
        _ => Ok(()),
    }
}

/// Replaces the content of `path` with `content`.
///
/// The bytes go to `<path>.tmp`, are synced, then renamed over `path`, so a reader sees
/// either the old file or the complete new one. Parent directories are created as needed
/// and the temporary file is removed if any step fails.
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> FileSystemResult<()> {
    let path = path.as_ref();
    create_parent_dirs(path)?;

    let tmp = sibling_path(path, ".tmp");
    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        })
        .map_err(|err| FileSystemError::io(FsOp::Write, &tmp, err))
        .and_then(|()| {
            fs::rename(&tmp, path).map_err(|err| FileSystemError::io(FsOp::Rename, path, err))
        });

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_safe_remove_file_and_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("listing.json");
        let tree = dir.path().join("icons").join("nested");
        fs::write(&file, "[]").unwrap();
        fs::create_dir_all(&tree).unwrap();

        safe_remove(&file).unwrap();
        safe_remove(dir.path().join("icons")).unwrap();

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[test]
    fn test_safe_remove_missing_is_ok() {
        let dir = tempdir().unwrap();
        safe_remove(dir.path().join("never-written.part")).unwrap();
    }

    #[test]
    fn test_create_dir_all_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("cache");
        fs::write(&file, "").unwrap();

        assert!(matches!(
            create_dir_all(&file),
            Err(FileSystemError::NotADirectory(_))
        ));
        create_dir_all(&dir.path().join("a/b")).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("listing.json");

        write_atomic(&target, b"[]").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"[]");
        assert!(!sibling_path(&target, ".tmp").exists());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("listing.json");
        fs::write(&target, "old content that is longer").unwrap();

        write_atomic(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_write_atomic_keeps_previous_on_failure() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("listing.json");
        fs::write(&target, "previous").unwrap();
        // A directory squatting on the temp name makes the write fail.
        fs::create_dir(sibling_path(&target, ".tmp")).unwrap();

        assert!(write_atomic(&target, b"next").is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "previous");
    }
}
