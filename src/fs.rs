//! File manager collaborator for the local backend
//!
//! The local storage adapter talks to the filesystem only through the
//! [`FileManager`] trait: existence check, recursive directory creation with
//! a permission mask, whole-file write, open, full read, remove. Keeping the
//! seam this narrow lets tests substitute an in-memory fake and assert which
//! calls were (or were not) issued.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Filesystem operations consumed by the local storage backend.
pub trait FileManager: Send + Sync {
    /// Whether anything exists at `path`.
    fn is_exists(&self, path: &Path) -> bool;

    /// Recursively creates `path` and applies `mode` to the final directory.
    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Writes `data` to `path`, replacing any previous content, and applies
    /// `mode` to the file.
    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()>;

    /// Opens the file at `path` for reading. The returned handle is released
    /// when dropped, on every exit path.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Reads an open handle to the end.
    fn read_file(&self, file: &mut dyn Read) -> io::Result<Vec<u8>>;

    /// Removes the file at `path`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FileManager`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileManager;

impl OsFileManager {
    #[cfg(unix)]
    fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn apply_mode(_path: &Path, _mode: u32) -> io::Result<()> {
        Ok(())
    }
}

impl FileManager for OsFileManager {
    fn is_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::create_dir_all(path)?;
        Self::apply_mode(path, mode)
    }

    fn write_file(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        fs::write(path, data)?;
        Self::apply_mode(path, mode)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(path)?;
        Ok(Box::new(file))
    }

    fn read_file(&self, file: &mut dyn Read) -> io::Result<Vec<u8>> {
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("object.bin");
        let fm = OsFileManager;

        fm.write_file(&path, b"payload", 0o644).unwrap();
        assert!(fm.is_exists(&path));

        let mut file = fm.open(&path).unwrap();
        let bytes = fm.read_file(&mut *file).unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[test]
    fn test_create_dir_is_recursive() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let fm = OsFileManager;

        fm.create_dir(&nested, 0o755).unwrap();
        assert!(fm.is_exists(&nested));
    }

    #[test]
    fn test_remove_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.bin");
        let fm = OsFileManager;

        fm.write_file(&path, b"x", 0o644).unwrap();
        fm.remove_file(&path).unwrap();
        assert!(!fm.is_exists(&path));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let fm = OsFileManager;
        assert!(fm.open(&dir.path().join("missing")).is_err());
    }
}
