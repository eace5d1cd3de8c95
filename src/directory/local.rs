//! # Local Filesystem Directory

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::backend::{Directory, ReadStream, WriteStream};
use super::errors::{validate_name, DirectoryError, DirectoryResult};

/// Directory backed by a path on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    /// Create a handle for `root`. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The path this directory points at
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, name: &str) -> DirectoryResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// fsync the directory so that newly created entries survive a crash.
    fn sync_dir(&self) -> DirectoryResult<()> {
        #[cfg(unix)]
        {
            let dir = File::open(&self.root)
                .map_err(|e| DirectoryError::from_io(&self.root.display().to_string(), e))?;
            dir.sync_all()
                .map_err(|e| DirectoryError::from_io(&self.root.display().to_string(), e))?;
        }
        Ok(())
    }
}

/// Buffered file writer whose `sync` flushes and fsyncs.
struct LocalWriter {
    inner: BufWriter<File>,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl WriteStream for LocalWriter {
    fn sync(&mut self) -> std::io::Result<()> {
        self.inner.flush()?;
        self.inner.get_ref().sync_all()
    }
}

impl Directory for LocalDirectory {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    fn exists(&self) -> DirectoryResult<bool> {
        Ok(self.root.is_dir())
    }

    fn mkdir(&self) -> DirectoryResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| DirectoryError::from_io(&self.root.display().to_string(), e))
    }

    fn list_files(&self) -> DirectoryResult<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| DirectoryError::from_io(&self.root.display().to_string(), e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DirectoryError::Io(e.to_string()))?;
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .map_err(|e| DirectoryError::Io(e.to_string()))?;
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn open_reader(&self, name: &str) -> DirectoryResult<Box<dyn ReadStream>> {
        let path = self.full_path(name)?;
        let file = File::open(&path).map_err(|e| DirectoryError::from_io(name, e))?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }

    fn open_writer(&self, name: &str) -> DirectoryResult<Box<dyn WriteStream>> {
        let path = self.full_path(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| DirectoryError::from_io(name, e))?;
        self.sync_dir()?;
        Ok(Box::new(LocalWriter {
            inner: BufWriter::new(file),
        }))
    }

    fn delete_file(&self, name: &str) -> DirectoryResult<()> {
        let path = self.full_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DirectoryError::from_io(name, e)),
        }
    }

    fn file_len(&self, name: &str) -> DirectoryResult<u64> {
        let path = self.full_path(name)?;
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| DirectoryError::from_io(name, e))
    }

    fn subdirectory(&self, name: &str) -> DirectoryResult<Arc<dyn Directory>> {
        let path = self.full_path(name)?;
        Ok(Arc::new(LocalDirectory::new(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_file(dir: &LocalDirectory, name: &str, data: &[u8]) {
        let mut w = dir.open_writer(name).unwrap();
        w.write_all(data).unwrap();
        w.sync().unwrap();
    }

    #[test]
    fn test_write_read() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        write_file(&dir, "test.txt", b"hello");
        let mut data = Vec::new();
        dir.open_reader("test.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"hello");
        assert_eq!(dir.file_len("test.txt").unwrap(), 5);
    }

    #[test]
    fn test_open_writer_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        write_file(&dir, "once", b"1");
        let result = dir.open_writer("once");
        assert!(matches!(result, Err(DirectoryError::AlreadyExists(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        write_file(&dir, "delete-me", b"bye");
        dir.delete_file("delete-me").unwrap();
        dir.delete_file("delete-me").unwrap();
        assert!(dir.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_list_excludes_subdirectories() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        write_file(&dir, "a", b"");
        write_file(&dir, "b", b"");
        let sub = dir.subdirectory("nested").unwrap();
        sub.mkdir().unwrap();

        assert_eq!(dir.list_files().unwrap(), vec!["a".to_string(), "b".to_string()]);
        assert!(sub.exists().unwrap());
        assert!(sub.list_files().unwrap().is_empty());
    }

    #[test]
    fn test_not_found() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        let result = dir.open_reader("nonexistent");
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn test_rejects_path_components() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path());

        assert!(matches!(
            dir.open_writer("../escape"),
            Err(DirectoryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = LocalDirectory::new(temp.path().join("absent"));

        assert!(!dir.exists().unwrap());
        dir.mkdir().unwrap();
        assert!(dir.exists().unwrap());
    }
}
