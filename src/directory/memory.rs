//! # In-Memory Directory
//!
//! Process-local directory with the same contract as [`LocalDirectory`].
//! Clones share state, so a store and a test can look at the same files.
//!
//! [`LocalDirectory`]: super::LocalDirectory

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{Directory, ReadStream, WriteStream};
use super::errors::{validate_name, DirectoryError, DirectoryResult};

#[derive(Debug, Default)]
struct MemoryState {
    /// Paths of directories that have been created
    dirs: BTreeSet<String>,
    /// File contents keyed by (directory path, file name)
    files: BTreeMap<(String, String), Vec<u8>>,
    /// Injected failures, checked against file names
    faults: Vec<Fault>,
}

#[derive(Debug, Clone)]
enum Fault {
    /// Writes fail once a file would grow past `limit` bytes
    Write { suffix: String, limit: usize },
    /// Deletes fail
    Delete { suffix: String },
}

impl MemoryState {
    fn write_limit(&self, name: &str) -> Option<usize> {
        self.faults.iter().find_map(|f| match f {
            Fault::Write { suffix, limit } if name.ends_with(suffix.as_str()) => Some(*limit),
            _ => None,
        })
    }

    fn delete_fails(&self, name: &str) -> bool {
        self.faults
            .iter()
            .any(|f| matches!(f, Fault::Delete { suffix } if name.ends_with(suffix.as_str())))
    }
}

/// In-memory [`Directory`]
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<MemoryState>>,
    path: String,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    /// Create an empty root directory that already exists.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        state.dirs.insert(String::new());
        Self {
            state: Arc::new(Mutex::new(state)),
            path: String::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key(&self, name: &str) -> DirectoryResult<(String, String)> {
        validate_name(name)?;
        Ok((self.path.clone(), name.to_string()))
    }

    /// Replace a file's contents outright, creating it if needed.
    pub fn put_file(&self, name: &str, data: &[u8]) -> DirectoryResult<()> {
        let key = self.key(name)?;
        self.lock().files.insert(key, data.to_vec());
        Ok(())
    }

    /// Flip every bit of the byte at `offset`.
    pub fn corrupt_byte(&self, name: &str, offset: usize) -> DirectoryResult<()> {
        let key = self.key(name)?;
        let mut state = self.lock();
        let file = state
            .files
            .get_mut(&key)
            .ok_or_else(|| DirectoryError::NotFound(name.to_string()))?;
        let byte = file
            .get_mut(offset)
            .ok_or_else(|| DirectoryError::Io(format!("{}: offset {} out of range", name, offset)))?;
        *byte ^= 0xFF;
        Ok(())
    }

    /// Make writes to files whose name ends with `suffix` fail once the
    /// file would exceed `limit` bytes. Applies to writers already open.
    pub fn fail_writes(&self, suffix: &str, limit: usize) {
        self.lock().faults.push(Fault::Write {
            suffix: suffix.to_string(),
            limit,
        });
    }

    /// Make deleting files whose name ends with `suffix` fail
    pub fn fail_deletes(&self, suffix: &str) {
        self.lock().faults.push(Fault::Delete {
            suffix: suffix.to_string(),
        });
    }

    /// Remove every injected failure
    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }
}

/// Buffers writes and publishes them on `sync` or drop.
struct MemoryWriter {
    state: Arc<Mutex<MemoryState>>,
    key: (String, String),
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn publish(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // A file deleted while its writer is open stays deleted.
        if let Some(contents) = state.files.get_mut(&self.key) {
            contents.clone_from(&self.buf);
        }
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let limit = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .write_limit(&self.key.1);
        if let Some(limit) = limit {
            if self.buf.len() + buf.len() > limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("{}: write refused past {} bytes", self.key.1, limit),
                ));
            }
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl WriteStream for MemoryWriter {
    fn sync(&mut self) -> std::io::Result<()> {
        self.publish();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.publish();
    }
}

impl Directory for MemoryDirectory {
    fn location(&self) -> String {
        format!("memory:/{}", self.path)
    }

    fn exists(&self) -> DirectoryResult<bool> {
        Ok(self.lock().dirs.contains(&self.path))
    }

    fn mkdir(&self) -> DirectoryResult<()> {
        let mut state = self.lock();
        let mut prefix = String::new();
        state.dirs.insert(String::new());
        for part in self.path.split('/').filter(|p| !p.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            state.dirs.insert(prefix.clone());
        }
        Ok(())
    }

    fn list_files(&self) -> DirectoryResult<Vec<String>> {
        let state = self.lock();
        if !state.dirs.contains(&self.path) {
            return Err(DirectoryError::NotFound(self.path.clone()));
        }
        Ok(state
            .files
            .keys()
            .filter(|(dir, _)| *dir == self.path)
            .map(|(_, name)| name.clone())
            .collect())
    }

    fn open_reader(&self, name: &str) -> DirectoryResult<Box<dyn ReadStream>> {
        let key = self.key(name)?;
        let state = self.lock();
        let data = state
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_writer(&self, name: &str) -> DirectoryResult<Box<dyn WriteStream>> {
        let key = self.key(name)?;
        let mut state = self.lock();
        if !state.dirs.contains(&self.path) {
            return Err(DirectoryError::NotFound(self.path.clone()));
        }
        if state.files.contains_key(&key) {
            return Err(DirectoryError::AlreadyExists(name.to_string()));
        }
        state.files.insert(key.clone(), Vec::new());
        Ok(Box::new(MemoryWriter {
            state: Arc::clone(&self.state),
            key,
            buf: Vec::new(),
        }))
    }

    fn delete_file(&self, name: &str) -> DirectoryResult<()> {
        let key = self.key(name)?;
        let mut state = self.lock();
        if state.delete_fails(name) {
            return Err(DirectoryError::Io(format!("{}: delete refused", name)));
        }
        state.files.remove(&key);
        Ok(())
    }

    fn file_len(&self, name: &str) -> DirectoryResult<u64> {
        let key = self.key(name)?;
        self.lock()
            .files
            .get(&key)
            .map(|f| f.len() as u64)
            .ok_or_else(|| DirectoryError::NotFound(name.to_string()))
    }

    fn subdirectory(&self, name: &str) -> DirectoryResult<Arc<dyn Directory>> {
        validate_name(name)?;
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.path, name)
        };
        Ok(Arc::new(MemoryDirectory {
            state: Arc::clone(&self.state),
            path,
        }))
    }
}
