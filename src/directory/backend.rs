//! # Directory Trait

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use super::errors::DirectoryResult;

/// A readable file stream handed out by a directory.
pub trait ReadStream: Read + Send {}

impl<T: Read + Send> ReadStream for T {}

/// A writable file stream handed out by a directory.
pub trait WriteStream: Write + Send {
    /// Make everything written so far durable.
    fn sync(&mut self) -> std::io::Result<()>;
}

impl<W: WriteStream + ?Sized> WriteStream for Box<W> {
    fn sync(&mut self) -> std::io::Result<()> {
        (**self).sync()
    }
}

/// Capability over a flat namespace of files plus named subdirectories.
///
/// The store never touches the filesystem directly; everything goes through
/// this trait so that a store can live on local disk, in memory, or on any
/// other backend that honors the contract below.
pub trait Directory: Send + Sync + fmt::Debug {
    /// Whether the directory itself exists
    fn exists(&self) -> DirectoryResult<bool>;

    /// Create the directory (and missing parents)
    fn mkdir(&self) -> DirectoryResult<()>;

    /// Names of the files in this directory, excluding subdirectories
    fn list_files(&self) -> DirectoryResult<Vec<String>>;

    /// Open an existing file for reading
    fn open_reader(&self, name: &str) -> DirectoryResult<Box<dyn ReadStream>>;

    /// Create a new file for writing. Fails with `AlreadyExists` rather
    /// than overwriting.
    fn open_writer(&self, name: &str) -> DirectoryResult<Box<dyn WriteStream>>;

    /// Delete a file. Succeeds if the file is already absent.
    fn delete_file(&self, name: &str) -> DirectoryResult<()>;

    /// Length of a file in bytes
    fn file_len(&self, name: &str) -> DirectoryResult<u64>;

    /// Handle to a named subdirectory (which need not exist yet)
    fn subdirectory(&self, name: &str) -> DirectoryResult<Arc<dyn Directory>>;

    /// Human-readable location, used in log lines
    fn location(&self) -> String;
}
