//! # Directory Errors

use std::io;

use thiserror::Error;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised by a [`Directory`](super::Directory) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The named file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// The named file already exists and will not be overwritten
    #[error("File already exists: {0}")]
    AlreadyExists(String),

    /// The name is not a plain file name (separators, `.`/`..`, NUL)
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl DirectoryError {
    /// Map an `io::Error` raised while operating on `name`.
    pub fn from_io(name: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => DirectoryError::NotFound(name.to_string()),
            io::ErrorKind::AlreadyExists => DirectoryError::AlreadyExists(name.to_string()),
            _ => DirectoryError::Io(format!("{}: {}", name, err)),
        }
    }

    /// Whether this error means the file is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::NotFound(_))
    }
}

impl From<DirectoryError> for io::Error {
    fn from(err: DirectoryError) -> Self {
        let kind = match &err {
            DirectoryError::NotFound(_) => io::ErrorKind::NotFound,
            DirectoryError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            DirectoryError::InvalidName(_) => io::ErrorKind::InvalidInput,
            DirectoryError::Io(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Validate that `name` is a single path component.
pub(crate) fn validate_name(name: &str) -> DirectoryResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(DirectoryError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_kinds() {
        let err = DirectoryError::from_io("a", io::Error::new(io::ErrorKind::NotFound, "x"));
        assert_eq!(err, DirectoryError::NotFound("a".into()));
        assert!(err.is_not_found());

        let err = DirectoryError::from_io("b", io::Error::new(io::ErrorKind::AlreadyExists, "x"));
        assert_eq!(err, DirectoryError::AlreadyExists("b".into()));

        let err = DirectoryError::from_io("c", io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(err, DirectoryError::Io(ref m) if m.contains("denied")));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("00000000000000000001_x").is_ok());
        assert!(validate_name("file.crc32").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let io_err: io::Error = DirectoryError::AlreadyExists("x".into()).into();
        assert_eq!(io_err.kind(), io::ErrorKind::AlreadyExists);
    }
}
