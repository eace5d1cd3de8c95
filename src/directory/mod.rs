//! # Directory Capability
//!
//! The storage namespace a store lives in. A directory is a flat set of
//! files plus named subdirectories; the store only ever creates, lists,
//! reads and deletes whole files through it.
//!
//! Contract relied on by the store:
//! - `open_writer` never overwrites; an existing name is `AlreadyExists`
//! - `delete_file` is idempotent
//! - `list_files` reports files only

pub mod backend;
pub mod errors;
pub mod local;
pub mod memory;

pub use backend::{Directory, ReadStream, WriteStream};
pub use errors::{DirectoryError, DirectoryResult};
pub use local::LocalDirectory;
pub use memory::MemoryDirectory;
