//! Integrity checking for version files
//!
//! Every version is written through a [`ChecksumWriter`] and verified
//! through a [`ChecksumReader`]. The digest lands in a sidecar file named
//! `<data file>.<algorithm>`, so a version records which algorithm sealed
//! it and stays readable after the store's default algorithm changes.
//!
//! # Algorithms
//!
//! | name      | kind                      | digest bytes |
//! |-----------|---------------------------|--------------|
//! | `crc32`   | IEEE CRC-32 (default)     | 4            |
//! | `crc64`   | CRC-64/ECMA-182           | 8            |
//! | `fnv32a`  | FNV-1a                    | 4            |
//! | `fnv64a`  | FNV-1a                    | 8            |
//! | `fnv128a` | FNV-1a                    | 16           |
//! | `xxh64`   | XXH64                     | 8            |
//! | `sha256`  | SHA-256                   | 32           |
//! | `sha512`  | SHA-512                   | 64           |
//!
//! Custom algorithms implement [`ChecksumAlgorithm`] and are registered in a
//! [`ChecksumRegistry`]; names must match `^[a-z0-9]+$`.

mod algorithm;
mod checker;
mod registry;

pub use algorithm::{is_valid_name, BuiltinAlgorithm, ChecksumAlgorithm, Digest};
pub use checker::{
    ChecksumReader, ChecksumWriter, IntegrityChecker, ReadChecksumFn, WriteChecksumFn,
};
pub use registry::ChecksumRegistry;
