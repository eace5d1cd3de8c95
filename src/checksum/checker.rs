//! Checksumming stream decorators
//!
//! The writer side digests every byte that the underlying stream accepts
//! and persists the final digest on `close`. The reader side digests every
//! byte handed out and compares against the persisted digest on `close`.

use std::io::{self, Read, Write};
use std::sync::Arc;

use super::algorithm::{ChecksumAlgorithm, Digest};
use super::registry::ChecksumRegistry;
use crate::crash_point::{maybe_crash, points};
use crate::directory::WriteStream;
use crate::store::{StoreError, StoreResult};

/// Persists `(algorithm_name, digest)` for a version
pub type WriteChecksumFn = Box<dyn FnOnce(&str, &[u8]) -> io::Result<()> + Send>;

/// Loads the persisted digest for a version given its algorithm name
pub type ReadChecksumFn = Box<dyn FnOnce(&str) -> io::Result<Vec<u8>> + Send>;

/// Pluggable integrity checking for version streams
#[derive(Debug, Clone)]
pub struct IntegrityChecker {
    registry: ChecksumRegistry,
    default: Arc<dyn ChecksumAlgorithm>,
}

impl IntegrityChecker {
    /// Checker writing with `default_name`, able to verify anything in `registry`
    pub fn new(registry: ChecksumRegistry, default_name: &str) -> StoreResult<Self> {
        let default = registry.get(default_name).ok_or_else(|| {
            StoreError::client(format!("unknown checksum algorithm '{}'", default_name))
        })?;
        Ok(Self { registry, default })
    }

    /// Name of the algorithm new versions are written with
    pub fn algorithm_name(&self) -> &str {
        self.default.name()
    }

    pub fn registry(&self) -> &ChecksumRegistry {
        &self.registry
    }

    /// Whether a version tagged with `name` can be verified
    pub fn supports(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn decorate_writer<W: WriteStream>(
        &self,
        inner: W,
        version_name: &str,
        write_checksum: WriteChecksumFn,
    ) -> ChecksumWriter<W> {
        ChecksumWriter {
            inner: Some(inner),
            digest: Some(self.default.digest()),
            algorithm: self.default.name().to_string(),
            version_name: version_name.to_string(),
            write_checksum: Some(write_checksum),
            bytes_written: 0,
            failed: false,
        }
    }

    /// Wrap `inner` for verification with the algorithm the version was
    /// written with. An algorithm this checker does not know is a client error.
    pub fn decorate_reader<R: Read>(
        &self,
        inner: R,
        version_name: &str,
        algorithm_name: &str,
        read_checksum: ReadChecksumFn,
    ) -> StoreResult<ChecksumReader<R>> {
        let algorithm = self.registry.get(algorithm_name).ok_or_else(|| {
            StoreError::client(format!("unknown checksum algorithm '{}'", algorithm_name))
                .with_details(format!("version: {}", version_name))
        })?;
        Ok(ChecksumReader {
            inner: Some(inner),
            digest: Some(algorithm.digest()),
            algorithm: algorithm_name.to_string(),
            version_name: version_name.to_string(),
            read_checksum: Some(read_checksum),
            bytes_read: 0,
        })
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        let registry = ChecksumRegistry::with_builtins();
        let default: Arc<dyn ChecksumAlgorithm> = Arc::new(super::BuiltinAlgorithm::DEFAULT);
        Self { registry, default }
    }
}

fn writer_closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "checksum writer already closed")
}

/// Writer that digests everything passing through it
pub struct ChecksumWriter<W: WriteStream> {
    inner: Option<W>,
    digest: Option<Box<dyn Digest>>,
    algorithm: String,
    version_name: String,
    write_checksum: Option<WriteChecksumFn>,
    bytes_written: u64,
    failed: bool,
}

impl<W: WriteStream> ChecksumWriter<W> {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Whether an earlier write or flush failed
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Finalize the digest, persist it, then make the data durable.
    ///
    /// The underlying stream is dropped on every path.
    pub fn close(mut self) -> StoreResult<()> {
        if self.failed {
            return Err(StoreError::client(format!(
                "writer for {} failed earlier and cannot be committed",
                self.version_name
            )));
        }
        let mut inner = self.inner.take().ok_or_else(writer_closed)?;
        inner.flush()?;
        maybe_crash(points::WRITER_BEFORE_CHECKSUM);

        let digest = self.digest.take().ok_or_else(writer_closed)?.finalize();
        let write_checksum = self.write_checksum.take().ok_or_else(writer_closed)?;
        write_checksum(&self.algorithm, &digest)?;
        maybe_crash(points::WRITER_AFTER_CHECKSUM);

        inner.sync()?;
        Ok(())
    }
}

impl<W: WriteStream> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "checksum writer failed earlier",
            ));
        }
        let (inner, digest) = match (self.inner.as_mut(), self.digest.as_mut()) {
            (Some(inner), Some(digest)) => (inner, digest),
            _ => return Err(writer_closed()),
        };
        match inner.write(buf) {
            Ok(n) => {
                digest.update(&buf[..n]);
                self.bytes_written += n as u64;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = self.inner.as_mut().ok_or_else(writer_closed)?;
        inner.flush().map_err(|e| {
            self.failed = true;
            e
        })
    }
}

/// Reader that digests everything it hands out
pub struct ChecksumReader<R: Read> {
    inner: Option<R>,
    digest: Option<Box<dyn Digest>>,
    algorithm: String,
    version_name: String,
    read_checksum: Option<ReadChecksumFn>,
    bytes_read: u64,
}

impl<R: Read> std::fmt::Debug for ChecksumReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChecksumReader")
            .field("algorithm", &self.algorithm)
            .field("version_name", &self.version_name)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}

impl<R: Read> ChecksumReader<R> {
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the rest of the stream and compare digests.
    ///
    /// The underlying stream is dropped before the comparison, on every path.
    pub fn close(mut self) -> StoreResult<()> {
        let drained = io::copy(&mut self, &mut io::sink());
        self.inner.take();
        drained?;

        let actual = match self.digest.take() {
            Some(digest) => digest.finalize(),
            None => return Err(StoreError::client("checksum reader already closed")),
        };
        let read_checksum = self
            .read_checksum
            .take()
            .ok_or_else(|| StoreError::client("checksum reader already closed"))?;
        let expected = read_checksum(&self.algorithm)?;

        if actual != expected {
            return Err(StoreError::checksum_mismatch(
                &self.version_name,
                &self.algorithm,
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (inner, digest) = match (self.inner.as_mut(), self.digest.as_mut()) {
            (Some(inner), Some(digest)) => (inner, digest),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "checksum reader already closed",
                ))
            }
        };
        let n = inner.read(buf)?;
        digest.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}
