//! Verified version reader

use std::io::{self, Read};
use std::sync::Arc;

use super::errors::StoreResult;
use super::version::Version;
use crate::checksum::ChecksumReader;
use crate::directory::ReadStream;
use crate::observability::MetricsRegistry;

/// Reader over a version that passed verification when it was opened.
///
/// `close()` verifies again, so corruption that appeared after opening is
/// reported as a checksum mismatch there.
pub struct VersionReader {
    inner: ChecksumReader<Box<dyn ReadStream>>,
    version: Version,
    metrics: Arc<MetricsRegistry>,
}

impl VersionReader {
    pub(crate) fn new(
        inner: ChecksumReader<Box<dyn ReadStream>>,
        version: Version,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            inner,
            version,
            metrics,
        }
    }

    /// The version being read
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes_read()
    }

    /// Drain the stream and check its digest
    pub fn close(self) -> StoreResult<()> {
        let result = self.inner.close();
        if let Err(ref e) = result {
            if e.is_checksum_mismatch() {
                self.metrics.increment_checksum_mismatches();
            }
        }
        result
    }
}

impl Read for VersionReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl std::fmt::Debug for VersionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionReader")
            .field("version", &self.version)
            .field("bytes_read", &self.inner.bytes_read())
            .finish()
    }
}
