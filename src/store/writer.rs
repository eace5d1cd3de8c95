//! Version writer
//!
//! The data file is created under its final name and the checksum sidecar
//! is written at `close()`. Until then the version has no sidecar and is
//! never chosen by a reader.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

use super::errors::{StoreError, StoreResult};
use super::filename;
use super::version::Version;
use super::Store;
use crate::checksum::ChecksumWriter;
use crate::crash_point::{maybe_crash, points};
use crate::directory::WriteStream;
use crate::observability::{log_event, Event};

/// Writer for a new version.
///
/// Nothing is committed until `close()` succeeds. Dropping an unclosed
/// writer aborts it and removes everything it wrote.
pub struct VersionWriter {
    store: Store,
    inner: Option<ChecksumWriter<Box<dyn WriteStream>>>,
    number: u64,
    created_at: DateTime<Utc>,
    name: String,
    algorithm: String,
    failure: Option<(io::ErrorKind, String)>,
}

impl VersionWriter {
    pub(crate) fn new(
        store: Store,
        inner: ChecksumWriter<Box<dyn WriteStream>>,
        number: u64,
        created_at: DateTime<Utc>,
        name: String,
    ) -> Self {
        let algorithm = inner.algorithm().to_string();
        Self {
            store,
            inner: Some(inner),
            number,
            created_at,
            name,
            algorithm,
            failure: None,
        }
    }

    /// Number the version will have once committed
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Data file name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes_written(&self) -> u64 {
        self.inner.as_ref().map(|w| w.bytes_written()).unwrap_or(0)
    }

    /// Seal the version: persist its checksum, make it durable, notify
    /// subscribers.
    ///
    /// If any earlier write failed, the version is aborted instead and the
    /// original failure is returned.
    pub fn close(mut self) -> StoreResult<Version> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| StoreError::client("version writer already closed"))?;

        if let Some((kind, message)) = self.failure.take() {
            drop(inner);
            let _ = self.discard();
            return Err(StoreError::io(
                format!("write to {} failed", self.name),
                io::Error::new(kind, message),
            ));
        }
        if self.store.is_closed() {
            drop(inner);
            let _ = self.discard();
            return Err(StoreError::closed());
        }

        let bytes = inner.bytes_written();
        if let Err(e) = inner.close() {
            let _ = self.discard();
            return Err(e);
        }
        maybe_crash(points::WRITER_AFTER_SYNC);

        let version = Version::new(
            self.store.downgrade(),
            self.number,
            self.created_at,
            self.name.clone(),
            Some(self.algorithm.clone()),
        );
        self.store.committed(&version, bytes);
        Ok(version)
    }

    /// Abandon the version and remove its files
    pub fn abort(mut self) -> StoreResult<()> {
        match self.inner.take() {
            Some(inner) => {
                drop(inner);
                self.discard()
            }
            None => Ok(()),
        }
    }

    /// Remove the data file and sidecar. The stream must already be dropped.
    fn discard(&self) -> StoreResult<()> {
        let directory = self.store.directory();
        let sidecar = directory.delete_file(&filename::sidecar_name(&self.name, &self.algorithm));
        let data = directory.delete_file(&self.name);

        self.store.metrics().increment_versions_aborted();
        log_event(
            Event::VersionAbort,
            &[
                ("store", self.store.location()),
                ("version", &self.number.to_string()),
            ],
        );

        sidecar?;
        data?;
        Ok(())
    }
}

impl Write for VersionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "version writer already closed"))?;
        inner.write(buf).map_err(|e| {
            if self.failure.is_none() && e.kind() != io::ErrorKind::Interrupted {
                self.failure = Some((e.kind(), e.to_string()));
            }
            e
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "version writer already closed"))?;
        inner.flush().map_err(|e| {
            if self.failure.is_none() {
                self.failure = Some((e.kind(), e.to_string()));
            }
            e
        })
    }
}

impl Drop for VersionWriter {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            drop(inner);
            let _ = self.discard();
        }
    }
}

impl std::fmt::Debug for VersionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionWriter")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("algorithm", &self.algorithm)
            .field("open", &self.inner.is_some())
            .finish()
    }
}
