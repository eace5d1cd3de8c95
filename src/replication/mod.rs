//! Replication Subsystem
//!
//! Copies versions between stores while preserving creation times, so a
//! destination's history lines up with its sources.
//!
//! - [`copy`] takes the newest listed version of one source, with no
//!   fallback.
//! - [`copy_newest`] considers every version of every source, newest
//!   creation time first (ties go to the earlier source), and moves past
//!   candidates that fail verification.
//! - [`Replicator`] repeats a [`copy_newest`] pass on an interval, copying
//!   only when some source holds something newer than the destination.
//!
//! Every copy is all-or-nothing: the destination writer is aborted if the
//! source fails verification or the destination write fails.
//!
//! # Failure attribution
//!
//! Source failures (unreadable listing, checksum mismatch) fall through to
//! the next candidate. Destination failures (conflict, I/O, closed store)
//! end the pass and are returned to the caller.

mod copy;
mod replicator;

pub use copy::{copy, copy_newest};
pub use replicator::{ReplicationOutcome, Replicator};
