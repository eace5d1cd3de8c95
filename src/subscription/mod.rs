//! Update notifications
//!
//! A [`SubscriptionHub`] belongs to each store and is notified after every
//! committed version. Observers (including background compaction) hold a
//! [`Subscription`].
//!
//! Delivery is at-least-once-eventually: notifications arriving while one is
//! already pending are coalesced into it.
//!
//! ```ignore
//! let mut sub = store.subscribe()?;
//! while sub.changed().await {
//!     let latest = store.read_bytes()?;
//! }
//! ```

mod hub;
#[allow(clippy::module_inception)]
mod subscription;

pub use hub::{NotifyResult, SubscriptionHub};
pub use subscription::Subscription;
