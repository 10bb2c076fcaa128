//! # Registry
//!
//! Subscriber table: identity → notification address.
//!
//! - Last write wins per identity
//! - `list_all` hands out snapshot copies
//! - Optional JSON snapshot file for durability across restarts

mod registry;
mod snapshot;

pub use contracts::{Subscriber, SubscriberStore};
pub use registry::Registry;
pub use snapshot::SnapshotFile;
