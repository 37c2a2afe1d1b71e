//! Page cache subsystem.
//!
//! # Data Flow
//! ```text
//! Page request
//!     → store.rs get(path)        (shared lock, expiry check)
//!     → hit: serve cached document values
//!     → miss: build + render, then put(entry) (exclusive lock)
//!
//! Background:
//!     janitor.rs → evict_expired() every interval
//!     hot reload → clear() on source change
//! ```
//!
//! # Design Decisions
//! - Expiry computed by the caller at put time from the route TTL
//! - Expired and missing entries are indistinguishable to callers
//! - Owned structure injected into its users, never a global

pub mod janitor;
pub mod store;

pub use janitor::CacheJanitor;
pub use store::{expires_in, unix_now, CacheEntry, PageCache};
