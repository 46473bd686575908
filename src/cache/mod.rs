//! Local snapshot cache: bounded TTL store mirrored to durable storage, and
//! the cached-request wrapper built on top of it.

mod requests;
mod snapshot;
mod storage;

pub use requests::CachedRequests;
pub use snapshot::{CacheEntry, SnapshotCache};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
