//! Question cache and its invalidation protocol.
//!
//! - [`QuestionCache`]: sharded LRU + TTL map of question id → aggregate.
//! - [`InvalidationCoordinator`]: evicts and notifies after committed writes.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1000
//! freshness_seconds = 1200
//! shards = 16
//! ```

mod config;
mod coordinator;
mod events;
mod lock;
mod store;

pub use config::CacheConfig;
pub use coordinator::InvalidationCoordinator;
pub use events::ChangeKind;
pub use store::{CacheEntry, PopulateTicket, QuestionCache};
