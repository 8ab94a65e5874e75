//! Page cache implementation for the positional index.
//!
//! Provides a multi-queue (MQ) cache that promotes entries by access
//! frequency and demotes them on expiry, with a ghost history for
//! re-promotion of recently evicted keys.

mod mq;

pub use mq::{CacheStats, EvictCallback, MqCache, DEFAULT_LIFE_TIME, DEFAULT_QUEUE_COUNT};
