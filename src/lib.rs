//! # coldb - An Embedded Columnar Storage Kernel
//!
//! coldb is the storage kernel of a columnar data store: durable,
//! append-only storage of typed values, a disk-backed positional index
//! from logical entry numbers to byte offsets, and an in-memory column
//! map that compresses duplicate values into run-length segments. It is
//! built for analytic workloads where a column is written once, scanned
//! by predicate, aggregated, and occasionally point-queried.
//!
//! ## Architecture
//!
//! The kernel consists of a few cooperating components:
//!
//! - **MQ cache**: A multi-level LRU with access-frequency promotion,
//!   expiry-driven demotion, and a ghost history for re-promotion
//! - **Positional index**: A disk-backed array of 64-bit offsets, read
//!   and written in whole pages through the MQ cache
//! - **Value file**: An append-only file of fixed-width typed records
//!   with a pluggable record codec
//! - **Column store**: A value-to-segments map supporting point reads,
//!   predicate scans, and group-wise aggregation
//!
//! The store uses the index for persistent positional access, the index
//! uses the MQ cache as a write-back page cache, and the cache calls back
//! into the index to write evicted pages to disk.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use coldb::ColumnStore;
//!
//! # fn main() -> Result<(), coldb::Error> {
//! let mut prices: ColumnStore<i64> = ColumnStore::open("./data/price")?;
//!
//! // Write values by column ordinal
//! prices.put(0, 42);
//! prices.put(1, 42);
//! prices.put(2, 99);
//!
//! // Point read
//! assert_eq!(prices.get(0), Some(42));
//!
//! // Predicate scan over the run-length segments
//! let cheap = prices.scan(|price| *price < 50);
//!
//! // Group-wise aggregation
//! let total = prices.aggregate(|price, acc, count| {
//!     *acc += price * count as i64;
//! });
//! # let _ = (cheap, total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The kernel is single-threaded by contract. No component is thread-safe
//! and no operation blocks on another; all mutation happens synchronously
//! on the calling thread.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod store;
pub mod value;

// Re-exports
pub use cache::{CacheStats, MqCache};
pub use config::Options;
pub use error::{Error, Result};
pub use index::{EntryPosition, PositionalIndex, PAGE_SIZE};
pub use store::{ColumnSegment, ColumnStore};
pub use value::{BincodeCodec, Codec, FixedValue, RawCodec, ValueFile};
