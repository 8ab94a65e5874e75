//! Configuration options for the coldb storage kernel.

/// Configuration options for opening an index or a column store.
#[derive(Debug, Clone)]
pub struct Options {
    /// Total number of index pages held by the page cache.
    /// The cache distributes this evenly across its queues.
    /// Default: 1024
    pub cache_capacity: u64,

    /// Number of logical ticks before an untouched cache entry becomes
    /// eligible for demotion.
    /// Default: 32
    pub cache_life_time: u64,

    /// Number of LRU queues in the page cache.
    /// Default: 8
    pub cache_queue_count: usize,

    /// Maintain a dense column-to-value side table for point lookups.
    /// Default: true
    pub use_fast_column_lookup: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_capacity: 1024,
            cache_life_time: 32,
            cache_queue_count: 8,
            use_fast_column_lookup: true,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total page cache capacity.
    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the cache entry life time in logical ticks.
    pub fn cache_life_time(mut self, life_time: u64) -> Self {
        self.cache_life_time = life_time;
        self
    }

    /// Sets the number of cache queues.
    pub fn cache_queue_count(mut self, queue_count: usize) -> Self {
        self.cache_queue_count = queue_count;
        self
    }

    /// Enables or disables the fast column lookup table.
    pub fn use_fast_column_lookup(mut self, value: bool) -> Self {
        self.use_fast_column_lookup = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.cache_capacity == 0 {
            return Err(crate::Error::invalid_argument("cache_capacity must be > 0"));
        }
        if self.cache_queue_count == 0 {
            return Err(crate::Error::invalid_argument("cache_queue_count must be > 0"));
        }
        if self.cache_capacity < self.cache_queue_count as u64 {
            return Err(crate::Error::invalid_argument(
                "cache_capacity must be at least cache_queue_count",
            ));
        }
        if self.cache_life_time == 0 {
            return Err(crate::Error::invalid_argument("cache_life_time must be > 0"));
        }
        Ok(())
    }
}
