//! In-memory column store with run-length value segments.
//!
//! A column is a 64-bit ordinal position; the store maps each distinct
//! value to the sorted list of column segments holding it. Consecutive
//! columns with the same value collapse into one segment at insertion
//! time, which keeps predicate scans and aggregation proportional to the
//! number of runs rather than the number of columns. An optional dense
//! side table maps columns straight back to values for point lookups.
//!
//! Writes stay in memory; the interfaces for spilling the write store into
//! on-disk segments exist but do not persist anything yet.

mod segment;

pub use segment::ColumnSegment;

use crate::config::Options;
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Column store over values of type `T`.
///
/// `T` is the cell type of one column family. The write store keeps values
/// ordered, so scans visit values in ascending order.
pub struct ColumnStore<T> {
    /// Distinct value to its sorted, non-overlapping column segments.
    write_store: BTreeMap<T, Vec<ColumnSegment>>,

    /// Dense column-to-value table, maintained while fast lookup is on.
    column_lookup: HashMap<u64, T>,

    use_fast_column_lookup: bool,

    base_path: PathBuf,
}

impl<T: Ord + Clone> ColumnStore<T> {
    /// Open a column store rooted at `base_path`.
    pub fn open<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        Self::with_options(base_path, &Options::default())
    }

    /// Open a column store with explicit options.
    pub fn with_options<P: AsRef<Path>>(base_path: P, options: &Options) -> Result<Self> {
        let mut store = Self {
            write_store: BTreeMap::new(),
            column_lookup: HashMap::new(),
            use_fast_column_lookup: options.use_fast_column_lookup,
            base_path: base_path.as_ref().to_path_buf(),
        };
        store.find_disk_segments()?;
        Ok(store)
    }

    /// Whether the store is usable. Open failures are reported by
    /// [`open`](ColumnStore::open) itself.
    pub fn is_open(&self) -> bool {
        true
    }

    /// Number of distinct values in the write store.
    pub fn count(&self) -> u64 {
        self.write_store.len() as u64
    }

    /// Enable or disable the dense column-to-value table.
    ///
    /// Disabling clears the table. Re-enabling starts from empty; the
    /// table repopulates through subsequent `put`s only.
    pub fn set_use_fast_column_lookup(&mut self, enabled: bool) {
        if !enabled {
            self.column_lookup.clear();
        }
        self.use_fast_column_lookup = enabled;
    }

    /// Record `value` at `column`.
    ///
    /// The segment list for `value` is walked in order and the first
    /// matching rule wins: extend a segment whose edge touches `column`,
    /// or insert a fresh single-column segment at the sorted position.
    /// Touching extensions never coalesce with the following segment, so
    /// two runs that grow together stay adjacent in the list.
    pub fn put(&mut self, column: u64, value: T) {
        if self.use_fast_column_lookup {
            self.column_lookup.insert(column, value.clone());
        }

        let segments = self.write_store.entry(value).or_default();
        for i in 0..segments.len() {
            let segment = segments[i];
            if Some(column) == segment.start.checked_sub(1) {
                segments[i].start = column;
                return;
            }
            if Some(column) == segment.end.checked_add(1) {
                segments[i].end = column;
                return;
            }
            if segment.start > column {
                segments.insert(i, ColumnSegment::single(column));
                return;
            }
        }

        segments.push(ColumnSegment::single(column));
    }

    /// Value recorded at `column`, if any.
    ///
    /// Uses the dense table when enabled; otherwise walks the segment
    /// lists, leaving each list as soon as its segments start past
    /// `column`.
    pub fn get(&self, column: u64) -> Option<T> {
        if self.use_fast_column_lookup {
            return self.column_lookup.get(&column).cloned();
        }

        for (value, segments) in &self.write_store {
            for segment in segments {
                if segment.start > column {
                    break;
                }
                if segment.contains(column) {
                    return Some(value.clone());
                }
            }
        }

        None
    }

    /// Column segments of every value matching `predicate`.
    ///
    /// Segments are returned in value order, each value's list in start
    /// order. The segments of one value never overlap; segments of
    /// different values can, when a column was written twice.
    pub fn scan<P>(&self, predicate: P) -> Vec<ColumnSegment>
    where
        P: Fn(&T) -> bool,
    {
        let mut columns = Vec::new();
        for (value, segments) in &self.write_store {
            if predicate(value) {
                columns.extend_from_slice(segments);
            }
        }
        columns
    }

    /// Fold every distinct value into an accumulator.
    ///
    /// `aggr` receives the value, the accumulator, and the number of
    /// columns holding that value.
    pub fn aggregate<F>(&self, mut aggr: F) -> T
    where
        T: Default,
        F: FnMut(&T, &mut T, u64),
    {
        let mut acc = T::default();
        for (value, segments) in &self.write_store {
            let count = segments.iter().map(ColumnSegment::len).sum();
            aggr(value, &mut acc, count);
        }
        acc
    }

    /// Spill the write store into a new on-disk segment.
    pub fn flush(&mut self) -> Result<()> {
        self.create_disk_segment()
    }

    /// Dumps the pre-sorted write store into a disk segment.
    fn create_disk_segment(&mut self) -> Result<()> {
        // TODO: write the value file and positional index pair under
        // `base_path` and clear the write store.
        Ok(())
    }

    /// Finds existing disk segments at open.
    fn find_disk_segments(&mut self) -> Result<()> {
        // TODO: enumerate segment files under `base_path` and register
        // them for reads.
        log::debug!("scanning for disk segments under {:?}", self.base_path);
        Ok(())
    }

    #[cfg(test)]
    fn segments_of(&self, value: &T) -> Option<&Vec<ColumnSegment>> {
        self.write_store.get(value)
    }
}
