// End-to-end tests for the positional index and the value file, alone and
// composed the way the store's flush path uses them.

use coldb::{EntryPosition, Options, PositionalIndex, ValueFile, PAGE_SIZE};
use tempfile::TempDir;

const TEST_REPS: u64 = 10_000;

/// Writing and reading ten thousand entries spans several pages and
/// drives the cache through eviction and write-back.
#[test]
fn test_index_round_trip_across_pages() {
    let dir = TempDir::new().unwrap();
    let mut index = PositionalIndex::open(dir.path().join("test.idx")).unwrap();
    assert!(index.is_open());

    for i in 0..TEST_REPS {
        index.put_entry_offset(EntryPosition::from_ordinal(i), i * 100).unwrap();
    }
    for i in 0..TEST_REPS {
        assert_eq!(index.get_entry_offset(EntryPosition::from_ordinal(i)).unwrap(), i * 100);
    }

    // The pages written expire while later pages stream in, so the cache
    // must have written some of them back already.
    assert!(index.cache_stats().evictions > 0);
    assert_eq!(index.entry_count(), TEST_REPS);
}

/// Dirty pages survive a drop and reopen.
#[test]
fn test_index_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.idx");

    {
        let mut index = PositionalIndex::open(&path).unwrap();
        for i in 0..TEST_REPS {
            index.put_entry_offset(EntryPosition::from_ordinal(i), i * 100).unwrap();
        }
    }

    let file_len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(file_len % PAGE_SIZE as u64, 0);

    let mut index = PositionalIndex::open(&path).unwrap();
    for i in 0..TEST_REPS {
        assert_eq!(index.get_entry_offset(EntryPosition::from_ordinal(i)).unwrap(), i * 100);
    }
}

/// A one-page cache forces a write-back on nearly every page touch and
/// must still read consistently.
#[test]
fn test_index_with_tiny_cache() {
    let dir = TempDir::new().unwrap();
    let options = Options::new().cache_capacity(8);
    let mut index =
        PositionalIndex::with_options(dir.path().join("test.idx"), &options).unwrap();

    for i in 0..TEST_REPS {
        index.put_entry_offset(EntryPosition::from_ordinal(i), i + 7).unwrap();
    }
    for i in 0..TEST_REPS {
        assert_eq!(index.get_entry_offset(EntryPosition::from_ordinal(i)).unwrap(), i + 7);
    }
}

#[test]
fn test_value_file_bulk_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut values: ValueFile<i32> = ValueFile::open(dir.path().join("test.dat")).unwrap();
    assert!(values.is_open());

    let mut offsets = Vec::new();
    for i in 0..TEST_REPS as i32 {
        offsets.push(values.append(&i).unwrap());
    }

    for (i, offset) in offsets.iter().enumerate() {
        assert_eq!(values.get(*offset).unwrap(), i as i32);
    }
}

/// The index holds byte offsets into the value file; resolving an entry
/// ordinal through both layers lands on the right record.
#[test]
fn test_index_resolves_value_records() {
    let dir = TempDir::new().unwrap();
    let mut values: ValueFile<i64> = ValueFile::open(dir.path().join("test.dat")).unwrap();
    let mut index = PositionalIndex::open(dir.path().join("test.idx")).unwrap();

    for i in 0..TEST_REPS {
        let offset = values.append(&(i as i64 * 3)).unwrap();
        index.put_entry_offset(EntryPosition::from_ordinal(i), offset).unwrap();
    }

    // Probe in a scattered order.
    for i in [0, 17, 1023, 1024, 4096, TEST_REPS - 1] {
        let offset = index.get_entry_offset(EntryPosition::from_ordinal(i)).unwrap();
        assert_eq!(values.get(offset).unwrap(), i as i64 * 3);
    }
}
