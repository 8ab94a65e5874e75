//! Append-only typed value file.
//!
//! Stores fixed-width records back to back; the byte offset returned by an
//! append is the record's identity and is what the positional index holds.

mod codec;

pub use codec::{BincodeCodec, Codec, FixedValue, RawCodec};

use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Append-only file of fixed-width records of type `T`.
pub struct ValueFile<T> {
    file: File,
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> ValueFile<T> {
    /// Open a value file, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        Ok(Self { file, path, _marker: PhantomData })
    }

    /// Whether the value file handle is held. Open failures are reported
    /// by [`open`](ValueFile::open) itself.
    pub fn is_open(&self) -> bool {
        true
    }

    /// Append one record encoded with `codec`, returning the byte offset
    /// it was written at.
    pub fn append_with<C: Codec<T>>(&mut self, value: &T, codec: &C) -> Result<u64> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        codec.encode(&mut self.file, value)?;
        Ok(offset)
    }

    /// Read the record at `offset` with `codec`.
    pub fn get_with<C: Codec<T>>(&mut self, offset: u64, codec: &C) -> Result<T> {
        self.file.seek(SeekFrom::Start(offset))?;
        codec.decode(&mut self.file)
    }

    /// Force buffered record data to persistent storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Current file size in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: FixedValue> ValueFile<T> {
    /// Append one record with the default raw codec, returning the byte
    /// offset it was written at.
    pub fn append(&mut self, value: &T) -> Result<u64> {
        self.append_with(value, &RawCodec)
    }

    /// Read the record at `offset` with the default raw codec.
    pub fn get(&mut self, offset: u64) -> Result<T> {
        self.get_with(offset, &RawCodec)
    }
}
