//! Record encoders for the value file.
//!
//! A codec turns one typed value into its on-disk record and back. The
//! default raw codec writes the little-endian bytes of fixed-width
//! primitives; callers with richer types can supply their own codec or use
//! the bincode-backed one for serde types.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Encodes and decodes one record of type `T` against a byte stream.
///
/// Codecs are passed by reference and monomorphized at the call site, so
/// the default path compiles down to a plain copy.
pub trait Codec<T> {
    /// Write `value` as one record.
    fn encode<W: Write>(&self, writer: &mut W, value: &T) -> Result<()>;

    /// Read one record.
    fn decode<R: Read>(&self, reader: &mut R) -> Result<T>;
}

/// Fixed-width little-endian conversion for plain values.
///
/// Implemented for the primitive integer and float types. The width is a
/// compile-time constant, which makes record offsets computable without
/// reading the file.
pub trait FixedValue: Copy {
    /// Record width in bytes.
    const WIDTH: usize;

    /// Write the little-endian bytes of `self` into `buf`, which is
    /// exactly `WIDTH` bytes long.
    fn encode_le(&self, buf: &mut [u8]);

    /// Read a value back from the little-endian bytes in `buf`.
    fn decode_le(buf: &[u8]) -> Self;
}

macro_rules! impl_fixed_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl FixedValue for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn encode_le(&self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_le_bytes());
                }

                fn decode_le(buf: &[u8]) -> Self {
                    <$t>::from_le_bytes(buf.try_into().unwrap())
                }
            }
        )*
    };
}

impl_fixed_value!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// The default codec: raw little-endian bytes of a fixed-width value.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl<T: FixedValue> Codec<T> for RawCodec {
    fn encode<W: Write>(&self, writer: &mut W, value: &T) -> Result<()> {
        let mut buf = vec![0u8; T::WIDTH];
        value.encode_le(&mut buf);
        writer.write_all(&buf)?;
        Ok(())
    }

    fn decode<R: Read>(&self, reader: &mut R) -> Result<T> {
        let mut buf = vec![0u8; T::WIDTH];
        reader.read_exact(&mut buf)?;
        Ok(T::decode_le(&buf))
    }
}

/// Codec for serde types, framed with bincode.
///
/// Bincode's default representation is fixed-int little-endian, so records
/// of plain-old-data types keep a fixed width.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for BincodeCodec {
    fn encode<W: Write>(&self, writer: &mut W, value: &T) -> Result<()> {
        bincode::serialize_into(writer, value)?;
        Ok(())
    }

    fn decode<R: Read>(&self, reader: &mut R) -> Result<T> {
        Ok(bincode::deserialize_from(reader)?)
    }
}
