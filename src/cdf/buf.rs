//! Random-access byte view over a CDF file.
//!
//! All record parsing goes through [`Buf`]. Control fields (record
//! sizes and types, offsets, counts, names) are written in network
//! byte order in every CDF variant and are read by the `read_int` /
//! `read_offset` / `read_string` family. Data values (variable
//! records, attribute entries, pad values) follow the encoding named
//! by the CDR and are read by the bulk `read_*s` family, which honours
//! the buffer's byte-order flag.
//!
//! The two configuration flags are written exactly twice during
//! [`CdfReader::new`](crate::CdfReader::new): the offset width after
//! magic-number decoding, and the byte order after CDR parsing. The
//! buffer must not be reconfigured afterwards.

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::warn;

use super::types::error::{CdfError, Result};

/// A read cursor over a [`Buf`].
#[derive(Debug, Clone, Copy)]
pub struct Pointer {
    pos: u64,
}

impl Pointer {
    /// Creates a cursor at the given byte offset.
    pub fn new(pos: u64) -> Self {
        Pointer { pos }
    }

    /// The cursor's current byte offset.
    pub fn get(&self) -> u64 {
        self.pos
    }

    fn advance(&mut self, n: u64) -> u64 {
        let pos = self.pos;
        self.pos += n;
        pos
    }
}

/// A cheaply-cloneable random-access view of file bytes.
///
/// Cloning shares the backing storage. A decompressed region is
/// wrapped by [`Buf::with_flags_of`], which inherits the parent's
/// configuration so record parsing continues unchanged.
#[derive(Debug, Clone)]
pub struct Buf {
    data: Arc<[u8]>,
    bit64: bool,
    big_endian: bool,
}

impl Buf {
    /// Wraps a byte vector. Starts with 32-bit offsets and big-endian
    /// data order; `CdfReader` reconfigures both during open.
    pub fn new(data: Vec<u8>) -> Self {
        Buf {
            data: data.into(),
            bit64: false,
            big_endian: true,
        }
    }

    /// Wraps a byte vector, inheriting another buffer's configuration.
    pub fn with_flags_of(data: Vec<u8>, parent: &Buf) -> Self {
        Buf {
            data: data.into(),
            bit64: parent.bit64,
            big_endian: parent.big_endian,
        }
    }

    /// Total length of the backing bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True when the backing byte run is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sets the file-offset width: 8-byte offsets when true, 4-byte
    /// otherwise.
    pub fn set_bit64(&mut self, bit64: bool) {
        self.bit64 = bit64;
    }

    /// The configured file-offset width flag.
    pub fn bit64(&self) -> bool {
        self.bit64
    }

    /// Sets the byte order used for data-value reads.
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// The configured data-value byte order.
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// Bounds-checked view of `count` bytes starting at `offset`.
    fn slice(&self, offset: u64, count: u64) -> Result<&[u8]> {
        let end = offset.checked_add(count).ok_or(CdfError::OutOfBounds {
            offset,
            count,
            len: self.len(),
        })?;
        if end > self.len() {
            return Err(CdfError::OutOfBounds {
                offset,
                count,
                len: self.len(),
            });
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Raw bytes at an absolute offset.
    pub fn read_bytes(&self, offset: u64, count: u64) -> Result<&[u8]> {
        self.slice(offset, count)
    }

    /// Reads a 4-byte control integer (network byte order).
    pub fn read_int(&self, ptr: &mut Pointer) -> Result<i32> {
        let bytes = self.slice(ptr.advance(4), 4)?;
        Ok(BigEndian::read_i32(bytes))
    }

    /// Reads a file offset at the configured width: 8 bytes when the
    /// 64-bit flag is set, otherwise 4 bytes sign-extended.
    pub fn read_offset(&self, ptr: &mut Pointer) -> Result<i64> {
        if self.bit64 {
            let bytes = self.slice(ptr.advance(8), 8)?;
            Ok(BigEndian::read_i64(bytes))
        } else {
            Ok(self.read_int(ptr)? as i64)
        }
    }

    /// Reads a fixed-width NUL-padded ASCII region as a string.
    ///
    /// The string ends at the first NUL byte. Non-NUL bytes after the
    /// terminator are suspect in well-formed files and are logged at
    /// warning level.
    pub fn read_string(&self, ptr: &mut Pointer, width: u64) -> Result<String> {
        let bytes = self.slice(ptr.advance(width), width)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        if bytes[end..].iter().any(|&b| b != 0) {
            warn!(
                "Non-NUL bytes after string terminator in {}-byte field at offset {}",
                width,
                ptr.get() - width
            );
        }
        Ok(bytes[..end].iter().map(|&b| b as char).collect())
    }

    /// Fills `out` with signed bytes starting at `offset`.
    pub fn read_i8s(&self, offset: u64, out: &mut [i8]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64)?;
        for (dst, &b) in out.iter_mut().zip(src) {
            *dst = b as i8;
        }
        Ok(())
    }

    /// Fills `out` with unsigned bytes starting at `offset`.
    pub fn read_u8s(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64)?;
        out.copy_from_slice(src);
        Ok(())
    }

    /// Fills `out` with 16-bit integers in the configured data order.
    pub fn read_i16s(&self, offset: u64, out: &mut [i16]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 2)?;
        if self.big_endian {
            BigEndian::read_i16_into(src, out);
        } else {
            LittleEndian::read_i16_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with unsigned 16-bit integers in the configured
    /// data order.
    pub fn read_u16s(&self, offset: u64, out: &mut [u16]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 2)?;
        if self.big_endian {
            BigEndian::read_u16_into(src, out);
        } else {
            LittleEndian::read_u16_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with 32-bit integers in the configured data order.
    pub fn read_i32s(&self, offset: u64, out: &mut [i32]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 4)?;
        if self.big_endian {
            BigEndian::read_i32_into(src, out);
        } else {
            LittleEndian::read_i32_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with unsigned 32-bit integers in the configured
    /// data order.
    pub fn read_u32s(&self, offset: u64, out: &mut [u32]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 4)?;
        if self.big_endian {
            BigEndian::read_u32_into(src, out);
        } else {
            LittleEndian::read_u32_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with 64-bit integers in the configured data order.
    pub fn read_i64s(&self, offset: u64, out: &mut [i64]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 8)?;
        if self.big_endian {
            BigEndian::read_i64_into(src, out);
        } else {
            LittleEndian::read_i64_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with 32-bit floats in the configured data order.
    pub fn read_f32s(&self, offset: u64, out: &mut [f32]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 4)?;
        if self.big_endian {
            BigEndian::read_f32_into(src, out);
        } else {
            LittleEndian::read_f32_into(src, out);
        }
        Ok(())
    }

    /// Fills `out` with 64-bit floats in the configured data order.
    pub fn read_f64s(&self, offset: u64, out: &mut [f64]) -> Result<()> {
        let src = self.slice(offset, out.len() as u64 * 8)?;
        if self.big_endian {
            BigEndian::read_f64_into(src, out);
        } else {
            LittleEndian::read_f64_into(src, out);
        }
        Ok(())
    }

    /// Reads a fixed-width data string (NUL-trimmed) at `offset`.
    pub fn read_data_string(&self, offset: u64, width: u64) -> Result<String> {
        let bytes = self.slice(offset, width)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(bytes[..end].iter().map(|&b| b as char).collect())
    }
}
