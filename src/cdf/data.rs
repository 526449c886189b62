//! Bulk reading of typed data values.
//!
//! A `DataReader` knows how one record of a variable (or one attribute
//! entry) is laid out: the data type, the sub-element count per item,
//! and the item count. It allocates matching raw buffers and fills
//! them from a buffer offset with a single bulk read per record.

use super::buf::Buf;
use super::types::data_type::DataType;
use super::types::error::Result;
use super::types::values::{ElementKind, RawArray};

/// Reads raw values for one variable or attribute entry.
#[derive(Debug, Clone)]
pub struct DataReader {
    data_type: DataType,
    num_elems: usize,
    n_item: usize,
}

impl DataReader {
    /// Creates a reader for `n_item` items of `num_elems` sub-elements
    /// each. For string types `num_elems` is the character count; for
    /// numeric types it is normally 1.
    pub fn new(data_type: DataType, num_elems: usize, n_item: usize) -> Self {
        DataReader {
            data_type,
            num_elems,
            n_item,
        }
    }

    /// The data type being read.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Raw buffer slots one record occupies.
    fn slot_count(&self) -> usize {
        if self.data_type.is_string() {
            self.n_item
        } else {
            self.n_item * self.num_elems * self.data_type.group_size()
        }
    }

    /// Allocates a raw buffer sized for exactly one record.
    pub fn create_raw_value_array(&self) -> RawArray {
        RawArray::with_len(self.data_type.element_kind(), self.slot_count())
    }

    /// Bytes one record occupies on disk.
    pub fn record_bytes(&self) -> u64 {
        (self.data_type.num_bytes(self.num_elems) * self.n_item) as u64
    }

    /// Fills `out` with one record's elements starting at `offset`.
    ///
    /// # Panics
    /// Panics when `out` was not allocated by
    /// [`create_raw_value_array`](Self::create_raw_value_array) for
    /// this reader, which is a caller contract violation.
    pub fn read_value(&self, buf: &Buf, offset: u64, out: &mut RawArray) -> Result<()> {
        assert!(
            out.element_kind() == self.data_type.element_kind() && out.len() == self.slot_count(),
            "workspace array does not match this reader: expected {} slots of {:?}, got {} of {:?}",
            self.slot_count(),
            self.data_type.element_kind(),
            out.len(),
            out.element_kind()
        );
        match out {
            RawArray::Int1(v) => buf.read_i8s(offset, v),
            RawArray::Int2(v) => buf.read_i16s(offset, v),
            RawArray::Int4(v) => buf.read_i32s(offset, v),
            RawArray::Int8(v) => buf.read_i64s(offset, v),
            RawArray::UInt1(v) => buf.read_u8s(offset, v),
            RawArray::UInt2(v) => buf.read_u16s(offset, v),
            RawArray::UInt4(v) => buf.read_u32s(offset, v),
            RawArray::Real4(v) => buf.read_f32s(offset, v),
            RawArray::Real8(v) => buf.read_f64s(offset, v),
            RawArray::Text(v) => {
                let width = self.num_elems as u64;
                for (i, slot) in v.iter_mut().enumerate() {
                    *slot = buf.read_data_string(offset + i as u64 * width, width)?;
                }
                Ok(())
            }
        }
    }

    /// The element family this reader produces.
    pub fn element_kind(&self) -> ElementKind {
        self.data_type.element_kind()
    }
}
