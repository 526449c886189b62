//! Shaping raw element buffers into logical multi-dimensional values.
//!
//! A variable's stored record is a flat run of elements covering only
//! its *varying* dimensions, laid out in the file's major order. The
//! shaper turns that run into the logical value handed to consumers:
//! a scalar when one element remains after variance-suppressed axes
//! collapse, otherwise a flat array in row-major order (column-major
//! sources are transposed on the way out).

use super::types::data_type::DataType;
use super::types::values::{RawArray, ShapeClass, Value};

/// Shape engine for one variable or attribute entry.
#[derive(Debug, Clone)]
pub struct Shaper {
    data_type: DataType,
    dim_sizes: Vec<i32>,
    raw_item_count: usize,
    /// Gather order mapping row-major output items to column-major
    /// source items; `None` when storage order already matches.
    order: Option<Vec<usize>>,
}

impl Shaper {
    /// Builds a shaper for declared extents `dim_sizes`, their
    /// variance flags, and the file's major order.
    pub fn new(data_type: DataType, dim_sizes: &[i32], dim_varys: &[bool], row_major: bool) -> Self {
        let varying_sizes: Vec<usize> = dim_sizes
            .iter()
            .zip(dim_varys)
            .filter(|(_, &varies)| varies)
            .map(|(&size, _)| size.max(0) as usize)
            .collect();
        let raw_item_count = varying_sizes.iter().product();
        let order = if !row_major && varying_sizes.len() > 1 {
            Some(column_major_order(&varying_sizes))
        } else {
            None
        };
        Shaper {
            data_type,
            dim_sizes: dim_sizes.to_vec(),
            raw_item_count,
            order,
        }
    }

    /// The data type being shaped.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The declared dimension extents, variance-suppressed axes
    /// included.
    pub fn dim_sizes(&self) -> &[i32] {
        &self.dim_sizes
    }

    /// Stored elements per record: the product of the varying extents.
    pub fn raw_item_count(&self) -> usize {
        self.raw_item_count
    }

    /// The container class shaped reads produce: a scalar when one
    /// single-lane element remains, an array otherwise.
    pub fn shape_class(&self) -> ShapeClass {
        let kind = self.data_type.element_kind();
        if self.raw_item_count == 1 && self.data_type.group_size() == 1 {
            ShapeClass::Scalar(kind)
        } else {
            ShapeClass::Array(kind)
        }
    }

    /// Shapes one record's raw buffer into its logical value.
    ///
    /// A single remaining element yields a scalar, unless
    /// `preserve_fixed` asks that a declared array whose every axis is
    /// variance-suppressed stay a one-element array.
    pub fn shape(&self, raw: &RawArray, preserve_fixed: bool) -> Value {
        let group = self.data_type.group_size();
        let n_elements = raw.len() / group;
        if n_elements == 1 && group == 1 && !(preserve_fixed && !self.dim_sizes.is_empty()) {
            return raw.scalar_at(0, group);
        }
        match &self.order {
            Some(order) if n_elements == self.raw_item_count => {
                Value::Array(raw.gather_items(order, group))
            }
            _ => Value::Array(raw.clone_prefix(n_elements * group)),
        }
    }
}

/// For each row-major output item index, the source index in a
/// column-major layout of the same extents.
fn column_major_order(sizes: &[usize]) -> Vec<usize> {
    let total: usize = sizes.iter().product();
    let mut order = Vec::with_capacity(total);
    let mut coords = vec![0usize; sizes.len()];
    for out in 0..total {
        let mut rem = out;
        for d in (0..sizes.len()).rev() {
            coords[d] = rem % sizes[d];
            rem /= sizes[d];
        }
        let mut src = 0;
        let mut stride = 1;
        for d in 0..sizes.len() {
            src += coords[d] * stride;
            stride *= sizes[d];
        }
        order.push(src);
    }
    order
}
