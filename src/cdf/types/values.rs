//! Typed value containers for decoded CDF data.
//!
//! CDF stores every value as a run of primitive elements. [`RawArray`] is
//! the workspace form: a flat, typed buffer that bulk reads fill in.
//! [`Value`] is the shaped form handed to consumers: either a single
//! scalar or a flat array in row-major order.

/// The primitive element family a data type decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Int1,
    Int2,
    Int4,
    Int8,
    UInt1,
    UInt2,
    UInt4,
    Real4,
    Real8,
    Text,
}

/// Shape metadata for a variable or entry: what container a shaped
/// read produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeClass {
    /// One element per record.
    Scalar(ElementKind),
    /// A flat array per record.
    Array(ElementKind),
}

impl ShapeClass {
    /// The element family of the container.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            ShapeClass::Scalar(kind) | ShapeClass::Array(kind) => *kind,
        }
    }

    /// True when shaped reads produce a single scalar element.
    pub fn is_scalar(&self) -> bool {
        matches!(self, ShapeClass::Scalar(_))
    }
}

/// A flat, typed buffer of raw elements.
///
/// Numeric variants hold one slot per primitive lane (an EPOCH16
/// element occupies two `Real8` lanes). `Text` holds one `String` per
/// element; the string length is the variable's element count.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArray {
    Int1(Vec<i8>),
    Int2(Vec<i16>),
    Int4(Vec<i32>),
    Int8(Vec<i64>),
    UInt1(Vec<u8>),
    UInt2(Vec<u16>),
    UInt4(Vec<u32>),
    Real4(Vec<f32>),
    Real8(Vec<f64>),
    Text(Vec<String>),
}

macro_rules! raw_array_dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            RawArray::Int1($v) => $body,
            RawArray::Int2($v) => $body,
            RawArray::Int4($v) => $body,
            RawArray::Int8($v) => $body,
            RawArray::UInt1($v) => $body,
            RawArray::UInt2($v) => $body,
            RawArray::UInt4($v) => $body,
            RawArray::Real4($v) => $body,
            RawArray::Real8($v) => $body,
            RawArray::Text($v) => $body,
        }
    };
}

impl RawArray {
    /// Number of slots (primitive lanes, or strings for `Text`).
    pub fn len(&self) -> usize {
        raw_array_dispatch!(self, v => v.len())
    }

    /// True when the buffer holds no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element family stored in this buffer.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            RawArray::Int1(_) => ElementKind::Int1,
            RawArray::Int2(_) => ElementKind::Int2,
            RawArray::Int4(_) => ElementKind::Int4,
            RawArray::Int8(_) => ElementKind::Int8,
            RawArray::UInt1(_) => ElementKind::UInt1,
            RawArray::UInt2(_) => ElementKind::UInt2,
            RawArray::UInt4(_) => ElementKind::UInt4,
            RawArray::Real4(_) => ElementKind::Real4,
            RawArray::Real8(_) => ElementKind::Real8,
            RawArray::Text(_) => ElementKind::Text,
        }
    }

    /// Allocates a zero-filled buffer of `kind` with `len` slots.
    pub fn with_len(kind: ElementKind, len: usize) -> RawArray {
        match kind {
            ElementKind::Int1 => RawArray::Int1(vec![0; len]),
            ElementKind::Int2 => RawArray::Int2(vec![0; len]),
            ElementKind::Int4 => RawArray::Int4(vec![0; len]),
            ElementKind::Int8 => RawArray::Int8(vec![0; len]),
            ElementKind::UInt1 => RawArray::UInt1(vec![0; len]),
            ElementKind::UInt2 => RawArray::UInt2(vec![0; len]),
            ElementKind::UInt4 => RawArray::UInt4(vec![0; len]),
            ElementKind::Real4 => RawArray::Real4(vec![0.0; len]),
            ElementKind::Real8 => RawArray::Real8(vec![0.0; len]),
            ElementKind::Text => RawArray::Text(vec![String::new(); len]),
        }
    }

    /// Resets every slot to the type's zero value.
    pub fn fill_default(&mut self) {
        match self {
            RawArray::Int1(v) => v.fill(0),
            RawArray::Int2(v) => v.fill(0),
            RawArray::Int4(v) => v.fill(0),
            RawArray::Int8(v) => v.fill(0),
            RawArray::UInt1(v) => v.fill(0),
            RawArray::UInt2(v) => v.fill(0),
            RawArray::UInt4(v) => v.fill(0),
            RawArray::Real4(v) => v.fill(0.0),
            RawArray::Real8(v) => v.fill(0.0),
            RawArray::Text(v) => v.iter_mut().for_each(String::clear),
        }
    }

    /// Fills this buffer by cycling the slots of `pattern`.
    ///
    /// Used to replicate a single pad item across every item of a
    /// record workspace. `pattern` must be non-empty and its length
    /// must divide this buffer's length.
    pub fn fill_repeat(&mut self, pattern: &RawArray) {
        fn cycle<T: Clone>(dst: &mut [T], src: &[T]) {
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = src[i % src.len()].clone();
            }
        }
        match (self, pattern) {
            (RawArray::Int1(d), RawArray::Int1(s)) => cycle(d, s),
            (RawArray::Int2(d), RawArray::Int2(s)) => cycle(d, s),
            (RawArray::Int4(d), RawArray::Int4(s)) => cycle(d, s),
            (RawArray::Int8(d), RawArray::Int8(s)) => cycle(d, s),
            (RawArray::UInt1(d), RawArray::UInt1(s)) => cycle(d, s),
            (RawArray::UInt2(d), RawArray::UInt2(s)) => cycle(d, s),
            (RawArray::UInt4(d), RawArray::UInt4(s)) => cycle(d, s),
            (RawArray::Real4(d), RawArray::Real4(s)) => cycle(d, s),
            (RawArray::Real8(d), RawArray::Real8(s)) => cycle(d, s),
            (RawArray::Text(d), RawArray::Text(s)) => cycle(d, s),
            _ => panic!("pad value array kind does not match workspace kind"),
        }
    }

    /// Copies out the first `n_slots` slots as a new buffer.
    pub fn clone_prefix(&self, n_slots: usize) -> RawArray {
        raw_array_dispatch!(self, v => {
            let n = n_slots.min(v.len());
            RawArrayVec::from(v[..n].to_vec()).0
        })
    }

    /// Builds a new buffer whose item `i` is this buffer's item
    /// `order[i]`, where an item spans `group` consecutive slots.
    pub fn gather_items(&self, order: &[usize], group: usize) -> RawArray {
        raw_array_dispatch!(self, v => {
            let mut out = Vec::with_capacity(order.len() * group);
            for &src_item in order {
                let start = src_item * group;
                out.extend_from_slice(&v[start..start + group]);
            }
            RawArrayVec::from(out).0
        })
    }

    /// Extracts the single element starting at slot `lane` as a scalar
    /// value. Multi-lane elements come back as a short array.
    pub fn scalar_at(&self, lane: usize, group: usize) -> Value {
        if group != 1 {
            return Value::Array(self.gather_items(&[lane / group], group));
        }
        match self {
            RawArray::Int1(v) => Value::Int1(v[lane]),
            RawArray::Int2(v) => Value::Int2(v[lane]),
            RawArray::Int4(v) => Value::Int4(v[lane]),
            RawArray::Int8(v) => Value::Int8(v[lane]),
            RawArray::UInt1(v) => Value::UInt1(v[lane]),
            RawArray::UInt2(v) => Value::UInt2(v[lane]),
            RawArray::UInt4(v) => Value::UInt4(v[lane]),
            RawArray::Real4(v) => Value::Real4(v[lane]),
            RawArray::Real8(v) => Value::Real8(v[lane]),
            RawArray::Text(v) => Value::Text(v[lane].clone()),
        }
    }
}

/// Helper newtype mapping vector element types back onto `RawArray`
/// variants inside the dispatch macro.
struct RawArrayVec(RawArray);

macro_rules! raw_array_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<Vec<$ty>> for RawArrayVec {
            fn from(v: Vec<$ty>) -> Self {
                RawArrayVec(RawArray::$variant(v))
            }
        })*
    };
}

raw_array_from_vec! {
    i8 => Int1,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    u8 => UInt1,
    u16 => UInt2,
    u32 => UInt4,
    f32 => Real4,
    f64 => Real8,
    String => Text,
}

/// A shaped value: one scalar element, or a flat row-major array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int1(i8),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    UInt1(u8),
    UInt2(u16),
    UInt4(u32),
    Real4(f32),
    Real8(f64),
    Text(String),
    Array(RawArray),
}

impl Value {
    /// The container class of this value.
    pub fn shape_class(&self) -> ShapeClass {
        match self {
            Value::Int1(_) => ShapeClass::Scalar(ElementKind::Int1),
            Value::Int2(_) => ShapeClass::Scalar(ElementKind::Int2),
            Value::Int4(_) => ShapeClass::Scalar(ElementKind::Int4),
            Value::Int8(_) => ShapeClass::Scalar(ElementKind::Int8),
            Value::UInt1(_) => ShapeClass::Scalar(ElementKind::UInt1),
            Value::UInt2(_) => ShapeClass::Scalar(ElementKind::UInt2),
            Value::UInt4(_) => ShapeClass::Scalar(ElementKind::UInt4),
            Value::Real4(_) => ShapeClass::Scalar(ElementKind::Real4),
            Value::Real8(_) => ShapeClass::Scalar(ElementKind::Real8),
            Value::Text(_) => ShapeClass::Scalar(ElementKind::Text),
            Value::Array(arr) => ShapeClass::Array(arr.element_kind()),
        }
    }

    /// The string payload, when this value is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}
