//! Pure-Rust reader for the Common Data Format (CDF), the
//! self-describing binary container used for multi-dimensional
//! scientific arrays.
//!
//! The entry point is [`CdfReader`]: hand it a file path or a
//! pre-built [`Buf`], then call
//! [`read_content`](CdfReader::read_content) for the file's catalogue
//! of [`Variable`]s, [`GlobalAttribute`]s and [`VariableAttribute`]s.
//!
//! ```no_run
//! use cdf_reader::{CdfReader, Value};
//!
//! let reader = CdfReader::open("data.cdf")?;
//! let content = reader.read_content()?;
//! for var in content.variables() {
//!     let mut work = var.create_raw_value_array();
//!     println!("{}: {}", var.name(), var.summary());
//!     if var.record_count() > 0 {
//!         let value: Value = var.read_shaped_record(0, false, &mut work)?;
//!         println!("  first record: {:?}", value);
//!     }
//! }
//! # Ok::<(), cdf_reader::CdfError>(())
//! ```
//!
//! Supported variants: CDF v3.x and v2.6/2.7, plus pre-v2.6 files
//! whose layout coincides with v2.6; uncompressed and whole-file
//! compressed forms of each, and per-variable compressed record
//! blocks. Multi-file CDFs and the mixed-byte-order VAX float
//! encodings are rejected.

pub mod cdf;

pub use cdf::attribute::{GlobalAttribute, VariableAttribute};
pub use cdf::buf::{Buf, Pointer};
pub use cdf::codec::compression::Compression;
pub use cdf::data::DataReader;
pub use cdf::format::factory::{CdfRecord, RecordFactory};
pub use cdf::format::magic::{decode_magic, is_magic, CdfVariant};
pub use cdf::reader::{CdfContent, CdfReader};
pub use cdf::shape::Shaper;
pub use cdf::types::data_type::DataType;
pub use cdf::types::encoding::NumericEncoding;
pub use cdf::types::error::{CdfError, Result};
pub use cdf::types::values::{ElementKind, RawArray, ShapeClass, Value};
pub use cdf::variable::Variable;
