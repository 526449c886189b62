//! Custom error types for the cdf-reader crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum CdfError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The first eight bytes of the file do not match any known CDF variant.
    #[error("Unrecognised magic numbers: {m1:#010x}, {m2:#010x}")]
    BadMagic { m1: u32, m2: u32 },

    /// A read would run past the end of the backing buffer.
    #[error("Read of {count} bytes at offset {offset} runs past end of buffer ({len} bytes)")]
    OutOfBounds { offset: u64, count: u64, len: u64 },

    /// A record's type tag does not match the kind the caller asked for.
    #[error("Unexpected record type {found} at offset {offset} (expected {expected})")]
    RecordTypeMismatch {
        expected: &'static str,
        found: i32,
        offset: u64,
    },

    /// The file uses a CDF feature this reader does not implement.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// A CPR or VDR declares a compression code outside the registry.
    #[error("Unknown compression type: {0}")]
    UnknownCompression(i32),

    /// A VDR or AEDR declares a data type code outside the catalogue.
    #[error("Unknown data type code: {0}")]
    UnknownDataType(i32),

    /// The CDR declares a numeric encoding code outside the catalogue.
    #[error("Unknown numeric encoding code: {0}")]
    UnknownEncoding(i32),

    /// An error occurred during decompression, often due to corrupted data.
    #[error("Decompression failed: {0}")]
    Decompression(String),

    /// A buffer or data block has an unexpected size after an operation.
    #[error("Size mismatch for {context}: expected {expected} bytes, but found {found} bytes")]
    SizeMismatch {
        context: &'static str,
        expected: u64,
        found: u64,
    },

    /// A declared count of items does not match the actual number of items found.
    #[error("Count mismatch for {item_type}: expected {expected}, but found {found}")]
    CountMismatch {
        item_type: &'static str,
        expected: u64,
        found: u64,
    },

    /// The file is structurally invalid or does not conform to the CDF format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,
}

/// A convenience `Result` type alias using the crate's `CdfError` type.
pub type Result<T> = std::result::Result<T, CdfError>;
