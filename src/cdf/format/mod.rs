//! On-disk record layer for the CDF format.
//!
//! Every CDF record opens with the same header (its size at the
//! variant's offset width, then a 4-byte type tag) followed by a
//! fixed field sequence specific to the record kind.
//!
//! # Module Organization
//!
//! - [`magic`]: decodes the 8-byte magic prelude into a format variant
//! - [`factory`]: reads record headers and dispatches to parsers
//! - [`descriptor`]: CDR, GDR, VDR, ADR, AEDR value objects
//! - [`storage`]: VXR, VVR, CVVR, CCR, CPR value objects

pub mod descriptor;
pub mod factory;
pub mod magic;
pub mod storage;

use log::warn;

/// The parsed header of an on-disk record: where it starts, its
/// declared size, its type tag, and where its fields begin.
#[derive(Debug, Clone, Copy)]
pub struct RecordPlan {
    pub start: u64,
    pub record_size: i64,
    pub record_type: i32,
    pub content_offset: u64,
}

impl RecordPlan {
    /// Bytes between the cursor and the record's declared end.
    pub fn bytes_remaining(&self, pos: u64) -> i64 {
        self.start as i64 + self.record_size - pos as i64
    }
}

/// Tests a flag word's bit, counting from the least significant end.
pub(crate) fn has_bit(flags: i32, bit: u32) -> bool {
    (flags >> bit) & 1 == 1
}

/// Checks a reserved field against its documented value. Mismatches
/// are tolerated but logged, since they usually mean a format revision
/// this reader has not caught up with.
pub(crate) fn check_int(label: &'static str, value: i32, expected: i32) -> i32 {
    if value != expected {
        warn!(
            "Unexpected value {} for reserved field {} (documented as {})",
            value, label, expected
        );
    }
    value
}
