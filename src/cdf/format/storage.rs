//! Storage records: where variable values actually live.
//!
//! A VDR's index (VXR) partitions the variable's record-number axis
//! into runs pointing at value records, plain (VVR) or compressed
//! (CVVR), or at deeper VXRs. The CCR/CPR pair wraps whole-file
//! compression.

use super::super::buf::{Buf, Pointer};
use super::super::types::error::{CdfError, Result};
use super::descriptor::read_int_array;
use super::{check_int, RecordPlan};

/// Variable indeX Record (type 6): a slab of `[first, last] → offset`
/// runs plus a link to the next VXR in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct VxrRecord {
    pub vxr_next: i64,
    pub n_entries: i32,
    pub n_used_entries: i32,
    pub first: Vec<i32>,
    pub last: Vec<i32>,
    pub offset: Vec<i64>,
}

impl VxrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let vxr_next = buf.read_offset(&mut ptr)?;
        let n_entries = buf.read_int(&mut ptr)?;
        let n_used_entries = buf.read_int(&mut ptr)?;
        if n_entries < 0 || n_used_entries < 0 || n_used_entries > n_entries {
            return Err(CdfError::InvalidFormat(format!(
                "VXR at offset {} declares {} entries of which {} used",
                plan.start, n_entries, n_used_entries
            )));
        }
        let n = n_entries as usize;
        let first = read_int_array(buf, &mut ptr, n)?;
        let last = read_int_array(buf, &mut ptr, n)?;
        let mut offset = Vec::with_capacity(n);
        for _ in 0..n {
            offset.push(buf.read_offset(&mut ptr)?);
        }
        Ok(VxrRecord {
            vxr_next,
            n_entries,
            n_used_entries,
            first,
            last,
            offset,
        })
    }
}

/// Variable Values Record (type 7): a contiguous uncompressed run of
/// record values starting right after the header.
#[derive(Debug, Clone, PartialEq)]
pub struct VvrRecord {
    pub data_offset: u64,
    pub data_len: u64,
}

impl VvrRecord {
    pub(crate) fn parse(_buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let data_len = plan.bytes_remaining(plan.content_offset);
        if data_len < 0 {
            return Err(CdfError::InvalidFormat(format!(
                "VVR at offset {} declares a size smaller than its header",
                plan.start
            )));
        }
        Ok(VvrRecord {
            data_offset: plan.content_offset,
            data_len: data_len as u64,
        })
    }
}

/// Compressed Variable Values Record (type 13): a compressed block of
/// record values; the expansion covers the run's record span.
#[derive(Debug, Clone, PartialEq)]
pub struct CvvrRecord {
    pub c_size: i64,
    pub data_offset: u64,
}

impl CvvrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        check_int("CVVR rfuA", buf.read_int(&mut ptr)?, 0);
        let c_size = buf.read_offset(&mut ptr)?;
        if c_size < 0 || c_size > plan.bytes_remaining(ptr.get()) {
            return Err(CdfError::InvalidFormat(format!(
                "CVVR at offset {} declares {} compressed bytes",
                plan.start, c_size
            )));
        }
        Ok(CvvrRecord {
            c_size,
            data_offset: ptr.get(),
        })
    }
}

/// Compressed CDF Record (type 10): wraps the whole file's records in
/// one compressed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CcrRecord {
    pub cpr_offset: i64,
    /// Size of the payload once decompressed, excluding the 8-byte
    /// magic prelude that internal offsets still assume.
    pub u_size: i64,
    pub data_offset: u64,
    pub data_len: u64,
}

impl CcrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let cpr_offset = buf.read_offset(&mut ptr)?;
        let u_size = buf.read_offset(&mut ptr)?;
        check_int("CCR rfuA", buf.read_int(&mut ptr)?, 0);
        let data_offset = ptr.get();
        let data_len = plan.bytes_remaining(data_offset);
        if u_size < 0 || data_len < 0 {
            return Err(CdfError::InvalidFormat(format!(
                "CCR at offset {} declares uncompressed size {} and data length {}",
                plan.start, u_size, data_len
            )));
        }
        Ok(CcrRecord {
            cpr_offset,
            u_size,
            data_offset,
            data_len: data_len as u64,
        })
    }
}

/// Compressed Parameters Record (type 11): names the compression
/// algorithm and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CprRecord {
    pub c_type: i32,
    pub p_count: i32,
    pub c_parms: Vec<i32>,
}

impl CprRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let c_type = buf.read_int(&mut ptr)?;
        check_int("CPR rfuA", buf.read_int(&mut ptr)?, 0);
        let p_count = buf.read_int(&mut ptr)?;
        let c_parms = read_int_array(buf, &mut ptr, p_count.max(0) as usize)?;
        Ok(CprRecord {
            c_type,
            p_count,
            c_parms,
        })
    }
}
