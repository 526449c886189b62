//! Record creation: header parsing, tag dispatch and verification.
//!
//! The tag check against the kind the caller asked for is the chief
//! defence against walking a corrupt offset into arbitrary bytes.

use log::trace;

use super::super::buf::{Buf, Pointer};
use super::super::types::error::{CdfError, Result};
use super::descriptor::{AdrRecord, AedrRecord, CdrRecord, GdrRecord, VdrRecord};
use super::storage::{CcrRecord, CprRecord, CvvrRecord, VvrRecord, VxrRecord};
use super::RecordPlan;

/// A record of any kind, tagged by its on-disk type. Used where the
/// format is genuinely polymorphic: a VXR entry may point at a VVR,
/// a CVVR, or a deeper VXR.
#[derive(Debug, Clone, PartialEq)]
pub enum CdfRecord {
    Cdr(CdrRecord),
    Gdr(GdrRecord),
    Vdr(VdrRecord),
    Adr(AdrRecord),
    Aedr(AedrRecord),
    Vxr(VxrRecord),
    Vvr(VvrRecord),
    Ccr(CcrRecord),
    Cpr(CprRecord),
    Cvvr(CvvrRecord),
}

impl CdfRecord {
    /// The record kind's name in the CDF documentation.
    pub fn kind(&self) -> &'static str {
        match self {
            CdfRecord::Cdr(_) => "CDR",
            CdfRecord::Gdr(_) => "GDR",
            CdfRecord::Vdr(r) => {
                if r.z_variable {
                    "zVDR"
                } else {
                    "rVDR"
                }
            }
            CdfRecord::Adr(_) => "ADR",
            CdfRecord::Aedr(r) => {
                if r.z_entry {
                    "AzEDR"
                } else {
                    "AgrEDR"
                }
            }
            CdfRecord::Vxr(_) => "VXR",
            CdfRecord::Vvr(_) => "VVR",
            CdfRecord::Ccr(_) => "CCR",
            CdfRecord::Cpr(_) => "CPR",
            CdfRecord::Cvvr(_) => "CVVR",
        }
    }
}

/// Parses records at given buffer offsets, configured with the format
/// variant's name-field width.
///
/// The record header is read at the buffer's *current* offset width,
/// so the buffer must be configured for the right variant before any
/// record is created.
#[derive(Debug, Clone)]
pub struct RecordFactory {
    name_leng: u64,
}

impl RecordFactory {
    /// Creates a factory for a variant with the given name width.
    pub fn new(name_leng: u64) -> Self {
        RecordFactory { name_leng }
    }

    /// The configured name-field width in bytes.
    pub fn name_leng(&self) -> u64 {
        self.name_leng
    }

    /// Reads the record header at `offset`: size at the configured
    /// offset width, then the 4-byte type tag.
    fn read_plan(&self, buf: &Buf, offset: u64) -> Result<RecordPlan> {
        let mut ptr = Pointer::new(offset);
        let record_size = buf.read_offset(&mut ptr)?;
        let record_type = buf.read_int(&mut ptr)?;
        let plan = RecordPlan {
            start: offset,
            record_size,
            record_type,
            content_offset: ptr.get(),
        };
        if record_size < (plan.content_offset - offset) as i64 {
            return Err(CdfError::InvalidFormat(format!(
                "Record at offset {} declares size {} smaller than its header",
                offset, record_size
            )));
        }
        trace!(
            "Record at offset {}: size={}, type={}",
            offset,
            record_size,
            record_type
        );
        Ok(plan)
    }

    /// Parses the record at `offset` as whatever its tag declares.
    ///
    /// # Errors
    /// Unknown tags are format errors; so is any per-kind parse
    /// failure.
    pub fn create_record(&self, buf: &Buf, offset: u64) -> Result<CdfRecord> {
        let plan = self.read_plan(buf, offset)?;
        match plan.record_type {
            1 => Ok(CdfRecord::Cdr(CdrRecord::parse(buf, &plan)?)),
            2 => Ok(CdfRecord::Gdr(GdrRecord::parse(buf, &plan)?)),
            3 => Ok(CdfRecord::Vdr(VdrRecord::parse(
                buf,
                &plan,
                false,
                self.name_leng,
            )?)),
            4 => Ok(CdfRecord::Adr(AdrRecord::parse(buf, &plan, self.name_leng)?)),
            5 => Ok(CdfRecord::Aedr(AedrRecord::parse(buf, &plan, false)?)),
            6 => Ok(CdfRecord::Vxr(VxrRecord::parse(buf, &plan)?)),
            7 => Ok(CdfRecord::Vvr(VvrRecord::parse(buf, &plan)?)),
            8 => Ok(CdfRecord::Vdr(VdrRecord::parse(
                buf,
                &plan,
                true,
                self.name_leng,
            )?)),
            9 => Ok(CdfRecord::Aedr(AedrRecord::parse(buf, &plan, true)?)),
            10 => Ok(CdfRecord::Ccr(CcrRecord::parse(buf, &plan)?)),
            11 => Ok(CdfRecord::Cpr(CprRecord::parse(buf, &plan)?)),
            13 => Ok(CdfRecord::Cvvr(CvvrRecord::parse(buf, &plan)?)),
            other => Err(CdfError::InvalidFormat(format!(
                "Unknown record type {} at offset {}",
                other, offset
            ))),
        }
    }

    fn expect_tag(
        &self,
        buf: &Buf,
        offset: u64,
        expected: &'static str,
        tags: &[i32],
    ) -> Result<RecordPlan> {
        let plan = self.read_plan(buf, offset)?;
        if !tags.contains(&plan.record_type) {
            return Err(CdfError::RecordTypeMismatch {
                expected,
                found: plan.record_type,
                offset,
            });
        }
        Ok(plan)
    }

    /// Parses a CDF Descriptor Record at `offset`.
    pub fn read_cdr(&self, buf: &Buf, offset: u64) -> Result<CdrRecord> {
        let plan = self.expect_tag(buf, offset, "CDR", &[1])?;
        CdrRecord::parse(buf, &plan)
    }

    /// Parses a Global Descriptor Record at `offset`.
    pub fn read_gdr(&self, buf: &Buf, offset: u64) -> Result<GdrRecord> {
        let plan = self.expect_tag(buf, offset, "GDR", &[2])?;
        GdrRecord::parse(buf, &plan)
    }

    /// Parses a Variable Descriptor Record (either kind) at `offset`.
    pub fn read_vdr(&self, buf: &Buf, offset: u64) -> Result<VdrRecord> {
        let plan = self.expect_tag(buf, offset, "VDR", &[3, 8])?;
        VdrRecord::parse(buf, &plan, plan.record_type == 8, self.name_leng)
    }

    /// Parses an Attribute Descriptor Record at `offset`.
    pub fn read_adr(&self, buf: &Buf, offset: u64) -> Result<AdrRecord> {
        let plan = self.expect_tag(buf, offset, "ADR", &[4])?;
        AdrRecord::parse(buf, &plan, self.name_leng)
    }

    /// Parses an Attribute Entry Descriptor Record (either kind) at
    /// `offset`.
    pub fn read_aedr(&self, buf: &Buf, offset: u64) -> Result<AedrRecord> {
        let plan = self.expect_tag(buf, offset, "AEDR", &[5, 9])?;
        AedrRecord::parse(buf, &plan, plan.record_type == 9)
    }

    /// Parses a Variable indeX Record at `offset`.
    pub fn read_vxr(&self, buf: &Buf, offset: u64) -> Result<VxrRecord> {
        let plan = self.expect_tag(buf, offset, "VXR", &[6])?;
        VxrRecord::parse(buf, &plan)
    }

    /// Parses a Compressed CDF Record at `offset`.
    pub fn read_ccr(&self, buf: &Buf, offset: u64) -> Result<CcrRecord> {
        let plan = self.expect_tag(buf, offset, "CCR", &[10])?;
        CcrRecord::parse(buf, &plan)
    }

    /// Parses a Compressed Parameters Record at `offset`.
    pub fn read_cpr(&self, buf: &Buf, offset: u64) -> Result<CprRecord> {
        let plan = self.expect_tag(buf, offset, "CPR", &[11])?;
        CprRecord::parse(buf, &plan)
    }
}
