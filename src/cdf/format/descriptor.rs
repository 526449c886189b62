//! Descriptor records: the metadata graph of a CDF file.
//!
//! Each type here is a pure decode of one on-disk record: raw fields
//! in file order plus retained offsets into the buffer for any inline
//! value bytes. Records are immutable once parsed.

use log::debug;

use super::super::buf::{Buf, Pointer};
use super::super::types::data_type::DataType;
use super::super::types::error::{CdfError, Result};
use super::{check_int, has_bit, RecordPlan};

/// Reads `count` consecutive 4-byte control integers.
pub(crate) fn read_int_array(buf: &Buf, ptr: &mut Pointer, count: usize) -> Result<Vec<i32>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(buf.read_int(ptr)?);
    }
    Ok(out)
}

/// CDF Descriptor Record (type 1): the file-level header record.
#[derive(Debug, Clone, PartialEq)]
pub struct CdrRecord {
    pub gdr_offset: i64,
    pub version: i32,
    pub release: i32,
    pub encoding: i32,
    pub flags: i32,
    pub increment: i32,
    pub copyright: String,
}

impl CdrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let gdr_offset = buf.read_offset(&mut ptr)?;
        let version = buf.read_int(&mut ptr)?;
        let release = buf.read_int(&mut ptr)?;
        let encoding = buf.read_int(&mut ptr)?;
        let flags = buf.read_int(&mut ptr)?;
        check_int("CDR rfuA", buf.read_int(&mut ptr)?, 0);
        check_int("CDR rfuB", buf.read_int(&mut ptr)?, 0);
        let increment = buf.read_int(&mut ptr)?;
        check_int("CDR rfuD", buf.read_int(&mut ptr)?, -1);
        check_int("CDR rfuE", buf.read_int(&mut ptr)?, -1);
        // The copyright field shrank from 1945 to 256 characters at v2.6.
        let pre26 = version < 2 || (version == 2 && release < 6);
        let copyright_leng = if pre26 { 1945 } else { 256 };
        let copyright = buf.read_string(&mut ptr, copyright_leng)?;
        Ok(CdrRecord {
            gdr_offset,
            version,
            release,
            encoding,
            flags,
            increment,
            copyright,
        })
    }

    /// True when variable array values are laid out row-major.
    pub fn row_major(&self) -> bool {
        has_bit(self.flags, 0)
    }

    /// True for single-file CDFs; multi-file CDFs keep variable data
    /// in sibling files and are not supported.
    pub fn single_file(&self) -> bool {
        has_bit(self.flags, 1)
    }

    /// True when the file carries a trailing checksum.
    pub fn has_checksum(&self) -> bool {
        has_bit(self.flags, 2)
    }
}

/// Global Descriptor Record (type 2): list heads and global counts.
#[derive(Debug, Clone, PartialEq)]
pub struct GdrRecord {
    pub rvdr_head: i64,
    pub zvdr_head: i64,
    pub adr_head: i64,
    pub eof: i64,
    pub nr_vars: i32,
    pub num_attr: i32,
    pub r_max_rec: i32,
    pub r_num_dims: i32,
    pub nz_vars: i32,
    pub uir_head: i64,
    /// The last leap second the writing library knew about; reserved
    /// (-1) in files older than CDF 3.6.
    pub last_leap_second_id: i32,
    pub r_dim_sizes: Vec<i32>,
}

impl GdrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let rvdr_head = buf.read_offset(&mut ptr)?;
        let zvdr_head = buf.read_offset(&mut ptr)?;
        let adr_head = buf.read_offset(&mut ptr)?;
        let eof = buf.read_offset(&mut ptr)?;
        let nr_vars = buf.read_int(&mut ptr)?;
        let num_attr = buf.read_int(&mut ptr)?;
        let r_max_rec = buf.read_int(&mut ptr)?;
        let r_num_dims = buf.read_int(&mut ptr)?;
        let nz_vars = buf.read_int(&mut ptr)?;
        let uir_head = buf.read_offset(&mut ptr)?;
        check_int("GDR rfuC", buf.read_int(&mut ptr)?, 0);
        let last_leap_second_id = buf.read_int(&mut ptr)?;
        check_int("GDR rfuE", buf.read_int(&mut ptr)?, -1);
        let r_dim_sizes = read_int_array(buf, &mut ptr, r_num_dims.max(0) as usize)?;
        Ok(GdrRecord {
            rvdr_head,
            zvdr_head,
            adr_head,
            eof,
            nr_vars,
            num_attr,
            r_max_rec,
            r_num_dims,
            nz_vars,
            uir_head,
            last_leap_second_id,
            r_dim_sizes,
        })
    }
}

/// Variable Descriptor Record (rVDR type 3 / zVDR type 8).
#[derive(Debug, Clone, PartialEq)]
pub struct VdrRecord {
    pub z_variable: bool,
    pub vdr_next: i64,
    pub data_type: i32,
    pub max_rec: i32,
    pub vxr_head: i64,
    pub vxr_tail: i64,
    pub flags: i32,
    pub s_records: i32,
    pub num_elems: i32,
    pub num: i32,
    pub cpr_or_spr_offset: i64,
    pub blocking_factor: i32,
    pub name: String,
    pub z_num_dims: i32,
    pub z_dim_sizes: Vec<i32>,
    pub dim_varys: Vec<i32>,
    /// Offset of the inline pad value when the has-pad flag is set.
    pub pad_offset: Option<u64>,
}

impl VdrRecord {
    pub(crate) fn parse(
        buf: &Buf,
        plan: &RecordPlan,
        z_variable: bool,
        name_leng: u64,
    ) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let vdr_next = buf.read_offset(&mut ptr)?;
        let data_type = buf.read_int(&mut ptr)?;
        let max_rec = buf.read_int(&mut ptr)?;
        let vxr_head = buf.read_offset(&mut ptr)?;
        let vxr_tail = buf.read_offset(&mut ptr)?;
        let flags = buf.read_int(&mut ptr)?;
        let s_records = buf.read_int(&mut ptr)?;
        check_int("VDR rfuB", buf.read_int(&mut ptr)?, 0);
        check_int("VDR rfuC", buf.read_int(&mut ptr)?, -1);
        check_int("VDR rfuF", buf.read_int(&mut ptr)?, -1);
        let num_elems = buf.read_int(&mut ptr)?;
        let num = buf.read_int(&mut ptr)?;
        let cpr_or_spr_offset = buf.read_offset(&mut ptr)?;
        let blocking_factor = buf.read_int(&mut ptr)?;
        let name = buf.read_string(&mut ptr, name_leng)?;
        let (z_num_dims, z_dim_sizes) = if z_variable {
            let nd = buf.read_int(&mut ptr)?;
            let sizes = read_int_array(buf, &mut ptr, nd.max(0) as usize)?;
            (nd, sizes)
        } else {
            (0, Vec::new())
        };

        // An rVDR's dimension count lives in the GDR, which this record
        // cannot see. The dimVarys length is deduced instead from the
        // bytes left in the record once the pad value is accounted for.
        let has_pad = has_bit(flags, 1);
        let pad_bytes = if has_pad {
            DataType::from_code(data_type)?.num_bytes(num_elems.max(0) as usize) as i64
        } else {
            0
        };
        let spare = plan.bytes_remaining(ptr.get()) - pad_bytes;
        if spare < 0 || spare % 4 != 0 {
            return Err(CdfError::InvalidFormat(format!(
                "VDR '{}' at offset {} leaves {} bytes for dimension variances",
                name, plan.start, spare
            )));
        }
        let ndv = (spare / 4) as usize;
        if z_variable && ndv != z_num_dims.max(0) as usize {
            debug!(
                "zVDR '{}' declares {} dims but has room for {} variance flags",
                name, z_num_dims, ndv
            );
        }
        let dim_varys = read_int_array(buf, &mut ptr, ndv)?;
        let pad_offset = if has_pad { Some(ptr.get()) } else { None };

        Ok(VdrRecord {
            z_variable,
            vdr_next,
            data_type,
            max_rec,
            vxr_head,
            vxr_tail,
            flags,
            s_records,
            num_elems,
            num,
            cpr_or_spr_offset,
            blocking_factor,
            name,
            z_num_dims,
            z_dim_sizes,
            dim_varys,
            pad_offset,
        })
    }

    /// True when the variable's value varies across records.
    pub fn record_variance(&self) -> bool {
        has_bit(self.flags, 0)
    }

    /// True when the record ends with an inline pad value.
    pub fn has_pad(&self) -> bool {
        has_bit(self.flags, 1)
    }

    /// True when the variable's record blocks are compressed (CVVRs).
    pub fn compressed(&self) -> bool {
        has_bit(self.flags, 2)
    }
}

/// Attribute Descriptor Record (type 4).
#[derive(Debug, Clone, PartialEq)]
pub struct AdrRecord {
    pub adr_next: i64,
    pub agr_edr_head: i64,
    pub scope: i32,
    pub num: i32,
    pub n_gr_entries: i32,
    pub max_gr_entry: i32,
    pub az_edr_head: i64,
    pub n_z_entries: i32,
    pub max_z_entry: i32,
    pub name: String,
}

impl AdrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan, name_leng: u64) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let adr_next = buf.read_offset(&mut ptr)?;
        let agr_edr_head = buf.read_offset(&mut ptr)?;
        let scope = buf.read_int(&mut ptr)?;
        let num = buf.read_int(&mut ptr)?;
        let n_gr_entries = buf.read_int(&mut ptr)?;
        let max_gr_entry = buf.read_int(&mut ptr)?;
        check_int("ADR rfuA", buf.read_int(&mut ptr)?, 0);
        let az_edr_head = buf.read_offset(&mut ptr)?;
        let n_z_entries = buf.read_int(&mut ptr)?;
        let max_z_entry = buf.read_int(&mut ptr)?;
        check_int("ADR rfuE", buf.read_int(&mut ptr)?, -1);
        let name = buf.read_string(&mut ptr, name_leng)?;
        Ok(AdrRecord {
            adr_next,
            agr_edr_head,
            scope,
            num,
            n_gr_entries,
            max_gr_entry,
            az_edr_head,
            n_z_entries,
            max_z_entry,
            name,
        })
    }

    /// True for global-scope attributes (scope bit 0 set).
    pub fn is_global(&self) -> bool {
        has_bit(self.scope, 0)
    }
}

/// Attribute Entry Descriptor Record (AgrEDR type 5 / AzEDR type 9).
#[derive(Debug, Clone, PartialEq)]
pub struct AedrRecord {
    pub z_entry: bool,
    pub aedr_next: i64,
    pub attr_num: i32,
    pub data_type: i32,
    pub num: i32,
    pub num_elems: i32,
    /// String count for multi-string entries; reserved (-1) before
    /// CDF 3.7.
    pub num_strings: i32,
    /// Offset of the inline entry value.
    pub value_offset: u64,
}

impl AedrRecord {
    pub(crate) fn parse(buf: &Buf, plan: &RecordPlan, z_entry: bool) -> Result<Self> {
        let mut ptr = Pointer::new(plan.content_offset);
        let aedr_next = buf.read_offset(&mut ptr)?;
        let attr_num = buf.read_int(&mut ptr)?;
        let data_type = buf.read_int(&mut ptr)?;
        let num = buf.read_int(&mut ptr)?;
        let num_elems = buf.read_int(&mut ptr)?;
        let num_strings = buf.read_int(&mut ptr)?;
        check_int("AEDR rfuB", buf.read_int(&mut ptr)?, 0);
        check_int("AEDR rfuC", buf.read_int(&mut ptr)?, 0);
        check_int("AEDR rfuD", buf.read_int(&mut ptr)?, -1);
        check_int("AEDR rfuE", buf.read_int(&mut ptr)?, -1);
        Ok(AedrRecord {
            z_entry,
            aedr_next,
            attr_num,
            data_type,
            num,
            num_elems,
            num_strings,
            value_offset: ptr.get(),
        })
    }
}
