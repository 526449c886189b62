//! The top-level reader: magic detection, optional whole-file
//! decompression, and the descriptor walks that produce [`CdfContent`].

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::attribute::{walk_entry_list, GlobalAttribute, VariableAttribute};
use super::buf::{Buf, Pointer};
use super::codec::compression::Compression;
use super::format::descriptor::{AdrRecord, CdrRecord, VdrRecord};
use super::format::factory::RecordFactory;
use super::format::magic::decode_magic;
use super::types::encoding::NumericEncoding;
use super::types::error::{CdfError, Result};
use super::variable::{CdfInfo, Variable};

/// The in-memory catalogue of a CDF file: its variables, global
/// attributes, and per-variable attributes.
#[derive(Debug)]
pub struct CdfContent {
    global_attributes: Vec<GlobalAttribute>,
    variable_attributes: Vec<VariableAttribute>,
    variables: Vec<Variable>,
}

impl CdfContent {
    /// The global-scope attributes, in file order.
    pub fn global_attributes(&self) -> &[GlobalAttribute] {
        &self.global_attributes
    }

    /// The variable-scope attributes, in file order.
    pub fn variable_attributes(&self) -> &[VariableAttribute] {
        &self.variable_attributes
    }

    /// The variables: r-variables first, then z-variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

/// Reader for a single CDF file.
///
/// Construction consumes the magic prelude, configures the buffer for
/// the detected variant, transparently decompresses whole-file
/// compressed variants, and parses the CDR.
/// [`read_content`](CdfReader::read_content) then walks the
/// descriptor lists.
#[derive(Debug)]
pub struct CdfReader {
    buf: Buf,
    factory: RecordFactory,
    cdr: CdrRecord,
}

impl CdfReader {
    /// Opens a CDF from a pre-built buffer.
    ///
    /// # Errors
    /// Fails on unrecognised magic numbers, multi-file CDFs, numeric
    /// encodings without a pure byte order, and any malformed record
    /// on the way to the CDR.
    pub fn new(mut buf: Buf) -> Result<CdfReader> {
        // The magic words are big-endian irrespective of the file's
        // encoding, as is all control data.
        let mut ptr = Pointer::new(0);
        let magic1 = buf.read_int(&mut ptr)? as u32;
        let magic2 = buf.read_int(&mut ptr)? as u32;
        let offset_rec0 = ptr.get();
        let variant = decode_magic(magic1, magic2).ok_or(CdfError::BadMagic {
            m1: magic1,
            m2: magic2,
        })?;
        info!("CDF magic number for {}", variant.label);
        info!("Whole file compression: {}", variant.compressed);

        // Versions prior to v3 use the same layout with 4-byte file
        // offsets; the buffer flag accommodates both widths.
        buf.set_bit64(variant.bit64);

        // Name-field widths differ per variant; the factory threads
        // the right one through record parsing.
        let factory = RecordFactory::new(variant.name_leng);

        // For whole-file compressed variants the CDR sits inside the
        // CCR's payload. Offsets recorded in the file assume the
        // 8-byte magic prelude even though the decompressed payload
        // does not contain it, so the decompression is wrapped to
        // prepend an 8-byte zero block.
        if variant.compressed {
            let ccr = factory.read_ccr(&buf, offset_rec0)?;
            if ccr.cpr_offset < 0 {
                return Err(CdfError::InvalidFormat(format!(
                    "CCR names a negative CPR offset {}",
                    ccr.cpr_offset
                )));
            }
            let cpr = factory.read_cpr(&buf, ccr.cpr_offset as u64)?;
            let compress = Compression::from_ctype(cpr.c_type)?;
            debug!("Whole-file compression: {}", compress.name());
            if offset_rec0 != 8 {
                return Err(CdfError::InvalidFormat(format!(
                    "Magic prelude is {} bytes; the offset workaround assumes 8",
                    offset_rec0
                )));
            }
            let padded = Compression::Padded {
                lead: offset_rec0,
                inner: Box::new(compress),
            };
            let bytes = padded.uncompress(
                &buf,
                ccr.data_offset,
                ccr.data_len,
                ccr.u_size as u64 + offset_rec0,
            )?;
            buf = Buf::with_flags_of(bytes, &buf);
        }

        let cdr = factory.read_cdr(&buf, offset_rec0)?;
        if !cdr.single_file() {
            return Err(CdfError::Unsupported(
                "Multi-file CDFs not supported".to_string(),
            ));
        }
        let encoding = NumericEncoding::from_code(cdr.encoding)?;
        let big_endian = encoding
            .is_big_endian()
            .ok_or_else(|| CdfError::Unsupported(format!("Unsupported encoding {}", encoding)))?;
        buf.set_big_endian(big_endian);
        info!(
            "CDF v{}.{} opened: encoding={}, row_major={}",
            cdr.version,
            cdr.release,
            encoding,
            cdr.row_major()
        );
        Ok(CdfReader { buf, factory, cdr })
    }

    /// Opens a CDF file from the filesystem.
    pub fn open(path: impl AsRef<Path>) -> Result<CdfReader> {
        let path = path.as_ref();
        info!("Opening CDF file: {}", path.display());
        CdfReader::new(Buf::new(fs::read(path)?))
    }

    /// The working buffer (the decompressed view for whole-file
    /// compressed variants).
    pub fn buf(&self) -> &Buf {
        &self.buf
    }

    /// The record factory configured for this file's variant.
    pub fn record_factory(&self) -> &RecordFactory {
        &self.factory
    }

    /// The file's CDF Descriptor Record.
    pub fn cdr(&self) -> &CdrRecord {
        &self.cdr
    }

    /// Walks the descriptor lists into the file's full catalogue.
    pub fn read_content(&self) -> Result<CdfContent> {
        let buf = &self.buf;
        let gdr = self
            .factory
            .read_gdr(buf, checked_offset(self.cdr.gdr_offset, "GDR")?)?;
        let info = CdfInfo {
            row_major: self.cdr.row_major(),
            r_dim_sizes: gdr.r_dim_sizes.clone(),
        };

        // rVariables and zVariables form separate lists but share the
        // variable surface; they are exposed concatenated.
        let rvdrs = self.walk_variable_list(gdr.nr_vars, gdr.rvdr_head)?;
        let zvdrs = self.walk_variable_list(gdr.nz_vars, gdr.zvdr_head)?;
        let mut variables = Vec::with_capacity(rvdrs.len() + zvdrs.len());
        for vdr in rvdrs.into_iter().chain(zvdrs) {
            variables.push(Variable::new(vdr, &info, &self.factory, buf.clone())?);
        }

        // Global and per-variable attributes share one ADR list,
        // split by the scope bit.
        let adrs = self.walk_attribute_list(gdr.num_attr, gdr.adr_head)?;
        let mut global_attributes = Vec::new();
        let mut variable_attributes = Vec::new();
        for adr in adrs {
            let gr_entries = walk_entry_list(
                buf,
                &self.factory,
                adr.agr_edr_head,
                adr.n_gr_entries,
                adr.max_gr_entry + 1,
            )?;
            let z_entries = walk_entry_list(
                buf,
                &self.factory,
                adr.az_edr_head,
                adr.n_z_entries,
                adr.max_z_entry + 1,
            )?;
            if adr.is_global() {
                global_attributes.push(GlobalAttribute::new(adr.name, gr_entries, z_entries));
            } else {
                variable_attributes.push(VariableAttribute::new(adr.name, gr_entries, z_entries));
            }
        }

        info!(
            "CDF content read: {} variables, {} global attributes, {} variable attributes",
            variables.len(),
            global_attributes.len(),
            variable_attributes.len()
        );
        Ok(CdfContent {
            global_attributes,
            variable_attributes,
            variables,
        })
    }

    fn walk_variable_list(&self, count: i32, head: i64) -> Result<Vec<VdrRecord>> {
        let count = count.max(0) as u64;
        let mut vdrs = Vec::with_capacity(count as usize);
        let mut off = head;
        for found in 0..count {
            if off <= 0 {
                return Err(CdfError::CountMismatch {
                    item_type: "variables",
                    expected: count,
                    found,
                });
            }
            let vdr = self.factory.read_vdr(&self.buf, off as u64)?;
            off = vdr.vdr_next;
            vdrs.push(vdr);
        }
        Ok(vdrs)
    }

    fn walk_attribute_list(&self, count: i32, head: i64) -> Result<Vec<AdrRecord>> {
        let count = count.max(0) as u64;
        let mut adrs = Vec::with_capacity(count as usize);
        let mut off = head;
        for found in 0..count {
            if off <= 0 {
                return Err(CdfError::CountMismatch {
                    item_type: "attributes",
                    expected: count,
                    found,
                });
            }
            let adr = self.factory.read_adr(&self.buf, off as u64)?;
            off = adr.adr_next;
            adrs.push(adr);
        }
        Ok(adrs)
    }
}

/// Rejects negative offsets before they wrap into huge unsigned ones.
fn checked_offset(offset: i64, what: &str) -> Result<u64> {
    u64::try_from(offset).map_err(|_| {
        CdfError::InvalidFormat(format!("Negative file offset {} for {}", offset, what))
    })
}
