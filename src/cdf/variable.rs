//! Variables: record-level read access over a VDR.
//!
//! A [`Variable`] resolves a record index through the VDR's index tree
//! to a value block, a plain VVR or a compressed CVVR, then bulk
//! reads and shapes the record. The index tree is flattened into a
//! sorted run table at construction; the most recently decompressed
//! CVVR block is cached behind a mutex so sequential reads touch each
//! block once.

use std::sync::Mutex;

use log::{debug, warn};

use super::buf::Buf;
use super::codec::compression::Compression;
use super::data::DataReader;
use super::format::descriptor::VdrRecord;
use super::format::factory::{CdfRecord, RecordFactory};
use super::shape::Shaper;
use super::types::data_type::DataType;
use super::types::error::{CdfError, Result};
use super::types::values::{RawArray, Value};

/// File-level context shared by every variable: the major order and
/// the r-variable dimension extents from the GDR.
#[derive(Debug, Clone)]
pub(crate) struct CdfInfo {
    pub row_major: bool,
    pub r_dim_sizes: Vec<i32>,
}

/// Where one run of records lives.
#[derive(Debug, Clone)]
enum BlockStore {
    Vvr { data_offset: u64, data_len: u64 },
    Cvvr { data_offset: u64, c_size: u64 },
}

/// One `[first, last]` run of record numbers and its backing block.
#[derive(Debug, Clone)]
struct RecordRun {
    first: i64,
    last: i64,
    store: BlockStore,
}

/// The flattened index tree of a variable, sorted by first record.
#[derive(Debug, Clone)]
struct RecordMap {
    runs: Vec<RecordRun>,
}

const MAX_VXR_DEPTH: u32 = 64;

impl RecordMap {
    fn build(buf: &Buf, factory: &RecordFactory, vdr: &VdrRecord) -> Result<RecordMap> {
        let mut runs = Vec::new();
        // A legitimate tree needs nowhere near one VXR per record;
        // the fuel counter only exists to stop cyclic chains.
        let mut fuel = (vdr.max_rec.max(0) as u64 + 2) * 2 + 1024;
        collect_chain(buf, factory, vdr.vxr_head, &mut runs, 0, &mut fuel)?;
        runs.sort_by_key(|run| run.first);
        debug!(
            "Variable '{}': {} record runs, max_rec={}",
            vdr.name,
            runs.len(),
            vdr.max_rec
        );
        Ok(RecordMap { runs })
    }

    /// Binary search for the run containing `rec`.
    fn locate(&self, rec: i64) -> Option<(usize, &RecordRun)> {
        let idx = self.runs.partition_point(|run| run.first <= rec);
        if idx == 0 {
            return None;
        }
        let run = &self.runs[idx - 1];
        if rec <= run.last {
            Some((idx - 1, run))
        } else {
            None
        }
    }
}

/// Walks a VXR chain, descending into nested VXR entries.
fn collect_chain(
    buf: &Buf,
    factory: &RecordFactory,
    head: i64,
    runs: &mut Vec<RecordRun>,
    depth: u32,
    fuel: &mut u64,
) -> Result<()> {
    if depth > MAX_VXR_DEPTH {
        return Err(CdfError::InvalidFormat(format!(
            "Variable index tree deeper than {} levels",
            MAX_VXR_DEPTH
        )));
    }
    let mut off = head;
    while off > 0 {
        if *fuel == 0 {
            return Err(CdfError::InvalidFormat(
                "Variable index walk ran out of fuel; chain is malformed".to_string(),
            ));
        }
        *fuel -= 1;
        let vxr = factory.read_vxr(buf, off as u64)?;
        for i in 0..vxr.n_used_entries as usize {
            let first = vxr.first[i] as i64;
            let last = vxr.last[i] as i64;
            match factory.create_record(buf, vxr.offset[i] as u64)? {
                CdfRecord::Vvr(vvr) => runs.push(RecordRun {
                    first,
                    last,
                    store: BlockStore::Vvr {
                        data_offset: vvr.data_offset,
                        data_len: vvr.data_len,
                    },
                }),
                CdfRecord::Cvvr(cvvr) => runs.push(RecordRun {
                    first,
                    last,
                    store: BlockStore::Cvvr {
                        data_offset: cvvr.data_offset,
                        c_size: cvvr.c_size as u64,
                    },
                }),
                CdfRecord::Vxr(_) => {
                    collect_chain(buf, factory, vxr.offset[i], runs, depth + 1, fuel)?;
                }
                other => {
                    return Err(CdfError::InvalidFormat(format!(
                        "Unexpected {} record in a variable index at offset {}",
                        other.kind(),
                        vxr.offset[i]
                    )));
                }
            }
        }
        off = vxr.vxr_next;
    }
    Ok(())
}

/// A CDF variable: name, type, shape, and per-record read access.
///
/// Structurally immutable after construction. `read_shaped_record`
/// takes `&self` plus a caller-owned workspace from
/// [`create_raw_value_array`](Self::create_raw_value_array), so
/// readers on different threads are safe as long as each owns its
/// workspace; a shared workspace needs external serialisation.
#[derive(Debug)]
pub struct Variable {
    vdr: VdrRecord,
    buf: Buf,
    data_type: DataType,
    shaper: Shaper,
    data_reader: DataReader,
    rec_bytes: u64,
    record_map: RecordMap,
    compression: Option<Compression>,
    pad: Option<RawArray>,
    block_cache: Mutex<Option<(usize, Buf)>>,
}

impl Variable {
    pub(crate) fn new(
        vdr: VdrRecord,
        info: &CdfInfo,
        factory: &RecordFactory,
        buf: Buf,
    ) -> Result<Variable> {
        let data_type = DataType::from_code(vdr.data_type)?;
        let dim_sizes: &[i32] = if vdr.z_variable {
            &vdr.z_dim_sizes
        } else {
            &info.r_dim_sizes
        };
        if vdr.dim_varys.len() < dim_sizes.len() {
            return Err(CdfError::CountMismatch {
                item_type: "dimension variances",
                expected: dim_sizes.len() as u64,
                found: vdr.dim_varys.len() as u64,
            });
        }
        let dim_varys: Vec<bool> = vdr.dim_varys[..dim_sizes.len()]
            .iter()
            .map(|&v| v != 0)
            .collect();
        let shaper = Shaper::new(data_type, dim_sizes, &dim_varys, info.row_major);

        let num_elems = if vdr.num_elems < 1 {
            warn!(
                "Variable '{}' declares {} elements per item; reading one",
                vdr.name, vdr.num_elems
            );
            1
        } else {
            vdr.num_elems as usize
        };
        let data_reader = DataReader::new(data_type, num_elems, shaper.raw_item_count());
        let rec_bytes = data_reader.record_bytes();

        let compression = if vdr.compressed() && vdr.cpr_or_spr_offset >= 0 {
            let cpr = factory.read_cpr(&buf, vdr.cpr_or_spr_offset as u64)?;
            Some(Compression::from_ctype(cpr.c_type)?)
        } else {
            None
        };

        let pad = match vdr.pad_offset {
            Some(offset) => {
                let pad_reader = DataReader::new(data_type, num_elems, 1);
                let mut pad = pad_reader.create_raw_value_array();
                pad_reader.read_value(&buf, offset, &mut pad)?;
                Some(pad)
            }
            None => None,
        };

        let record_map = RecordMap::build(&buf, factory, &vdr)?;

        Ok(Variable {
            vdr,
            buf,
            data_type,
            shaper,
            data_reader,
            rec_bytes,
            record_map,
            compression,
            pad,
            block_cache: Mutex::new(None),
        })
    }

    /// The variable's name.
    pub fn name(&self) -> &str {
        &self.vdr.name
    }

    /// The variable's index within its kind (r- or z-variables).
    pub fn num(&self) -> i32 {
        self.vdr.num
    }

    /// True for z-variables, which carry their own dimensions.
    pub fn is_z_variable(&self) -> bool {
        self.vdr.z_variable
    }

    /// The variable's data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The shape engine for this variable's records.
    pub fn shaper(&self) -> &Shaper {
        &self.shaper
    }

    /// True when the value changes across records; a non-varying
    /// variable stores exactly one record.
    pub fn record_variance(&self) -> bool {
        self.vdr.record_variance()
    }

    /// Number of records: `max_rec + 1`.
    pub fn record_count(&self) -> i64 {
        self.vdr.max_rec as i64 + 1
    }

    /// A short human-readable description: type, kind, and shape.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} {}",
            self.data_type.name(),
            if self.vdr.z_variable { "(z)" } else { "(r)" }
        );
        let dims = self.shaper.dim_sizes();
        if !dims.is_empty() {
            let extents: Vec<String> = dims.iter().map(i32::to_string).collect();
            out.push_str(&format!(" [{}]", extents.join(",")));
        }
        out
    }

    /// Allocates a workspace sized for one record's raw elements.
    pub fn create_raw_value_array(&self) -> RawArray {
        self.data_reader.create_raw_value_array()
    }

    /// Reads record `irec` into `work` without shaping.
    ///
    /// Indices beyond `max_rec`, or falling in a sparse gap between
    /// runs, fill the workspace with the pad value (or the type's
    /// default fill).
    ///
    /// # Panics
    /// Panics when `irec` is negative or does not fit a 32-bit signed
    /// integer; record counts beyond 2^31 do not exist in CDF, so this
    /// is a caller contract violation.
    pub fn read_raw_record(&self, irec: i64, work: &mut RawArray) -> Result<()> {
        assert!(
            irec >= 0 && i32::try_from(irec).is_ok(),
            "record index out of range: {}",
            irec
        );
        let rec = if self.record_variance() { irec } else { 0 };
        match self.record_map.locate(rec) {
            Some((idx, run)) => {
                let rec_offset = (rec - run.first) as u64 * self.rec_bytes;
                match run.store {
                    BlockStore::Vvr {
                        data_offset,
                        data_len,
                    } => {
                        if rec_offset + self.rec_bytes > data_len {
                            return Err(CdfError::InvalidFormat(format!(
                                "Record {} of variable '{}' runs past its VVR ({} bytes)",
                                rec, self.vdr.name, data_len
                            )));
                        }
                        self.data_reader
                            .read_value(&self.buf, data_offset + rec_offset, work)
                    }
                    BlockStore::Cvvr { .. } => {
                        let block = self.uncompressed_block(idx, run)?;
                        self.data_reader.read_value(&block, rec_offset, work)
                    }
                }
            }
            None => {
                match &self.pad {
                    Some(pad) => work.fill_repeat(pad),
                    None => work.fill_default(),
                }
                Ok(())
            }
        }
    }

    /// Reads record `irec` and shapes it into its logical value.
    ///
    /// `work` must come from
    /// [`create_raw_value_array`](Self::create_raw_value_array);
    /// supplying one workspace per reader thread keeps this call free
    /// of per-record allocation for the raw read.
    ///
    /// # Panics
    /// As [`read_raw_record`](Self::read_raw_record).
    pub fn read_shaped_record(
        &self,
        irec: i64,
        preserve_fixed: bool,
        work: &mut RawArray,
    ) -> Result<Value> {
        self.read_raw_record(irec, work)?;
        Ok(self.shaper.shape(work, preserve_fixed))
    }

    /// Decompresses the CVVR backing `run`, reusing the most recently
    /// expanded block when it is the same one.
    fn uncompressed_block(&self, idx: usize, run: &RecordRun) -> Result<Buf> {
        let (data_offset, c_size) = match run.store {
            BlockStore::Cvvr {
                data_offset,
                c_size,
            } => (data_offset, c_size),
            BlockStore::Vvr { .. } => unreachable!("uncompressed_block called for a VVR run"),
        };
        let mut cache = self
            .block_cache
            .lock()
            .map_err(|_| CdfError::LockPoisoned)?;
        if let Some((cached_idx, block)) = cache.as_ref() {
            if *cached_idx == idx {
                return Ok(block.clone());
            }
        }
        let compression = self.compression.clone().unwrap_or(Compression::None);
        let n_rec = (run.last - run.first + 1) as u64;
        let bytes = compression.uncompress(&self.buf, data_offset, c_size, n_rec * self.rec_bytes)?;
        let block = Buf::with_flags_of(bytes, &self.buf);
        *cache = Some((idx, block.clone()));
        Ok(block)
    }
}
