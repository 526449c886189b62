//! End-to-end checks against synthetic CDF files built in memory.
//!
//! The builder at the top of this file writes the same record layouts
//! the reader parses: control fields in network byte order, data
//! values in the declared encoding, record sizes patched once each
//! record is complete.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};
use cdf_reader::{
    is_magic, Buf, CdfContent, CdfError, CdfReader, DataReader, DataType, ElementKind, RawArray,
    ShapeClass, Shaper, Value,
};

const NETWORK: i32 = 1;
const IBMPC: i32 = 6;
const VAX: i32 = 3;

const V3_MAGIC1: u32 = 0xcdf3_0001;
const V26_MAGIC1: u32 = 0xcdf2_6002;
const PRE26_MAGIC1: u32 = 0x0000_ffff;
const UNCOMPRESSED_MAGIC2: u32 = 0x0000_ffff;
const COMPRESSED_MAGIC2: u32 = 0xcccc_0001;

// ---------------------------------------------------------------------------
// File builder
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Patch(usize);

#[derive(Clone, Copy)]
struct RecordStart(usize);

struct FileBuilder {
    bytes: Vec<u8>,
    bit64: bool,
    data_big: bool,
    name_leng: usize,
}

impl FileBuilder {
    fn new(v3: bool, data_big: bool) -> Self {
        FileBuilder {
            bytes: Vec::new(),
            bit64: v3,
            data_big,
            name_leng: if v3 { 256 } else { 64 },
        }
    }

    fn magic(&mut self, m1: u32, m2: u32) {
        self.bytes.extend_from_slice(&m1.to_be_bytes());
        self.bytes.extend_from_slice(&m2.to_be_bytes());
    }

    fn int(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    fn offset(&mut self, v: i64) {
        if self.bit64 {
            self.bytes.extend_from_slice(&v.to_be_bytes());
        } else {
            self.bytes.extend_from_slice(&(v as i32).to_be_bytes());
        }
    }

    fn offset_patch(&mut self) -> Patch {
        let patch = Patch(self.bytes.len());
        self.offset(0);
        patch
    }

    fn patch(&mut self, patch: Patch, value: u64) {
        if self.bit64 {
            BigEndian::write_i64(&mut self.bytes[patch.0..patch.0 + 8], value as i64);
        } else {
            BigEndian::write_i32(&mut self.bytes[patch.0..patch.0 + 4], value as i32);
        }
    }

    fn string(&mut self, s: &str, width: usize) {
        let mut field = vec![0u8; width];
        field[..s.len()].copy_from_slice(s.as_bytes());
        self.bytes.extend_from_slice(&field);
    }

    fn name(&mut self, s: &str) {
        let width = self.name_leng;
        self.string(s, width);
    }

    fn data_i32(&mut self, v: i32) {
        if self.data_big {
            self.bytes.extend_from_slice(&v.to_be_bytes());
        } else {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    fn begin_record(&mut self, record_type: i32) -> RecordStart {
        let start = RecordStart(self.bytes.len());
        self.offset(0);
        self.int(record_type);
        start
    }

    fn end_record(&mut self, start: RecordStart) -> u64 {
        let size = (self.bytes.len() - start.0) as u64;
        self.patch(Patch(start.0), size);
        start.0 as u64
    }
}

struct CdrPatches {
    gdr_offset: Patch,
}

fn write_cdr(
    b: &mut FileBuilder,
    version: i32,
    release: i32,
    encoding: i32,
    flags: i32,
) -> CdrPatches {
    let rec = b.begin_record(1);
    let gdr_offset = b.offset_patch();
    b.int(version);
    b.int(release);
    b.int(encoding);
    b.int(flags);
    b.int(0); // rfuA
    b.int(0); // rfuB
    b.int(0); // increment
    b.int(-1); // rfuD
    b.int(-1); // rfuE
    let pre26 = version < 2 || (version == 2 && release < 6);
    b.string("Synthetic test CDF", if pre26 { 1945 } else { 256 });
    b.end_record(rec);
    CdrPatches { gdr_offset }
}

struct GdrPatches {
    rvdr_head: Patch,
    zvdr_head: Patch,
    adr_head: Patch,
}

fn write_gdr(
    b: &mut FileBuilder,
    nr_vars: i32,
    nz_vars: i32,
    num_attr: i32,
    r_dims: &[i32],
) -> (u64, GdrPatches) {
    let rec = b.begin_record(2);
    let rvdr_head = b.offset_patch();
    let zvdr_head = b.offset_patch();
    let adr_head = b.offset_patch();
    b.offset(0); // eof
    b.int(nr_vars);
    b.int(num_attr);
    b.int(-1); // rMaxRec
    b.int(r_dims.len() as i32);
    b.int(nz_vars);
    b.offset(0); // uirHead
    b.int(0); // rfuC
    b.int(-1); // lastLeapSecondId
    b.int(-1); // rfuE
    for &dim in r_dims {
        b.int(dim);
    }
    let off = b.end_record(rec);
    (
        off,
        GdrPatches {
            rvdr_head,
            zvdr_head,
            adr_head,
        },
    )
}

struct VdrPatches {
    vdr_next: Patch,
    vxr_head: Patch,
    vxr_tail: Patch,
    cpr_offset: Patch,
}

#[allow(clippy::too_many_arguments)]
fn write_vdr(
    b: &mut FileBuilder,
    z: bool,
    name: &str,
    data_type: i32,
    max_rec: i32,
    flags: i32,
    num_elems: i32,
    num: i32,
    z_dims: &[i32],
    dim_varys: &[i32],
    pad: Option<&[i32]>,
) -> (u64, VdrPatches) {
    let rec = b.begin_record(if z { 8 } else { 3 });
    let vdr_next = b.offset_patch();
    b.int(data_type);
    b.int(max_rec);
    let vxr_head = b.offset_patch();
    let vxr_tail = b.offset_patch();
    b.int(flags);
    b.int(0); // sRecords
    b.int(0); // rfuB
    b.int(-1); // rfuC
    b.int(-1); // rfuF
    b.int(num_elems);
    b.int(num);
    let cpr_offset = b.offset_patch();
    b.int(0); // blockingFactor
    b.name(name);
    if z {
        b.int(z_dims.len() as i32);
        for &dim in z_dims {
            b.int(dim);
        }
    }
    for &vary in dim_varys {
        b.int(vary);
    }
    if let Some(pad) = pad {
        for &value in pad {
            b.data_i32(value);
        }
    }
    let off = b.end_record(rec);
    (
        off,
        VdrPatches {
            vdr_next,
            vxr_head,
            vxr_tail,
            cpr_offset,
        },
    )
}

fn write_vxr(b: &mut FileBuilder, runs: &[(i32, i32)]) -> (u64, Vec<Patch>) {
    let rec = b.begin_record(6);
    b.offset(0); // vxrNext
    b.int(runs.len() as i32);
    b.int(runs.len() as i32);
    for &(first, _) in runs {
        b.int(first);
    }
    for &(_, last) in runs {
        b.int(last);
    }
    let mut offsets = Vec::new();
    for _ in runs {
        offsets.push(b.offset_patch());
    }
    let off = b.end_record(rec);
    (off, offsets)
}

fn write_vvr(b: &mut FileBuilder, data: &[u8]) -> u64 {
    let rec = b.begin_record(7);
    b.raw(data);
    b.end_record(rec)
}

fn write_cvvr(b: &mut FileBuilder, compressed: &[u8]) -> u64 {
    let rec = b.begin_record(13);
    b.int(0); // rfuA
    b.offset(compressed.len() as i64);
    b.raw(compressed);
    b.end_record(rec)
}

fn write_cpr(b: &mut FileBuilder, c_type: i32) -> u64 {
    let rec = b.begin_record(11);
    b.int(c_type);
    b.int(0); // rfuA
    b.int(1); // pCount
    b.int(0); // cParms[0]
    b.end_record(rec)
}

struct AdrPatches {
    adr_next: Patch,
    agr_head: Patch,
    az_head: Patch,
}

#[allow(clippy::too_many_arguments)]
fn write_adr(
    b: &mut FileBuilder,
    name: &str,
    scope: i32,
    num: i32,
    n_gr: i32,
    max_gr: i32,
    n_z: i32,
    max_z: i32,
) -> (u64, AdrPatches) {
    let rec = b.begin_record(4);
    let adr_next = b.offset_patch();
    let agr_head = b.offset_patch();
    b.int(scope);
    b.int(num);
    b.int(n_gr);
    b.int(max_gr);
    b.int(0); // rfuA
    let az_head = b.offset_patch();
    b.int(n_z);
    b.int(max_z);
    b.int(-1); // rfuE
    b.name(name);
    let off = b.end_record(rec);
    (
        off,
        AdrPatches {
            adr_next,
            agr_head,
            az_head,
        },
    )
}

#[derive(Clone)]
enum EntryValue {
    Int(i32),
    IntArray(Vec<i32>),
    Text(&'static str),
}

fn write_aedr(
    b: &mut FileBuilder,
    z: bool,
    attr_num: i32,
    num: i32,
    value: &EntryValue,
) -> (u64, Patch) {
    let rec = b.begin_record(if z { 9 } else { 5 });
    let next = b.offset_patch();
    b.int(attr_num);
    match value {
        EntryValue::Int(_) => {
            b.int(4); // INT4
            b.int(num);
            b.int(1);
        }
        EntryValue::IntArray(values) => {
            b.int(4);
            b.int(num);
            b.int(values.len() as i32);
        }
        EntryValue::Text(text) => {
            b.int(51); // CHAR
            b.int(num);
            b.int(text.len() as i32);
        }
    }
    b.int(-1); // numStrings
    b.int(0); // rfuB
    b.int(0); // rfuC
    b.int(-1); // rfuD
    b.int(-1); // rfuE
    match value {
        EntryValue::Int(v) => b.data_i32(*v),
        EntryValue::IntArray(values) => {
            for &v in values {
                b.data_i32(v);
            }
        }
        EntryValue::Text(text) => b.raw(text.as_bytes()),
    }
    let off = b.end_record(rec);
    (off, next)
}

// ---------------------------------------------------------------------------
// Whole-file assembly
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct VarSpec {
    name: &'static str,
    z: bool,
    data_type: i32,
    num_elems: i32,
    dims: Vec<i32>,
    dim_varys: Vec<i32>,
    flags: i32,
    max_rec: i32,
    records: Vec<Vec<i32>>,
    text_records: Vec<&'static str>,
    pad: Option<Vec<i32>>,
    gzip_block: Option<usize>,
}

impl Default for VarSpec {
    fn default() -> Self {
        VarSpec {
            name: "VAR",
            z: true,
            data_type: 4,
            num_elems: 1,
            dims: Vec::new(),
            dim_varys: Vec::new(),
            flags: 1,
            max_rec: -1,
            records: Vec::new(),
            text_records: Vec::new(),
            pad: None,
            gzip_block: None,
        }
    }
}

#[derive(Clone)]
struct AttrSpec {
    name: &'static str,
    global: bool,
    gr_entries: Vec<(i32, EntryValue)>,
    max_gr: i32,
    z_entries: Vec<(i32, EntryValue)>,
    max_z: i32,
}

impl Default for AttrSpec {
    fn default() -> Self {
        AttrSpec {
            name: "ATTR",
            global: true,
            gr_entries: Vec::new(),
            max_gr: -1,
            z_entries: Vec::new(),
            max_z: -1,
        }
    }
}

#[derive(Clone)]
struct CdfSpec {
    magic1: u32,
    version: (i32, i32),
    encoding: i32,
    cdr_flags: i32,
    r_dims: Vec<i32>,
    vars: Vec<VarSpec>,
    attrs: Vec<AttrSpec>,
}

impl Default for CdfSpec {
    fn default() -> Self {
        CdfSpec {
            magic1: V3_MAGIC1,
            version: (3, 6),
            encoding: NETWORK,
            cdr_flags: 0x03, // row-major, single-file
            r_dims: Vec::new(),
            vars: Vec::new(),
            attrs: Vec::new(),
        }
    }
}

fn encoding_is_big(encoding: i32) -> bool {
    !matches!(encoding, 4 | 6 | 13 | 16 | 17)
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::GzEncoder::new(data, flate2::Compression::default())
        .read_to_end(&mut out)
        .expect("gzip encode");
    out
}

fn record_bytes(data_big: bool, record: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(record.len() * 4);
    for &v in record {
        if data_big {
            out.extend_from_slice(&v.to_be_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

fn build_cdf(spec: &CdfSpec) -> Vec<u8> {
    let v3 = spec.magic1 == V3_MAGIC1;
    let mut b = FileBuilder::new(v3, encoding_is_big(spec.encoding));
    b.magic(spec.magic1, UNCOMPRESSED_MAGIC2);

    let cdr = write_cdr(
        &mut b,
        spec.version.0,
        spec.version.1,
        spec.encoding,
        spec.cdr_flags,
    );
    let nr_vars = spec.vars.iter().filter(|v| !v.z).count() as i32;
    let nz_vars = spec.vars.iter().filter(|v| v.z).count() as i32;
    let (gdr_off, gdr) = write_gdr(
        &mut b,
        nr_vars,
        nz_vars,
        spec.attrs.len() as i32,
        &spec.r_dims,
    );
    b.patch(cdr.gdr_offset, gdr_off);

    let mut prev_r: Option<Patch> = None;
    let mut prev_z: Option<Patch> = None;
    let mut r_count = 0;
    let mut z_count = 0;
    for var in &spec.vars {
        let num = if var.z { z_count } else { r_count };
        let (vdr_off, vdr) = write_vdr(
            &mut b,
            var.z,
            var.name,
            var.data_type,
            var.max_rec,
            var.flags,
            var.num_elems,
            num,
            &var.dims,
            &var.dim_varys,
            var.pad.as_deref(),
        );
        let link = if var.z {
            z_count += 1;
            prev_z.replace(vdr.vdr_next)
        } else {
            r_count += 1;
            prev_r.replace(vdr.vdr_next)
        };
        match link {
            Some(prev) => b.patch(prev, vdr_off),
            None => b.patch(
                if var.z { gdr.zvdr_head } else { gdr.rvdr_head },
                vdr_off,
            ),
        }

        if let Some(block_size) = var.gzip_block {
            let chunks: Vec<_> = var.records.chunks(block_size).collect();
            let runs: Vec<(i32, i32)> = chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let first = (i * block_size) as i32;
                    (first, first + chunk.len() as i32 - 1)
                })
                .collect();
            let (vxr_off, slots) = write_vxr(&mut b, &runs);
            b.patch(vdr.vxr_head, vxr_off);
            b.patch(vdr.vxr_tail, vxr_off);
            for (chunk, slot) in chunks.iter().zip(slots) {
                let mut raw = Vec::new();
                for record in *chunk {
                    raw.extend_from_slice(&record_bytes(b.data_big, record));
                }
                let compressed = gzip(&raw);
                let cvvr_off = write_cvvr(&mut b, &compressed);
                b.patch(slot, cvvr_off);
            }
            let cpr_off = write_cpr(&mut b, 5);
            b.patch(vdr.cpr_offset, cpr_off);
        } else if !var.records.is_empty() || !var.text_records.is_empty() {
            let n_stored = var.records.len().max(var.text_records.len());
            let (vxr_off, slots) = write_vxr(&mut b, &[(0, n_stored as i32 - 1)]);
            b.patch(vdr.vxr_head, vxr_off);
            b.patch(vdr.vxr_tail, vxr_off);
            let mut raw = Vec::new();
            for record in &var.records {
                raw.extend_from_slice(&record_bytes(b.data_big, record));
            }
            for text in &var.text_records {
                let mut field = vec![0u8; var.num_elems as usize];
                field[..text.len()].copy_from_slice(text.as_bytes());
                raw.extend_from_slice(&field);
            }
            let vvr_off = write_vvr(&mut b, &raw);
            b.patch(slots[0], vvr_off);
        }
    }

    let mut prev_adr: Option<Patch> = None;
    for (num, attr) in spec.attrs.iter().enumerate() {
        let scope = if attr.global { 1 } else { 2 };
        let (adr_off, adr) = write_adr(
            &mut b,
            attr.name,
            scope,
            num as i32,
            attr.gr_entries.len() as i32,
            attr.max_gr,
            attr.z_entries.len() as i32,
            attr.max_z,
        );
        match prev_adr.replace(adr.adr_next) {
            Some(prev) => b.patch(prev, adr_off),
            None => b.patch(gdr.adr_head, adr_off),
        }
        let mut prev_entry: Option<Patch> = Some(adr.agr_head);
        for (slot, value) in &attr.gr_entries {
            let (aedr_off, next) = write_aedr(&mut b, false, num as i32, *slot, value);
            b.patch(prev_entry.take().expect("entry link"), aedr_off);
            prev_entry = Some(next);
        }
        let mut prev_entry: Option<Patch> = Some(adr.az_head);
        for (slot, value) in &attr.z_entries {
            let (aedr_off, next) = write_aedr(&mut b, true, num as i32, *slot, value);
            b.patch(prev_entry.take().expect("entry link"), aedr_off);
            prev_entry = Some(next);
        }
    }

    b.bytes
}

/// Rewrites an uncompressed file as its whole-file compressed twin:
/// magic, a CCR whose payload is the gzipped body, then the CPR.
fn wrap_whole_file_gzip(uncompressed: &[u8], magic1: u32) -> Vec<u8> {
    let body = &uncompressed[8..];
    let compressed = gzip(body);
    let mut b = FileBuilder::new(magic1 == V3_MAGIC1, true);
    b.magic(magic1, COMPRESSED_MAGIC2);
    let rec = b.begin_record(10);
    let cpr_slot = b.offset_patch();
    b.offset(body.len() as i64); // uSize
    b.int(0); // rfuA
    b.raw(&compressed);
    b.end_record(rec);
    let cpr_off = write_cpr(&mut b, 5);
    b.patch(cpr_slot, cpr_off);
    b.bytes
}

fn open(bytes: Vec<u8>) -> CdfContent {
    CdfReader::new(Buf::new(bytes))
        .expect("open CDF")
        .read_content()
        .expect("read content")
}

fn read_record(content: &CdfContent, ivar: usize, irec: i64) -> Value {
    let var = &content.variables()[ivar];
    let mut work = var.create_raw_value_array();
    var.read_shaped_record(irec, false, &mut work)
        .expect("read record")
}

fn int_scalar_var(name: &'static str, values: &[i32]) -> VarSpec {
    VarSpec {
        name,
        max_rec: values.len() as i32 - 1,
        records: values.iter().map(|&v| vec![v]).collect(),
        ..VarSpec::default()
    }
}

// ---------------------------------------------------------------------------
// Magic detection
// ---------------------------------------------------------------------------

#[test]
fn known_magic_words_are_recognised() {
    let table = [
        (V3_MAGIC1, UNCOMPRESSED_MAGIC2),
        (V3_MAGIC1, COMPRESSED_MAGIC2),
        (V26_MAGIC1, UNCOMPRESSED_MAGIC2),
        (V26_MAGIC1, COMPRESSED_MAGIC2),
        (PRE26_MAGIC1, UNCOMPRESSED_MAGIC2),
    ];
    for (m1, m2) in table {
        let mut intro = Vec::new();
        intro.extend_from_slice(&m1.to_be_bytes());
        intro.extend_from_slice(&m2.to_be_bytes());
        assert!(is_magic(&intro), "{:#010x}/{:#010x}", m1, m2);
        // Detection is idempotent.
        assert!(is_magic(&intro));
    }
    assert!(!is_magic(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0xff, 0xff]));
    assert!(!is_magic(&[0xcd])); // too short
    // The pre-v2.6 era predates whole-file compression.
    let mut intro = Vec::new();
    intro.extend_from_slice(&PRE26_MAGIC1.to_be_bytes());
    intro.extend_from_slice(&COMPRESSED_MAGIC2.to_be_bytes());
    assert!(!is_magic(&intro));
}

#[test]
fn unknown_magic_reports_both_words() {
    let mut bytes = vec![0u8; 16];
    BigEndian::write_u32(&mut bytes[0..4], 0xdead_beef);
    BigEndian::write_u32(&mut bytes[4..8], 0x0000_ffff);
    let err = CdfReader::new(Buf::new(bytes)).unwrap_err();
    let message = err.to_string();
    assert!(
        message.contains("0xdeadbeef") && message.contains("0x0000ffff"),
        "magic bytes missing from: {}",
        message
    );
}

#[test]
fn truncated_intro_is_out_of_bounds() {
    let err = CdfReader::new(Buf::new(vec![0xcd, 0xf3])).unwrap_err();
    assert!(matches!(err, CdfError::OutOfBounds { .. }));
}

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn minimal_v3_uncompressed_reads_scalar_records() {
    let spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[10, 20, 30])],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(content.variables().len(), 1);
    let var = &content.variables()[0];
    assert_eq!(var.name(), "COUNTS");
    assert_eq!(var.record_count(), 3);
    assert_eq!(var.data_type(), DataType::Int4);
    assert!(var.record_variance());
    assert_eq!(var.shaper().shape_class(), ShapeClass::Scalar(ElementKind::Int4));
    assert_eq!(read_record(&content, 0, 0), Value::Int4(10));
    assert_eq!(read_record(&content, 0, 1), Value::Int4(20));
    assert_eq!(read_record(&content, 0, 2), Value::Int4(30));
}

#[test]
fn column_major_arrays_are_transposed_to_row_major() {
    let spec = CdfSpec {
        cdr_flags: 0x02, // single-file, column-major
        vars: vec![VarSpec {
            name: "GRID",
            dims: vec![2, 3],
            dim_varys: vec![1, 1],
            max_rec: 0,
            records: vec![vec![1, 2, 3, 4, 5, 6]],
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    let var = &content.variables()[0];
    assert_eq!(var.shaper().dim_sizes(), &[2, 3]);
    assert_eq!(var.shaper().raw_item_count(), 6);
    assert_eq!(var.summary(), "INT4 (z) [2,3]");
    assert_eq!(
        read_record(&content, 0, 0),
        Value::Array(RawArray::Int4(vec![1, 3, 5, 2, 4, 6]))
    );
}

#[test]
fn row_major_arrays_pass_through_unchanged() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "GRID",
            dims: vec![2, 3],
            dim_varys: vec![1, 1],
            max_rec: 0,
            records: vec![vec![1, 2, 3, 4, 5, 6]],
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(
        read_record(&content, 0, 0),
        Value::Array(RawArray::Int4(vec![1, 2, 3, 4, 5, 6]))
    );
}

#[test]
fn v26_gzip_whole_file_matches_its_uncompressed_twin() {
    let spec = CdfSpec {
        magic1: V26_MAGIC1,
        version: (2, 6),
        vars: vec![int_scalar_var("COUNTS", &[10, 20, 30])],
        attrs: vec![AttrSpec {
            name: "TITLE",
            gr_entries: vec![(0, EntryValue::Text("gzip test"))],
            max_gr: 0,
            ..AttrSpec::default()
        }],
        ..CdfSpec::default()
    };
    let plain_bytes = build_cdf(&spec);
    let compressed_bytes = wrap_whole_file_gzip(&plain_bytes, V26_MAGIC1);
    assert_ne!(plain_bytes, compressed_bytes);

    let plain = open(plain_bytes);
    let packed = open(compressed_bytes);
    assert_eq!(packed.variables().len(), 1);
    for irec in 0..3 {
        assert_eq!(
            read_record(&plain, 0, irec),
            read_record(&packed, 0, irec),
            "record {} differs between plain and compressed",
            irec
        );
    }
    assert_eq!(plain.global_attributes().len(), 1);
    assert_eq!(
        packed.global_attributes()[0].entries()[0],
        Some(Value::Text("gzip test".to_string()))
    );
}

#[test]
fn whole_file_compressed_v3_also_opens() {
    let spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[7, 8])],
        ..CdfSpec::default()
    };
    let content = open(wrap_whole_file_gzip(&build_cdf(&spec), V3_MAGIC1));
    assert_eq!(read_record(&content, 0, 1), Value::Int4(8));
}

#[test]
fn non_record_variant_variable_repeats_its_single_record() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "CONSTANT",
            flags: 0, // no record variance
            max_rec: 0,
            records: vec![vec![42]],
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    let var = &content.variables()[0];
    assert!(!var.record_variance());
    assert_eq!(read_record(&content, 0, 0), Value::Int4(42));
    assert_eq!(read_record(&content, 0, 1000), Value::Int4(42));
    assert_eq!(read_record(&content, 0, 0), read_record(&content, 0, 1000));
}

#[test]
fn sparse_entry_lists_keep_null_slots() {
    let spec = CdfSpec {
        attrs: vec![AttrSpec {
            name: "SPARSE",
            gr_entries: vec![(0, EntryValue::Int(7)), (3, EntryValue::Int(9))],
            max_gr: 4,
            ..AttrSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(content.global_attributes().len(), 1);
    let entries = content.global_attributes()[0].entries();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0], Some(Value::Int4(7)));
    assert_eq!(entries[1], None);
    assert_eq!(entries[2], None);
    assert_eq!(entries[3], Some(Value::Int4(9)));
    assert_eq!(entries[4], None);
}

#[test]
fn multi_file_cdfs_are_rejected() {
    let spec = CdfSpec {
        cdr_flags: 0x01, // row-major but not single-file
        ..CdfSpec::default()
    };
    let err = CdfReader::new(Buf::new(build_cdf(&spec))).unwrap_err();
    assert!(
        err.to_string().contains("Multi-file CDFs not supported"),
        "unexpected error: {}",
        err
    );
}

// ---------------------------------------------------------------------------
// Further format coverage
// ---------------------------------------------------------------------------

#[test]
fn little_endian_encoding_reads_the_same_values() {
    let mut spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[100, -200, 300])],
        ..CdfSpec::default()
    };
    let big = open(build_cdf(&spec));
    spec.encoding = IBMPC;
    let little = open(build_cdf(&spec));
    for irec in 0..3 {
        assert_eq!(read_record(&big, 0, irec), read_record(&little, 0, irec));
    }
}

#[test]
fn vax_encoding_is_unsupported() {
    let spec = CdfSpec {
        encoding: VAX,
        ..CdfSpec::default()
    };
    let err = CdfReader::new(Buf::new(build_cdf(&spec))).unwrap_err();
    assert!(
        err.to_string().contains("Unsupported encoding VAX"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn unknown_encoding_codes_are_format_errors() {
    let spec = CdfSpec {
        encoding: 99,
        ..CdfSpec::default()
    };
    let err = CdfReader::new(Buf::new(build_cdf(&spec))).unwrap_err();
    assert!(matches!(err, CdfError::UnknownEncoding(99)));
}

#[test]
fn pre_v26_files_parse_with_the_v26_layout() {
    let spec = CdfSpec {
        magic1: PRE26_MAGIC1,
        version: (2, 5),
        vars: vec![int_scalar_var("OLD", &[5])],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(read_record(&content, 0, 0), Value::Int4(5));
}

#[test]
fn records_beyond_max_rec_fall_back_to_the_pad_value() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "PADDED",
            flags: 0x03, // record variance, has pad
            max_rec: 1,
            records: vec![vec![1], vec![2]],
            pad: Some(vec![99]),
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(read_record(&content, 0, 0), Value::Int4(1));
    assert_eq!(read_record(&content, 0, 1), Value::Int4(2));
    assert_eq!(read_record(&content, 0, 5), Value::Int4(99));
    // Pad and stored records share the shape class.
    let class = content.variables()[0].shaper().shape_class();
    assert_eq!(read_record(&content, 0, 5).shape_class(), class);
    assert_eq!(read_record(&content, 0, 0).shape_class(), class);
}

#[test]
fn records_beyond_max_rec_without_pad_use_the_type_fill() {
    let spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[10])],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(read_record(&content, 0, 7), Value::Int4(0));
}

#[test]
fn compressed_record_blocks_decompress_per_run() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "PACKED",
            flags: 0x05, // record variance, compressed
            max_rec: 3,
            records: vec![vec![11], vec![22], vec![33], vec![44]],
            gzip_block: Some(2),
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    for (irec, expected) in [11, 22, 33, 44].into_iter().enumerate() {
        assert_eq!(read_record(&content, 0, irec as i64), Value::Int4(expected));
    }
    // Revisit records out of order so the block cache is exercised.
    assert_eq!(read_record(&content, 0, 3), Value::Int4(44));
    assert_eq!(read_record(&content, 0, 0), Value::Int4(11));
    assert_eq!(read_record(&content, 0, 1), Value::Int4(22));
}

#[test]
fn char_variables_read_as_strings() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "LABELS",
            data_type: 51, // CHAR
            num_elems: 4,
            max_rec: 1,
            text_records: vec!["abcd", "ef"],
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(
        content.variables()[0].shaper().shape_class(),
        ShapeClass::Scalar(ElementKind::Text)
    );
    assert_eq!(read_record(&content, 0, 0), Value::Text("abcd".to_string()));
    assert_eq!(read_record(&content, 0, 1), Value::Text("ef".to_string()));
}

#[test]
fn r_variables_take_their_dimensions_from_the_gdr() {
    let spec = CdfSpec {
        r_dims: vec![2],
        vars: vec![VarSpec {
            name: "RPAIR",
            z: false,
            dim_varys: vec![1],
            max_rec: 0,
            records: vec![vec![4, 5]],
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    let var = &content.variables()[0];
    assert!(!var.is_z_variable());
    assert_eq!(var.shaper().dim_sizes(), &[2]);
    assert_eq!(var.summary(), "INT4 (r) [2]");
    assert_eq!(
        read_record(&content, 0, 0),
        Value::Array(RawArray::Int4(vec![4, 5]))
    );
}

#[test]
fn variance_suppressed_dimensions_collapse() {
    let spec = CdfSpec {
        vars: vec![VarSpec {
            name: "COLLAPSED",
            dims: vec![3],
            dim_varys: vec![0],
            max_rec: 0,
            records: vec![vec![8]], // one stored element
            ..VarSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    let var = &content.variables()[0];
    assert_eq!(var.shaper().raw_item_count(), 1);
    assert_eq!(var.shaper().dim_sizes(), &[3]);
    assert_eq!(read_record(&content, 0, 0), Value::Int4(8));
    // preserve_fixed keeps the degenerate fixed array an array.
    let mut work = var.create_raw_value_array();
    let preserved = var
        .read_shaped_record(0, true, &mut work)
        .expect("read record");
    assert_eq!(preserved, Value::Array(RawArray::Int4(vec![8])));
}

#[test]
fn variable_attributes_dispatch_on_variable_kind() {
    let spec = CdfSpec {
        r_dims: vec![2],
        vars: vec![
            VarSpec {
                name: "RVAR",
                z: false,
                dim_varys: vec![1],
                max_rec: 0,
                records: vec![vec![1, 2]],
                ..VarSpec::default()
            },
            int_scalar_var("ZVAR", &[3]),
        ],
        attrs: vec![
            AttrSpec {
                name: "UNITS",
                global: false,
                gr_entries: vec![(0, EntryValue::Text("meters"))],
                max_gr: 0,
                z_entries: vec![(0, EntryValue::Text("seconds"))],
                max_z: 0,
                ..AttrSpec::default()
            },
            AttrSpec {
                name: "UNRELATED",
                global: false,
                ..AttrSpec::default()
            },
        ],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(content.variable_attributes().len(), 2);
    assert_eq!(content.global_attributes().len(), 0);
    let units = &content.variable_attributes()[0];
    let rvar = &content.variables()[0];
    let zvar = &content.variables()[1];
    assert!(zvar.is_z_variable());
    assert_eq!(
        units.entry(rvar),
        Some(&Value::Text("meters".to_string()))
    );
    assert_eq!(
        units.entry(zvar),
        Some(&Value::Text("seconds".to_string()))
    );
    // An attribute with no entries answers nothing for any variable.
    assert_eq!(content.variable_attributes()[1].entry(rvar), None);
    assert_eq!(content.variable_attributes()[1].entry(zvar), None);
}

#[test]
fn global_attribute_entries_concatenate_g_then_z() {
    let spec = CdfSpec {
        attrs: vec![AttrSpec {
            name: "HISTORY",
            gr_entries: vec![(0, EntryValue::Int(1))],
            max_gr: 0,
            z_entries: vec![(0, EntryValue::Int(2))],
            max_z: 0,
            ..AttrSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    let entries = content.global_attributes()[0].entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], Some(Value::Int4(1)));
    assert_eq!(entries[1], Some(Value::Int4(2)));
}

#[test]
fn multi_element_entries_read_as_arrays() {
    let spec = CdfSpec {
        attrs: vec![AttrSpec {
            name: "RANGE",
            gr_entries: vec![(0, EntryValue::IntArray(vec![-5, 5, 15]))],
            max_gr: 0,
            ..AttrSpec::default()
        }],
        ..CdfSpec::default()
    };
    let content = open(build_cdf(&spec));
    assert_eq!(
        content.global_attributes()[0].entries()[0],
        Some(Value::Array(RawArray::Int4(vec![-5, 5, 15])))
    );
}

#[test]
fn reading_content_twice_is_idempotent() {
    let spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[10, 20])],
        attrs: vec![AttrSpec {
            name: "TITLE",
            gr_entries: vec![(0, EntryValue::Text("twice"))],
            max_gr: 0,
            ..AttrSpec::default()
        }],
        ..CdfSpec::default()
    };
    let reader = CdfReader::new(Buf::new(build_cdf(&spec))).expect("open");
    let first = reader.read_content().expect("first read");
    let second = reader.read_content().expect("second read");
    assert_eq!(first.variables().len(), second.variables().len());
    for (a, b) in first.variables().iter().zip(second.variables()) {
        assert_eq!(a.name(), b.name());
        assert_eq!(a.summary(), b.summary());
        for irec in 0..a.record_count() {
            let mut wa = a.create_raw_value_array();
            let mut wb = b.create_raw_value_array();
            assert_eq!(
                a.read_shaped_record(irec, false, &mut wa).expect("a"),
                b.read_shaped_record(irec, false, &mut wb).expect("b")
            );
        }
    }
    assert_eq!(
        first.global_attributes()[0].entries(),
        second.global_attributes()[0].entries()
    );
}

#[test]
fn record_factory_round_trips_descriptor_records() {
    let spec = CdfSpec {
        vars: vec![int_scalar_var("COUNTS", &[10, 20])],
        ..CdfSpec::default()
    };
    let reader = CdfReader::new(Buf::new(build_cdf(&spec))).expect("open");
    // Walking the same record twice yields structurally equal results.
    let factory = reader.record_factory();
    let cdr_a = factory.read_cdr(reader.buf(), 8).expect("cdr");
    let cdr_b = factory.read_cdr(reader.buf(), 8).expect("cdr again");
    assert_eq!(cdr_a, cdr_b);
    let gdr_a = factory
        .read_gdr(reader.buf(), cdr_a.gdr_offset as u64)
        .expect("gdr");
    let gdr_b = factory
        .read_gdr(reader.buf(), cdr_a.gdr_offset as u64)
        .expect("gdr again");
    assert_eq!(gdr_a, gdr_b);
    let vdr_a = factory
        .read_vdr(reader.buf(), gdr_a.zvdr_head as u64)
        .expect("vdr");
    let vdr_b = factory
        .read_vdr(reader.buf(), gdr_a.zvdr_head as u64)
        .expect("vdr again");
    assert_eq!(vdr_a, vdr_b);
    assert_eq!(vdr_a.name, "COUNTS");
    // Asking for the wrong kind at a valid offset is a tag mismatch.
    let err = factory.read_gdr(reader.buf(), 8).unwrap_err();
    assert!(matches!(err, CdfError::RecordTypeMismatch { .. }));
}

#[test]
fn shaper_and_data_reader_handle_epoch16_pairs() {
    let mut bytes = Vec::new();
    for v in [1.5f64, -2.5] {
        bytes.extend_from_slice(&v.to_be_bytes());
    }
    let buf = Buf::new(bytes);
    let reader = DataReader::new(DataType::Epoch16, 1, 1);
    let mut raw = reader.create_raw_value_array();
    assert_eq!(raw.len(), 2);
    reader.read_value(&buf, 0, &mut raw).expect("read epoch16");
    let shaper = Shaper::new(DataType::Epoch16, &[], &[], true);
    assert_eq!(
        shaper.shape_class(),
        ShapeClass::Array(ElementKind::Real8)
    );
    assert_eq!(
        shaper.shape(&raw, false),
        Value::Array(RawArray::Real8(vec![1.5, -2.5]))
    );
}

#[test]
fn buffer_reads_past_the_end_are_format_errors() {
    let buf = Buf::new(vec![0u8; 4]);
    let err = buf.read_bytes(2, 8).unwrap_err();
    match err {
        CdfError::OutOfBounds { offset, count, len } => {
            assert_eq!((offset, count, len), (2, 8, 4));
        }
        other => panic!("unexpected error: {}", other),
    }
}
