//! Decompression algorithms for CDF compressed records.
//!
//! A CPR (whole-file compression) or a compressed VDR names one of the
//! registered compression types by its `cType` code:
//!
//! - `NONE` (0): no compression
//! - `RLE` (1): run-length encoding of zero bytes
//! - `HUFF` (2): static Huffman coding
//! - `AHUFF` (3): adaptive (FGK) Huffman coding
//! - `GZIP` (5): RFC 1952 deflate via flate2
//!
//! Every algorithm is an `InputStream → InputStream` transformer.
//! [`Compression::Padded`] composes: it prefixes a run of zero bytes
//! before deferring to the inner algorithm, reconciling whole-file
//! compressed files whose internal offsets assume the 8-byte magic
//! prelude that the compressed payload does not contain.

use std::io::{self, Read};

use flate2::read::GzDecoder;
use log::trace;

use super::super::buf::Buf;
use super::super::types::error::{CdfError, Result};
use super::huffman;

/// A decompression algorithm from the CDF registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    RunLength,
    Huffman,
    AdaptiveHuffman,
    Gzip,
    /// Emits `lead` zero bytes, then defers to `inner`.
    Padded { lead: u64, inner: Box<Compression> },
}

impl Compression {
    /// Resolves a `cType` code from a CPR or VDR.
    ///
    /// # Errors
    /// Returns [`CdfError::UnknownCompression`] for codes outside the
    /// registry.
    pub fn from_ctype(c_type: i32) -> Result<Self> {
        match c_type {
            0 => Ok(Compression::None),
            1 => Ok(Compression::RunLength),
            2 => Ok(Compression::Huffman),
            3 => Ok(Compression::AdaptiveHuffman),
            5 => Ok(Compression::Gzip),
            _ => Err(CdfError::UnknownCompression(c_type)),
        }
    }

    /// The algorithm's name in the CDF documentation.
    pub fn name(&self) -> String {
        match self {
            Compression::None => "NONE".to_string(),
            Compression::RunLength => "RLE".to_string(),
            Compression::Huffman => "HUFF".to_string(),
            Compression::AdaptiveHuffman => "AHUFF".to_string(),
            Compression::Gzip => "GZIP".to_string(),
            Compression::Padded { inner, .. } => format!("Padded {}", inner.name()),
        }
    }

    /// Wraps a compressed stream in a decompressing one.
    ///
    /// The Huffman codecs decode their whole payload up front (their
    /// model is stateful across the stream); the other algorithms
    /// stream.
    pub fn uncompress_stream<'a>(&self, input: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
        match self {
            Compression::None => Ok(input),
            Compression::RunLength => Ok(Box::new(RunLengthReader::new(input))),
            Compression::Huffman => {
                let mut data = Vec::new();
                let mut input = input;
                input.read_to_end(&mut data)?;
                Ok(Box::new(io::Cursor::new(huffman::decode_huffman(&data)?)))
            }
            Compression::AdaptiveHuffman => {
                let mut data = Vec::new();
                let mut input = input;
                input.read_to_end(&mut data)?;
                Ok(Box::new(io::Cursor::new(huffman::decode_adaptive(&data)?)))
            }
            Compression::Gzip => Ok(Box::new(GzDecoder::new(input))),
            Compression::Padded { lead, inner } => {
                let tail = inner.uncompress_stream(input)?;
                Ok(Box::new(io::repeat(0).take(*lead).chain(tail)))
            }
        }
    }

    /// Decompresses `count` bytes of `buf` starting at `offset` into a
    /// vector of exactly `expected_size` bytes.
    ///
    /// # Errors
    /// Short and long streams both surface as
    /// [`CdfError::SizeMismatch`]; codec failures as
    /// [`CdfError::Decompression`].
    pub fn uncompress(
        &self,
        buf: &Buf,
        offset: u64,
        count: u64,
        expected_size: u64,
    ) -> Result<Vec<u8>> {
        trace!(
            "Decompressing {} bytes at offset {} with {} (expecting {} bytes)",
            count,
            offset,
            self.name(),
            expected_size
        );
        let src = buf.read_bytes(offset, count)?;
        let stream = self.uncompress_stream(Box::new(src))?;
        let mut out = Vec::with_capacity(expected_size as usize);
        stream
            .take(expected_size + 1)
            .read_to_end(&mut out)
            .map_err(|e| CdfError::Decompression(format!("{} stream: {}", self.name(), e)))?;
        if out.len() as u64 != expected_size {
            return Err(CdfError::SizeMismatch {
                context: "decompressed block",
                expected: expected_size,
                found: out.len() as u64,
            });
        }
        Ok(out)
    }
}

/// Expands the CDF run-length encoding of zero bytes: a literal zero
/// is followed by a count byte giving the number of additional zeros.
struct RunLengthReader<R> {
    inner: R,
    pending_zeros: u64,
}

impl<R: Read> RunLengthReader<R> {
    fn new(inner: R) -> Self {
        RunLengthReader {
            inner,
            pending_zeros: 0,
        }
    }
}

impl<R: Read> Read for RunLengthReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < out.len() {
            if self.pending_zeros > 0 {
                self.pending_zeros -= 1;
                out[n] = 0;
                n += 1;
                continue;
            }
            let mut byte = [0u8; 1];
            match self.inner.read_exact(&mut byte) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            if byte[0] == 0 {
                let mut count = [0u8; 1];
                self.inner.read_exact(&mut count).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        "run-length stream truncated after zero marker",
                    )
                })?;
                self.pending_zeros = count[0] as u64;
            }
            out[n] = byte[0];
            n += 1;
        }
        Ok(n)
    }
}
