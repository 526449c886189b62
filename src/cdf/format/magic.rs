//! Magic-number detection and format variant dispatch.

use byteorder::{BigEndian, ByteOrder};

/// The CDF format variant identified by the 8-byte magic prelude.
///
/// Versions prior to v3 use the same record layout but 4-byte file
/// offsets and 64-character name fields; the pre-v2.6 variant is
/// accepted with the v2.6 name width (its true width is not
/// documented).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdfVariant {
    pub label: &'static str,
    pub bit64: bool,
    pub name_leng: u64,
    pub compressed: bool,
}

/// Decodes the two big-endian magic words into a format variant, or
/// `None` for an unrecognised combination.
pub fn decode_magic(magic1: u32, magic2: u32) -> Option<CdfVariant> {
    let (label, bit64, name_leng) = match magic1 {
        0xcdf3_0001 => ("V3", true, 256),
        0xcdf2_6002 => ("V2.6/2.7", false, 64),
        0x0000_ffff => ("pre-V2.6", false, 64),
        _ => return None,
    };
    let compressed = match magic2 {
        0x0000_ffff => false,
        // The pre-v2.6 era predates whole-file compression.
        0xcccc_0001 if magic1 != 0x0000_ffff => true,
        _ => return None,
    };
    Some(CdfVariant {
        label,
        bit64,
        name_leng,
        compressed,
    })
}

/// Reports whether the given bytes open a CDF file: at least eight
/// bytes whose two big-endian words decode to a known variant.
pub fn is_magic(intro: &[u8]) -> bool {
    if intro.len() < 8 {
        return false;
    }
    let magic1 = BigEndian::read_u32(&intro[0..4]);
    let magic2 = BigEndian::read_u32(&intro[4..8]);
    decode_magic(magic1, magic2).is_some()
}
