//! The catalogue of CDF numeric encodings.

use super::error::{CdfError, Result};

/// A numeric encoding, as declared by the CDR.
///
/// The encoding names the platform that wrote the file's data values.
/// This reader handles every encoding whose byte order is pure big- or
/// little-endian; the VAX-family float encodings mix byte order within
/// a word and are reported as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericEncoding {
    Network,
    Sun,
    Vax,
    DecStation,
    Sgi,
    IbmPc,
    IbmRs,
    Mac,
    Hp,
    Next,
    AlphaOsf1,
    AlphaVmsD,
    AlphaVmsG,
    AlphaVmsI,
    ArmLittle,
    ArmBig,
}

impl NumericEncoding {
    /// Resolves an encoding code from the CDR.
    ///
    /// # Errors
    /// Returns [`CdfError::UnknownEncoding`] for codes outside the
    /// published catalogue.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(NumericEncoding::Network),
            2 => Ok(NumericEncoding::Sun),
            3 => Ok(NumericEncoding::Vax),
            4 => Ok(NumericEncoding::DecStation),
            5 => Ok(NumericEncoding::Sgi),
            6 => Ok(NumericEncoding::IbmPc),
            7 => Ok(NumericEncoding::IbmRs),
            9 => Ok(NumericEncoding::Mac),
            11 => Ok(NumericEncoding::Hp),
            12 => Ok(NumericEncoding::Next),
            13 => Ok(NumericEncoding::AlphaOsf1),
            14 => Ok(NumericEncoding::AlphaVmsD),
            15 => Ok(NumericEncoding::AlphaVmsG),
            16 => Ok(NumericEncoding::AlphaVmsI),
            17 => Ok(NumericEncoding::ArmLittle),
            18 => Ok(NumericEncoding::ArmBig),
            _ => Err(CdfError::UnknownEncoding(code)),
        }
    }

    /// The encoding's name in the CDF documentation.
    pub fn name(&self) -> &'static str {
        match self {
            NumericEncoding::Network => "NETWORK",
            NumericEncoding::Sun => "SUN",
            NumericEncoding::Vax => "VAX",
            NumericEncoding::DecStation => "DECSTATION",
            NumericEncoding::Sgi => "SGi",
            NumericEncoding::IbmPc => "IBMPC",
            NumericEncoding::IbmRs => "IBMRS",
            NumericEncoding::Mac => "MAC",
            NumericEncoding::Hp => "HP",
            NumericEncoding::Next => "NeXT",
            NumericEncoding::AlphaOsf1 => "ALPHAOSF1",
            NumericEncoding::AlphaVmsD => "ALPHAVMSd",
            NumericEncoding::AlphaVmsG => "ALPHAVMSg",
            NumericEncoding::AlphaVmsI => "ALPHAVMSi",
            NumericEncoding::ArmLittle => "ARM_LITTLE",
            NumericEncoding::ArmBig => "ARM_BIG",
        }
    }

    /// The byte order of data values under this encoding.
    ///
    /// `Some(true)` for pure big-endian, `Some(false)` for pure
    /// little-endian, `None` for the mixed-order VAX float family.
    pub fn is_big_endian(&self) -> Option<bool> {
        match self {
            NumericEncoding::Network
            | NumericEncoding::Sun
            | NumericEncoding::Sgi
            | NumericEncoding::IbmRs
            | NumericEncoding::Mac
            | NumericEncoding::Hp
            | NumericEncoding::Next
            | NumericEncoding::ArmBig => Some(true),
            NumericEncoding::DecStation
            | NumericEncoding::IbmPc
            | NumericEncoding::AlphaOsf1
            | NumericEncoding::AlphaVmsI
            | NumericEncoding::ArmLittle => Some(false),
            NumericEncoding::Vax | NumericEncoding::AlphaVmsD | NumericEncoding::AlphaVmsG => None,
        }
    }
}

impl std::fmt::Display for NumericEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
