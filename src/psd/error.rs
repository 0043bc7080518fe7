use crate::psd::color::ColorMode;
use std::fmt;
use std::io;

/// A structural rule of the PSD/PSB format was violated. Parsing stops at the
/// first violation; a partially populated document is never returned.
#[derive(Debug)]
pub enum FormatError {
    BadMagic(String),
    BadVersion(i16),
    ReservedNotZero,
    ChannelCountOutOfRange(i16),
    DimensionOutOfRange {
        field: &'static str,
        value: i32,
        max: i32,
    },
    BadDepth(i16),
    BadColorMode(i16),
    ColorModeDataMismatch {
        mode: ColorMode,
        length: i32,
    },
    NegativeLength {
        field: &'static str,
        value: i64,
    },
    BadResourceMagic(String),
    NonAsciiString(u8),
    BadBlendModeSignature(String),
    BadBlendMode(String),
    BadClipping(u8),
    BadMaskDefaultColor(u8),
    MaskSizeMismatch {
        declared: i32,
        computed: i32,
    },
    GlobalMaskTooShort(i32),
    BadGlobalMaskOpacity(i16),
    BadLayerMaskKind(u8),
    BadBlendingRangeLength(i32),
    BadInfoSignature(String),
    BadCompression(i16),
    ChannelDataTooShort(i64),
    ReadError(io::Error),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for FormatError {}

impl From<io::Error> for FormatError {
    fn from(e: io::Error) -> Self {
        FormatError::ReadError(e)
    }
}
