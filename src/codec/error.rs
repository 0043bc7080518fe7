use std::fmt;
use std::io;

/// A pixel-stream decoding failure. Decoding stops at the first failure and
/// the destination sink must be treated as unusable.
#[derive(Debug)]
pub enum DecodeError {
    /// Input ended inside a PackBits literal run.
    TruncatedLiteralRun { expected: usize },
    /// A PackBits repeat control byte had no byte to repeat.
    TruncatedRepeatRun { count: usize },
    /// Delta buffer length is not a multiple of the sample width.
    UnevenBuffer { length: usize, sample_size: usize },
    /// Source ended before a length-bounded copy completed.
    UnexpectedEndOfData,
    /// Parameters do not fit the compression method.
    ParamsMismatch(crate::codec::Compression),
    /// Prediction applies to 16- and 32-bit samples only.
    UnsupportedDepth(u16),
    /// A zero-width image has no rows to predict over.
    ZeroImageWidth,
    Cancelled,
    IoError(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::IoError(e)
    }
}
