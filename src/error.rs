use crate::codec::DecodeError;
use crate::psd::FormatError;
use std::fmt;
use std::io;

pub type PsdResult<T> = Result<T, PsdError>;

#[derive(Debug)]
pub enum PsdError {
    Format(FormatError),
    Decode(DecodeError),
    ReadError(io::Error),
}

impl fmt::Display for PsdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for PsdError {}

impl From<FormatError> for PsdError {
    fn from(e: FormatError) -> Self {
        match e {
            FormatError::ReadError(io) => PsdError::ReadError(io),
            other => PsdError::Format(other),
        }
    }
}

impl From<DecodeError> for PsdError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::IoError(io) => PsdError::ReadError(io),
            other => PsdError::Decode(other),
        }
    }
}

impl From<io::Error> for PsdError {
    fn from(e: io::Error) -> Self {
        PsdError::ReadError(e)
    }
}
