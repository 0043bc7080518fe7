//! Lazy reader for Photoshop PSD and PSB files.
//!
//! [`Psd::read`] parses the container structure of a document from any
//! `Read + Seek` source while leaving every encoded pixel region in place;
//! layers and the precomposed image carry placeholders recording compression
//! method and byte offset. [`codec::decode`] then expands a single region on
//! demand, with optional cooperative cancellation.

pub mod codec;
mod endian;
mod error;
pub mod io;
pub mod psd;

pub use codec::{CancelToken, Compression, DecodeError, DecodeParams};
pub use error::{PsdError, PsdResult};
pub use io::PartialStream;
pub use psd::{FormatError, Psd, PsdVersion};
