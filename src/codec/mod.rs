// https://www.adobe.com/devnet-apps/photoshop/fileformatashtml/#50577409_pgfId-1055097

use crate::endian::{read_bytes, Endian};
use crate::io::PartialStream;
use flate2::read::DeflateDecoder;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::{Read, Seek, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

mod delta;
mod error;
mod packbits;

pub use delta::{delta_decode, delta_decode_be16, delta_decode_be32};
pub use error::DecodeError;
pub use packbits::{unpack_bits, UnpackBits};

const CHUNK_SIZE: usize = 8192;

/// How a pixel data region is compressed. Unknown tags are rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
pub enum Compression {
    Raw = 0,
    PackBits = 1,
    Deflate = 2,
    /// Deflate over per-row delta-encoded samples.
    DeflatePrediction = 3,
}

/// Cooperative cancellation flag for pixel decoding, polled at least once per
/// scanline, row or chunk. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn check_cancel(cancel: Option<&CancelToken>) -> Result<(), DecodeError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(DecodeError::Cancelled),
        _ => Ok(()),
    }
}

/// Method parameters for [`decode`], one shape per compression method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeParams {
    /// Copy exactly `length` bytes, or to source exhaustion when `None`.
    Raw { length: Option<u64> },
    /// One length-table entry and one encoded run per scanline; entries are
    /// 32-bit for PSB files, 16-bit otherwise.
    PackBits {
        scanline_count: usize,
        wide_lengths: bool,
    },
    /// Inflate a region of `length` encoded bytes, or to end of stream.
    Deflate { length: Option<u64> },
    /// Like `Deflate`, with per-row delta prediction at depths 16 and 32.
    DeflatePredicted {
        length: Option<u64>,
        depth: u16,
        image_width: usize,
    },
}

/// Decodes one encoded pixel region from `stream` into `sink`. The stream
/// must already be positioned at the region's first byte. On cancellation or
/// error the sink is left partially written.
pub fn decode<R: Read + Seek, W: Write>(
    stream: &mut R,
    sink: &mut W,
    compression: Compression,
    params: DecodeParams,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    debug!("decoding {compression:?} region");
    match (compression, params) {
        (Compression::Raw, DecodeParams::Raw { length }) => {
            decode_raw(stream, sink, length, cancel)
        }
        (
            Compression::PackBits,
            DecodeParams::PackBits {
                scanline_count,
                wide_lengths,
            },
        ) => decode_packbits(stream, sink, scanline_count, wide_lengths, cancel),
        (Compression::Deflate, DecodeParams::Deflate { length }) => {
            decode_deflate(stream, sink, length, cancel)
        }
        (
            Compression::DeflatePrediction,
            DecodeParams::DeflatePredicted {
                length,
                depth,
                image_width,
            },
        ) => decode_deflate_predicted(stream, sink, length, depth, image_width, cancel),
        _ => Err(DecodeError::ParamsMismatch(compression)),
    }
}

/// Byte-for-byte copy. With a length, stops exactly there and fails on early
/// end; without one, copies until the source is exhausted.
pub fn decode_raw<R: Read, W: Write>(
    stream: &mut R,
    sink: &mut W,
    length: Option<u64>,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut copied: u64 = 0;
    loop {
        check_cancel(cancel)?;
        let want = match length {
            Some(target) => {
                if copied >= target {
                    break;
                }
                (target - copied).min(CHUNK_SIZE as u64) as usize
            }
            None => CHUNK_SIZE,
        };
        let read = stream.read(&mut buf[..want])?;
        if read == 0 {
            if length.is_some() {
                return Err(DecodeError::UnexpectedEndOfData);
            }
            break;
        }
        sink.write_all(&buf[..read])?;
        copied += read as u64;
    }
    Ok(())
}

/// Expands a PackBits region: a per-scanline length table followed by that
/// many encoded bytes per scanline, expanded one scanline at a time.
pub fn decode_packbits<R: Read, W: Write>(
    stream: &mut R,
    sink: &mut W,
    scanline_count: usize,
    wide_lengths: bool,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    let mut lengths = Vec::with_capacity(scanline_count);
    for _ in 0..scanline_count {
        let length = if wide_lengths {
            Endian::Big.read::<4, u32>(stream)? as usize
        } else {
            Endian::Big.read::<2, u16>(stream)? as usize
        };
        lengths.push(length);
    }

    let mut packed = vec![0u8; lengths.iter().copied().max().unwrap_or(0)];
    let mut expanded = vec![];
    for &length in &lengths {
        check_cancel(cancel)?;
        stream.read_exact(&mut packed[..length])?;
        expanded.clear();
        for byte in UnpackBits::new(packed[..length].iter().copied()) {
            expanded.push(byte?);
        }
        sink.write_all(&expanded)?;
    }
    Ok(())
}

/// Inflates a Deflate region. The leading 2-byte zlib header is skipped
/// unvalidated; with a length the source is bounded to that many bytes.
pub fn decode_deflate<R: Read + Seek, W: Write>(
    stream: &mut R,
    sink: &mut W,
    length: Option<u64>,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    match length {
        Some(length) => {
            let start = stream.stream_position().map_err(DecodeError::IoError)?;
            let mut bounded = PartialStream::new(&mut *stream, start, length)?;
            read_bytes(&mut bounded, 2)?; // zlib header
            inflate(&mut bounded, sink, cancel)
        }
        None => {
            read_bytes(stream, 2)?; // zlib header
            inflate(stream, sink, cancel)
        }
    }
}

fn inflate<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    let mut decoder = DeflateDecoder::new(source);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        check_cancel(cancel)?;
        let read = decoder.read(&mut buf)?;
        if read == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..read])?;
    }
}

/// Inflates a delta-predicted Deflate region. Depths 1 and 8 carry no
/// prediction and decode as plain Deflate; depths 16 and 32 are inflated one
/// row at a time, delta-decoded in place, and emitted. End of stream is
/// normal termination.
pub fn decode_deflate_predicted<R: Read + Seek, W: Write>(
    stream: &mut R,
    sink: &mut W,
    length: Option<u64>,
    depth: u16,
    image_width: usize,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    if depth == 1 || depth == 8 {
        return decode_deflate(stream, sink, length, cancel);
    }
    if depth != 16 && depth != 32 {
        return Err(DecodeError::UnsupportedDepth(depth));
    }
    if image_width == 0 {
        return Err(DecodeError::ZeroImageWidth);
    }

    let row_length = image_width * (depth as usize / 8);
    match length {
        Some(length) => {
            let start = stream.stream_position().map_err(DecodeError::IoError)?;
            let mut bounded = PartialStream::new(&mut *stream, start, length)?;
            read_bytes(&mut bounded, 2)?;
            inflate_predicted_rows(&mut bounded, sink, depth, row_length, cancel)
        }
        None => {
            read_bytes(stream, 2)?;
            inflate_predicted_rows(stream, sink, depth, row_length, cancel)
        }
    }
}

fn inflate_predicted_rows<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    depth: u16,
    row_length: usize,
    cancel: Option<&CancelToken>,
) -> Result<(), DecodeError> {
    let mut decoder = DeflateDecoder::new(source);
    let mut row = vec![0u8; row_length];
    loop {
        check_cancel(cancel)?;
        if !read_full_row(&mut decoder, &mut row)? {
            return Ok(());
        }
        match depth {
            16 => delta_decode_be16(&mut row)?,
            _ => delta_decode_be32(&mut row)?,
        }
        sink.write_all(&row)?;
    }
}

/// Fills `row` from `source`. Returns false once the stream ends; a partial
/// trailing row also terminates decoding.
fn read_full_row<R: Read>(source: &mut R, row: &mut [u8]) -> Result<bool, DecodeError> {
    let mut filled = 0;
    while filled < row.len() {
        let read = source.read(&mut row[filled..])?;
        if read == 0 {
            return Ok(false);
        }
        filled += read;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression as Flate2Level;
    use std::io::Cursor;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(vec![], Flate2Level::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn raw_copy_bounded() {
        let mut stream = Cursor::new(vec![1, 2, 3, 4, 5]);
        let mut sink = vec![];
        decode_raw(&mut stream, &mut sink, Some(3), None).unwrap();
        assert_eq!(sink, vec![1, 2, 3]);
    }

    #[test]
    fn raw_copy_unbounded_runs_to_exhaustion() {
        let mut stream = Cursor::new(vec![1, 2, 3]);
        let mut sink = vec![];
        decode_raw(&mut stream, &mut sink, None, None).unwrap();
        assert_eq!(sink, vec![1, 2, 3]);
    }

    #[test]
    fn raw_copy_short_source_fails() {
        let mut stream = Cursor::new(vec![1, 2]);
        let mut sink = vec![];
        assert!(matches!(
            decode_raw(&mut stream, &mut sink, Some(5), None),
            Err(DecodeError::UnexpectedEndOfData)
        ));
    }

    #[test]
    fn packbits_region() {
        // two scanlines: a literal run and a repeat run
        let mut bytes = vec![];
        bytes.extend_from_slice(&4u16.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&[0x02, 0xAA, 0xBB, 0xCC]);
        bytes.extend_from_slice(&[0xFE, 0x11]);
        let mut stream = Cursor::new(bytes);
        let mut sink = vec![];
        decode_packbits(&mut stream, &mut sink, 2, false, None).unwrap();
        assert_eq!(sink, vec![0xAA, 0xBB, 0xCC, 0x11, 0x11, 0x11]);
    }

    #[test]
    fn packbits_wide_length_table() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&[0xFF, 0x42]); // 2x 0x42
        let mut stream = Cursor::new(bytes);
        let mut sink = vec![];
        decode_packbits(&mut stream, &mut sink, 1, true, None).unwrap();
        assert_eq!(sink, vec![0x42, 0x42]);
    }

    #[test]
    fn deflate_bounded_region() {
        let payload = b"the quick brown fox jumps over the lazy dog".to_vec();
        let mut encoded = zlib_compress(&payload);
        let encoded_length = encoded.len() as u64;
        encoded.extend_from_slice(b"trailing bytes that must stay unread");
        let mut stream = Cursor::new(encoded);
        let mut sink = vec![];
        decode_deflate(&mut stream, &mut sink, Some(encoded_length), None).unwrap();
        assert_eq!(sink, payload);
    }

    #[test]
    fn deflate_unbounded_region() {
        let payload = vec![7u8; 1000];
        let mut stream = Cursor::new(zlib_compress(&payload));
        let mut sink = vec![];
        decode_deflate(&mut stream, &mut sink, None, None).unwrap();
        assert_eq!(sink, payload);
    }

    #[test]
    fn predicted_deflate_restores_rows() {
        // two rows of 4 16-bit samples, delta-encoded per row
        let rows: [[u16; 4]; 2] = [[100, 101, 102, 103], [65535, 1, 1, 1]];
        let mut plain = vec![];
        for row in rows {
            let mut previous = 0u16;
            for (i, sample) in row.into_iter().enumerate() {
                let stored = if i == 0 {
                    sample
                } else {
                    sample.wrapping_sub(previous)
                };
                plain.extend_from_slice(&stored.to_be_bytes());
                previous = sample;
            }
        }
        let mut stream = Cursor::new(zlib_compress(&plain));
        let mut sink = vec![];
        decode_deflate_predicted(&mut stream, &mut sink, None, 16, 4, None).unwrap();

        let decoded: Vec<u16> = sink
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(decoded, vec![100, 101, 102, 103, 65535, 0, 1, 2]);
    }

    #[test]
    fn predicted_deflate_at_depth_8_is_plain_deflate() {
        let payload = vec![1u8, 2, 3, 4];
        let mut stream = Cursor::new(zlib_compress(&payload));
        let mut sink = vec![];
        decode_deflate_predicted(&mut stream, &mut sink, None, 8, 4, None).unwrap();
        assert_eq!(sink, payload);
    }

    #[test]
    fn cancelled_token_aborts() {
        let token = CancelToken::new();
        token.cancel();
        let mut stream = Cursor::new(vec![0u8; 64]);
        let mut sink = vec![];
        assert!(matches!(
            decode_raw(&mut stream, &mut sink, None, Some(&token)),
            Err(DecodeError::Cancelled)
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn dispatch_rejects_mismatched_params() {
        let mut stream = Cursor::new(vec![]);
        let mut sink = vec![];
        assert!(matches!(
            decode(
                &mut stream,
                &mut sink,
                Compression::Raw,
                DecodeParams::Deflate { length: None },
                None,
            ),
            Err(DecodeError::ParamsMismatch(Compression::Raw))
        ));
    }

    #[test]
    fn dispatch_routes_raw() {
        let mut stream = Cursor::new(vec![9, 8, 7]);
        let mut sink = vec![];
        decode(
            &mut stream,
            &mut sink,
            Compression::Raw,
            DecodeParams::Raw { length: Some(2) },
            None,
        )
        .unwrap();
        assert_eq!(sink, vec![9, 8]);
    }
}
