use super::DecodeError;
use eio::{FromBytes, ToBytes};
use num_traits::WrappingAdd;

/// Reverses per-sample delta encoding in place over consecutive big-endian
/// samples of `N` bytes. The first sample is already absolute; every later
/// sample is the wrapping sum of its stored delta and the previously decoded
/// sample. An empty buffer is a no-op.
pub fn delta_decode<const N: usize, T>(bytes: &mut [u8]) -> Result<(), DecodeError>
where
    T: FromBytes<N> + ToBytes<N> + WrappingAdd + Copy,
{
    if bytes.len() % N != 0 {
        return Err(DecodeError::UnevenBuffer {
            length: bytes.len(),
            sample_size: N,
        });
    }

    let mut chunks = bytes.chunks_exact_mut(N);
    let mut previous: T = match chunks.next() {
        Some(first) => decode_sample(first),
        None => return Ok(()),
    };
    for chunk in chunks {
        let current = decode_sample::<N, T>(chunk).wrapping_add(&previous);
        chunk.copy_from_slice(&current.to_be_bytes());
        previous = current;
    }
    Ok(())
}

fn decode_sample<const N: usize, T: FromBytes<N>>(chunk: &[u8]) -> T {
    let mut sample = [0u8; N];
    sample.copy_from_slice(chunk);
    T::from_be_bytes(sample)
}

/// Delta-decodes big-endian 16-bit samples in place.
pub fn delta_decode_be16(bytes: &mut [u8]) -> Result<(), DecodeError> {
    delta_decode::<2, u16>(bytes)
}

/// Delta-decodes big-endian 32-bit samples in place.
pub fn delta_decode_be32(bytes: &mut [u8]) -> Result<(), DecodeError> {
    delta_decode::<4, u32>(bytes)
}
