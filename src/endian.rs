use eio::FromBytes;
use std::io::{self, Read};

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn read<const N: usize, T: FromBytes<N>>(&self, stream: &mut impl Read) -> io::Result<T> {
        let mut buf = [0u8; N];
        stream.read_exact(&mut buf)?;
        self.decode(buf)
    }

    pub fn decode<const N: usize, T: FromBytes<N>>(&self, bytes: [u8; N]) -> io::Result<T> {
        use eio::ReadExt;
        match self {
            Endian::Big => bytes.as_slice().read_be(),
            Endian::Little => bytes.as_slice().read_le(),
        }
    }
}

pub fn read_u8<R: Read>(stream: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    stream.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_fourcc<R: Read>(stream: &mut R) -> io::Result<[u8; 4]> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Exact-count read. Fails with `UnexpectedEof` on a short read.
pub fn read_bytes<R: Read>(stream: &mut R, count: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}
