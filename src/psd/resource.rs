use crate::endian::{read_bytes, read_fourcc, read_u8, Endian};
use crate::psd::{tag_string, FormatError};
use std::io::{Read, Seek};

const RESOURCE_MAGIC: &[u8; 4] = b"8BIM";

/// One image resource block, mostly document metadata. The payload is kept
/// opaque; the trailing even-length padding byte is not part of `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    pub id: i16,
    pub name: String,
    pub data: Vec<u8>,
}

impl ImageResource {
    fn read_block<R: Read>(stream: &mut R) -> Result<Self, FormatError> {
        let magic = read_fourcc(stream)?;
        if &magic != RESOURCE_MAGIC {
            return Err(FormatError::BadResourceMagic(tag_string(magic)));
        }

        let id: i16 = Endian::Big.read(stream)?;
        let name = super::read_pascal_string_even(stream)?;

        let data_length: i32 = Endian::Big.read(stream)?;
        if data_length < 0 {
            return Err(FormatError::NegativeLength {
                field: "image resource data length",
                value: data_length as i64,
            });
        }

        let data = read_bytes(stream, data_length as usize)?;
        if data_length % 2 == 1 {
            // payloads are padded to even sizes
            read_u8(stream)?;
        }

        Ok(Self { id, name, data })
    }
}

/// Reads the image resource section: a 32-bit section length followed by
/// resource blocks packed up to exactly that boundary.
pub(crate) fn read_image_resources<R: Read + Seek>(
    stream: &mut R,
) -> Result<Vec<ImageResource>, FormatError> {
    let section_length: i32 = Endian::Big.read(stream)?;
    if section_length < 0 {
        return Err(FormatError::NegativeLength {
            field: "image resource section length",
            value: section_length as i64,
        });
    }

    let end = stream.stream_position()? + section_length as u64;
    let mut resources = vec![];
    while stream.stream_position()? < end {
        resources.push(ImageResource::read_block(stream)?);
    }
    Ok(resources)
}
