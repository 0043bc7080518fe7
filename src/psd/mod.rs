use crate::codec::Compression;
use crate::endian::{read_bytes, read_fourcc, read_u8, Endian};
use std::fmt::Display;
use std::io::{self, Read, Seek};
use tracing::debug;

mod blend;
mod color;
mod error;
mod layer;
mod mask;
mod resource;

pub use blend::BlendMode;
pub use color::ColorMode;
pub use error::FormatError;
pub use layer::{
    AdditionalLayerInfo, BlendingRange, ChannelDataPlaceholder, Layer, LayerChannel,
};
pub use mask::{GlobalLayerMask, LayerMask, LayerMaskKind};
pub use resource::ImageResource;

const MAGIC: [u8; 4] = *b"8BPS";
const MIN_CHANNELS: i16 = 1;
const MAX_CHANNELS: i16 = 56;

/// The file variant. PSB widens the length fields of several sections and
/// raises the dimension limit.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum PsdVersion {
    Psd,
    Psb,
}

impl PsdVersion {
    /// Reads a section length: 64-bit for PSB, 32-bit for PSD.
    pub(crate) fn read_length<R: Read>(&self, stream: &mut R) -> io::Result<i64> {
        match self {
            PsdVersion::Psd => Endian::Big.read::<4, i32>(stream).map(|v| v as i64),
            PsdVersion::Psb => Endian::Big.read(stream),
        }
    }

    pub const fn max_dimension(&self) -> i32 {
        match self {
            PsdVersion::Psd => 30_000,
            PsdVersion::Psb => 300_000,
        }
    }

    /// The version number as stored in the header.
    pub const fn number(&self) -> i16 {
        match self {
            PsdVersion::Psd => 1,
            PsdVersion::Psb => 2,
        }
    }
}

/// Where the precomposed (merged) image's encoded bytes begin. The bytes are
/// never read during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDataPlaceholder {
    pub compression: Compression,
    /// Absolute stream position of the first encoded byte.
    pub offset: u64,
}

/// A parsed PSD/PSB document. Pixel data stays in the source stream; layers
/// and the precomposed image carry placeholders describing where to find it.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    pub version: PsdVersion,
    /// 1 to 56.
    pub channel_count: i16,
    pub width: i32,
    pub height: i32,
    /// Bits per channel sample: 1, 8, 16 or 32.
    pub depth: i16,
    pub color_mode: ColorMode,
    /// Palette or duotone payload; empty for modes that carry none.
    pub color_mode_data: Vec<u8>,
    pub image_resources: Vec<ImageResource>,
    pub layers: Vec<Layer>,
    pub global_layer_mask: Option<GlobalLayerMask>,
    pub additional_info: Vec<AdditionalLayerInfo>,
    /// The layer count was stored negative: the first alpha channel of the
    /// merged result carries transparency.
    pub merged_alpha_is_transparency: bool,
    pub precomposed_image: ImageDataPlaceholder,
}

impl Psd {
    /// Parses a document from a seekable stream, failing at the first
    /// violated structural rule. Encoded pixel regions are seeked past, never
    /// read, so memory use is bounded by structural bytes only.
    pub fn read<R: Read + Seek>(stream: &mut R) -> Result<Self, FormatError> {
        let header = read_header(stream)?;
        debug!(
            "header: {}x{}, {} channels, {}-bit, {:?}",
            header.width, header.height, header.channel_count, header.depth, header.color_mode
        );

        let color_mode_data = read_color_mode_data(stream, header.color_mode)?;
        let image_resources = resource::read_image_resources(stream)?;
        let layer_info = layer::read_layer_and_mask_info(stream, header.version)?;

        // precomposed image: compression tag only, bytes stay in the stream
        let compression = read_compression_tag(stream)?;
        let precomposed_image = ImageDataPlaceholder {
            compression,
            offset: stream.stream_position()?,
        };

        Ok(Self {
            version: header.version,
            channel_count: header.channel_count,
            width: header.width,
            height: header.height,
            depth: header.depth,
            color_mode: header.color_mode,
            color_mode_data,
            image_resources,
            layers: layer_info.layers,
            global_layer_mask: layer_info.global_mask,
            additional_info: layer_info.additional_info,
            merged_alpha_is_transparency: layer_info.merged_alpha_is_transparency,
            precomposed_image,
        })
    }
}

impl Display for Psd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Psd(v{}, {}x{}, {} channels, {}-bit, {:?}, {} layers)",
            self.version.number(),
            self.width,
            self.height,
            self.channel_count,
            self.depth,
            self.color_mode,
            self.layers.len()
        )
    }
}

struct Header {
    version: PsdVersion,
    channel_count: i16,
    width: i32,
    height: i32,
    depth: i16,
    color_mode: ColorMode,
}

fn read_header<R: Read>(stream: &mut R) -> Result<Header, FormatError> {
    let magic = read_fourcc(stream)?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic(tag_string(magic)));
    }

    let version = match Endian::Big.read::<2, i16>(stream)? {
        1 => PsdVersion::Psd,
        2 => PsdVersion::Psb,
        other => return Err(FormatError::BadVersion(other)),
    };

    let reserved = read_bytes(stream, 6)?;
    if reserved.iter().any(|&b| b != 0x00) {
        return Err(FormatError::ReservedNotZero);
    }

    let channel_count: i16 = Endian::Big.read(stream)?;
    if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&channel_count) {
        return Err(FormatError::ChannelCountOutOfRange(channel_count));
    }

    let height: i32 = Endian::Big.read(stream)?;
    if height < 1 || height > version.max_dimension() {
        return Err(FormatError::DimensionOutOfRange {
            field: "height",
            value: height,
            max: version.max_dimension(),
        });
    }

    let width: i32 = Endian::Big.read(stream)?;
    if width < 1 || width > version.max_dimension() {
        return Err(FormatError::DimensionOutOfRange {
            field: "width",
            value: width,
            max: version.max_dimension(),
        });
    }

    let depth: i16 = Endian::Big.read(stream)?;
    if ![1, 8, 16, 32].contains(&depth) {
        return Err(FormatError::BadDepth(depth));
    }

    let mode_value: i16 = Endian::Big.read(stream)?;
    let color_mode =
        ColorMode::try_from(mode_value).map_err(|_| FormatError::BadColorMode(mode_value))?;

    Ok(Header {
        version,
        channel_count,
        width,
        height,
        depth,
        color_mode,
    })
}

/// Reads the color mode data section. Its presence must match the color
/// mode: Indexed and Duotone require a payload, every other mode forbids one.
fn read_color_mode_data<R: Read>(
    stream: &mut R,
    color_mode: ColorMode,
) -> Result<Vec<u8>, FormatError> {
    let length: i32 = Endian::Big.read(stream)?;
    if length < 0 {
        return Err(FormatError::NegativeLength {
            field: "color mode data length",
            value: length as i64,
        });
    }
    if (length > 0) != color_mode.requires_mode_data() {
        return Err(FormatError::ColorModeDataMismatch {
            mode: color_mode,
            length,
        });
    }
    Ok(read_bytes(stream, length as usize)?)
}

pub(crate) fn read_compression_tag<R: Read>(stream: &mut R) -> Result<Compression, FormatError> {
    let value: i16 = Endian::Big.read(stream)?;
    Compression::try_from(value).map_err(|_| FormatError::BadCompression(value))
}

pub(crate) fn tag_string(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

/// Reads an ASCII string of exactly `byte_count` bytes.
pub(crate) fn read_ascii_string<R: Read>(
    stream: &mut R,
    byte_count: usize,
) -> Result<String, FormatError> {
    let bytes = read_bytes(stream, byte_count)?;
    if let Some(&bad) = bytes.iter().find(|&&b| b > 0x7F) {
        return Err(FormatError::NonAsciiString(bad));
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

/// Reads a Pascal string whose total size (length byte included) is padded to
/// an even byte count.
pub(crate) fn read_pascal_string_even<R: Read>(stream: &mut R) -> Result<String, FormatError> {
    let length = read_u8(stream)? as usize;
    let value = read_ascii_string(stream, length)?;
    if length % 2 == 0 {
        // length byte plus an even count is odd; one padding byte follows
        read_u8(stream)?;
    }
    Ok(value)
}

/// Reads a layer name: a Pascal string padded so the length byte plus content
/// is a multiple of 4. The encoding is undefined by the format; bytes are
/// mapped as Latin-1.
pub(crate) fn read_layer_name<R: Read>(stream: &mut R) -> Result<String, FormatError> {
    let length = read_u8(stream)? as usize;
    let bytes = read_bytes(stream, length)?;
    let pad = 4 - ((length + 1) % 4);
    if pad != 4 {
        read_bytes(stream, pad)?;
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}
