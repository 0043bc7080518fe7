use crate::codec::Compression;
use crate::endian::{read_bytes, read_fourcc, read_u8, Endian};
use crate::psd::mask::{self, GlobalLayerMask, LayerMask};
use crate::psd::{read_compression_tag, read_layer_name, tag_string, FormatError, PsdVersion};
use crate::psd::blend::BlendMode;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

const INFO_SIGNATURES: [[u8; 4]; 2] = [*b"8BIM", *b"8B64"];
const BLEND_SIGNATURE: [u8; 4] = *b"8BIM";

/// Keys whose payload is a whole layer-information section shunted out of its
/// usual place, not an opaque block.
const SHUNTED_LAYER_INFO_KEYS: [[u8; 4]; 3] = [*b"Layr", *b"Lr16", *b"Lr32"];

/// The keys that carry 64-bit payload lengths in PSB files.
const WIDE_LENGTH_KEYS: [[u8; 4]; 10] = [
    *b"LMsk", *b"Mt16", *b"Mt32", *b"Mtrn", *b"Alph", *b"FMsk", *b"Ink2", *b"FEid", *b"FXid",
    *b"PxSD",
];

/// Where a channel's encoded pixel bytes live in the stream. The bytes
/// themselves are never read during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDataPlaceholder {
    pub compression: Compression,
    /// Absolute stream position of the first encoded byte (after the
    /// compression tag).
    pub offset: u64,
    /// Encoded length, excluding the 2-byte compression tag.
    pub data_length: u64,
}

/// A constituent channel of a layer. Negative IDs follow the alpha/mask
/// convention (-1 alpha, -2 user mask, -3 real user mask).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerChannel {
    pub id: i16,
    pub data: ChannelDataPlaceholder,
}

/// One source/destination blending range entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendingRange {
    pub source_low: [u8; 2],
    pub source_high: [u8; 2],
    pub destination_low: [u8; 2],
    pub destination_high: [u8; 2],
}

/// An opaque key-tagged additional-information block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalLayerInfo {
    pub key: String,
    pub data: Vec<u8>,
}

/// One layer of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer rectangle, as offsets from the image edges.
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub channels: Vec<LayerChannel>,
    pub blend_mode: BlendMode,
    /// 0 (fully transparent) to 255 (fully opaque).
    pub opacity: u8,
    pub non_base_clipping: bool,
    pub transparency_protected: bool,
    pub visible: bool,
    pub obsolete: bool,
    /// Both flag bits 3 and 4 set: the stored pixels do not affect the
    /// document's appearance.
    pub pixel_data_irrelevant: bool,
    pub layer_mask: Option<LayerMask>,
    pub blending_ranges: Vec<BlendingRange>,
    /// The legacy layer name; its encoding is not defined by the format.
    pub name: String,
    pub additional_info: Vec<AdditionalLayerInfo>,
}

/// Everything the layer-and-mask section contributes to the document.
#[derive(Debug, Default)]
pub(crate) struct LayerAndMaskInfo {
    pub layers: Vec<Layer>,
    pub global_mask: Option<GlobalLayerMask>,
    pub additional_info: Vec<AdditionalLayerInfo>,
    /// Set when the layer count was negative: the first alpha channel of the
    /// merged result carries transparency.
    pub merged_alpha_is_transparency: bool,
}

/// Outcome of parsing one additional-information block: either a normal
/// entry, or a shunted layer-information section already merged into the
/// in-progress document.
pub(crate) enum InfoBlock {
    Entry(AdditionalLayerInfo),
    MergedLayerInfo,
}

/// A parsed layer record, before channel data placeholders are known. The
/// per-channel compression tags and offsets follow all records in the stream,
/// so channels are described here as (id, declared length) and resolved in a
/// second pass.
struct LayerRecord {
    top: i32,
    left: i32,
    bottom: i32,
    right: i32,
    channels: Vec<(i16, i64)>,
    blend_mode: BlendMode,
    opacity: u8,
    non_base_clipping: bool,
    transparency_protected: bool,
    visible: bool,
    obsolete: bool,
    pixel_data_irrelevant: bool,
    layer_mask: Option<LayerMask>,
    blending_ranges: Vec<BlendingRange>,
    name: String,
    additional_info: Vec<AdditionalLayerInfo>,
}

impl LayerRecord {
    fn into_layer(self, channels: Vec<LayerChannel>) -> Layer {
        Layer {
            top: self.top,
            left: self.left,
            bottom: self.bottom,
            right: self.right,
            channels,
            blend_mode: self.blend_mode,
            opacity: self.opacity,
            non_base_clipping: self.non_base_clipping,
            transparency_protected: self.transparency_protected,
            visible: self.visible,
            obsolete: self.obsolete,
            pixel_data_irrelevant: self.pixel_data_irrelevant,
            layer_mask: self.layer_mask,
            blending_ranges: self.blending_ranges,
            name: self.name,
            additional_info: self.additional_info,
        }
    }
}

/// Reads the whole layer-and-mask information section: layer information,
/// global mask information, then additional-information blocks until the
/// declared outer length is exhausted.
pub(crate) fn read_layer_and_mask_info<R: Read + Seek>(
    stream: &mut R,
    version: PsdVersion,
) -> Result<LayerAndMaskInfo, FormatError> {
    let section_length = version.read_length(stream)?;
    if section_length < 0 {
        return Err(FormatError::NegativeLength {
            field: "layer and mask information length",
            value: section_length,
        });
    }

    let mut info = LayerAndMaskInfo::default();
    if section_length == 0 {
        return Ok(info);
    }
    let start = stream.stream_position()?;
    debug!("layer and mask information: {section_length} bytes");

    read_layer_information(stream, version, &mut info, false)?;
    info.global_mask = mask::read_global_mask_info(stream)?;

    while stream.stream_position()?.saturating_sub(start) < section_length as u64 {
        if let InfoBlock::Entry(entry) = read_additional_info(stream, version, &mut info)? {
            info.additional_info.push(entry);
        }
    }

    Ok(info)
}

/// Reads a layer-information section into `info`. `round_to_four` applies on
/// the shunted path, where blocks are padded to a multiple of 4 bytes.
pub(crate) fn read_layer_information<R: Read + Seek>(
    stream: &mut R,
    version: PsdVersion,
    info: &mut LayerAndMaskInfo,
    round_to_four: bool,
) -> Result<(), FormatError> {
    let info_length = version.read_length(stream)?;
    if info_length < 0 {
        return Err(FormatError::NegativeLength {
            field: "layer information length",
            value: info_length,
        });
    }
    if info_length == 0 {
        // no layers at all
        info.layers = vec![];
        return Ok(());
    }
    let info_start = stream.stream_position()?;

    let mut layer_count: i16 = Endian::Big.read(stream)?;
    if layer_count < 0 {
        layer_count = -layer_count;
        info.merged_alpha_is_transparency = true;
    }
    debug!("layer information: {layer_count} layers in {info_length} bytes");

    let mut records = Vec::with_capacity(layer_count as usize);
    for _ in 0..layer_count {
        records.push(read_layer_record(stream, version, info)?);
    }

    // channel pixel data follows all the records; record where each channel's
    // bytes live and seek past them unread
    let mut layers = Vec::with_capacity(records.len());
    for record in records {
        let mut channels = Vec::with_capacity(record.channels.len());
        for &(id, declared_length) in &record.channels {
            if declared_length < 2 {
                return Err(FormatError::ChannelDataTooShort(declared_length));
            }
            let compression = read_compression_tag(stream)?;
            let data_length = (declared_length - 2) as u64;
            channels.push(LayerChannel {
                id,
                data: ChannelDataPlaceholder {
                    compression,
                    offset: stream.stream_position()?,
                    data_length,
                },
            });
            stream.seek(SeekFrom::Current(data_length as i64))?;
        }
        layers.push(record.into_layer(channels));
    }
    info.layers = layers;

    // skip padding up to the declared length
    let end = info_start + info_length as u64;
    if stream.stream_position()? < end {
        stream.seek(SeekFrom::Start(end))?;
    }

    // Adobe's documentation says blocks round to an even byte count; files in
    // the wild round to 4 on this path
    if round_to_four && info_length % 4 != 0 {
        read_bytes(stream, (4 - (info_length % 4)) as usize)?;
    }

    Ok(())
}

fn read_layer_record<R: Read + Seek>(
    stream: &mut R,
    version: PsdVersion,
    info: &mut LayerAndMaskInfo,
) -> Result<LayerRecord, FormatError> {
    let top: i32 = Endian::Big.read(stream)?;
    let left: i32 = Endian::Big.read(stream)?;
    let bottom: i32 = Endian::Big.read(stream)?;
    let right: i32 = Endian::Big.read(stream)?;

    let channel_count: i16 = Endian::Big.read(stream)?;
    if channel_count < 0 {
        return Err(FormatError::NegativeLength {
            field: "layer channel count",
            value: channel_count as i64,
        });
    }
    let mut channels = Vec::with_capacity(channel_count as usize);
    for _ in 0..channel_count {
        let id: i16 = Endian::Big.read(stream)?;
        let declared_length = version.read_length(stream)?;
        channels.push((id, declared_length));
    }

    let signature = read_fourcc(stream)?;
    if signature != BLEND_SIGNATURE {
        return Err(FormatError::BadBlendModeSignature(tag_string(signature)));
    }
    let blend_value: u32 = Endian::Big.read(stream)?;
    let blend_mode = BlendMode::try_from(blend_value)
        .map_err(|_| FormatError::BadBlendMode(tag_string(blend_value.to_be_bytes())))?;

    let opacity = read_u8(stream)?;

    let clipping = read_u8(stream)?;
    if clipping > 1 {
        return Err(FormatError::BadClipping(clipping));
    }

    let flags = read_u8(stream)?;
    let _filler = read_u8(stream)?;

    let extra_length: i32 = Endian::Big.read(stream)?;
    if extra_length < 0 {
        return Err(FormatError::NegativeLength {
            field: "layer extra data length",
            value: extra_length as i64,
        });
    }
    let extra_start = stream.stream_position()?;

    let layer_mask = mask::read_layer_mask(stream)?;
    let blending_ranges = read_blending_ranges(stream)?;
    let name = read_layer_name(stream)?;

    let mut additional_info = vec![];
    while stream.stream_position()? < extra_start + extra_length as u64 {
        if let InfoBlock::Entry(entry) = read_additional_info(stream, version, info)? {
            additional_info.push(entry);
        }
    }

    Ok(LayerRecord {
        top,
        left,
        bottom,
        right,
        channels,
        blend_mode,
        opacity,
        non_base_clipping: clipping == 1,
        transparency_protected: (flags & 0x01) != 0,
        visible: (flags & 0x02) != 0,
        obsolete: (flags & 0x04) != 0,
        pixel_data_irrelevant: (flags & 0x18) == 0x18,
        layer_mask,
        blending_ranges,
        name,
        additional_info,
    })
}

fn read_blending_ranges<R: Read>(stream: &mut R) -> Result<Vec<BlendingRange>, FormatError> {
    let length: i32 = Endian::Big.read(stream)?;
    if length < 0 || length % 8 != 0 {
        return Err(FormatError::BadBlendingRangeLength(length));
    }

    let count = (length / 8) as usize;
    let mut ranges = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = read_bytes(stream, 8)?;
        ranges.push(BlendingRange {
            source_low: [bytes[0], bytes[1]],
            source_high: [bytes[2], bytes[3]],
            destination_low: [bytes[4], bytes[5]],
            destination_high: [bytes[6], bytes[7]],
        });
    }
    Ok(ranges)
}

/// Reads one additional-information block. Shunted layer-information keys are
/// merged into `info` and yield no entry.
pub(crate) fn read_additional_info<R: Read + Seek>(
    stream: &mut R,
    version: PsdVersion,
    info: &mut LayerAndMaskInfo,
) -> Result<InfoBlock, FormatError> {
    let signature = read_fourcc(stream)?;
    if !INFO_SIGNATURES.contains(&signature) {
        return Err(FormatError::BadInfoSignature(tag_string(signature)));
    }

    let key = read_fourcc(stream)?;
    if SHUNTED_LAYER_INFO_KEYS.contains(&key) {
        read_layer_information(stream, version, info, true)?;
        return Ok(InfoBlock::MergedLayerInfo);
    }

    let wide = version == PsdVersion::Psb && WIDE_LENGTH_KEYS.contains(&key);
    let length = if wide {
        Endian::Big.read::<8, i64>(stream)?
    } else {
        Endian::Big.read::<4, i32>(stream)? as i64
    };
    if length < 0 {
        return Err(FormatError::NegativeLength {
            field: "additional layer information length",
            value: length,
        });
    }

    let data = read_bytes(stream, length as usize)?;

    // payloads round to a multiple of 4, despite what Adobe's documentation
    // says about even byte counts
    if length % 4 != 0 {
        read_bytes(stream, (4 - (length % 4)) as usize)?;
    }

    Ok(InfoBlock::Entry(AdditionalLayerInfo {
        key: tag_string(key),
        data,
    }))
}
