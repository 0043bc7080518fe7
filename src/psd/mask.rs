use crate::endian::{read_bytes, read_u8, Endian};
use crate::psd::FormatError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::Read;

/// The kind of the global layer mask. Almost universally `UsePerLayerValue`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LayerMaskKind {
    ColorSelected = 0,
    ColorProtected = 1,
    UsePerLayerValue = 128,
}

/// The mask attached to a single layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMask {
    /// Mask rectangle, as offsets from the image edges.
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    /// Either 0 or 255.
    pub default_color: u8,
    pub position_relative_to_layer: bool,
    pub disabled: bool,
    /// Should be false in newer files.
    pub invert_when_blending: bool,
    /// The user mask actually originates from rendering other data.
    pub from_other_data: bool,
    pub user_mask_density: Option<u8>,
    pub user_mask_feather: Option<f64>,
    pub vector_mask_density: Option<u8>,
    pub vector_mask_feather: Option<f64>,
}

/// Document-wide mask overlay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalLayerMask {
    pub overlay_color_space: i16,
    pub color_components: [i16; 4],
    /// 0 (transparent) to 100 (opaque).
    pub opacity: i16,
    pub kind: LayerMaskKind,
}

/// Reads a layer mask block. A declared length of zero means no mask.
pub(crate) fn read_layer_mask<R: Read>(stream: &mut R) -> Result<Option<LayerMask>, FormatError> {
    let mask_size: i32 = Endian::Big.read(stream)?;
    if mask_size == 0 {
        return Ok(None);
    }

    let top: i32 = Endian::Big.read(stream)?;
    let left: i32 = Endian::Big.read(stream)?;
    let bottom: i32 = Endian::Big.read(stream)?;
    let right: i32 = Endian::Big.read(stream)?;

    let default_color = read_u8(stream)?;
    if default_color != 0 && default_color != 255 {
        return Err(FormatError::BadMaskDefaultColor(default_color));
    }

    let flags = read_u8(stream)?;
    let has_parameters = (flags & 0x10) == 0x10;

    let mut mask = LayerMask {
        top,
        left,
        bottom,
        right,
        default_color,
        position_relative_to_layer: (flags & 0x01) != 0,
        disabled: (flags & 0x02) != 0,
        invert_when_blending: (flags & 0x04) != 0,
        from_other_data: (flags & 0x08) != 0,
        user_mask_density: None,
        user_mask_feather: None,
        vector_mask_density: None,
        vector_mask_feather: None,
    };

    if mask_size == 20 && !has_parameters {
        // short form: two bytes of padding and that's it
        read_bytes(stream, 2)?;
        return Ok(Some(mask));
    }

    // rectangle + default color + flags + real flags + real background + real rectangle
    let mut computed_size = 4 * 4 + 1 + 1 + 1 + 1 + 4 * 4;
    if has_parameters {
        computed_size += 1;

        let available = read_u8(stream)?;
        if (available & 0x01) == 0x01 {
            computed_size += 1;
            mask.user_mask_density = Some(read_u8(stream)?);
        }
        if (available & 0x02) == 0x02 {
            computed_size += 8;
            mask.user_mask_feather = Some(Endian::Big.read(stream)?);
        }
        if (available & 0x04) == 0x04 {
            computed_size += 1;
            mask.vector_mask_density = Some(read_u8(stream)?);
        }
        if (available & 0x08) == 0x08 {
            computed_size += 8;
            mask.vector_mask_feather = Some(Endian::Big.read(stream)?);
        }
    }

    if computed_size != mask_size {
        return Err(FormatError::MaskSizeMismatch {
            declared: mask_size,
            computed: computed_size,
        });
    }

    // the "real" flags, background and rectangle duplicate what was read above
    read_bytes(stream, 18)?;

    Ok(Some(mask))
}

/// Reads the global mask information block. Zero length means absent.
pub(crate) fn read_global_mask_info<R: Read>(
    stream: &mut R,
) -> Result<Option<GlobalLayerMask>, FormatError> {
    let length: i32 = Endian::Big.read(stream)?;
    if length == 0 {
        return Ok(None);
    }
    if length < 13 {
        return Err(FormatError::GlobalMaskTooShort(length));
    }

    let overlay_color_space: i16 = Endian::Big.read(stream)?;
    let mut color_components = [0i16; 4];
    for component in color_components.iter_mut() {
        *component = Endian::Big.read(stream)?;
    }

    let opacity: i16 = Endian::Big.read(stream)?;
    if !(0..=100).contains(&opacity) {
        return Err(FormatError::BadGlobalMaskOpacity(opacity));
    }

    let kind_value = read_u8(stream)?;
    let kind = LayerMaskKind::try_from(kind_value)
        .map_err(|_| FormatError::BadLayerMaskKind(kind_value))?;

    // rest of the declared block is filler
    read_bytes(stream, (length - 13) as usize)?;

    Ok(Some(GlobalLayerMask {
        overlay_color_space,
        color_components,
        opacity,
        kind,
    }))
}
