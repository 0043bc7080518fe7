use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The color mode of the image. Unknown values are rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(i16)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    /// Color palette plus indices into it. Carries the palette as color mode data.
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    /// Two components, often black plus a spot color. Carries color mode data.
    Duotone = 8,
    Lab = 9,
}

impl ColorMode {
    /// Whether this mode stores a payload in the color mode data section.
    pub fn requires_mode_data(&self) -> bool {
        matches!(self, ColorMode::Indexed | ColorMode::Duotone)
    }
}
