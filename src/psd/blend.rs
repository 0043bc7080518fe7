use num_enum::{IntoPrimitive, TryFromPrimitive};

/// How a layer combines with the layers below it. The wire value is a packed
/// big-endian 4-byte ASCII tag; values outside this set are rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum BlendMode {
    PassThrough = 0x70617373,  // "pass"
    Normal = 0x6E6F726D,       // "norm"
    Dissolve = 0x64697373,     // "diss"
    Darken = 0x6461726B,       // "dark"
    Multiply = 0x6D756C20,     // "mul "
    ColorBurn = 0x69646976,    // "idiv"
    LinearBurn = 0x6C62726E,   // "lbrn"
    DarkerColor = 0x646B436C,  // "dkCl"
    Lighten = 0x6C697465,      // "lite"
    Screen = 0x7363726E,       // "scrn"
    ColorDodge = 0x64697620,   // "div "
    LinearDodge = 0x6C646467,  // "lddg"
    LighterColor = 0x6C67436C, // "lgCl"
    Overlay = 0x6F766572,      // "over"
    SoftLight = 0x734C6974,    // "sLit"
    HardLight = 0x684C6974,    // "hLit"
    VividLight = 0x764C6974,   // "vLit"
    LinearLight = 0x6C4C6974,  // "lLit"
    PinLight = 0x704C6974,     // "pLit"
    HardMix = 0x684D6978,      // "hMix"
    Difference = 0x64696666,   // "diff"
    Exclusion = 0x736D7564,    // "smud"
    Subtract = 0x66737562,     // "fsub"
    Divide = 0x66646976,       // "fdiv"
    Hue = 0x68756520,          // "hue "
    Saturation = 0x73617420,   // "sat "
    Color = 0x636F6C72,        // "colr"
    Luminosity = 0x6C756D20,   // "lum "
}

impl BlendMode {
    /// The 4-byte ASCII tag as stored in the file.
    pub fn tag(&self) -> [u8; 4] {
        u32::from(*self).to_be_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_decode() {
        assert_eq!(
            BlendMode::try_from(u32::from_be_bytes(*b"norm")),
            Ok(BlendMode::Normal)
        );
        assert_eq!(
            BlendMode::try_from(u32::from_be_bytes(*b"mul ")),
            Ok(BlendMode::Multiply)
        );
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(BlendMode::try_from(u32::from_be_bytes(*b"nope")).is_err());
    }

    #[test]
    fn tag_roundtrip() {
        assert_eq!(BlendMode::Luminosity.tag(), *b"lum ");
    }
}
