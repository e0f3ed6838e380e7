//
// apngenc - still PNG and animated APNG frame encoder
// pixels.rs - accepted pixel formats and their PNG colour/depth mapping
//
// Generalizes mtpng's Header::bytes_per_pixel (which only covered the five
// PNG colour types at a caller-chosen depth) to the fixed list of pixel
// formats this encoder accepts from its host codec framework.
//

use std::io;

use crate::utils::invalid_input;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorType {
    Greyscale = 0,
    Truecolor = 2,
    IndexedColor = 3,
    GreyscaleAlpha = 4,
    TruecolorAlpha = 6,
}

/// Pixel formats accepted from the host. Anything else is a fatal open error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Rgba,
    Rgb48Be,
    Rgba64Be,
    Gray8,
    Gray8A,
    Gray16Be,
    Ya16Be,
    Pal8,
    MonoBlack,
}

impl PixelFormat {
    pub fn color_type(self) -> ColorType {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Rgb48Be => ColorType::Truecolor,
            PixelFormat::Rgba | PixelFormat::Rgba64Be => ColorType::TruecolorAlpha,
            PixelFormat::Gray8 | PixelFormat::Gray16Be | PixelFormat::MonoBlack => {
                ColorType::Greyscale
            }
            PixelFormat::Gray8A | PixelFormat::Ya16Be => ColorType::GreyscaleAlpha,
            PixelFormat::Pal8 => ColorType::IndexedColor,
        }
    }

    pub fn bit_depth(self) -> u8 {
        match self {
            PixelFormat::MonoBlack => 1,
            PixelFormat::Rgb48Be
            | PixelFormat::Rgba64Be
            | PixelFormat::Gray16Be
            | PixelFormat::Ya16Be => 16,
            _ => 8,
        }
    }

    /// Bits per pixel (may be less than 8, for MonoBlack).
    pub fn bits_per_pixel(self) -> usize {
        let channels = match self.color_type() {
            ColorType::Greyscale => 1,
            ColorType::Truecolor => 3,
            ColorType::IndexedColor => 1,
            ColorType::GreyscaleAlpha => 2,
            ColorType::TruecolorAlpha => 4,
        };
        channels * self.bit_depth() as usize
    }

    /// Filter stride unit: ceil(bits_per_pixel / 8), minimum 1.
    pub fn filter_bpp(self) -> usize {
        (self.bits_per_pixel() + 7) / 8
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self.color_type(),
            ColorType::TruecolorAlpha | ColorType::GreyscaleAlpha
        )
    }

    /// True for pixel formats whose "OVER" blending can be expressed as a
    /// simple per-pixel alpha test (section 4.7's feasibility check).
    pub fn supports_alpha_blend(self) -> bool {
        self.has_alpha() || matches!(self, PixelFormat::Pal8)
    }

    /// The per-channel value that means "fully opaque" in the RGBA16
    /// working space: 65535 for 16-bit-per-channel formats, 255 otherwise.
    pub fn channel_max(self) -> u16 {
        if self.bit_depth() == 16 {
            65535
        } else {
            255
        }
    }

    /// True for the formats the APNG optimizer may offer an inverse `Over`
    /// blend for, via the exact trivial-case test (section 4.7): target
    /// equals canvas, or target/canvas sits at a compositing extreme.
    /// `Pal8` only ever reaches this through a verbatim index copy or a
    /// dedicated transparent palette entry, never through a reconstructed
    /// color, so it is exact too -- see `apng::optimize`.
    pub fn exact_alpha_roundtrip(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgba
                | PixelFormat::Rgba64Be
                | PixelFormat::Gray8A
                | PixelFormat::Ya16Be
                | PixelFormat::Pal8
        )
    }

    pub fn stride(self, width: u32) -> usize {
        (self.bits_per_pixel() * width as usize + 7) / 8
    }

    pub fn from_u8(color_type: u8, depth: u8) -> io::Result<PixelFormat> {
        match (color_type, depth) {
            (2, 8) => Ok(PixelFormat::Rgb24),
            (6, 8) => Ok(PixelFormat::Rgba),
            (2, 16) => Ok(PixelFormat::Rgb48Be),
            (6, 16) => Ok(PixelFormat::Rgba64Be),
            (0, 8) => Ok(PixelFormat::Gray8),
            (4, 8) => Ok(PixelFormat::Gray8A),
            (0, 16) => Ok(PixelFormat::Gray16Be),
            (4, 16) => Ok(PixelFormat::Ya16Be),
            (3, 8) => Ok(PixelFormat::Pal8),
            (0, 1) => Ok(PixelFormat::MonoBlack),
            _ => Err(invalid_input("Unsupported pixel format")),
        }
    }

    fn get_mono_bit(data: &[u8], pixel: u32) -> u8 {
        let byte = data[(pixel / 8) as usize];
        let shift = 7 - (pixel % 8);
        (byte >> shift) & 1
    }

    fn read_be16(data: &[u8], offset: usize) -> u16 {
        ((data[offset] as u16) << 8) | data[offset + 1] as u16
    }

    /// Converts one row of `self`-formatted pixel data to a 16-bit-per-
    /// channel RGBA working buffer. This is the comparison/compositing
    /// space the APNG frame optimizer diffs and blends in, not the encoded
    /// bit stream -- but unlike an 8-bit working space it keeps every bit
    /// of a 16-bit-per-channel format's precision, so two frames that only
    /// differ in a channel's low byte are never mistaken for identical.
    pub fn to_rgba16(self, data: &[u8], width: u32, palette: Option<&[u32]>) -> Vec<u16> {
        let mut out = vec![0u16; width as usize * 4];
        for x in 0..width as usize {
            let px: [u16; 4] = match self {
                PixelFormat::Rgb24 => {
                    let o = x * 3;
                    [data[o] as u16, data[o + 1] as u16, data[o + 2] as u16, 255]
                }
                PixelFormat::Rgba => {
                    let o = x * 4;
                    [data[o] as u16, data[o + 1] as u16, data[o + 2] as u16, data[o + 3] as u16]
                }
                PixelFormat::Rgb48Be => {
                    let o = x * 6;
                    [Self::read_be16(data, o), Self::read_be16(data, o + 2), Self::read_be16(data, o + 4), 65535]
                }
                PixelFormat::Rgba64Be => {
                    let o = x * 8;
                    [
                        Self::read_be16(data, o),
                        Self::read_be16(data, o + 2),
                        Self::read_be16(data, o + 4),
                        Self::read_be16(data, o + 6),
                    ]
                }
                PixelFormat::Gray8 => {
                    let g = data[x] as u16;
                    [g, g, g, 255]
                }
                PixelFormat::Gray8A => {
                    let o = x * 2;
                    let g = data[o] as u16;
                    [g, g, g, data[o + 1] as u16]
                }
                PixelFormat::Gray16Be => {
                    let g = Self::read_be16(data, x * 2);
                    [g, g, g, 65535]
                }
                PixelFormat::Ya16Be => {
                    let o = x * 4;
                    let g = Self::read_be16(data, o);
                    [g, g, g, Self::read_be16(data, o + 2)]
                }
                PixelFormat::Pal8 => {
                    let entry = palette.expect("Pal8 conversion requires a palette")[data[x] as usize];
                    [
                        ((entry >> 16) as u8) as u16,
                        ((entry >> 8) as u8) as u16,
                        (entry as u8) as u16,
                        ((entry >> 24) as u8) as u16,
                    ]
                }
                PixelFormat::MonoBlack => {
                    let bit = get_mono_bit(data, x as u32);
                    let v = if bit != 0 { 255 } else { 0 };
                    [v, v, v, 255]
                }
            };
            out[x * 4..x * 4 + 4].copy_from_slice(&px);
        }
        out
    }

    /// Inverse of `to_rgba16`, for the formats `exact_alpha_roundtrip`
    /// allows (`Pal8` excepted -- its inverse is an index, not a color, and
    /// is resolved directly by `apng::optimize`): rebuilds one native-format
    /// row from RGBA16 pixels.
    pub fn from_rgba16(self, rgba: &[u16], width: u32) -> Vec<u8> {
        let mut out = vec![0u8; self.stride(width)];
        for x in 0..width as usize {
            let px = [rgba[x * 4], rgba[x * 4 + 1], rgba[x * 4 + 2], rgba[x * 4 + 3]];
            match self {
                PixelFormat::Rgba => {
                    let o = x * 4;
                    for c in 0..4 {
                        out[o + c] = px[c] as u8;
                    }
                }
                PixelFormat::Rgba64Be => {
                    let o = x * 8;
                    for c in 0..4 {
                        out[o + c * 2] = (px[c] >> 8) as u8;
                        out[o + c * 2 + 1] = px[c] as u8;
                    }
                }
                PixelFormat::Gray8A => {
                    out[x * 2] = px[0] as u8;
                    out[x * 2 + 1] = px[3] as u8;
                }
                PixelFormat::Ya16Be => {
                    let o = x * 4;
                    out[o] = (px[0] >> 8) as u8;
                    out[o + 1] = px[0] as u8;
                    out[o + 2] = (px[3] >> 8) as u8;
                    out[o + 3] = px[3] as u8;
                }
                _ => panic!("from_rgba16 is only exact for alpha round-trip formats"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb24_is_three_bytes() {
        assert_eq!(PixelFormat::Rgb24.filter_bpp(), 3);
        assert_eq!(PixelFormat::Rgb24.stride(4), 12);
    }

    #[test]
    fn monoblack_is_bit_packed() {
        assert_eq!(PixelFormat::MonoBlack.bits_per_pixel(), 1);
        assert_eq!(PixelFormat::MonoBlack.filter_bpp(), 1);
        assert_eq!(PixelFormat::MonoBlack.stride(8), 1);
        assert_eq!(PixelFormat::MonoBlack.stride(9), 2);
    }

    #[test]
    fn alpha_formats_support_over() {
        assert!(PixelFormat::Rgba.supports_alpha_blend());
        assert!(PixelFormat::Gray8A.supports_alpha_blend());
        assert!(PixelFormat::Pal8.supports_alpha_blend());
        assert!(!PixelFormat::Rgb24.supports_alpha_blend());
    }

    #[test]
    fn rgb48be_keeps_low_byte_precision_in_working_space() {
        // 0x00AA and 0x00FF differ only in the low byte; an 8-bit-truncated
        // working space would see these as the same pixel.
        let a: Vec<u8> = vec![0x00, 0xAA, 0x00, 0xAA, 0x00, 0xAA];
        let b: Vec<u8> = vec![0x00, 0xFF, 0x00, 0xAA, 0x00, 0xAA];
        let rgba_a = PixelFormat::Rgb48Be.to_rgba16(&a, 1, None);
        let rgba_b = PixelFormat::Rgb48Be.to_rgba16(&b, 1, None);
        assert_ne!(rgba_a, rgba_b);
        assert_eq!(rgba_a[0], 0x00AA);
        assert_eq!(rgba_b[0], 0x00FF);
    }

    #[test]
    fn rgba64be_round_trips_through_rgba16_exactly() {
        let data: Vec<u8> = vec![0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let rgba = PixelFormat::Rgba64Be.to_rgba16(&data, 1, None);
        let back = PixelFormat::Rgba64Be.from_rgba16(&rgba, 1);
        assert_eq!(back, data);
    }
}
