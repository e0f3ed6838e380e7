//
// apngenc - still PNG and animated APNG frame encoder
// frame.rs - one caller-supplied raster, in the shape the driver consumes
//

use std::io;

use crate::pixels::PixelFormat;
use crate::utils::invalid_input;

/// One decoded raster handed in by the host codec framework. `data` is
/// tightly packed rows (no padding) at `format`'s native stride.
pub struct Frame<'a> {
    pub data: &'a [u8],
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// 0xAARRGGBB palette entries, required when `format` is `Pal8`.
    pub palette: Option<&'a [u32]>,
    /// Per-frame delay in seconds, expressed as a fraction (num/den), used
    /// only by the APNG driver.
    pub delay_num: u16,
    pub delay_den: u16,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8], format: PixelFormat, width: u32, height: u32) -> Frame<'a> {
        Frame {
            data,
            format,
            width,
            height,
            palette: None,
            delay_num: 1,
            delay_den: 30,
        }
    }

    pub fn with_palette(mut self, palette: &'a [u32]) -> Frame<'a> {
        self.palette = Some(palette);
        self
    }

    pub fn with_delay(mut self, num: u16, den: u16) -> Frame<'a> {
        self.delay_num = num;
        self.delay_den = den;
        self
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid_input("Frame dimensions must be nonzero"));
        }
        let expected = self.format.stride(self.width) * self.height as usize;
        if self.data.len() != expected {
            return Err(invalid_input("Frame data length does not match stride * height"));
        }
        match (self.format, self.palette) {
            (PixelFormat::Pal8, None) => Err(invalid_input("Indexed frames require a palette")),
            (PixelFormat::Pal8, Some(p)) if p.is_empty() || p.len() > 256 => {
                Err(invalid_input("Palette must have 1-256 entries"))
            }
            _ => Ok(()),
        }
    }
}
