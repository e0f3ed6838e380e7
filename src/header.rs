//
// apngenc - still PNG and animated APNG frame encoder
// header.rs - IHDR and the ancillary chunks that describe a whole image
//
// Grounded in mtpng's lib.rs::Header (field shape, ColorType/CompressionMethod/
// FilterMethod/InterlaceMethod enums) and in andreasots-eris's apng/mod.rs,
// which is the pack's other complete APNG writer and emits sRGB/gAMA/cHRM
// with the exact constants used below.
//

use std::convert::TryFrom;
use std::io;

use crate::pixels::{ColorType, PixelFormat};
use crate::utils::{invalid_input, write_be32, write_byte, IoResult};

#[derive(Copy, Clone)]
#[repr(u8)]
pub enum CompressionMethod {
    Deflate = 0,
}

#[derive(Copy, Clone)]
#[repr(u8)]
pub enum FilterMethod {
    Standard = 0,
}

#[derive(Copy, Clone)]
#[repr(u8)]
pub enum InterlaceMethod {
    Standard = 0,
    Adam7 = 1,
}

#[derive(Copy, Clone)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub interlace_method: InterlaceMethod,
}

impl Header {
    pub fn new(width: u32, height: u32, format: PixelFormat, interlaced: bool) -> io::Result<Header> {
        if width == 0 || height == 0 {
            return Err(invalid_input("Width and height must be nonzero"));
        }
        Ok(Header {
            width,
            height,
            format,
            interlace_method: if interlaced {
                InterlaceMethod::Adam7
            } else {
                InterlaceMethod::Standard
            },
        })
    }

    pub fn ihdr_payload(&self) -> io::Result<Vec<u8>> {
        let mut data = Vec::<u8>::new();
        write_be32(&mut data, self.width)?;
        write_be32(&mut data, self.height)?;
        write_byte(&mut data, self.format.bit_depth())?;
        write_byte(&mut data, self.format.color_type() as u8)?;
        write_byte(&mut data, CompressionMethod::Deflate as u8)?;
        write_byte(&mut data, FilterMethod::Standard as u8)?;
        write_byte(&mut data, self.interlace_method as u8)?;
        Ok(data)
    }
}

/// Resolution tag for pHYs. Spec section 6 exposes this as a dpi-or-dpm
/// choice on Options; both collapse to the same "pixels per unit" payload.
#[derive(Copy, Clone)]
pub enum Resolution {
    PerInch(u32),
    PerMeter(u32),
}

pub fn phys_payload(res: Resolution) -> io::Result<Vec<u8>> {
    let (ppu, unit) = match res {
        Resolution::PerMeter(v) => (v, 1u8),
        // 1 inch == 0.0254 meters, rounded to the nearest whole pixel/meter.
        Resolution::PerInch(v) => (((v as f64) / 0.0254).round() as u32, 1u8),
    };
    let mut data = Vec::<u8>::new();
    write_be32(&mut data, ppu)?;
    write_be32(&mut data, ppu)?;
    write_byte(&mut data, unit)?;
    Ok(data)
}

#[derive(Copy, Clone)]
pub enum Stereo3d {
    CrossFuse,
    Diverging,
}

pub fn ster_payload(mode: Stereo3d) -> Vec<u8> {
    vec![match mode {
        Stereo3d::CrossFuse => 0,
        Stereo3d::Diverging => 1,
    }]
}

#[derive(Copy, Clone)]
#[repr(u8)]
pub enum RenderingIntent {
    Perceptual = 0,
    RelativeColorimetric = 1,
    Saturation = 2,
    AbsoluteColorimetric = 3,
}

pub fn srgb_payload(intent: RenderingIntent) -> Vec<u8> {
    vec![intent as u8]
}

impl TryFrom<u8> for RenderingIntent {
    type Error = io::Error;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RenderingIntent::Perceptual),
            1 => Ok(RenderingIntent::RelativeColorimetric),
            2 => Ok(RenderingIntent::Saturation),
            3 => Ok(RenderingIntent::AbsoluteColorimetric),
            _ => Err(invalid_input("Invalid rendering intent constant")),
        }
    }
}

// (white, red, green, blue), each (x, y) scaled by 100000, per the CIE 1931
// chromaticity coordinates the PNG cHRM chunk wants.
#[derive(Copy, Clone)]
pub enum ColorPrimaries {
    Bt709,
    Bt470M,
    Bt470Bg,
    Smpte170mOr240m,
    Bt2020,
}

impl ColorPrimaries {
    fn chromaticities(self) -> [(u32, u32); 4] {
        match self {
            ColorPrimaries::Bt709 => [
                (31270, 32900),
                (64000, 33000),
                (30000, 60000),
                (15000, 6000),
            ],
            ColorPrimaries::Bt470M => [
                (31000, 31600),
                (67000, 33000),
                (21000, 71000),
                (14000, 8000),
            ],
            ColorPrimaries::Bt470Bg => [
                (31270, 32900),
                (64000, 33000),
                (29000, 60000),
                (15000, 6000),
            ],
            ColorPrimaries::Smpte170mOr240m => [
                (31270, 32900),
                (63000, 34000),
                (31000, 59500),
                (15500, 7000),
            ],
            ColorPrimaries::Bt2020 => [
                (31270, 32900),
                (70800, 29200),
                (17000, 79700),
                (13100, 4600),
            ],
        }
    }
}

pub fn chrm_payload(primaries: ColorPrimaries) -> io::Result<Vec<u8>> {
    let mut data = Vec::<u8>::new();
    for (x, y) in primaries.chromaticities().iter() {
        write_be32(&mut data, *x)?;
        write_be32(&mut data, *y)?;
    }
    Ok(data)
}

/// gAMA payload, or `None` if the supplied gamma rounds to zero (a
/// degenerate value that would otherwise claim "infinite contrast").
pub fn gama_payload(gamma: f64) -> Option<Vec<u8>> {
    let scaled = (gamma * 100_000.0).round();
    if scaled <= 0.0 {
        None
    } else {
        let mut data = Vec::<u8>::new();
        // write_be32 cannot fail on a Vec<u8>.
        write_be32(&mut data, scaled as u32).ok();
        Some(data)
    }
}

/// Color tagging for a whole image/animation, as surfaced on Options.
#[derive(Copy, Clone)]
pub enum ColorTag {
    None,
    Srgb(RenderingIntent),
    Gamma(f64),
    GammaAndPrimaries(f64, ColorPrimaries),
}

/// Splits a 0xAARRGGBB-packed palette into the PLTE payload and an optional
/// tRNS payload. Per the PNG spec, trailing fully-opaque entries are
/// dropped from tRNS; if none are transparent, tRNS is omitted entirely.
pub fn plte_and_trns(palette: &[u32]) -> io::Result<(Vec<u8>, Option<Vec<u8>>)> {
    if palette.is_empty() || palette.len() > 256 {
        return Err(invalid_input("Palette must have 1-256 entries"));
    }

    let mut plte = Vec::with_capacity(palette.len() * 3);
    let mut alpha = Vec::with_capacity(palette.len());
    for &entry in palette {
        let a = (entry >> 24) as u8;
        let r = (entry >> 16) as u8;
        let g = (entry >> 8) as u8;
        let b = entry as u8;
        plte.push(r);
        plte.push(g);
        plte.push(b);
        alpha.push(a);
    }

    while let Some(&255) = alpha.last() {
        alpha.pop();
    }

    let trns = if alpha.is_empty() { None } else { Some(alpha) };
    Ok((plte, trns))
}

pub fn write_color_tag<F>(mut emit: F, tag: ColorTag) -> IoResult
where
    F: FnMut(&[u8], &[u8]) -> IoResult,
{
    match tag {
        ColorTag::None => Ok(()),
        ColorTag::Srgb(intent) => emit(b"sRGB", &srgb_payload(intent)),
        ColorTag::Gamma(gamma) => {
            if let Some(payload) = gama_payload(gamma) {
                emit(b"gAMA", &payload)
            } else {
                Ok(())
            }
        }
        ColorTag::GammaAndPrimaries(gamma, primaries) => {
            if let Some(payload) = gama_payload(gamma) {
                emit(b"gAMA", &payload)?;
            }
            emit(b"cHRM", &chrm_payload(primaries)?)
        }
    }
}
