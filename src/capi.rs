//
// apngenc - still PNG and animated APNG frame encoder
// capi.rs - C API implementation
//
// Copyright (c) 2018 Brion Vibber
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//

use std::convert::TryFrom;
use std::io;
use std::io::Write;
use std::ptr;

use libc::{c_int, c_void, size_t};

use super::deflate::Strategy;
use super::filter::{FilterMode, FilterType};
use super::frame::Frame;
use super::header::ColorTag;
use super::options::Options;
use super::pixels::PixelFormat;
use super::utils::{invalid_input, other};
use super::Encoder;

#[repr(C)]
pub enum CResult {
    Ok = 0,
    Err = 1,
}

impl From<Result<(), io::Error>> for CResult {
    fn from(result: Result<(), io::Error>) -> CResult {
        match result {
            Ok(()) => CResult::Ok,
            Err(_) => CResult::Err,
        }
    }
}

pub type CWriteFunc = unsafe extern "C" fn(*const c_void, *const u8, size_t) -> size_t;
pub type CFlushFunc = unsafe extern "C" fn(*const c_void) -> bool;

//
// Adapter for Write trait to use C callbacks.
//
pub struct CWriter {
    write_func: CWriteFunc,
    flush_func: CFlushFunc,
    user_data: *mut c_void,
}

impl CWriter {
    fn new(write_func: CWriteFunc, flush_func: CFlushFunc, user_data: *mut c_void) -> CWriter {
        CWriter {
            write_func,
            flush_func,
            user_data,
        }
    }
}

impl Write for CWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let ret = unsafe { (self.write_func)(self.user_data, &buf[0], buf.len()) };
        if ret == buf.len() {
            Ok(ret)
        } else {
            Err(other("apngenc write callback returned failure"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let ret = unsafe { (self.flush_func)(self.user_data) };
        if ret {
            Ok(())
        } else {
            Err(other("apngenc flush callback returned failure"))
        }
    }
}

fn pixel_format_from_raw(color_type: c_int, depth: u8) -> io::Result<PixelFormat> {
    if color_type < 0 || color_type > u8::max_value() as c_int {
        return Err(invalid_input("Invalid color type"));
    }
    PixelFormat::from_u8(color_type as u8, depth)
}

/// One frame as handed across the FFI boundary: pointers into memory the
/// caller keeps alive for the duration of the encode call.
#[repr(C)]
pub struct CFrame {
    pub data: *const u8,
    pub data_len: size_t,
    pub width: u32,
    pub height: u32,
    pub color_type: c_int,
    pub depth: u8,
    /// 0xAARRGGBB entries; ignored unless color_type/depth maps to Pal8.
    pub palette: *const u32,
    pub palette_len: size_t,
    pub delay_num: u16,
    pub delay_den: u16,
}

unsafe fn frame_from_c<'a>(c: &'a CFrame) -> io::Result<Frame<'a>> {
    if c.data.is_null() {
        return Err(invalid_input("frame data must not be null"));
    }
    let format = pixel_format_from_raw(c.color_type, c.depth)?;
    let data = std::slice::from_raw_parts(c.data, c.data_len);
    let mut frame = Frame::new(data, format, c.width, c.height).with_delay(c.delay_num, c.delay_den);
    if !c.palette.is_null() {
        let palette = std::slice::from_raw_parts(c.palette, c.palette_len);
        frame = frame.with_palette(palette);
    }
    Ok(frame)
}

pub type PEncoderOptions = *mut Options;
pub type PEncoder = *mut Encoder<CWriter>;

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_new(pp_options: *mut PEncoderOptions) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if pp_options.is_null() {
            return Err(invalid_input("pp_options must not be null"));
        }
        if !(*pp_options).is_null() {
            return Err(invalid_input("*pp_options must be null"));
        }
        *pp_options = Box::into_raw(Box::new(Options::new()));
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_release(pp_options: *mut PEncoderOptions) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if pp_options.is_null() {
            return Err(invalid_input("pp_options must not be null"));
        }
        if (*pp_options).is_null() {
            return Err(invalid_input("*pp_options must not be null"));
        }
        drop(Box::from_raw(*pp_options));
        *pp_options = ptr::null_mut();
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_set_filter(
    p_options: PEncoderOptions,
    filter_type: c_int,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_options.is_null() {
            return Err(invalid_input("p_options must not be null"));
        }
        if filter_type > u8::max_value() as c_int {
            return Err(invalid_input("Invalid filter type"));
        }
        let mode = if filter_type < 0 {
            FilterMode::Mixed
        } else {
            FilterMode::Fixed(FilterType::try_from(filter_type as u8)?)
        };
        (*p_options).set_filter_mode(mode);
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_set_strategy(
    p_options: PEncoderOptions,
    strategy: c_int,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_options.is_null() {
            return Err(invalid_input("p_options must not be null"));
        }
        if strategy < 0 || strategy > u8::max_value() as c_int {
            return Err(invalid_input("Invalid strategy"));
        }
        (*p_options).set_strategy(Strategy::try_from(strategy as u8)?);
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_set_compression_level(
    p_options: PEncoderOptions,
    compression_level: c_int,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_options.is_null() {
            return Err(invalid_input("p_options must not be null"));
        }
        if compression_level < 0 || compression_level > 9 {
            return Err(invalid_input("Invalid compression level"));
        }
        (*p_options).set_compression_level(compression_level);
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_set_num_plays(
    p_options: PEncoderOptions,
    num_plays: u32,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_options.is_null() {
            return Err(invalid_input("p_options must not be null"));
        }
        (*p_options).set_num_plays(num_plays);
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_options_set_srgb(
    p_options: PEncoderOptions,
    rendering_intent: c_int,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_options.is_null() {
            return Err(invalid_input("p_options must not be null"));
        }
        if rendering_intent < 0 || rendering_intent > u8::max_value() as c_int {
            return Err(invalid_input("Invalid rendering intent"));
        }
        let intent = super::header::RenderingIntent::try_from(rendering_intent as u8)?;
        (*p_options).set_color_tag(ColorTag::Srgb(intent));
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_encoder_new(
    pp_encoder: *mut PEncoder,
    write_func: Option<CWriteFunc>,
    flush_func: Option<CFlushFunc>,
    user_data: *mut c_void,
    p_options: PEncoderOptions,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if pp_encoder.is_null() {
            return Err(invalid_input("pp_encoder must not be null"));
        }
        if !(*pp_encoder).is_null() {
            return Err(invalid_input("*pp_encoder must be null"));
        }
        let writer = match (write_func, flush_func) {
            (Some(wf), Some(ff)) => CWriter::new(wf, ff, user_data),
            _ => return Err(invalid_input("write_func and flush_func must not be null")),
        };
        let options = if p_options.is_null() {
            Options::new()
        } else {
            *p_options
        };
        let encoder = Encoder::open(writer, options);
        *pp_encoder = Box::into_raw(Box::new(encoder));
        Ok(())
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_encoder_encode_png(
    p_encoder: PEncoder,
    c_frame: *const CFrame,
    interlaced: bool,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_encoder.is_null() {
            return Err(invalid_input("p_encoder must not be null"));
        }
        if c_frame.is_null() {
            return Err(invalid_input("c_frame must not be null"));
        }
        let frame = frame_from_c(&*c_frame)?;
        (*p_encoder).encode_png(&frame, interlaced)
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_encoder_encode_apng(
    p_encoder: PEncoder,
    c_frames: *const CFrame,
    num_frames: size_t,
) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if p_encoder.is_null() {
            return Err(invalid_input("p_encoder must not be null"));
        }
        if c_frames.is_null() {
            return Err(invalid_input("c_frames must not be null"));
        }
        let c_slice = std::slice::from_raw_parts(c_frames, num_frames);
        let mut frames = Vec::with_capacity(c_slice.len());
        for c in c_slice {
            frames.push(frame_from_c(c)?);
        }
        (*p_encoder).encode_apng(&frames)
    }())
}

#[no_mangle]
pub unsafe extern "C" fn apngenc_encoder_finish(pp_encoder: *mut PEncoder) -> CResult {
    CResult::from(|| -> io::Result<()> {
        if pp_encoder.is_null() {
            return Err(invalid_input("pp_encoder must not be null"));
        }
        if (*pp_encoder).is_null() {
            return Err(invalid_input("*pp_encoder must not be null"));
        }

        // Take ownership back from C...
        let b_encoder = Box::from_raw(*pp_encoder);
        *pp_encoder = ptr::null_mut();

        // And finish it out.
        b_encoder.close()?;
        Ok(())
    }())
}
