//
// apngenc - still PNG and animated APNG frame encoder
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

extern crate crc;

pub mod apng;
pub mod deflate;
pub mod filter;
pub mod frame;
pub mod header;
pub mod interlace;
pub mod options;
pub mod pixels;
pub mod still;
pub mod utils;
pub mod writer;

#[cfg(feature = "capi")]
pub mod capi;

use std::io;
use std::io::Write;

pub use filter::{FilterMode, FilterType};
pub use frame::Frame;
pub use header::{ColorPrimaries, ColorTag, RenderingIntent, Resolution, Stereo3d};
pub use options::Options;
pub use pixels::PixelFormat;

use apng::ApngEncoder;
use utils::other;

/// A single open encoding session bound to one output sink, offering the
/// two things this crate knows how to produce: one-shot still PNGs and
/// whole APNG animations. Mirrors the open/encode/close shape a host
/// codec framework expects from any muxer it embeds.
pub struct Encoder<W: Write> {
    output: Option<W>,
    options: Options,
}

impl<W: Write> Encoder<W> {
    pub fn open(output: W, options: Options) -> Encoder<W> {
        Encoder {
            output: Some(output),
            options,
        }
    }

    /// Encodes one standalone PNG: signature through IEND, no APNG chunks.
    pub fn encode_png(&mut self, frame: &Frame, interlaced: bool) -> io::Result<()> {
        let output = self.output.take().ok_or_else(|| other("Encoder already closed"))?;
        let output = still::encode_png(output, frame, &self.options, interlaced)?;
        self.output = Some(output);
        Ok(())
    }

    /// Encodes a complete APNG: every frame in `frames`, in order, as one
    /// animation. The frame count must be known up front since it rides in
    /// acTL ahead of any frame data.
    pub fn encode_apng(&mut self, frames: &[Frame]) -> io::Result<()> {
        if frames.is_empty() {
            return Err(other("An APNG needs at least one frame"));
        }
        let output = self.output.take().ok_or_else(|| other("Encoder already closed"))?;
        let first = &frames[0];
        let mut apng = ApngEncoder::open(
            output,
            first.width,
            first.height,
            first.format,
            frames.len() as u32,
            self.options,
        )?;
        for frame in frames {
            apng.write_frame(frame)?;
        }
        let output = apng.close()?;
        self.output = Some(output);
        Ok(())
    }

    /// Releases the underlying writer. Nothing further may be encoded
    /// through this session afterward.
    pub fn close(mut self) -> io::Result<W> {
        self.output.take().ok_or_else(|| other("Encoder already closed"))
    }
}
