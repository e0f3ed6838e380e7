//
// apngenc - still PNG and animated APNG frame encoder
// apng/mod.rs - one-frame-delay APNG driver
//
// Chunk framing (acTL/fcTL/fdAT field order, sequence-number bookkeeping)
// follows andreasots-eris's apng/mod.rs, the pack's other complete APNG
// writer; the per-frame filter/interlace/deflate pipeline is still.rs's,
// reused here frame by frame instead of once.
//

pub mod optimize;

use std::io;
use std::io::Write;

use crate::deflate::{self, Deflate, Flush};
use crate::frame::Frame;
use crate::header::{self, Header};
use crate::options::Options;
use crate::pixels::PixelFormat;
use crate::still;
use crate::utils::{invalid_input, other};
use crate::writer::{BlendOp, DisposeOp, FrameControl, Writer};

use optimize::{Optimizer, Placement, Rect};

fn frame_to_rgba16(frame: &Frame) -> Vec<u16> {
    let format = frame.format;
    let stride = format.stride(frame.width);
    let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize * 4);
    for y in 0..frame.height as usize {
        let row = &frame.data[y * stride..(y + 1) * stride];
        out.extend_from_slice(&format.to_rgba16(row, frame.width, frame.palette));
    }
    out
}

/// A frame queued for emission but not yet written: its own fcTL can't be
/// finalized until the *next* frame arrives, because the dispose op that
/// belongs on this frame's fcTL is chosen jointly with that next frame's
/// bbox/blend (section 4.8's one-frame delay).
struct Pending {
    is_first: bool,
    bbox: Rect,
    blend_op: BlendOp,
    delay_num: u16,
    delay_den: u16,
    /// Pixel bytes for `bbox`, already in the image's native PixelFormat.
    native_pixels: Vec<u8>,
}

/// Streaming APNG encoder. The total frame count must be known up front
/// (it rides in acTL, which precedes every frame's data), so unlike the
/// still-image driver this takes it as a constructor argument rather than
/// discovering it at close() time the way a two-pass/seekable writer could.
pub struct ApngEncoder<W: Write> {
    writer: Writer<W>,
    options: Options,
    width: u32,
    height: u32,
    format: PixelFormat,
    num_frames: u32,
    frames_seen: u32,
    sequence_number: u32,
    optimizer: Optimizer,
    deflate: Deflate<Vec<u8>>,
    pending: Option<Pending>,
    palette_signature: Option<Vec<u32>>,
}

impl<W: Write> ApngEncoder<W> {
    pub fn open(
        output: W,
        width: u32,
        height: u32,
        format: PixelFormat,
        num_frames: u32,
        options: Options,
    ) -> io::Result<ApngEncoder<W>> {
        if num_frames == 0 {
            return Err(invalid_input("An APNG needs at least one frame"));
        }
        let header = Header::new(width, height, format, false)?;

        let mut writer = Writer::new(output);
        writer.write_signature()?;
        writer.write_header(&header)?;

        if let Some(res) = options.resolution() {
            writer.write_chunk(b"pHYs", &header::phys_payload(res)?)?;
        }
        if let Some(mode) = options.stereo3d() {
            writer.write_chunk(b"sTER", &header::ster_payload(mode))?;
        }
        header::write_color_tag(|tag, data| writer.write_chunk(tag, data), options.color_tag())?;
        writer.write_actl(num_frames, options.num_plays())?;

        let mut deflate_opts = deflate::Options::new();
        deflate_opts.set_level(options.compression_level());
        deflate_opts.set_strategy(options.strategy());

        Ok(ApngEncoder {
            writer,
            options,
            width,
            height,
            format,
            num_frames,
            frames_seen: 0,
            sequence_number: 0,
            optimizer: Optimizer::new(width, height, format),
            deflate: Deflate::new(deflate_opts, Vec::new()),
            pending: None,
            palette_signature: None,
        })
    }

    fn next_sequence_number(&mut self) -> u32 {
        let seq = self.sequence_number;
        self.sequence_number += 1;
        seq
    }

    fn check_palette(&mut self, frame: &Frame) -> io::Result<()> {
        if self.format != PixelFormat::Pal8 {
            return Ok(());
        }
        let palette = frame
            .palette
            .ok_or_else(|| invalid_input("Indexed frames require a palette"))?
            .to_vec();
        match &self.palette_signature {
            None => {
                let (plte, trns) = header::plte_and_trns(&palette)?;
                self.writer.write_chunk(b"PLTE", &plte)?;
                if let Some(trns) = trns {
                    self.writer.write_chunk(b"tRNS", &trns)?;
                }
                let transparent_index =
                    palette.iter().position(|&entry| (entry >> 24) as u8 == 0).map(|i| i as u8);
                self.optimizer.set_transparent_index(transparent_index);
                self.palette_signature = Some(palette);
            }
            Some(existing) if existing == &palette => {}
            Some(_) => {
                return Err(other(
                    "APNG frames must share one palette; this frame's palette differs",
                ))
            }
        }
        Ok(())
    }

    /// Compresses `native_pixels` (already cropped to `bbox`, in the
    /// image's native format) through a fresh filter pass and the shared,
    /// reset-between-frames deflate stream.
    fn compress_region(&mut self, native_pixels: &[u8], bbox: Rect) -> io::Result<Vec<u8>> {
        let cropped = Frame::new(native_pixels, self.format, bbox.width, bbox.height);
        let filtered = still::filter_rows(&cropped, self.options.filter_mode(), false);
        self.deflate.reset()?;
        self.deflate.write(&filtered, Flush::Finish)?;
        Ok(self.deflate.take_buffer())
    }

    fn emit_pending(&mut self, prev_dispose_op: DisposeOp) -> io::Result<()> {
        let pending = self.pending.take().expect("emit_pending called with no pending frame");
        let seq = self.next_sequence_number();
        self.writer.write_fctl(&FrameControl {
            sequence_number: seq,
            width: pending.bbox.width,
            height: pending.bbox.height,
            x_offset: pending.bbox.x,
            y_offset: pending.bbox.y,
            delay_num: pending.delay_num,
            delay_den: pending.delay_den,
            dispose_op: prev_dispose_op,
            blend_op: pending.blend_op,
        })?;

        let compressed = self.compress_region(&pending.native_pixels, pending.bbox)?;
        if pending.is_first {
            for chunk in compressed.chunks(64 * 1024) {
                self.writer.write_chunk(b"IDAT", chunk)?;
            }
        } else {
            for chunk in compressed.chunks(64 * 1024) {
                let seq = self.next_sequence_number();
                self.writer.write_fdat(seq, chunk)?;
            }
        }
        Ok(())
    }

    fn crop_source_row(&self, row: &[u8], bbox: Rect) -> Vec<u8> {
        let bpp = self.format.bits_per_pixel();
        let row_stride = self.format.stride(bbox.width);
        let mut out = vec![0u8; row_stride];
        if bpp % 8 == 0 {
            let bytes_per_pixel = bpp / 8;
            let off = bbox.x as usize * bytes_per_pixel;
            out.copy_from_slice(&row[off..off + row_stride]);
        } else {
            // Only MonoBlack (1 bpp) takes this path.
            for col in 0..bbox.width {
                let src_bit = (bbox.x + col) * bpp as u32;
                let byte = row[(src_bit / 8) as usize];
                let bit = (byte >> (7 - src_bit % 8)) & 1;
                let dst_bit = col * bpp as u32;
                if bit != 0 {
                    out[(dst_bit / 8) as usize] |= 1 << (7 - dst_bit % 8);
                }
            }
        }
        out
    }

    fn native_pixels_for(&self, frame: &Frame, placement: &Placement) -> Vec<u8> {
        let row_stride = self.format.stride(placement.bbox.width);
        let mut out = Vec::with_capacity(row_stride * placement.bbox.height as usize);
        match placement.blend_op {
            BlendOp::Source => {
                let stride = self.format.stride(self.width);
                for y in placement.bbox.y..placement.bbox.y + placement.bbox.height {
                    let row = &frame.data[y as usize * stride..(y as usize + 1) * stride];
                    out.extend_from_slice(&self.crop_source_row(row, placement.bbox));
                }
            }
            BlendOp::Over if self.format == PixelFormat::Pal8 => {
                out.extend(placement.pixels.iter().map(|&idx| idx as u8));
            }
            BlendOp::Over => {
                for row in placement.pixels.chunks(placement.bbox.width as usize * 4) {
                    out.extend_from_slice(&self.format.from_rgba16(row, placement.bbox.width));
                }
            }
        }
        out
    }

    /// Submits the next frame in sequence. Buffered internally until the
    /// following frame (or `close`) reveals the dispose op that belongs on
    /// its own fcTL.
    pub fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        frame.validate()?;
        if frame.width != self.width || frame.height != self.height {
            return Err(invalid_input("APNG frames must all share the animation's canvas size"));
        }
        if frame.format != self.format {
            return Err(invalid_input("APNG frames must all share the animation's pixel format"));
        }
        if self.frames_seen >= self.num_frames {
            return Err(invalid_input("More frames were written than num_frames declared"));
        }
        self.check_palette(frame)?;
        self.frames_seen += 1;

        let rgba = frame_to_rgba16(frame);

        if self.frames_seen == 1 {
            self.optimizer.seed(&rgba);
            let bbox = Rect { x: 0, y: 0, width: self.width, height: self.height };
            let native_pixels = frame.data.to_vec();
            self.pending = Some(Pending {
                is_first: true,
                bbox,
                blend_op: BlendOp::Source,
                delay_num: frame.delay_num,
                delay_den: frame.delay_den,
                native_pixels,
            });
            return Ok(());
        }

        let placement = self.optimizer.next(&rgba, frame.data);
        self.emit_pending(placement.prev_dispose_op)?;

        let native_pixels = self.native_pixels_for(frame, &placement);
        self.pending = Some(Pending {
            is_first: false,
            bbox: placement.bbox,
            blend_op: placement.blend_op,
            delay_num: frame.delay_num,
            delay_den: frame.delay_den,
            native_pixels,
        });
        Ok(())
    }

    /// Flushes the final buffered frame and writes IEND. The last frame's
    /// own dispose op can't affect anything downstream, so it is always
    /// `None`.
    pub fn close(mut self) -> io::Result<W> {
        if self.frames_seen != self.num_frames {
            return Err(invalid_input("write_frame was called fewer times than num_frames declared"));
        }
        if self.pending.is_some() {
            self.emit_pending(DisposeOp::None)?;
        }
        self.writer.write_end()?;
        self.writer.finish()
    }
}
