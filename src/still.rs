//
// apngenc - still PNG and animated APNG frame encoder
// still.rs - single-frame PNG driver (also the per-frame pipeline the
// APNG driver reuses for each of its frames)
//
// Sequencing grounded in mtpng's encoder.rs (signature, header, ancillary
// chunks, IDAT, IEND in one pass), simplified from its multithreaded chunk
// pipeline down to the single-threaded, no-internal-parallelism pipeline
// this spec requires.
//

use std::io;
use std::io::Write;

use crate::deflate::{self, Deflate, Flush};
use crate::filter::{AdaptiveFilter, FilterMode};
use crate::frame::Frame;
use crate::header::{self, Header};
use crate::interlace;
use crate::options::Options;
use crate::pixels::PixelFormat;
use crate::utils::invalid_input;
use crate::writer::Writer;

// Chosen to keep any single IDAT well under typical reader buffer sizes
// without fragmenting small images into many tiny chunks.
const IDAT_CHUNK_SIZE: usize = 64 * 1024;

/// Filters every scanline of `frame` (through Adam7 if `interlaced`) and
/// concatenates the filter-tagged rows into one buffer ready for deflate.
pub(crate) fn filter_rows(frame: &Frame, filter_mode: FilterMode, interlaced: bool) -> Vec<u8> {
    let format = frame.format;
    let src_stride = format.stride(frame.width);

    if !interlaced {
        let mut filter = AdaptiveFilter::new(format, frame.width, filter_mode);
        let row_bytes = src_stride + 1;
        let mut out = Vec::with_capacity(row_bytes * frame.height as usize);
        let zero_row = vec![0u8; src_stride];
        let mut prev: &[u8] = &zero_row;
        for y in 0..frame.height as usize {
            let src_row = &frame.data[y * src_stride..(y + 1) * src_stride];
            let filtered = filter.filter(prev, src_row, y > 0);
            out.extend_from_slice(filtered);
            prev = src_row;
        }
        out
    } else {
        let mut out = Vec::new();
        for pass in interlace::passes(frame.width, frame.height).iter() {
            if pass.is_empty() {
                continue;
            }
            let mut filter = AdaptiveFilter::new(format, pass.width, filter_mode);
            let pass_stride = interlace::pass_row_size(format, pass);
            let zero_row = vec![0u8; pass_stride];
            let mut cur = vec![0u8; pass_stride];
            let mut prev = zero_row.clone();
            for row in 0..pass.height {
                let src_row_idx = pass.source_row(row) as usize;
                let src_row = &frame.data[src_row_idx * src_stride..(src_row_idx + 1) * src_stride];
                interlace::get_interlaced_row(format, src_row, pass, &mut cur);
                let filtered = filter.filter(&prev, &cur, row > 0);
                out.extend_from_slice(filtered);
                prev.copy_from_slice(&cur);
            }
        }
        out
    }
}

fn write_ancillary_chunks<W: Write>(writer: &mut Writer<W>, options: &Options) -> io::Result<()> {
    if let Some(res) = options.resolution() {
        writer.write_chunk(b"pHYs", &header::phys_payload(res)?)?;
    }
    if let Some(mode) = options.stereo3d() {
        writer.write_chunk(b"sTER", &header::ster_payload(mode))?;
    }
    header::write_color_tag(|tag, data| writer.write_chunk(tag, data), options.color_tag())
}

fn write_palette<W: Write>(writer: &mut Writer<W>, frame: &Frame) -> io::Result<()> {
    if frame.format != PixelFormat::Pal8 {
        return Ok(());
    }
    let palette = frame
        .palette
        .ok_or_else(|| invalid_input("Indexed frames require a palette"))?;
    let (plte, trns) = header::plte_and_trns(palette)?;
    writer.write_chunk(b"PLTE", &plte)?;
    if let Some(trns) = trns {
        writer.write_chunk(b"tRNS", &trns)?;
    }
    Ok(())
}

/// One-shot still-image encoder: signature, IHDR, ancillary chunks, PLTE/tRNS
/// if indexed, one or more IDATs, IEND. No APNG chunks are written.
pub fn encode_png<W: Write>(output: W, frame: &Frame, options: &Options, interlaced: bool) -> io::Result<W> {
    frame.validate()?;
    let header = Header::new(frame.width, frame.height, frame.format, interlaced)?;

    let mut writer = Writer::new(output);
    writer.write_signature()?;
    writer.write_header(&header)?;
    write_ancillary_chunks(&mut writer, options)?;
    write_palette(&mut writer, frame)?;

    let filtered = filter_rows(frame, options.filter_mode(), interlaced);
    let mut deflate_opts = deflate::Options::new();
    deflate_opts.set_level(options.compression_level());
    deflate_opts.set_strategy(options.strategy());
    let mut compressor = Deflate::new(deflate_opts, Vec::<u8>::new());
    compressor.write(&filtered, Flush::Finish)?;
    let compressed = compressor.finish()?;

    for chunk in compressed.chunks(IDAT_CHUNK_SIZE.max(1)) {
        writer.write_chunk(b"IDAT", chunk)?;
    }
    writer.write_end()?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel_black() -> Vec<u8> {
        vec![0u8, 0, 0]
    }

    #[test]
    fn one_by_one_black_pixel_round_trips_through_png_crate() {
        let data = one_pixel_black();
        let frame = Frame::new(&data, PixelFormat::Rgb24, 1, 1);
        let options = Options::new();
        let out = encode_png(Vec::new(), &frame, &options, false).unwrap();

        let decoder = png::Decoder::new(&out[..]);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!(info.width, 1);
        assert_eq!(info.height, 1);
        assert_eq!(&buf[..3], &[0, 0, 0]);
    }

    #[test]
    fn checkerboard_monoblack_forces_none_filter() {
        // 8x8 bit-packed checkerboard, one byte per row.
        let data: Vec<u8> = (0..8).map(|y| if y % 2 == 0 { 0xAA } else { 0x55 }).collect();
        let frame = Frame::new(&data, PixelFormat::MonoBlack, 8, 8);
        let rows = filter_rows(&frame, FilterMode::Mixed, false);
        for row in rows.chunks(2) {
            assert_eq!(row[0], crate::filter::FilterType::None as u8);
        }
    }

    #[test]
    fn rgba_two_by_two_round_trips() {
        let data = vec![
            255, 0, 0, 255, // opaque red
            0, 255, 0, 0, // transparent green
            0, 0, 255, 128, // translucent blue
            255, 255, 255, 255, // opaque white
        ];
        let frame = Frame::new(&data, PixelFormat::Rgba, 2, 2);
        let options = Options::new();
        let out = encode_png(Vec::new(), &frame, &options, false).unwrap();

        let decoder = png::Decoder::new(&out[..]);
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0u8; reader.output_buffer_size()];
        reader.next_frame(&mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn indexed_frame_emits_plte_and_trns_before_idat() {
        let palette = vec![0xFFFF0000u32, 0x80000000u32];
        let data = vec![0u8, 1, 1, 0];
        let frame = Frame::new(&data, PixelFormat::Pal8, 2, 2).with_palette(&palette);
        let options = Options::new();
        let out = encode_png(Vec::new(), &frame, &options, false).unwrap();

        let plte_pos = out.windows(4).position(|w| w == b"PLTE").unwrap();
        let trns_pos = out.windows(4).position(|w| w == b"tRNS").unwrap();
        let idat_pos = out.windows(4).position(|w| w == b"IDAT").unwrap();
        assert!(plte_pos < idat_pos);
        assert!(trns_pos < idat_pos);
        assert!(plte_pos < trns_pos);
    }
}
