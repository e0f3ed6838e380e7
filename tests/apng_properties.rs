//
// Integration tests driving the public Encoder through real decoders
// (the `png` crate for still images) and, for APNG, by walking the raw
// chunk stream directly -- png 0.17's animation API is feature-gated and
// these properties are easiest to check against the wire bytes anyway.
//

use apngenc::{Encoder, Frame, Options, PixelFormat};

fn chunks(data: &[u8]) -> Vec<(&[u8], &[u8])> {
    assert_eq!(&data[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    let mut out = Vec::new();
    let mut pos = 8;
    while pos < data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let tag = &data[pos + 4..pos + 8];
        let payload = &data[pos + 8..pos + 8 + len];
        let crc_pos = pos + 8 + len;
        let crc = u32::from_be_bytes([
            data[crc_pos],
            data[crc_pos + 1],
            data[crc_pos + 2],
            data[crc_pos + 3],
        ]);
        let mut digest = crc::crc32::Digest::new(crc::crc32::IEEE);
        use crc::Hasher32;
        digest.write(tag);
        digest.write(payload);
        assert_eq!(digest.sum32(), crc, "bad CRC on {:?} chunk", std::str::from_utf8(tag));
        out.push((tag, payload));
        pos = crc_pos + 4;
    }
    out
}

fn decode_still(data: &[u8]) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(data);
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();
    (info.width, info.height, buf)
}

#[test]
fn one_by_one_rgb24_black_round_trips() {
    let data = vec![0u8, 0, 0];
    let frame = Frame::new(&data, PixelFormat::Rgb24, 1, 1);
    let mut options = Options::new();
    options.set_filter_mode(apngenc::FilterMode::Fixed(apngenc::FilterType::None));
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_png(&frame, false).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    assert_eq!(cs[0].0, b"IHDR");
    assert_eq!(cs.last().unwrap().0, b"IEND");

    let (width, height, pixels) = decode_still(&out);
    assert_eq!((width, height), (1, 1));
    assert_eq!(&pixels[..3], &[0, 0, 0]);
}

#[test]
fn monoblack_checkerboard_bit_depth_is_one() {
    let data: Vec<u8> = (0..8).map(|y| if y % 2 == 0 { 0xAA } else { 0x55 }).collect();
    let frame = Frame::new(&data, PixelFormat::MonoBlack, 8, 8);
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_png(&frame, false).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    let ihdr = cs.iter().find(|(tag, _)| *tag == b"IHDR").unwrap().1;
    assert_eq!(ihdr[8], 1, "bit depth must be 1 for MonoBlack");
}

#[test]
fn indexed_palette_emits_ordered_plte_and_trns() {
    // Every index carries some transparency (alpha never reaches 0xFF), so
    // tRNS keeps all 256 bytes instead of trimming trailing opaque entries.
    let palette: Vec<u32> = (0..256u32).map(|i| ((i % 255) << 24) | 0x00112233).collect();
    let data: Vec<u8> = (0..256u32).map(|i| i as u8).collect();
    let frame = Frame::new(&data, PixelFormat::Pal8, 256, 1).with_palette(&palette);
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_png(&frame, false).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    let plte_idx = cs.iter().position(|(tag, _)| *tag == b"PLTE").unwrap();
    let trns_idx = cs.iter().position(|(tag, _)| *tag == b"tRNS").unwrap();
    let idat_idx = cs.iter().position(|(tag, _)| *tag == b"IDAT").unwrap();
    assert!(plte_idx < trns_idx);
    assert!(trns_idx < idat_idx);
    assert_eq!(cs[plte_idx].1.len(), 768);
    assert_eq!(cs[trns_idx].1.len(), 256);
}

#[test]
fn apng_sequence_numbers_are_gapless_across_fctl_and_fdat() {
    let a = vec![10u8; 16];
    let mut b = a.clone();
    b[5] = 200;
    let c = b.clone();

    let frames = vec![
        Frame::new(&a, PixelFormat::Gray8, 4, 4),
        Frame::new(&b, PixelFormat::Gray8, 4, 4),
        Frame::new(&c, PixelFormat::Gray8, 4, 4),
    ];
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_apng(&frames).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    assert!(cs.iter().any(|(tag, _)| *tag == b"acTL"));

    let mut seen = Vec::new();
    for (tag, payload) in &cs {
        if *tag == b"fcTL" || *tag == b"fdAT" {
            let seq = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            seen.push(seq);
        }
    }
    let expected: Vec<u32> = (0..seen.len() as u32).collect();
    assert_eq!(seen, expected, "sequence numbers must be 0,1,2,... with no gaps");
}

#[test]
fn apng_third_identical_frame_collapses_to_one_pixel_bbox() {
    let a = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9];
    let mut b = a.clone();
    b[4] = 250;
    let c = b.clone();

    let frames = vec![
        Frame::new(&a, PixelFormat::Gray8, 3, 3),
        Frame::new(&b, PixelFormat::Gray8, 3, 3),
        Frame::new(&c, PixelFormat::Gray8, 3, 3),
    ];
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_apng(&frames).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    let fctls: Vec<_> = cs.iter().filter(|(tag, _)| *tag == b"fcTL").map(|(_, p)| p).collect();
    assert_eq!(fctls.len(), 3);
    // Third frame (index 2) is identical to the second: its fcTL should be
    // a degenerate 1x1 box.
    let third = fctls[2];
    let w = u32::from_be_bytes([third[4], third[5], third[6], third[7]]);
    let h = u32::from_be_bytes([third[8], third[9], third[10], third[11]]);
    assert_eq!((w, h), (1, 1));
}

#[test]
fn apng_rgb24_frames_use_source_blend_and_exact_crop() {
    let width = 10u32;
    let height = 10u32;
    let mut a = vec![0u8; (width * height * 3) as usize];
    for p in a.chunks_mut(3) {
        p.copy_from_slice(&[30, 30, 30]);
    }
    let mut b = a.clone();
    // Differ in an exact 5x5 region at offset (2,3).
    for y in 3..8u32 {
        for x in 2..7u32 {
            let off = ((y * width + x) * 3) as usize;
            b[off..off + 3].copy_from_slice(&[200, 10, 10]);
        }
    }

    let frames = vec![
        Frame::new(&a, PixelFormat::Rgb24, width, height),
        Frame::new(&b, PixelFormat::Rgb24, width, height),
    ];
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_apng(&frames).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    let fctls: Vec<_> = cs.iter().filter(|(tag, _)| *tag == b"fcTL").map(|(_, p)| p).collect();
    assert_eq!(fctls.len(), 2);
    let second = fctls[1];
    let w = u32::from_be_bytes([second[4], second[5], second[6], second[7]]);
    let h = u32::from_be_bytes([second[8], second[9], second[10], second[11]]);
    let x = u32::from_be_bytes([second[12], second[13], second[14], second[15]]);
    let y = u32::from_be_bytes([second[16], second[17], second[18], second[19]]);
    let blend_op = second[25];
    assert_eq!((x, y, w, h), (2, 3, 5, 5));
    assert_eq!(blend_op, 0, "RGB24 has no alpha, so only SOURCE (0) is feasible");
}

/// Assembles one frame's cropped pixel data (already defiltered/inflated via
/// a standalone synthetic PNG) plus its fcTL fields.
struct DecodedFrame {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    dispose_op: u8,
    blend_op: u8,
    pixels: Vec<u8>,
}

fn write_standalone_chunk(out: &mut Vec<u8>, tag: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(payload);
    let mut digest = crc::crc32::Digest::new(crc::crc32::IEEE);
    use crc::Hasher32;
    digest.write(tag);
    digest.write(payload);
    out.extend_from_slice(&digest.sum32().to_be_bytes());
}

/// Decodes every APNG frame by rebuilding each one as a standalone PNG (its
/// own IHDR sized to the frame's bbox, its IDAT/fdAT payload renamed to
/// IDAT) and running it through the `png` crate -- the same inflate+defilter
/// path a real decoder uses, just invoked once per frame instead of letting
/// it walk fcTL/fdAT itself.
fn decode_apng_frames(data: &[u8], global_bit_depth: u8, global_color_type: u8) -> Vec<DecodedFrame> {
    let cs = chunks(data);
    let mut frames = Vec::new();
    let mut i = 0;
    while i < cs.len() {
        if cs[i].0 == b"fcTL" {
            let p = cs[i].1;
            let width = u32::from_be_bytes([p[4], p[5], p[6], p[7]]);
            let height = u32::from_be_bytes([p[8], p[9], p[10], p[11]]);
            let x = u32::from_be_bytes([p[12], p[13], p[14], p[15]]);
            let y = u32::from_be_bytes([p[16], p[17], p[18], p[19]]);
            let dispose_op = p[24];
            let blend_op = p[25];

            let mut idat = Vec::new();
            let mut j = i + 1;
            while j < cs.len() && (cs[j].0 == b"IDAT" || cs[j].0 == b"fdAT") {
                if cs[j].0 == b"IDAT" {
                    idat.extend_from_slice(cs[j].1);
                } else {
                    idat.extend_from_slice(&cs[j].1[4..]); // drop the sequence number
                }
                j += 1;
            }

            let mut synthetic = Vec::new();
            synthetic.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);
            let mut ihdr = Vec::new();
            ihdr.extend_from_slice(&width.to_be_bytes());
            ihdr.extend_from_slice(&height.to_be_bytes());
            ihdr.push(global_bit_depth);
            ihdr.push(global_color_type);
            ihdr.extend_from_slice(&[0, 0, 0]); // deflate / standard filter / no interlace
            write_standalone_chunk(&mut synthetic, b"IHDR", &ihdr);
            write_standalone_chunk(&mut synthetic, b"IDAT", &idat);
            write_standalone_chunk(&mut synthetic, b"IEND", &[]);

            let decoder = png::Decoder::new(synthetic.as_slice());
            let mut reader = decoder.read_info().unwrap();
            let mut buf = vec![0u8; reader.output_buffer_size()];
            reader.next_frame(&mut buf).unwrap();

            frames.push(DecodedFrame { x, y, width, height, dispose_op, blend_op, pixels: buf });
            i = j;
        } else {
            i += 1;
        }
    }
    frames
}

/// Replays the dispose/blend state machine a real APNG decoder runs, using
/// the same exact trivial-case composite the encoder relies on: a zero-alpha
/// source leaves the canvas untouched, and a fully-opaque source (or a
/// fully-transparent canvas underneath) is copied verbatim. Any other
/// combination means the stream asked for a non-trivial blend this encoder
/// should never produce.
fn composite_over(canvas: &mut [u8], bbox_w: u32, x: u32, y: u32, w: u32, src: &[u8]) {
    for dy in 0..(src.len() as u32 / (w * 4)) {
        for dx in 0..w {
            let so = ((dy * w + dx) * 4) as usize;
            let co = (((y + dy) * bbox_w + (x + dx)) * 4) as usize;
            let src_px = &src[so..so + 4];
            let src_a = src_px[3];
            if src_a == 0 {
                continue;
            }
            let dst_a = canvas[co + 3];
            assert!(
                src_a == 255 || dst_a == 0,
                "composite asked for a non-trivial OVER blend: src_a={src_a}, dst_a={dst_a}"
            );
            canvas[co..co + 4].copy_from_slice(src_px);
        }
    }
}

#[test]
fn apng_rgba_partial_alpha_overlay_round_trips_through_over_blend() {
    let a: Vec<u8> = vec![10, 20, 30, 255, 10, 20, 30, 255];
    let mut b = a.clone();
    b[4..8].copy_from_slice(&[0, 0, 0, 0]);
    let mut c = b.clone();
    c[4..8].copy_from_slice(&[100, 150, 200, 128]);

    let frames = vec![
        Frame::new(&a, PixelFormat::Rgba, 2, 1),
        Frame::new(&b, PixelFormat::Rgba, 2, 1),
        Frame::new(&c, PixelFormat::Rgba, 2, 1),
    ];
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    enc.encode_apng(&frames).unwrap();
    let out = enc.close().unwrap();

    let cs = chunks(&out);
    let ihdr = cs.iter().find(|(tag, _)| *tag == b"IHDR").unwrap().1;
    let decoded = decode_apng_frames(&out, ihdr[8], ihdr[9]);
    assert_eq!(decoded.len(), 3);

    // At least one of these three frames must actually exercise OVER with a
    // genuinely partial alpha value, or this test isn't checking what it
    // claims to.
    assert!(decoded.iter().any(|f| f.blend_op == 1), "no frame used BlendOp::Over");

    let mut canvas = vec![0u8; 2 * 1 * 4];
    let mut prev_bbox: Option<(u32, u32, u32, u32)> = None;
    let expected = [&a, &b, &c];
    for (frame, expect) in decoded.iter().zip(expected.iter()) {
        if let Some((px, py, pw, ph)) = prev_bbox {
            if frame.dispose_op == 1 {
                // Background: clear the previous frame's own region.
                for dy in 0..ph {
                    for dx in 0..pw {
                        let o = (((py + dy) * 2 + (px + dx)) * 4) as usize;
                        canvas[o..o + 4].copy_from_slice(&[0, 0, 0, 0]);
                    }
                }
            }
        }
        match frame.blend_op {
            0 => {
                for dy in 0..frame.height {
                    for dx in 0..frame.width {
                        let so = ((dy * frame.width + dx) * 4) as usize;
                        let co = (((frame.y + dy) * 2 + (frame.x + dx)) * 4) as usize;
                        canvas[co..co + 4].copy_from_slice(&frame.pixels[so..so + 4]);
                    }
                }
            }
            _ => composite_over(&mut canvas, 2, frame.x, frame.y, frame.width, &frame.pixels),
        }
        assert_eq!(&canvas[..], &expect[..], "canvas mismatch after a frame");
        prev_bbox = Some((frame.x, frame.y, frame.width, frame.height));
    }
}

#[test]
fn apng_rejects_a_second_frame_with_a_different_palette() {
    let pal_a = vec![0xFF000000u32, 0xFFFFFFFFu32];
    let pal_b = vec![0xFFFFFFFFu32, 0xFF000000u32];
    let a = vec![0u8, 1, 1, 0];
    let b = vec![1u8, 0, 0, 1];

    let frames = vec![
        Frame::new(&a, PixelFormat::Pal8, 2, 2).with_palette(&pal_a),
        Frame::new(&b, PixelFormat::Pal8, 2, 2).with_palette(&pal_b),
    ];
    let options = Options::new();
    let mut enc = Encoder::open(Vec::new(), options);
    assert!(enc.encode_apng(&frames).is_err());
}
