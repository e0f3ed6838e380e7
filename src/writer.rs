//
// apngenc - still PNG and animated APNG frame encoder
// writer.rs - low-level PNG/APNG chunk writer
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

use crc::crc32;
use crc::Hasher32;

use std::io;
use std::io::Write;

use crate::header::Header;
use crate::utils::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposeOp {
    None = 0,
    Background = 1,
    Previous = 2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BlendOp {
    Source = 0,
    Over = 1,
}

/// One fcTL chunk's worth of frame-control fields (section 4.1/4.8's
/// per-frame metadata).
pub struct FrameControl {
    pub sequence_number: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: DisposeOp,
    pub blend_op: BlendOp,
}

pub struct Writer<W: Write> {
    output: W,
}

impl<W: Write> Writer<W> {
    //
    // Creates a new PNG chunk stream writer.
    // Consumes the output Write object, but will
    // give it back to you via Writer::finish().
    //
    pub fn new(output: W) -> Writer<W> {
        Writer { output }
    }

    //
    // Close out the writer and return the Write
    // passed in originally so it can be used for
    // further output if necessary.
    //
    pub fn finish(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.output)
    }

    //
    // Write the PNG file signature to output stream.
    // https://www.w3.org/TR/PNG/#5PNG-file-signature
    //
    pub fn write_signature(&mut self) -> IoResult {
        let bytes = [137u8, 80, 78, 71, 13, 10, 26, 10];
        self.write_bytes(&bytes)
    }

    fn write_be32_inner(&mut self, val: u32) -> IoResult {
        write_be32(&mut self.output, val)
    }

    fn write_bytes(&mut self, data: &[u8]) -> IoResult {
        self.output.write_all(data)
    }

    //
    // Write a chunk to the output stream.
    //
    // https://www.w3.org/TR/PNG/#5DataRep
    // https://www.w3.org/TR/PNG/#5CRC-algorithm
    //
    pub fn write_chunk(&mut self, tag: &[u8], data: &[u8]) -> IoResult {
        if tag.len() != 4 {
            return Err(invalid_input("Chunk tags must be 4 bytes"));
        }
        if data.len() > u32::max_value() as usize {
            return Err(invalid_input("Data chunks cannot exceed 4 GiB - 1 byte"));
        }

        // CRC covers both tag and data.
        let mut digest = crc32::Digest::new(crc32::IEEE);
        digest.write(tag);
        digest.write(data);
        let checksum = digest.sum32();

        self.write_be32_inner(data.len() as u32)?;
        self.write_bytes(tag)?;
        self.write_bytes(data)?;
        self.write_be32_inner(checksum)
    }

    //
    // IHDR - first chunk in the file.
    // https://www.w3.org/TR/PNG/#11IHDR
    //
    pub fn write_header(&mut self, header: &Header) -> IoResult {
        let data = header.ihdr_payload()?;
        self.write_chunk(b"IHDR", &data)
    }

    //
    // acTL - animation control, precedes the first IDAT in an APNG.
    //
    pub fn write_actl(&mut self, num_frames: u32, num_plays: u32) -> IoResult {
        let mut data = Vec::<u8>::new();
        write_be32(&mut data, num_frames)?;
        write_be32(&mut data, num_plays)?;
        self.write_chunk(b"acTL", &data)
    }

    //
    // fcTL - frame control, precedes each frame's image data.
    //
    pub fn write_fctl(&mut self, fc: &FrameControl) -> IoResult {
        let mut data = Vec::<u8>::new();
        write_be32(&mut data, fc.sequence_number)?;
        write_be32(&mut data, fc.width)?;
        write_be32(&mut data, fc.height)?;
        write_be32(&mut data, fc.x_offset)?;
        write_be32(&mut data, fc.y_offset)?;
        write_be16(&mut data, fc.delay_num)?;
        write_be16(&mut data, fc.delay_den)?;
        write_byte(&mut data, fc.dispose_op as u8)?;
        write_byte(&mut data, fc.blend_op as u8)?;
        self.write_chunk(b"fcTL", &data)
    }

    //
    // fdAT - frame data for any frame after the first. The first frame's
    // pixels always ride in IDAT instead, per the APNG spec.
    //
    pub fn write_fdat(&mut self, sequence_number: u32, data: &[u8]) -> IoResult {
        let mut payload = Vec::with_capacity(data.len() + 4);
        write_be32(&mut payload, sequence_number)?;
        payload.extend_from_slice(data);
        self.write_chunk(b"fdAT", &payload)
    }

    //
    // IEND - last chunk in the file.
    // https://www.w3.org/TR/PNG/#11IEND
    //
    pub fn write_end(&mut self) -> IoResult {
        self.write_chunk(b"IEND", b"")
    }

    //
    // Flush output.
    //
    pub fn flush(&mut self) -> IoResult {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelFormat;

    fn test_writer<F, G>(test_func: F, assert_func: G)
    where
        F: Fn(&mut Writer<Vec<u8>>) -> IoResult,
        G: Fn(&[u8]),
    {
        let result = (|| -> io::Result<Vec<u8>> {
            let output = Vec::<u8>::new();
            let mut writer = Writer::new(output);
            test_func(&mut writer)?;
            writer.finish()
        })();
        match result {
            Ok(output) => assert_func(&output),
            Err(e) => panic!("Error: {}", e),
        }
    }

    #[test]
    fn it_works() {
        test_writer(|_writer| Ok(()), |output| assert_eq!(output.len(), 0))
    }

    #[test]
    fn header_works() {
        test_writer(
            |writer| writer.write_signature(),
            |output| assert_eq!(output.len(), 8),
        )
    }

    #[test]
    fn empty_chunk_works() {
        test_writer(
            |writer| writer.write_chunk(b"IDAT", b""),
            |output| assert_eq!(output.len(), 12),
        )
    }

    #[test]
    fn crc_works() {
        // From a 1x1 truecolor black pixel made with gd
        let one_pixel = b"\x08\x99\x63\x60\x60\x60\x00\x00\x00\x04\x00\x01";
        test_writer(
            |writer| writer.write_chunk(b"IDAT", one_pixel),
            |output| {
                assert_eq!(output[0..4], b"\x00\x00\x00\x0c"[..], "expected length 12");
                assert_eq!(output[4..8], b"IDAT"[..], "expected IDAT");
                assert_eq!(output[8..20], one_pixel[..], "expected data payload");
                assert_eq!(output[20..24], b"\xa3\x0a\x15\xe3"[..], "expected crc32");
            },
        )
    }

    #[test]
    fn fctl_payload_is_26_bytes() {
        test_writer(
            |writer| {
                writer.write_fctl(&FrameControl {
                    sequence_number: 0,
                    width: 4,
                    height: 4,
                    x_offset: 0,
                    y_offset: 0,
                    delay_num: 1,
                    delay_den: 30,
                    dispose_op: DisposeOp::None,
                    blend_op: BlendOp::Source,
                })
            },
            |output| {
                // 4 len + 4 tag + 26 payload + 4 crc
                assert_eq!(output.len(), 38);
                assert_eq!(&output[0..4], &[0, 0, 0, 26]);
            },
        )
    }

    #[test]
    fn header_roundtrips_dimensions() {
        test_writer(
            |writer| {
                let header = Header::new(10, 20, PixelFormat::Rgb24, false).unwrap();
                writer.write_header(&header)
            },
            |output| {
                assert_eq!(&output[4..8], b"IHDR");
                assert_eq!(&output[8..12], &[0, 0, 0, 10]);
                assert_eq!(&output[12..16], &[0, 0, 0, 20]);
            },
        )
    }
}
