//
// apngenc - still PNG and animated APNG frame encoder
// deflate.rs - wrapper for the zlib wire format, reusable across frames
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
use std::mem;
use std::os::raw::*;

// libz-rs-sys is a pure-Rust reimplementation of the classic zlib C ABI and
// is the default backend; libz-sys (the real C library) remains available
// behind the `zlib` feature for hosts that already link it elsewhere.
#[cfg(feature = "zlib-rs")]
use libz_rs_sys as zsys;
#[cfg(all(feature = "zlib", not(feature = "zlib-rs")))]
use libz_sys as zsys;

use zsys::*;

use super::utils::*;

pub struct Options {
    level: c_int,
    method: c_int,
    window_bits: c_int,
    mem_level: c_int,
    strategy: c_int,
}

#[repr(i32)]
#[derive(Copy, Clone)]
pub enum Strategy {
    Default = Z_DEFAULT_STRATEGY,
    Filtered = Z_FILTERED,
    HuffmanOnly = Z_HUFFMAN_ONLY,
    RLE = Z_RLE,
    Fixed = Z_FIXED,
}

impl TryFrom<u8> for Strategy {
    type Error = io::Error;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(Strategy::Default),
            1 => Ok(Strategy::Filtered),
            2 => Ok(Strategy::HuffmanOnly),
            3 => Ok(Strategy::RLE),
            4 => Ok(Strategy::Fixed),
            _ => Err(invalid_input("Invalid strategy constant")),
        }
    }
}

impl Options {
    pub fn new() -> Options {
        Options {
            level: Z_DEFAULT_COMPRESSION,
            method: Z_DEFLATED,
            // Full zlib wrapper (header + Adler-32 trailer): the PNG IDAT/fdAT
            // stream is a zlib datastream per the spec, not raw DEFLATE.
            window_bits: 15,
            mem_level: 8,
            strategy: Z_DEFAULT_STRATEGY,
        }
    }

    //
    // Compression level, 0 (store) - 9 (max)
    //
    pub fn set_level(&mut self, level: i32) {
        self.level = level as c_int;
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy as c_int;
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}

#[derive(Copy, Clone)]
pub enum Flush {
    SyncFlush = Z_SYNC_FLUSH as isize,
    Finish = Z_FINISH as isize,
}

/// A streaming zlib encoder over a bounded caller-owned buffer. Unlike a
/// one-shot compressor, this is reset rather than torn down at the end of
/// each frame, so the underlying allocations (window, hash chains) survive
/// across an APNG's whole frame sequence.
pub struct Deflate<W: Write> {
    output: W,
    options: Options,
    initialized: bool,
    stream: Box<z_stream>,
}

impl<W: Write> Deflate<W> {
    pub fn new(options: Options, w: W) -> Deflate<W> {
        Deflate {
            output: w,
            options,
            initialized: false,
            stream: Box::new(unsafe {
                let maybe = mem::MaybeUninit::<z_stream>::zeroed();
                maybe.assume_init()
            }),
        }
    }

    pub fn init(&mut self) -> IoResult {
        if self.initialized {
            Ok(())
        } else {
            let ret = unsafe {
                deflateInit2_(
                    &mut *self.stream,
                    self.options.level,
                    self.options.method,
                    self.options.window_bits,
                    self.options.mem_level,
                    self.options.strategy,
                    zlibVersion(),
                    mem::size_of::<z_stream>() as c_int,
                )
            };
            match ret {
                Z_OK => {
                    self.initialized = true;
                    Ok(())
                }
                Z_MEM_ERROR => Err(other("Out of memory")),
                Z_STREAM_ERROR => Err(invalid_input("Invalid parameter")),
                Z_VERSION_ERROR => Err(invalid_input("Incompatible version of zlib")),
                _ => Err(other("Unexpected error")),
            }
        }
    }

    pub fn set_dictionary(&mut self, dict: &[u8]) -> IoResult {
        self.init()?;
        let ret =
            unsafe { deflateSetDictionary(&mut *self.stream, &dict[0], dict.len() as c_uint) };
        match ret {
            Z_OK => Ok(()),
            Z_STREAM_ERROR => Err(invalid_input("Invalid parameter")),
            _ => Err(other("Unexpected error")),
        }
    }

    /// Worst-case compressed size of `input_len` bytes fed in one shot,
    /// per the underlying library's own bound function. Used by the still
    /// and APNG drivers to size their packet buffers up front.
    pub fn bound(&mut self, input_len: usize) -> io::Result<usize> {
        self.init()?;
        let bound = unsafe { deflateBound(&mut *self.stream, input_len as c_ulong) };
        Ok(bound as usize)
    }

    fn deflate(&mut self, data: &[u8], flush: Flush) -> IoResult {
        self.init()?;
        let mut buffer = [0u8; 128 * 1024];
        let stream = &mut *self.stream;
        stream.next_in = if data.is_empty() {
            std::ptr::null_mut()
        } else {
            &data[0] as *const u8 as *mut u8
        };
        stream.avail_in = data.len() as c_uint;
        loop {
            stream.next_out = &mut buffer[0] as *mut u8;
            stream.avail_out = buffer.len() as c_uint;
            let ret = unsafe { deflate(stream, flush as c_int) };
            match ret {
                Z_OK | Z_STREAM_END => {
                    let end = buffer.len() - stream.avail_out as usize;
                    self.output.write_all(&buffer[0..end])?;
                    if stream.avail_out == 0 {
                        // Must call again; more output available.
                        continue;
                    } else {
                        return Ok(());
                    }
                }
                Z_STREAM_ERROR => return Err(invalid_input("Inconsistent stream state")),
                Z_BUF_ERROR => return Err(other("No progress possible")),
                _ => return Err(other("Unexpected error")),
            }
        }
    }

    pub fn write(&mut self, data: &[u8], flush: Flush) -> IoResult {
        self.init()?;
        self.deflate(data, flush)
    }

    /// Ends the current zlib stream (its trailer has already been written
    /// by a prior `write(.., Flush::Finish)`) and resets internal state so
    /// the same allocation can start a fresh stream for the next frame.
    /// The underlying window/hash-chain memory is preserved; only the
    /// per-stream counters and bit buffer are cleared.
    pub fn reset(&mut self) -> IoResult {
        if !self.initialized {
            return self.init();
        }
        let ret = unsafe { deflateReset(&mut *self.stream) };
        match ret {
            Z_OK => Ok(()),
            Z_STREAM_ERROR => Err(invalid_input("Inconsistent stream state")),
            _ => Err(other("Unexpected error")),
        }
    }

    //
    // Deallocate the zlib state and return the writer.
    //
    pub fn finish(mut self) -> io::Result<W> {
        if self.initialized {
            let ret = unsafe { deflateEnd(&mut *self.stream) };
            match ret {
                // Z_DATA_ERROR means we freed before finishing the stream.
                // For our use case we do this deliberately, it's ok!
                Z_OK | Z_DATA_ERROR => Ok(self.output),
                Z_STREAM_ERROR => Err(invalid_input("Inconsistent stream state")),
                _ => Err(other("Unexpected error")),
            }
        } else {
            Ok(self.output)
        }
    }
}

impl Deflate<Vec<u8>> {
    /// Lifts the bytes compressed so far out of the stream without tearing
    /// it down, so the same allocation can serve the next frame after a
    /// `reset()`.
    pub fn take_buffer(&mut self) -> Vec<u8> {
        mem::take(&mut self.output)
    }
}
