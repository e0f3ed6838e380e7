//
// apngenc - still PNG and animated APNG frame encoder
// filter.rs - per-scanline PNG prediction filters
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

use std::cmp;
use std::convert::TryFrom;
use std::io;

use crate::pixels::PixelFormat;
use crate::utils::{diff_bytes, invalid_input};

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl TryFrom<u8> for FilterType {
    type Error = io::Error;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            _ => Err(invalid_input("Invalid filter type constant")),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum FilterMode {
    Mixed,
    Fixed(FilterType),
}

//
// Using a runtime bpp variable in the inner loop slows things down;
// specialize the filter functions for each possible constant size.
//
macro_rules! filter_specialize {
    ( $filter_macro:ident, $bpp:expr, $prev:expr, $src:expr, $dest:expr ) => {{
        match $bpp {
            1 => $filter_macro!(1, $prev, $src, $dest), // indexed, greyscale@8, monoblack
            2 => $filter_macro!(2, $prev, $src, $dest), // greyscale@16, greyscale+alpha@8
            3 => $filter_macro!(3, $prev, $src, $dest), // truecolor@8
            4 => $filter_macro!(4, $prev, $src, $dest), // truecolor+alpha@8, greyscale+alpha@16
            6 => $filter_macro!(6, $prev, $src, $dest), // truecolor@16
            8 => $filter_macro!(8, $prev, $src, $dest), // truecolor+alpha@16
            _ => panic!("Invalid bpp, should never happen."),
        }
    }};
}

fn filter_none(_bpp: usize, _prev: &[u8], src: &[u8], dest: &mut [u8]) {
    dest[0] = FilterType::None as u8;
    dest[1..].clone_from_slice(src);
}

macro_rules! filter_sub {
    ( $bpp:expr, $prev:expr, $src:expr, $dest:expr ) => {{
        $dest[0] = FilterType::Sub as u8;

        let out = &mut $dest[1..];
        out[0..$bpp].clone_from_slice(&$src[0..$bpp]);

        let len = $src.len();
        diff_bytes(&$src[$bpp..len], &$src[0..len - $bpp], &mut out[$bpp..len]);
    }};
}

fn filter_sub(bpp: usize, prev: &[u8], src: &[u8], dest: &mut [u8]) {
    filter_specialize!(filter_sub, bpp, prev, src, dest);
}

fn filter_up(_bpp: usize, prev: &[u8], src: &[u8], dest: &mut [u8]) {
    dest[0] = FilterType::Up as u8;
    diff_bytes(src, prev, &mut dest[1..]);
}

macro_rules! filter_average {
    ( $bpp:expr, $prev:expr, $src:expr, $dest:expr ) => {{
        $dest[0] = FilterType::Average as u8;

        let out = &mut $dest[1..];
        for i in 0..$bpp {
            let above = $prev[i];
            let avg = (above as u32 / 2) as u8;
            out[i] = $src[i].wrapping_sub(avg);
        }

        let len = $src.len();
        for i in $bpp..len {
            let left = $src[i - $bpp];
            let above = $prev[i];
            let avg = ((left as u32 + above as u32) / 2) as u8;
            out[i] = $src[i].wrapping_sub(avg);
        }
    }};
}

fn filter_average(bpp: usize, prev: &[u8], src: &[u8], dest: &mut [u8]) {
    filter_specialize!(filter_average, bpp, prev, src, dest);
}

// From the PNG standard. Ties broken a < b < c.
fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;

    let p = a + b - c;
    let pa = i32::abs(p - a);
    let pb = i32::abs(p - b);
    let pc = i32::abs(p - c);
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

macro_rules! filter_paeth {
    ( $bpp:expr, $prev:expr, $src:expr, $dest:expr ) => {{
        $dest[0] = FilterType::Paeth as u8;

        let out = &mut $dest[1..];
        for i in 0..$bpp {
            let left = 0;
            let above = $prev[i];
            let upper_left = 0;
            let predict = paeth_predictor(left, above, upper_left);
            out[i] = $src[i].wrapping_sub(predict);
        }

        let len = $src.len();
        for i in $bpp..len {
            let left = $src[i - $bpp];
            let above = $prev[i];
            let upper_left = $prev[i - $bpp];
            let predict = paeth_predictor(left, above, upper_left);
            out[i] = $src[i].wrapping_sub(predict);
        }
    }};
}

fn filter_paeth(bpp: usize, prev: &[u8], src: &[u8], dest: &mut [u8]) {
    filter_specialize!(filter_paeth, bpp, prev, src, dest);
}

//
// Cheap proxy for post-deflate size: sum of the filtered bytes read as
// signed i8 magnitudes. The filter type byte itself participates, since it
// rides along in the compressed stream too.
//
fn estimate_complexity(filtered_row: &[u8]) -> i64 {
    let mut sum = 0i64;
    for &b in filtered_row {
        let val = 128 - i32::abs(b as i32 - 128);
        sum += val as i64;
    }
    i64::abs(sum)
}

//
// Holds one candidate filtered row. Reused across calls to filter().
//
struct Filterator {
    filter: FilterType,
    bpp: usize,
    data: Vec<u8>,
    complexity: i64,
}

impl Filterator {
    fn new(filter: FilterType, bpp: usize, stride: usize) -> Filterator {
        Filterator {
            filter,
            bpp,
            data: vec![0u8; stride + 1],
            complexity: 0,
        }
    }

    fn filter(&mut self, prev: &[u8], src: &[u8]) -> &[u8] {
        match self.filter {
            FilterType::None => filter_none(self.bpp, prev, src, &mut self.data),
            FilterType::Sub => filter_sub(self.bpp, prev, src, &mut self.data),
            FilterType::Up => filter_up(self.bpp, prev, src, &mut self.data),
            FilterType::Average => filter_average(self.bpp, prev, src, &mut self.data),
            FilterType::Paeth => filter_paeth(self.bpp, prev, src, &mut self.data),
        }
        self.complexity = estimate_complexity(&self.data);
        &self.data
    }

    fn get_data(&self) -> &[u8] {
        &self.data
    }

    fn get_complexity(&self) -> i64 {
        self.complexity
    }
}

/// Selects a filter per row: either a fixed filter, or (Mixed) the minimum
/// sum-of-absolute-values candidate among all five.
pub struct AdaptiveFilter {
    mode: FilterMode,
    mono: bool,
    filter_none: Filterator,
    filter_up: Filterator,
    filter_sub: Filterator,
    filter_average: Filterator,
    filter_paeth: Filterator,
}

impl AdaptiveFilter {
    pub fn new(format: PixelFormat, width: u32, mode: FilterMode) -> AdaptiveFilter {
        let stride = format.stride(width);
        let bpp = cmp::max(1, format.filter_bpp());
        AdaptiveFilter {
            mode,
            mono: format == PixelFormat::MonoBlack,
            filter_none: Filterator::new(FilterType::None, bpp, stride),
            filter_up: Filterator::new(FilterType::Up, bpp, stride),
            filter_sub: Filterator::new(FilterType::Sub, bpp, stride),
            filter_average: Filterator::new(FilterType::Average, bpp, stride),
            filter_paeth: Filterator::new(FilterType::Paeth, bpp, stride),
        }
    }

    fn filter_mixed(&mut self, prev: &[u8], src: &[u8], has_prev: bool) -> &[u8] {
        // Without a real row above, Up/Average/Paeth would just be reading
        // zeroes; downgrade straight to Sub rather than let them "win" on
        // a meaningless zero-filled prev row.
        if !has_prev {
            return self.filter_sub.filter(prev, src);
        }

        self.filter_sub.filter(prev, src);
        let mut min = self.filter_sub.get_complexity();
        let mut best = FilterType::Sub;

        self.filter_up.filter(prev, src);
        if self.filter_up.get_complexity() < min {
            min = self.filter_up.get_complexity();
            best = FilterType::Up;
        }

        self.filter_average.filter(prev, src);
        if self.filter_average.get_complexity() < min {
            min = self.filter_average.get_complexity();
            best = FilterType::Average;
        }

        self.filter_paeth.filter(prev, src);
        if self.filter_paeth.get_complexity() < min {
            best = FilterType::Paeth;
        }

        match best {
            FilterType::Sub => self.filter_sub.get_data(),
            FilterType::Up => self.filter_up.get_data(),
            FilterType::Average => self.filter_average.get_data(),
            FilterType::Paeth => self.filter_paeth.get_data(),
            FilterType::None => unreachable!(),
        }
    }

    /// Filter one row. `prev` is the previous output row (same pass, for
    /// interlaced data), or a zero-filled buffer when there is none; in
    /// that case pass `has_prev = false` so filters requiring `top` are
    /// downgraded rather than reading meaningless zeroes.
    pub fn filter(&mut self, prev: &[u8], src: &[u8], has_prev: bool) -> &[u8] {
        if self.mono {
            return self.filter_none.filter(prev, src);
        }
        match self.mode {
            FilterMode::Fixed(FilterType::None) => self.filter_none.filter(prev, src),
            FilterMode::Fixed(FilterType::Sub) => self.filter_sub.filter(prev, src),
            FilterMode::Fixed(FilterType::Up) => {
                if has_prev {
                    self.filter_up.filter(prev, src)
                } else {
                    self.filter_sub.filter(prev, src)
                }
            }
            FilterMode::Fixed(FilterType::Average) => self.filter_average.filter(prev, src),
            FilterMode::Fixed(FilterType::Paeth) => self.filter_paeth.filter(prev, src),
            FilterMode::Mixed => self.filter_mixed(prev, src, has_prev),
        }
    }
}
