//
// apngenc - still PNG and animated APNG frame encoder
// apng/optimize.rs - inverse-blend dispose x blend search
//
// No direct precedent in the example pack (andreasots-eris's apng module
// always emits DisposeOp::None/BlendOp::Source and never crops), so this
// is grounded directly in the APNG specification's dispose_op/blend_op
// semantics; the bounding-box/working-buffer shape follows filter.rs and
// interlace.rs's row-at-a-time style.
//

use crate::pixels::PixelFormat;
use crate::writer::{BlendOp, DisposeOp};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The chosen encoding for one APNG frame transition: the dispose op to
/// stamp on the *previous* frame's fcTL, and the blend op plus cropped
/// source pixels to stamp on *this* frame's fcTL/fdAT.
pub struct Placement {
    pub bbox: Rect,
    pub blend_op: BlendOp,
    pub prev_dispose_op: DisposeOp,
    /// Pixels to encode for `bbox`: one palette index per pixel (widened to
    /// u16) for `Pal8`, or four RGBA16 channels per pixel for every other
    /// format. Already inverse-blended when `blend_op` is `Over`.
    pub pixels: Vec<u16>,
}

fn get_pixel(buf: &[u16], width: u32, x: u32, y: u32) -> [u16; 4] {
    let o = (y as usize * width as usize + x as usize) * 4;
    [buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]
}

fn pixels_equal(a: [u16; 4], b: [u16; 4]) -> bool {
    a == b
}

enum OverCase {
    /// `dst` already equals `target`: a fully transparent source changes
    /// nothing, which is exactly what's needed.
    Transparent,
    /// `target` is fully opaque, or `dst` is fully transparent: OVER
    /// degenerates to "the output is just the source", so the source is
    /// `target` itself, copied verbatim.
    CopyForeground,
}

/// Section 4.7's exact OVER feasibility test: no continuous blending or
/// quantization, just the two trivial cases under which compositing
/// degenerates to a copy. Anything else is infeasible.
fn inverse_over_feasible(dst: [u16; 4], target: [u16; 4], max: u16) -> Option<OverCase> {
    if dst == target {
        Some(OverCase::Transparent)
    } else if target[3] == max || dst[3] == 0 {
        Some(OverCase::CopyForeground)
    } else {
        None
    }
}

fn bounding_box_of_diff(a: &[u16], b: &[u16], width: u32, height: u32) -> Option<Rect> {
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut any = false;

    for y in 0..height {
        for x in 0..width {
            if !pixels_equal(get_pixel(a, width, x, y), get_pixel(b, width, x, y)) {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }

    if !any {
        None
    } else {
        Some(Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }
}

/// Tries to express `target` as `blend`-composited over `canvas` within
/// `bbox`; returns the cropped pixels to encode on success. `target_native`
/// is the target frame's raw pixel bytes (full canvas, native format),
/// consulted only for `Pal8`, whose output must be an actual palette index
/// rather than a reconstructed color.
fn try_blend(
    canvas: &[u16],
    target: &[u16],
    target_native: Option<&[u8]>,
    width: u32,
    bbox: Rect,
    blend: BlendOp,
    max: u16,
    transparent_index: Option<u8>,
) -> Option<Vec<u16>> {
    let native_index = |x: u32, y: u32| -> u16 { target_native.unwrap()[(y * width + x) as usize] as u16 };

    let mut pixels = Vec::with_capacity(
        bbox.width as usize * bbox.height as usize * if target_native.is_some() { 1 } else { 4 },
    );
    for y in bbox.y..bbox.y + bbox.height {
        for x in bbox.x..bbox.x + bbox.width {
            let t = get_pixel(target, width, x, y);
            match blend {
                BlendOp::Source => {
                    if target_native.is_some() {
                        pixels.push(native_index(x, y));
                    } else {
                        pixels.extend_from_slice(&t);
                    }
                }
                BlendOp::Over => {
                    let dst = get_pixel(canvas, width, x, y);
                    match inverse_over_feasible(dst, t, max)? {
                        OverCase::Transparent if target_native.is_some() => {
                            pixels.push(transparent_index? as u16);
                        }
                        OverCase::Transparent => {
                            pixels.extend_from_slice(&[0, 0, 0, 0]);
                        }
                        OverCase::CopyForeground if target_native.is_some() => {
                            pixels.push(native_index(x, y));
                        }
                        OverCase::CopyForeground => {
                            pixels.extend_from_slice(&t);
                        }
                    }
                }
            }
        }
    }
    Some(pixels)
}

/// Incremental state for one APNG's frame sequence, tracked in a 16-bit
/// RGBA working space regardless of the caller's actual pixel format.
pub struct Optimizer {
    width: u32,
    height: u32,
    format: PixelFormat,
    channel_max: u16,
    /// `Pal8` only: index of a palette entry whose alpha is 0, if one
    /// exists. Without one, `Pal8` has no way to express "transparent" and
    /// `Over` is never feasible for it.
    transparent_index: Option<u8>,
    /// Canvas exactly as currently displayed (post most-recent blend).
    displayed: Vec<u16>,
    /// Canvas immediately before the most recently placed frame's blend,
    /// i.e. the restore target for a `Previous` dispose applied after it.
    pre_blend: Vec<u16>,
    /// Region the most recently placed frame actually touched.
    region: Rect,
}

impl Optimizer {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Optimizer {
        let size = width as usize * height as usize * 4;
        Optimizer {
            width,
            height,
            format,
            channel_max: format.channel_max(),
            transparent_index: None,
            displayed: vec![0u16; size],
            pre_blend: vec![0u16; size],
            region: Rect {
                x: 0,
                y: 0,
                width,
                height,
            },
        }
    }

    /// Records which palette index (if any) is fully transparent, once the
    /// animation's shared palette is known. Only meaningful for `Pal8`.
    pub fn set_transparent_index(&mut self, index: Option<u8>) {
        self.transparent_index = index;
    }

    fn allow_over(&self) -> bool {
        match self.format {
            PixelFormat::Pal8 => self.transparent_index.is_some(),
            other => other.exact_alpha_roundtrip(),
        }
    }

    /// Seeds the optimizer with the first frame's RGBA16 pixels. The first
    /// frame always covers the full canvas with SOURCE blend: there is
    /// nothing underneath it to blend against yet.
    pub fn seed(&mut self, first_rgba: &[u16]) {
        self.displayed.copy_from_slice(first_rgba);
        self.region = Rect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        };
    }

    fn disposed_canvas(&self, op: DisposeOp) -> Vec<u16> {
        let mut canvas = self.displayed.clone();
        match op {
            DisposeOp::None => {}
            DisposeOp::Background => {
                for y in self.region.y..self.region.y + self.region.height {
                    for x in self.region.x..self.region.x + self.region.width {
                        let o = (y as usize * self.width as usize + x as usize) * 4;
                        canvas[o..o + 4].copy_from_slice(&[0, 0, 0, 0]);
                    }
                }
            }
            DisposeOp::Previous => {
                for y in self.region.y..self.region.y + self.region.height {
                    for x in self.region.x..self.region.x + self.region.width {
                        let o = (y as usize * self.width as usize + x as usize) * 4;
                        canvas[o..o + 4].copy_from_slice(&self.pre_blend[o..o + 4]);
                    }
                }
            }
        }
        canvas
    }

    /// Finds the minimal-area (dispose, blend, bbox) placement for the
    /// next frame and commits it as the new display state. `target_native`
    /// is that frame's raw pixel bytes, consulted only for `Pal8`.
    pub fn next(&mut self, target_rgba: &[u16], target_native: &[u8]) -> Placement {
        let degenerate = Rect {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        let allow_over = self.allow_over();
        let native = if self.format == PixelFormat::Pal8 {
            Some(target_native)
        } else {
            None
        };

        let mut best: Option<(Rect, BlendOp, DisposeOp, Vec<u16>, u64)> = None;

        for &dispose in &[DisposeOp::None, DisposeOp::Background, DisposeOp::Previous] {
            let canvas = self.disposed_canvas(dispose);
            // Dispose can itself introduce or remove differences, so the
            // diff must be re-checked against this candidate canvas rather
            // than reused from a single pass against `displayed`.
            let bbox = match bounding_box_of_diff(&canvas, target_rgba, self.width, self.height) {
                Some(b) => b,
                None => degenerate,
            };

            // Source is always feasible at whatever bbox a dispose yields,
            // so Over can only ever tie it on area, never beat it -- tried
            // first, it wins ties, since its trivial-case output (a
            // verbatim copy, or an all-zero transparent pixel) compresses
            // at least as well as Source restating the canvas's own bytes.
            let blends: &[BlendOp] = if allow_over {
                &[BlendOp::Over, BlendOp::Source]
            } else {
                &[BlendOp::Source]
            };
            for &blend in blends {
                if let Some(pixels) = try_blend(
                    &canvas,
                    target_rgba,
                    native,
                    self.width,
                    bbox,
                    blend,
                    self.channel_max,
                    self.transparent_index,
                ) {
                    let area = bbox.width as u64 * bbox.height as u64;
                    let better = best.as_ref().map_or(true, |(_, _, _, _, a)| area < *a);
                    if better {
                        best = Some((bbox, blend, dispose, pixels, area));
                    }
                }
            }
        }

        let (bbox, blend_op, prev_dispose_op, pixels, _) =
            best.expect("(None, Source) is always a feasible placement");

        self.pre_blend = self.disposed_canvas(prev_dispose_op);
        self.displayed = target_rgba.to_vec();
        self.region = bbox;

        Placement {
            bbox,
            blend_op,
            prev_dispose_op,
            pixels,
        }
    }
}
