//
// apngenc - still PNG and animated APNG frame encoder
// options.rs - caller-configurable encoding knobs
//
// Builder shape grounded in mtpng's top-level Options (set_* methods
// returning by value, no Result since these never fail at set time).
//

use crate::deflate::Strategy;
use crate::filter::FilterMode;
use crate::header::{ColorTag, Resolution, Stereo3d};

#[derive(Copy, Clone)]
pub struct Options {
    filter_mode: FilterMode,
    compression_level: i32,
    strategy: Strategy,
    resolution: Option<Resolution>,
    color_tag: ColorTag,
    stereo3d: Option<Stereo3d>,
    num_plays: u32,
}

impl Options {
    pub fn new() -> Options {
        Options {
            filter_mode: FilterMode::Mixed,
            compression_level: 6,
            strategy: Strategy::Default,
            resolution: None,
            color_tag: ColorTag::None,
            stereo3d: None,
            // 0 means "loop forever", matching acTL's num_plays semantics.
            num_plays: 0,
        }
    }

    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn set_compression_level(&mut self, level: i32) {
        self.compression_level = level;
    }

    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn set_color_tag(&mut self, tag: ColorTag) {
        self.color_tag = tag;
    }

    pub fn color_tag(&self) -> ColorTag {
        self.color_tag
    }

    pub fn set_stereo3d(&mut self, mode: Stereo3d) {
        self.stereo3d = Some(mode);
    }

    pub fn stereo3d(&self) -> Option<Stereo3d> {
        self.stereo3d
    }

    /// Number of times an APNG's animation plays; 0 means loop forever.
    pub fn set_num_plays(&mut self, num_plays: u32) {
        self.num_plays = num_plays;
    }

    pub fn num_plays(&self) -> u32 {
        self.num_plays
    }
}

impl Default for Options {
    fn default() -> Options {
        Options::new()
    }
}
