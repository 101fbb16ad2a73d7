use crate::memory::SPRITES_PER_LINE;

use super::savestate::SpritePipelineState;
use super::sprite::{RenderSprite, SpriteCandidate};

/// Sprite evaluation and fetch state for one scanline pair.
///
/// Evaluation walks primary OAM during the visible beats and fills
/// `secondary` with up to eight candidates for the *next* scanline; the
/// fetch window (beats 256..=319) copies each candidate into `render` along
/// with its pattern row. The three counters carry the hardware's exact
/// progression, including its restart quirks, so they are plain numbers
/// rather than an enum:
///
/// - `scanned`: primary sprites examined so far (0..=64)
/// - `selected`: candidates accepted into `secondary` (0..=8)
/// - `fetch_index`: render slots filled or being filled (0..=`selected`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct SpritePipeline {
    pub(crate) secondary: [SpriteCandidate; SPRITES_PER_LINE],
    pub(crate) render: [RenderSprite; SPRITES_PER_LINE],
    pub(crate) scanned: u8,
    pub(crate) selected: u8,
    pub(crate) fetch_index: u8,
    /// OAM byte latched on the even beat of each evaluation pair.
    pub(crate) latch: u8,
}

impl SpritePipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Beat-0 housekeeping: restart the scan counters for this scanline.
    #[inline]
    pub(crate) fn begin_scanline(&mut self) {
        self.scanned = 0;
        self.selected = 0;
    }

    /// Beat-256 housekeeping: restart the fetch cursor.
    #[inline]
    pub(crate) fn begin_fetch(&mut self) {
        self.fetch_index = 0;
    }

    /// Number of render slots valid for the compositor this scanline.
    #[inline]
    pub(crate) fn renderable(&self) -> usize {
        debug_assert!(self.fetch_index as usize <= SPRITES_PER_LINE);
        (self.fetch_index as usize).min(SPRITES_PER_LINE)
    }

    pub(crate) fn save_state(&self) -> SpritePipelineState {
        let mut state = SpritePipelineState::default();
        for (i, c) in self.secondary.iter().enumerate() {
            state.secondary_y[i] = c.y;
            state.secondary_tile[i] = c.tile;
            state.secondary_attr[i] = c.attr;
            state.secondary_x[i] = c.x;
            state.secondary_index[i] = c.oam_index;
        }
        for (i, r) in self.render.iter().enumerate() {
            state.render_y[i] = r.meta.y;
            state.render_tile[i] = r.meta.tile;
            state.render_attr[i] = r.meta.attr;
            state.render_x[i] = r.meta.x;
            state.render_index[i] = r.meta.oam_index;
            state.render_pattern[i] = r.pattern;
        }
        state.scanned = self.scanned;
        state.selected = self.selected;
        state.fetch_index = self.fetch_index;
        state.latch = self.latch;
        state
    }

    pub(crate) fn load_state(&mut self, state: &SpritePipelineState) {
        for i in 0..SPRITES_PER_LINE {
            self.secondary[i] = SpriteCandidate {
                y: state.secondary_y[i],
                tile: state.secondary_tile[i],
                attr: state.secondary_attr[i],
                x: state.secondary_x[i],
                oam_index: state.secondary_index[i],
            };
            self.render[i] = RenderSprite {
                meta: SpriteCandidate {
                    y: state.render_y[i],
                    tile: state.render_tile[i],
                    attr: state.render_attr[i],
                    x: state.render_x[i],
                    oam_index: state.render_index[i],
                },
                pattern: state.render_pattern[i],
            };
        }
        self.scanned = state.scanned.min(64);
        self.selected = state.selected.min(SPRITES_PER_LINE as u8);
        // `fetch_index` may legitimately exceed `selected` outside the fetch
        // window (the counters reset at different beats), so it is only
        // clamped to the slot count.
        self.fetch_index = state.fetch_index.min(SPRITES_PER_LINE as u8);
        self.latch = state.latch;
    }
}
