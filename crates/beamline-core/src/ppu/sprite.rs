use bitflags::bitflags;

bitflags! {
    /// Attribute bits stored in sprite byte 2.
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// V H P . . . p p
    /// ```
    /// - `V`: vertical flip
    /// - `H`: horizontal flip
    /// - `P`: priority (behind background when set)
    /// - `p`: sprite palette select (0..=3)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub(crate) struct SpriteAttributes: u8 {
        const PALETTE        = 0b0000_0011;
        const BEHIND_BACKGROUND = 0b0010_0000;
        const FLIP_HORIZONTAL   = 0b0100_0000;
        const FLIP_VERTICAL     = 0b1000_0000;
    }
}

impl SpriteAttributes {
    /// Sprite palette group (4..=7) as used by the compositor: the two
    /// palette bits offset past the four background palettes.
    #[inline]
    pub(crate) fn palette_group(self) -> u16 {
        u16::from(self.bits() & 0b11) + 4
    }
}

/// A sprite selected during evaluation for the next scanline.
///
/// The four OAM bytes plus the originating primary-OAM index; the index tag
/// is what makes sprite-0 hits attributable after the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct SpriteCandidate {
    pub(crate) y: u8,
    pub(crate) tile: u8,
    pub(crate) attr: u8,
    pub(crate) x: u8,
    /// Index of the sprite in primary OAM (0..=63).
    pub(crate) oam_index: u8,
}

/// A render-ready sprite: candidate bytes plus the fetched, bit-interleaved
/// pattern row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) struct RenderSprite {
    pub(crate) meta: SpriteCandidate,
    /// Interleaved pattern row (same layout as the background shifters).
    pub(crate) pattern: u16,
}

impl RenderSprite {
    #[inline]
    pub(crate) fn attributes(&self) -> SpriteAttributes {
        SpriteAttributes::from_bits_retain(self.meta.attr)
    }
}
