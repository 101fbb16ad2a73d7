use bitflags::bitflags;

bitflags! {
    /// PPU mask register (`$2001`, "dispctrl").
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// B G R S B s b g
    /// ```
    /// - `g`: greyscale
    /// - `b`/`s`: show background/sprites in the leftmost 8 pixels
    /// - `B`/`S`: background/sprite enable
    /// - `R/G/B`: color emphasis
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Mask: u8 {
        const GREYSCALE            = 0b0000_0001;
        const SHOW_BACKGROUND_LEFT = 0b0000_0010;
        const SHOW_SPRITES_LEFT    = 0b0000_0100;
        const SHOW_BACKGROUND      = 0b0000_1000;
        const SHOW_SPRITES         = 0b0001_0000;
        const EMPHASIZE_RED        = 0b0010_0000;
        const EMPHASIZE_GREEN      = 0b0100_0000;
        const EMPHASIZE_BLUE       = 0b1000_0000;
    }
}

impl Default for Mask {
    fn default() -> Self {
        Self::empty()
    }
}

impl Mask {
    /// True when either layer is enabled; gates the whole fetch machinery.
    #[inline]
    pub(crate) fn rendering_enabled(self) -> bool {
        self.intersects(Mask::SHOW_BACKGROUND | Mask::SHOW_SPRITES)
    }

    /// The three emphasis bits as a 0..=7 value, ready to shift into the
    /// final palette index above the 6 color bits.
    #[inline]
    pub(crate) fn emphasis_bits(self) -> u16 {
        (self.bits() >> 5) as u16
    }

    /// Palette mask applied to composed colors (greyscale keeps rows only).
    #[inline]
    pub(crate) fn color_mask(self) -> u8 {
        if self.contains(Mask::GREYSCALE) { 0x30 } else { 0x3F }
    }
}
