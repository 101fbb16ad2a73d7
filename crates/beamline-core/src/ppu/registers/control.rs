use bitflags::bitflags;

use crate::memory;

bitflags! {
    /// PPU control register (`$2000`, "sysctrl").
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N M S B s I n n
    /// ```
    /// - `n n`: base nametable select
    /// - `I`: VRAM increment unit (0=+1, 1=+32)
    /// - `s`: sprite pattern table half (8x8 mode only)
    /// - `B`: background pattern table half
    /// - `S`: sprite size (0=8x8, 1=8x16)
    /// - `M`: master/slave select (latched, no behavioral effect)
    /// - `N`: NMI enable at vblank
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Control: u8 {
        const NAMETABLE       = 0b0000_0011;
        const INCREMENT_32    = 0b0000_0100;
        const SPRITE_TABLE    = 0b0000_1000;
        const BACKGROUND_TABLE = 0b0001_0000;
        const SPRITE_SIZE_16  = 0b0010_0000;
        const MASTER_SLAVE    = 0b0100_0000;
        const GENERATE_NMI    = 0b1000_0000;
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::empty()
    }
}

impl Control {
    /// Base-nametable select bits (0..=3).
    #[inline]
    pub(crate) fn nametable_index(self) -> u8 {
        self.bits() & 0b11
    }

    /// Auto-increment applied to the VRAM address after a `$2007` access.
    #[inline]
    pub(crate) fn vram_increment(self) -> u16 {
        if self.contains(Control::INCREMENT_32) { 32 } else { 1 }
    }

    /// Pattern-table base for 8x8 sprites. Ignored in 8x16 mode, where bit 0
    /// of the tile index picks the table instead.
    #[inline]
    pub(crate) fn sprite_pattern_table(self) -> u16 {
        if self.contains(Control::SPRITE_TABLE) {
            memory::PATTERN_TABLE_1
        } else {
            memory::PATTERN_TABLE_0
        }
    }

    /// Pattern-table base for background tiles.
    #[inline]
    pub(crate) fn background_pattern_table(self) -> u16 {
        if self.contains(Control::BACKGROUND_TABLE) {
            memory::PATTERN_TABLE_1
        } else {
            memory::PATTERN_TABLE_0
        }
    }

    /// Sprite height in scanlines (8 or 16).
    #[inline]
    pub(crate) fn sprite_height(self) -> i16 {
        if self.contains(Control::SPRITE_SIZE_16) { 16 } else { 8 }
    }

    #[inline]
    pub(crate) fn nmi_enabled(self) -> bool {
        self.contains(Control::GENERATE_NMI)
    }
}
