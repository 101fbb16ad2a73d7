use bitflags::bitflags;

bitflags! {
    /// PPU status register (`$2002`).
    ///
    /// Only the top three bits are driven by the PPU; the low five read back
    /// as open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct Status: u8 {
        /// Sprite overflow: a ninth in-range sprite was seen during
        /// evaluation. (The hardware's 9-sprite scan malfunction is not
        /// emulated; the flag itself is.)
        const SPRITE_OVERFLOW = 0b0010_0000;

        /// Sprite-0 hit: an opaque sprite-0 pixel landed on an opaque
        /// background pixel.
        const SPRITE_ZERO_HIT = 0b0100_0000;

        /// Vertical blank flag. Reading `$2002` clears it.
        const VERTICAL_BLANK = 0b1000_0000;
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::empty()
    }
}
