use bitflags::bitflags;

// Layout (bits 0-14):
//  14 13 12 11 10 9 8 7 6 5 4 3 2 1 0
//  [fine_y][V][H][coarse_y  ][coarse_x  ]
bitflags! {
    /// Field masks for the 15-bit VRAM address.
    pub(crate) struct AddrField: u16 {
        const COARSE_X    = 0x001F; // bits 0-4
        const COARSE_Y    = 0x03E0; // bits 5-9
        const NAMETABLE_H = 0x0400; // bit 10
        const NAMETABLE_V = 0x0800; // bit 11
        const FINE_Y      = 0x7000; // bits 12-14
        const ALL = Self::COARSE_X.bits()
            | Self::COARSE_Y.bits()
            | Self::NAMETABLE_H.bits()
            | Self::NAMETABLE_V.bits()
            | Self::FINE_Y.bits();
    }
}

const COARSE_Y_SHIFT: u16 = 5;
const NAMETABLE_SHIFT: u16 = 10;
const FINE_Y_SHIFT: u16 = 12;

/// 15-bit VRAM address, the backing integer behind both the current address
/// (`v`) and the temporary scroll latch (`t`).
///
/// Every logical field gets an explicit accessor; nothing else in the crate
/// is allowed to poke at the raw bit positions.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct VramAddr(u16);

impl VramAddr {
    /// Coarse X tile coordinate (0..=31).
    #[inline]
    pub(crate) fn coarse_x(self) -> u8 {
        (self.0 & AddrField::COARSE_X.bits()) as u8
    }

    #[inline]
    pub(crate) fn set_coarse_x(&mut self, cx: u8) {
        self.0 = (self.0 & !AddrField::COARSE_X.bits()) | u16::from(cx & 0x1F);
    }

    /// Coarse Y tile coordinate (0..=31).
    #[inline]
    pub(crate) fn coarse_y(self) -> u8 {
        ((self.0 & AddrField::COARSE_Y.bits()) >> COARSE_Y_SHIFT) as u8
    }

    #[inline]
    pub(crate) fn set_coarse_y(&mut self, cy: u8) {
        self.0 =
            (self.0 & !AddrField::COARSE_Y.bits()) | (u16::from(cy & 0x1F) << COARSE_Y_SHIFT);
    }

    /// Both nametable select bits (0..=3, V in bit 1, H in bit 0).
    #[inline]
    pub(crate) fn nametable(self) -> u8 {
        ((self.0 >> NAMETABLE_SHIFT) & 0b11) as u8
    }

    #[inline]
    pub(crate) fn set_nametable(&mut self, nt: u8) {
        self.0 = (self.0 & !(AddrField::NAMETABLE_H | AddrField::NAMETABLE_V).bits())
            | (u16::from(nt & 0b11) << NAMETABLE_SHIFT);
    }

    /// Horizontal nametable bit, toggled when coarse X wraps.
    #[inline]
    pub(crate) fn nametable_h(self) -> bool {
        self.0 & AddrField::NAMETABLE_H.bits() != 0
    }

    #[inline]
    pub(crate) fn set_nametable_h(&mut self, h: bool) {
        if h {
            self.0 |= AddrField::NAMETABLE_H.bits();
        } else {
            self.0 &= !AddrField::NAMETABLE_H.bits();
        }
    }

    /// Vertical nametable bit, toggled when coarse Y wraps past 29.
    #[inline]
    pub(crate) fn nametable_v(self) -> bool {
        self.0 & AddrField::NAMETABLE_V.bits() != 0
    }

    #[inline]
    pub(crate) fn set_nametable_v(&mut self, v: bool) {
        if v {
            self.0 |= AddrField::NAMETABLE_V.bits();
        } else {
            self.0 &= !AddrField::NAMETABLE_V.bits();
        }
    }

    /// Fine Y scroll (0..=7).
    #[inline]
    pub(crate) fn fine_y(self) -> u8 {
        ((self.0 & AddrField::FINE_Y.bits()) >> FINE_Y_SHIFT) as u8
    }

    #[inline]
    pub(crate) fn set_fine_y(&mut self, fy: u8) {
        self.0 = (self.0 & !AddrField::FINE_Y.bits()) | (u16::from(fy & 0b111) << FINE_Y_SHIFT);
    }

    /// Raw 15-bit value.
    #[inline]
    pub(crate) fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub(crate) fn set_raw(&mut self, v: u16) {
        self.0 = v & AddrField::ALL.bits();
    }

    /// Adds the `$2007` auto-increment, wrapping within 15 bits.
    #[inline]
    pub(crate) fn increment(&mut self, step: u16) {
        self.0 = self.0.wrapping_add(step) & AddrField::ALL.bits();
    }
}

impl core::fmt::Debug for VramAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VramAddr")
            .field("raw", &format_args!("{:#06X}", self.0))
            .field("fine_y", &self.fine_y())
            .field("nametable", &self.nametable())
            .field("coarse_y", &self.coarse_y())
            .field("coarse_x", &self.coarse_x())
            .finish()
    }
}

impl From<u16> for VramAddr {
    #[inline]
    fn from(v: u16) -> Self {
        VramAddr(v & AddrField::ALL.bits())
    }
}

impl From<VramAddr> for u16 {
    #[inline]
    fn from(v: VramAddr) -> Self {
        v.raw()
    }
}
