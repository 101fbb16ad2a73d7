use core::fmt;

use crate::error::Error;

/// Runtime region / timing selection for the PPU.
///
/// Unlike a ROM-header TV-system hint, this always resolves to a concrete
/// timing profile: the beat grid, vblank length, and CPU-to-PPU clock ratio
/// all hang off it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Region {
    /// North American / Japanese NTSC timing (3 beats per CPU cycle).
    #[default]
    Ntsc = 0,
    /// European PAL timing (3.2 beats per CPU cycle on average).
    Pal = 1,
}

impl Region {
    /// Last vblank scanline index before the wrap to the pre-render line.
    ///
    /// NTSC frames run scanlines -1..=260, PAL frames -1..=310.
    #[inline]
    pub const fn last_scanline(self) -> i16 {
        match self {
            Region::Ntsc => 260,
            Region::Pal => 310,
        }
    }

    /// Total scanlines per frame, counting the pre-render line.
    #[inline]
    pub const fn scanlines_per_frame(self) -> u16 {
        match self {
            Region::Ntsc => 262,
            Region::Pal => 312,
        }
    }

    /// Number of PPU beats to run for one CPU cycle.
    ///
    /// NTSC is a fixed 3:1. PAL averages 3.2:1 by inserting a fourth beat on
    /// every fifth CPU cycle.
    #[inline]
    pub const fn beats_for_cpu_tick(self, cpu_ticks: u64) -> u32 {
        match self {
            Region::Ntsc => 3,
            Region::Pal => {
                if cpu_ticks % 5 == 4 {
                    4
                } else {
                    3
                }
            }
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Region::Ntsc => "ntsc",
            Region::Pal => "pal",
        };
        f.write_str(s)
    }
}

/// Convert from the raw numeric id (used by state snapshots).
impl TryFrom<u8> for Region {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Region::Ntsc),
            1 => Ok(Region::Pal),
            _ => Err(Error::UnsupportedRegion(value)),
        }
    }
}

/// Convert back to the raw numeric id (for state snapshots, FFI, etc.).
impl From<Region> for u8 {
    fn from(region: Region) -> Self {
        region as u8
    }
}
