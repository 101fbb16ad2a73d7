//! CPU-visible PPU register state and internal VRAM address latches.
//!
//! Mirrors the `$2000-$2007` register set plus the internal `v/t/x/w`
//! latches. Concrete bit layouts live in the submodules; this file only
//! aggregates them and carries the cross-register write couplings.

mod control;
mod mask;
mod status;
mod vram_addr;
mod vram_registers;

pub(crate) use control::Control;
pub(crate) use mask::Mask;
pub(crate) use status::Status;
pub(crate) use vram_addr::VramAddr;
pub(crate) use vram_registers::VramRegisters;

use crate::mem_block::OamRam;

/// Aggregate of all CPU-visible registers and their helper latches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Registers {
    /// Control register mirror (`$2000`).
    pub(crate) control: Control,
    /// Mask register mirror (`$2001`).
    pub(crate) mask: Mask,
    /// Status flags (`$2002`, top three bits).
    pub(crate) status: Status,
    /// OAM pointer driven by `$2003`/`$2004` and sprite evaluation.
    pub(crate) oam_addr: u8,
    /// Primary sprite memory behind `$2004`.
    pub(crate) oam: OamRam,
    /// Internal `v`/`t`/`x`/`w` block.
    pub(crate) vram: VramRegisters,
    /// Delayed `$2007` read buffer.
    pub(crate) read_buffer: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub(crate) fn new() -> Self {
        Self {
            control: Control::default(),
            mask: Mask::default(),
            status: Status::default(),
            oam_addr: 0,
            oam: OamRam::new(),
            vram: VramRegisters::default(),
            read_buffer: 0,
        }
    }

    /// `$2000` write. The base-nametable bits are silently copied into the
    /// scroll latch `t` — games rely on this coupling.
    pub(crate) fn write_control(&mut self, value: u8) {
        self.control = Control::from_bits_retain(value);
        self.vram.t.set_nametable(self.control.nametable_index());
    }
}
