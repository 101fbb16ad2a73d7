//! Plain serializable snapshots of every stateful sub-unit.
//!
//! These structs are always available so hosts can roll their own formats;
//! the `savestate-serde` feature additionally derives serde on all of them.

#[cfg(feature = "savestate-serde")]
use serde::{Deserialize, Serialize};

use crate::mem_block::{OamRam, PaletteBytes};

/// Background pipeline shifters and the decoded-tile latch.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BgPipelineState {
    pub tile_pat: u16,
    pub tile_attr: u8,
    pub shift_pat: u32,
    pub shift_attr: u32,
}

/// Open-bus latch value and remaining decay countdown.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenBusState {
    pub value: u8,
    pub decay_timer: u32,
}

/// Vblank sequencer phase (0 clearing, 1 idle, 2 raising) and countdown.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VblankSequencerState {
    pub phase: u8,
    pub countdown: u8,
}

/// Secondary and render-ready sprite slots plus the evaluation counters.
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpritePipelineState {
    pub secondary_y: [u8; 8],
    pub secondary_tile: [u8; 8],
    pub secondary_attr: [u8; 8],
    pub secondary_x: [u8; 8],
    pub secondary_index: [u8; 8],
    pub render_y: [u8; 8],
    pub render_tile: [u8; 8],
    pub render_attr: [u8; 8],
    pub render_x: [u8; 8],
    pub render_index: [u8; 8],
    pub render_pattern: [u16; 8],
    pub scanned: u8,
    pub selected: u8,
    pub fetch_index: u8,
    pub latch: u8,
}

/// Complete PPU snapshot.
///
/// Restoring one of these mid-frame resumes rendering beat-exactly; see
/// [`crate::Ppu::save_state`] / [`crate::Ppu::load_state`].
#[cfg_attr(feature = "savestate-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpuState {
    /// Region id (see `Region` conversions).
    pub region: u8,

    // Register bank.
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub oam: OamRam,
    pub palette: PaletteBytes,

    // Address latches.
    pub vaddr: u16,
    pub scroll: u16,
    pub fine_x: u8,
    pub write_toggle: bool,
    pub read_buffer: u8,

    pub open_bus: OpenBusState,
    pub vblank: VblankSequencerState,

    // Beat grid.
    pub scanline: i16,
    pub x: u16,
    pub scanline_end: u16,
    pub cycle_phase: u8,
    pub even_odd_toggle: bool,
    pub beats: u64,
    pub cpu_ticks: u64,
    pub frame: u64,

    // Fetch pipelines.
    pub bg: BgPipelineState,
    pub pat_addr: u16,
    pub io_addr: u16,
    pub sprites: SpritePipelineState,
}
