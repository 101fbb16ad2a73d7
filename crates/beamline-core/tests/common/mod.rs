#![allow(dead_code)]

use beamline_core::{Ppu, VideoBus};

/// Flat-memory bus that records every observable collaborator event.
///
/// `beats` counts completed `ppu_tick` calls, so an event recorded during a
/// beat carries the number of beats that finished *before* it — deltas
/// between recorded events are exact beat distances.
pub struct TestBus {
    pub vram: Box<[u8; 0x3000]>,
    pub beats: u64,
    pub nmi: bool,
    pub nmi_rises: Vec<u64>,
    pub frame_completes: Vec<u64>,
    pub vertical_blanks: Vec<u64>,
}

impl Default for TestBus {
    fn default() -> Self {
        Self {
            vram: Box::new([0; 0x3000]),
            beats: 0,
            nmi: false,
            nmi_rises: Vec::new(),
            frame_completes: Vec::new(),
            vertical_blanks: Vec::new(),
        }
    }
}

impl TestBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills pattern-table tile 0 with solid color 1 and leaves the
    /// nametables zeroed, so every background pixel is opaque.
    pub fn with_solid_tile_zero() -> Self {
        let mut bus = Self::new();
        for b in &mut bus.vram[0x0000..0x0008] {
            *b = 0xFF;
        }
        bus
    }
}

impl VideoBus for TestBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.vram[addr as usize % 0x3000]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.vram[addr as usize % 0x3000] = value;
    }

    fn ppu_tick(&mut self) {
        self.beats += 1;
    }

    fn set_nmi(&mut self, level: bool) {
        if level && !self.nmi {
            self.nmi_rises.push(self.beats);
        }
        self.nmi = level;
    }

    fn frame_complete(&mut self) {
        self.frame_completes.push(self.beats);
    }

    fn vertical_blank(&mut self) {
        self.vertical_blanks.push(self.beats);
    }
}

/// Runs whole CPU cycles until the beat position next reaches (or, because
/// ticks advance three beats at a time, just passes) the target. A position
/// at or beyond the target first runs into the following frame.
pub fn run_until(ppu: &mut Ppu, bus: &mut TestBus, scanline: i16, x: u16) {
    let started = ppu.beats();
    let guard = |ppu: &Ppu| {
        assert!(
            ppu.beats() - started < 2 * 4 * 341 * 312,
            "target ({scanline}, {x}) not reached within two frames"
        );
    };
    while ppu.position() >= (scanline, x) {
        ppu.tick(bus);
        guard(ppu);
    }
    while ppu.position() < (scanline, x) {
        ppu.tick(bus);
        guard(ppu);
    }
}

/// Runs `n` CPU cycles.
pub fn tick_n(ppu: &mut Ppu, bus: &mut TestBus, n: usize) {
    for _ in 0..n {
        ppu.tick(bus);
    }
}
