//! Cycle-driven NES Picture Processing Unit.
//!
//! **Quick primer for newcomers**
//! - The beat grid is 341 columns per scanline. Scanline `-1` is the
//!   pre-render line, `0..=239` are visible, `240` is idle, and the rest is
//!   vertical blanking (through 260 on NTSC, 310 on PAL). Three beats run
//!   per CPU cycle (PAL sneaks in a fourth every fifth cycle).
//! - Four activities interleave on that grid every beat: background tile
//!   fetching, sprite evaluation for the *next* scanline, pixel composition
//!   for the current one, and register traffic from the CPU side.
//! - The CPU sees eight registers at `$2000-$2007` (mirrored to `$3FFF`).
//!   Most observable weirdness — the `$2007` read buffer, the shared write
//!   toggle, open-bus reads — is tiny internal latches leaking out, and the
//!   code models those latches directly.
//!
//! **Why some code looks strange**
//! - Background work is dispatched on `x % 8`: each 8-beat window performs
//!   the nametable/attribute/pattern-low/pattern-high access pairs of the
//!   hardware, and the same dispatcher is reused for sprite pattern fetches
//!   during beats 256..=319 (`tile_decode_mode` tells the two apart).
//! - Sprite evaluation advances on odd beats only and walks primary OAM
//!   through the address register itself, which is why `oam_addr` moves
//!   during rendering and why the skip logic looks like pointer arithmetic:
//!   that is literally what the hardware does.
//! - The vblank flag is not raised or cleared instantly; a small sequencer
//!   ([`vblank::VblankSequencer`]) walks the flag transitions over a few
//!   beats and a `$2002` read can cancel an in-flight raise.
//! - The pre-render line is one beat shorter on alternating NTSC frames when
//!   background rendering is on; the check sits in the middle of the fetch
//!   dispatcher (phase 1, x=337) because that is when the hardware commits
//!   the decision.

pub mod palette;
pub mod savestate;

mod background_pipeline;
mod open_bus;
mod registers;
mod sprite;
mod sprite_pipeline;
mod vblank;

pub use open_bus::DEFAULT_DECAY_BEATS;

use core::fmt;

use crate::{
    bus::VideoBus,
    config::region::Region,
    error::Error,
    memory::{self, Register},
};

use self::{
    background_pipeline::{interleave_planes, BgPipeline},
    open_bus::OpenBusLatch,
    palette::PaletteRam,
    registers::{Control, Mask, Registers, Status, VramAddr},
    savestate::PpuState,
    sprite::SpriteAttributes,
    sprite_pipeline::SpritePipeline,
    vblank::{VblankAction, VblankSequencer},
};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

/// Nominal beats per scanline.
const LINE_BEATS: u16 = 341;
/// Pre-render line length when the odd-frame shortening fires.
const SHORT_LINE_BEATS: u16 = 340;

/// The PPU core.
///
/// One instance owns everything inside the chip: the register bank and its
/// latches, palette RAM, the fetch pipelines, and the output frame buffer.
/// Everything outside — pattern/nametable memory, the NMI line, host
/// callbacks — is borrowed per call through a [`VideoBus`].
#[derive(Clone)]
pub struct Ppu {
    region: Region,
    /// CPU-visible registers and their helper latches.
    regs: Registers,
    /// 32-byte palette RAM (the only PPU-owned video memory).
    palette: PaletteRam,
    /// Residual register-bus value with decay.
    open_bus: OpenBusLatch,
    /// Vblank flag / NMI edge sequencer.
    vblank: VblankSequencer,
    /// Background tile fetch pipeline.
    bg: BgPipeline,
    /// Sprite evaluation and fetch pipeline.
    sprites: SpritePipeline,
    /// Address selected by the current fetch phase (nametable/attribute).
    io_addr: u16,
    /// Pattern-table address latched between fetch phases.
    pat_addr: u16,
    /// Current scanline; -1 is the pre-render line.
    scanline: i16,
    /// Current column (beat) within the scanline.
    x: u16,
    /// Length of the current scanline (341, or 340 once shortened).
    scanline_end: u16,
    /// NTSC pixel phase (0..=2) handed to the host color resolver.
    cycle_phase: u8,
    /// Flips on every wrap to the pre-render line.
    even_odd_toggle: bool,
    /// Total beats executed.
    beats: u64,
    /// `tick()` invocations; drives the PAL 3.2:1 cadence.
    cpu_ticks: u64,
    /// Frames completed (increments on the wrap to the pre-render line).
    frame: u64,
    /// Last level driven onto the NMI line.
    nmi_level: bool,
    /// ARGB output, written by the compositor only.
    framebuffer: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
}

impl fmt::Debug for Ppu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ppu")
            .field("region", &self.region)
            .field("scanline", &self.scanline)
            .field("x", &self.x)
            .field("frame", &self.frame)
            .field("even_odd_toggle", &self.even_odd_toggle)
            .field("beats", &self.beats)
            .finish()
    }
}

impl Ppu {
    /// Creates a PPU in its post-initialization state: idle at the start of
    /// the vblank region, sequencer at rest, latches cleared.
    pub fn new(region: Region) -> Self {
        Self {
            region,
            regs: Registers::new(),
            palette: PaletteRam::new(),
            open_bus: OpenBusLatch::new(),
            vblank: VblankSequencer::new(),
            bg: BgPipeline::new(),
            sprites: SpritePipeline::new(),
            io_addr: 0,
            pat_addr: 0,
            scanline: 241,
            x: 0,
            scanline_end: LINE_BEATS,
            cycle_phase: 0,
            even_odd_toggle: false,
            beats: 0,
            cpu_ticks: 0,
            frame: 0,
            nmi_level: false,
            framebuffer: Box::new([0; SCREEN_WIDTH * SCREEN_HEIGHT]),
        }
    }

    /// Applies the power-on register state: control cleared, mask reduced to
    /// its surviving bits, status flags dropped, OAM pointer and both address
    /// latches zeroed, power-up palette loaded.
    pub fn power(&mut self) {
        log::debug!("ppu power-on ({})", self.region);
        self.beats = 0;
        self.regs.control = Control::empty();
        self.regs.mask = Mask::from_bits_retain(self.regs.mask.bits() & 0x06);
        self.regs.status = Status::empty();
        self.regs.oam_addr = 0;
        self.regs.vram.reset_toggle();
        self.regs.vram.t = VramAddr::default();
        self.regs.vram.v = VramAddr::default();
        self.regs.vram.x = 0;
        self.regs.read_buffer = 0;
        self.palette.load_power_up();
    }

    /// Applies the reset-pin state. Unlike [`Ppu::power`], the current VRAM
    /// address and the OAM pointer survive a reset.
    pub fn reset(&mut self) {
        log::debug!("ppu reset ({})", self.region);
        self.beats = 0;
        self.regs.control = Control::empty();
        self.regs.mask = Mask::from_bits_retain(self.regs.mask.bits() & 0x06);
        self.regs.status = Status::empty();
        self.regs.vram.reset_toggle();
        self.regs.vram.t = VramAddr::default();
        self.regs.read_buffer = 0;
        self.palette.load_power_up();
    }

    /// Selected timing variant.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Current `(scanline, x)` beat position.
    pub fn position(&self) -> (i16, u16) {
        (self.scanline, self.x)
    }

    /// Total beats executed since power.
    pub fn beats(&self) -> u64 {
        self.beats
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Level currently driven on the NMI line.
    pub fn nmi_level(&self) -> bool {
        self.nmi_level
    }

    /// The 256x240 ARGB output. Stable from `frame_complete` until rendering
    /// of the next frame begins.
    pub fn framebuffer(&self) -> &[u32] {
        &*self.framebuffer
    }

    /// Overrides the open-bus decay period (in beats). The default is a
    /// coarse approximation, not a silicon measurement.
    pub fn set_open_bus_decay_period(&mut self, beats: u32) {
        self.open_bus.set_decay_period(beats);
    }

    // ------------------------------------------------------------------
    // Register interface
    // ------------------------------------------------------------------

    /// CPU read from the mirrored register space (`$2000-$3FFF`).
    ///
    /// Ports that do not drive the bus return the open-bus latch without
    /// refreshing it; only `$2004` and `$2007` reads put fresh data on the
    /// bus.
    pub fn read(&mut self, addr: u16, bus: &mut impl VideoBus) -> u8 {
        match Register::from_cpu_addr(addr) {
            Register::Status => {
                let res = self.regs.status.bits() | (self.open_bus.sample() & 0x1F);
                self.regs.status.remove(Status::VERTICAL_BLANK);
                self.regs.vram.reset_toggle();
                self.vblank.cancel_on_status_read();
                res
            }
            Register::OamData => {
                let value = self.regs.oam[self.regs.oam_addr as usize];
                // Attribute bytes have no storage for bits 2-4.
                let masked = if self.regs.oam_addr & 3 == 2 {
                    value & 0xE3
                } else {
                    value
                };
                self.open_bus.refresh(masked)
            }
            Register::Data => self.read_data(bus),
            _ => self.open_bus.sample(),
        }
    }

    /// CPU write to the mirrored register space. Every write refreshes the
    /// open-bus latch with the written byte.
    pub fn write(&mut self, addr: u16, value: u8, bus: &mut impl VideoBus) {
        self.open_bus.refresh(value);
        match Register::from_cpu_addr(addr) {
            Register::Control => self.regs.write_control(value),
            Register::Mask => self.regs.mask = Mask::from_bits_retain(value),
            Register::Status => {} // read-only
            Register::OamAddr => self.regs.oam_addr = value,
            Register::OamData => {
                let idx = self.regs.oam_addr;
                self.regs.oam[idx as usize] = value;
                self.regs.oam_addr = idx.wrapping_add(1);
            }
            Register::Scroll => self.regs.vram.write_scroll(value),
            Register::Addr => self.regs.vram.write_addr(value),
            Register::Data => {
                let vaddr = self.regs.vram.v.raw();
                self.video_write(bus, vaddr, value);
                self.open_bus.refresh(value);
                self.regs.vram.v.increment(self.regs.control.vram_increment());
            }
        }
    }

    /// `$2007` read: returns the delayed buffer for VRAM addresses, or the
    /// palette byte directly (merged with open-bus bits 6-7) when the
    /// address sits in palette space — in which case the buffer refills from
    /// the nametable shadow underneath at `vaddr & $2FFF`.
    fn read_data(&mut self, bus: &mut impl VideoBus) -> u8 {
        let vaddr = self.regs.vram.v.raw();
        let res;
        if vaddr & 0x3F00 == 0x3F00 {
            res = (self.open_bus.sample() & 0xC0) | (self.palette.read(vaddr) & 0x3F);
            self.regs.read_buffer = self.video_read(bus, vaddr & 0x2FFF);
        } else {
            res = self.regs.read_buffer;
            self.regs.read_buffer = self.video_read(bus, vaddr);
        }
        self.open_bus.refresh(res);
        self.regs.vram.v.increment(self.regs.control.vram_increment());
        res
    }

    // ------------------------------------------------------------------
    // Video memory routing
    // ------------------------------------------------------------------

    /// Reads the 14-bit video space: palette RAM internally, everything
    /// below `$3F00` through the bus.
    fn video_read(&mut self, bus: &mut impl VideoBus, addr: u16) -> u8 {
        let addr = addr & memory::VRAM_MIRROR_MASK;
        if addr >= memory::PALETTE_BASE {
            self.palette.read(addr)
        } else {
            bus.read(addr)
        }
    }

    fn video_write(&mut self, bus: &mut impl VideoBus, addr: u16, value: u8) {
        let addr = addr & memory::VRAM_MIRROR_MASK;
        if addr >= memory::PALETTE_BASE {
            self.palette.write(addr, value);
        } else {
            bus.write(addr, value);
        }
    }

    // ------------------------------------------------------------------
    // Beat driver
    // ------------------------------------------------------------------

    /// Advances the PPU for one CPU cycle: three beats, plus the PAL
    /// catch-up beat on every fifth call.
    pub fn tick(&mut self, bus: &mut impl VideoBus) {
        let beats = self.region.beats_for_cpu_tick(self.cpu_ticks);
        self.cpu_ticks += 1;
        for _ in 0..beats {
            self.step_beat(bus);
        }
    }

    fn step_beat(&mut self, bus: &mut impl VideoBus) {
        match self.vblank.tick() {
            VblankAction::ClearStatus => self.regs.status = Status::empty(),
            VblankAction::SetInVblank => self.regs.status.insert(Status::VERTICAL_BLANK),
            VblankAction::DriveNmi => {
                let level = self.regs.status.contains(Status::VERTICAL_BLANK)
                    && self.regs.control.nmi_enabled();
                if level != self.nmi_level {
                    log::trace!(
                        "nmi line {} at scanline {} x {}",
                        if level { "asserted" } else { "released" },
                        self.scanline,
                        self.x
                    );
                    self.nmi_level = level;
                }
                bus.set_nmi(level);
            }
            VblankAction::None => {}
        }
        self.open_bus.tick_decay();

        if self.scanline < 240 {
            if self.regs.mask.rendering_enabled() {
                self.rendering_tick(bus);
            }
            if self.scanline >= 0 && self.x < 256 {
                self.render_pixel(bus);
            }
        }

        if self.region == Region::Ntsc {
            self.cycle_phase += 1;
            if self.cycle_phase == 3 {
                self.cycle_phase = 0;
            }
            // Late clear of the sprite-0 flag near the end of the last vblank
            // line; timing-test behavior inherited from the hardware model.
            if self.scanline == 260 && (328..=339).contains(&self.x) {
                self.regs.status.remove(Status::SPRITE_ZERO_HIT);
            }
        }

        self.x += 1;
        if self.x == self.scanline_end {
            if self.scanline == 239 {
                bus.frame_complete();
            }
            self.scanline_end = LINE_BEATS;
            self.x = 0;
            self.scanline += 1;
            if self.scanline > self.region.last_scanline() {
                self.scanline = -1;
                self.even_odd_toggle = !self.even_odd_toggle;
                self.frame = self.frame.wrapping_add(1);
                self.vblank.begin_clear();
            } else if self.scanline == 241 {
                bus.vertical_blank();
                self.vblank.begin_raise();
            }
        }

        bus.ppu_tick();
        self.beats += 1;
    }

    // ------------------------------------------------------------------
    // Fetch pipelines
    // ------------------------------------------------------------------

    /// One beat of the interleaved background/sprite fetch machinery.
    /// Runs on every beat of scanlines below 240 while rendering is enabled.
    fn rendering_tick(&mut self, bus: &mut impl VideoBus) {
        let x = self.x;
        // True for x in 0..=255 and 320..=335: background tiles are being
        // decoded. False during the sprite fetch window and the idle tail.
        let tile_decode_mode = (0x0010_FFFF_u32 >> (x >> 4)) & 1 == 1;

        // Each action takes two beats: select an address, then receive the
        // byte and react to it.
        match x % 8 {
            0 => {
                self.io_addr = memory::NAMETABLE_BASE | (self.regs.vram.v.raw() & 0x0FFF);
                if x == 0 {
                    self.sprites.begin_scanline();
                    if self.regs.mask.contains(Mask::SHOW_SPRITES) {
                        self.regs.oam_addr = 0;
                    }
                }
                if self.regs.mask.contains(Mask::SHOW_BACKGROUND) {
                    // Scroll reload: the full latch once per frame on the
                    // pre-render line, the horizontal half every scanline.
                    if x == 304 && self.scanline == -1 {
                        let t = self.regs.vram.t.raw();
                        self.regs.vram.v.set_raw(t);
                    }
                    if x == 256 {
                        let t = self.regs.vram.t;
                        self.regs.vram.v.set_coarse_x(t.coarse_x());
                        self.regs.vram.v.set_nametable_h(t.nametable_h());
                        self.sprites.begin_fetch();
                    }
                }
            }
            2 => {
                let v = self.regs.vram.v;
                self.io_addr = memory::ATTRIBUTE_TABLE_BASE
                    + 0x400 * u16::from(v.nametable())
                    + 8 * u16::from(v.coarse_y() / 4)
                    + u16::from(v.coarse_x() / 4);
                if !tile_decode_mode {
                    // Sprite fetches re-read the nametable instead.
                    self.io_addr = memory::NAMETABLE_BASE | (v.raw() & 0x0FFF);
                }
            }
            1 => {
                if x == 337
                    && self.scanline == -1
                    && self.even_odd_toggle
                    && self.regs.mask.contains(Mask::SHOW_BACKGROUND)
                    && self.region == Region::Ntsc
                {
                    self.scanline_end = SHORT_LINE_BEATS;
                }
                let tile = self.video_read(bus, self.io_addr);
                self.pat_addr = self.regs.control.background_pattern_table()
                    + memory::TILE_STRIDE * u16::from(tile)
                    + u16::from(self.regs.vram.v.fine_y());
                if tile_decode_mode {
                    self.bg.push_tile();
                }
            }
            3 => {
                if tile_decode_mode {
                    let attr_byte = self.video_read(bus, self.io_addr);
                    let v = self.regs.vram.v;
                    let quadrant = (v.coarse_x() & 2) + 2 * (v.coarse_y() & 2);
                    self.bg.tile_attr = (attr_byte >> quadrant) & 3;
                    self.advance_coarse_x();
                    if x == 251 {
                        self.advance_fine_y();
                    }
                } else if self.sprites.fetch_index < self.sprites.selected {
                    self.sprite_fetch_setup();
                }
            }
            5 => {
                self.bg.tile_pat = u16::from(self.video_read(bus, self.pat_addr));
            }
            7 => {
                let low = self.bg.tile_pat as u8;
                let high = self.video_read(bus, self.pat_addr | 8);
                self.bg.tile_pat = interleave_planes(low, high);
                if !tile_decode_mode && self.sprites.fetch_index < self.sprites.selected {
                    let slot = (self.sprites.fetch_index & 7) as usize;
                    self.sprites.render[slot].pattern = self.bg.tile_pat;
                    self.sprites.fetch_index += 1;
                }
            }
            _ => {}
        }

        self.sprite_evaluation_tick();
    }

    /// Advances coarse X in `v`, toggling the horizontal nametable on wrap.
    fn advance_coarse_x(&mut self) {
        let v = &mut self.regs.vram.v;
        let cx = v.coarse_x();
        if cx == 31 {
            v.set_coarse_x(0);
            let h = v.nametable_h();
            v.set_nametable_h(!h);
        } else {
            v.set_coarse_x(cx + 1);
        }
    }

    /// Advances fine Y in `v`; coarse Y wraps at 30 with a vertical
    /// nametable toggle, or silently at 32 when software scrolled into the
    /// attribute rows.
    fn advance_fine_y(&mut self) {
        let v = &mut self.regs.vram.v;
        let fy = v.fine_y();
        if fy < 7 {
            v.set_fine_y(fy + 1);
            return;
        }
        v.set_fine_y(0);
        let cy = v.coarse_y().wrapping_add(1) & 0x1F;
        if cy == 30 {
            v.set_coarse_y(0);
            let vert = v.nametable_v();
            v.set_nametable_v(!vert);
        } else {
            v.set_coarse_y(cy);
        }
    }

    /// Round-robin sprite evaluation step, run once per rendering beat.
    ///
    /// Odd beats in [64, 256) consume the byte latched on the previous beat
    /// and advance the OAM pointer; everything else just latches
    /// `OAM[oam_addr]`.
    fn sprite_evaluation_tick(&mut self) {
        let x = self.x;
        if !((64..256).contains(&x) && x % 2 == 1) {
            self.sprites.latch = self.regs.oam[self.regs.oam_addr as usize];
            return;
        }

        let addr = self.regs.oam_addr;
        self.regs.oam_addr = addr.wrapping_add(1);
        match addr & 3 {
            0 => {
                // Y byte: range-test the sprite against this scanline; the
                // selected set becomes visible on the *next* one.
                if self.sprites.scanned >= 64 {
                    self.regs.oam_addr = 0;
                    return;
                }
                self.sprites.scanned += 1;
                let slot = self.sprites.selected as usize;
                if slot < memory::SPRITES_PER_LINE {
                    self.sprites.secondary[slot].y = self.sprites.latch;
                    self.sprites.secondary[slot].oam_index = addr >> 2;
                }
                let y1 = i16::from(self.sprites.latch);
                let y2 = y1 + self.regs.control.sprite_height();
                if !(self.scanline >= y1 && self.scanline < y2) {
                    // Out of range: skip the remaining three bytes. The
                    // second sprite instead realigns the pointer to 8, a
                    // pipeline peculiarity games can observe.
                    self.regs.oam_addr = if self.sprites.scanned != 2 {
                        self.regs.oam_addr.wrapping_add(3)
                    } else {
                        8
                    };
                }
            }
            1 => {
                let slot = self.sprites.selected as usize;
                if slot < memory::SPRITES_PER_LINE {
                    self.sprites.secondary[slot].tile = self.sprites.latch;
                }
            }
            2 => {
                let slot = self.sprites.selected as usize;
                if slot < memory::SPRITES_PER_LINE {
                    self.sprites.secondary[slot].attr = self.sprites.latch;
                }
            }
            3 => {
                // X byte completes the record; a ninth in-range sprite only
                // raises the overflow flag (the hardware's 9-sprite scan
                // malfunction is not modeled).
                let slot = self.sprites.selected as usize;
                if slot < memory::SPRITES_PER_LINE {
                    self.sprites.secondary[slot].x = self.sprites.latch;
                    self.sprites.selected += 1;
                } else {
                    self.regs.status.insert(Status::SPRITE_OVERFLOW);
                }
                if self.sprites.scanned == 2 {
                    self.regs.oam_addr = 8;
                }
            }
            _ => unreachable!(),
        }
        debug_assert!(self.sprites.selected as usize <= memory::SPRITES_PER_LINE);
    }

    /// Phase-3 beat of a sprite fetch slot: copy the candidate into its
    /// render slot and compute the pattern row address (8x16-aware, vertical
    /// flip applied). The interleaved row itself lands on the phase-7 beat.
    fn sprite_fetch_setup(&mut self) {
        let slot = (self.sprites.fetch_index & 7) as usize;
        let meta = self.sprites.secondary[slot];
        self.sprites.render[slot].meta = meta;

        let attrs = SpriteAttributes::from_bits_retain(meta.attr);
        let tall = self.regs.control.contains(Control::SPRITE_SIZE_16);
        let mut row = (i32::from(self.scanline) - i32::from(meta.y)) as u32;
        if attrs.contains(SpriteAttributes::FLIP_VERTICAL) {
            row ^= if tall { 15 } else { 7 };
        }

        let table = if tall {
            u16::from(meta.tile & 0x01) * memory::PATTERN_TABLE_1
        } else {
            self.regs.control.sprite_pattern_table()
        };
        let tile = if tall { meta.tile & 0xFE } else { meta.tile };
        self.pat_addr = table
            + memory::TILE_STRIDE * u16::from(tile)
            + ((row & 7) + (row & 8) * 2) as u16;
    }

    // ------------------------------------------------------------------
    // Compositor
    // ------------------------------------------------------------------

    /// Composites one pixel into the frame buffer: background sample, first
    /// opaque sprite overlay with priority and sprite-0 hit detection, then
    /// palette lookup with greyscale and emphasis applied.
    fn render_pixel(&mut self, bus: &mut impl VideoBus) {
        let x = self.x;
        // Leftmost and rightmost 8 columns share the edge mask.
        let edge = ((x + 8) as u8) < 16;
        let mask = self.regs.mask;
        let show_bg = mask.contains(Mask::SHOW_BACKGROUND)
            && (!edge || mask.contains(Mask::SHOW_BACKGROUND_LEFT));
        let show_sp = mask.contains(Mask::SHOW_SPRITES)
            && (!edge || mask.contains(Mask::SHOW_SPRITES_LEFT));

        // Sample offset into the 32-bit shifters: fine X plus the intra-tile
        // position, one tile behind for all but the first column of a tile.
        let xb = u32::from(x & 7);
        let fine_x = u32::from(self.regs.vram.x);
        let xpos = 15 - ((xb + fine_x + 8 * u32::from(xb != 0)) & 15);

        let mut pixel: u16 = 0;
        let mut attr: u16 = 0;
        if show_bg {
            let (p, a) = self.bg.sample(xpos);
            pixel = p;
            attr = a;
        } else if self.regs.vram.v.raw() & 0x3F00 == 0x3F00 && !mask.rendering_enabled() {
            // Rendering fully disabled with v parked in palette space shows
            // that palette entry (the "background palette hack").
            pixel = self.regs.vram.v.raw();
        }

        if show_sp {
            for sno in 0..self.sprites.renderable() {
                let s = self.sprites.render[sno];
                let xdiff = x.wrapping_sub(u16::from(s.meta.x));
                if xdiff >= 8 {
                    continue; // also catches x still left of the sprite
                }
                let mut col = xdiff;
                if !s.attributes().contains(SpriteAttributes::FLIP_HORIZONTAL) {
                    col = 7 - col;
                }
                let sprite_pixel = (s.pattern >> (col * 2)) & 3;
                if sprite_pixel == 0 {
                    continue;
                }
                if x < 255 && pixel != 0 && s.meta.oam_index == 0 {
                    self.regs.status.insert(Status::SPRITE_ZERO_HIT);
                }
                if !s.attributes().contains(SpriteAttributes::BEHIND_BACKGROUND) || pixel == 0 {
                    attr = s.attributes().palette_group();
                    pixel = sprite_pixel;
                }
                // Only the first opaque sprite pixel participates.
                break;
            }
        }

        let color = self.palette.entry(attr * 4 + pixel) & mask.color_mask();
        let index = u16::from(color) | (mask.emphasis_bits() << 6);
        let rgb = bus.resolve_color(x, self.scanline as u16, index, self.cycle_phase);
        self.framebuffer[self.scanline as usize * SCREEN_WIDTH + x as usize] =
            0xFF00_0000 | rgb;
    }

    // ------------------------------------------------------------------
    // Save states
    // ------------------------------------------------------------------

    /// Captures a complete snapshot of the chip (frame buffer excluded — it
    /// is an output, not state).
    pub fn save_state(&self) -> PpuState {
        PpuState {
            region: self.region.into(),
            control: self.regs.control.bits(),
            mask: self.regs.mask.bits(),
            status: self.regs.status.bits(),
            oam_addr: self.regs.oam_addr,
            oam: self.regs.oam.clone(),
            palette: crate::mem_block::PaletteBytes::from_array(*self.palette.as_bytes()),
            vaddr: self.regs.vram.v.raw(),
            scroll: self.regs.vram.t.raw(),
            fine_x: self.regs.vram.x,
            write_toggle: self.regs.vram.w,
            read_buffer: self.regs.read_buffer,
            open_bus: self.open_bus.save_state(),
            vblank: self.vblank.save_state(),
            scanline: self.scanline,
            x: self.x,
            scanline_end: self.scanline_end,
            cycle_phase: self.cycle_phase,
            even_odd_toggle: self.even_odd_toggle,
            beats: self.beats,
            cpu_ticks: self.cpu_ticks,
            frame: self.frame,
            bg: self.bg.save_state(),
            pat_addr: self.pat_addr,
            io_addr: self.io_addr,
            sprites: self.sprites.save_state(),
        }
    }

    /// Restores a snapshot. Timing fields are validated (a snapshot from a
    /// different region or with an impossible beat position is rejected);
    /// sprite counters outside their legal ranges are clamped with a
    /// warning, mirroring how the hardware could never reach them.
    pub fn load_state(&mut self, state: &PpuState) -> Result<(), Error> {
        let region = Region::try_from(state.region)?;
        if state.scanline < -1 || state.scanline > region.last_scanline() {
            return Err(Error::StateOutOfRange {
                field: "scanline",
                value: i64::from(state.scanline),
            });
        }
        if state.scanline_end != LINE_BEATS && state.scanline_end != SHORT_LINE_BEATS {
            return Err(Error::StateOutOfRange {
                field: "scanline_end",
                value: i64::from(state.scanline_end),
            });
        }
        if state.x >= state.scanline_end {
            return Err(Error::StateOutOfRange {
                field: "x",
                value: i64::from(state.x),
            });
        }
        if state.cycle_phase >= 3 {
            return Err(Error::StateOutOfRange {
                field: "cycle_phase",
                value: i64::from(state.cycle_phase),
            });
        }

        self.region = region;
        self.regs.control = Control::from_bits_retain(state.control);
        self.regs.mask = Mask::from_bits_retain(state.mask);
        self.regs.status = Status::from_bits_retain(state.status);
        self.regs.oam_addr = state.oam_addr;
        self.regs.oam = state.oam.clone();
        self.palette.copy_from(&state.palette);
        self.regs.vram.v = VramAddr::from(state.vaddr);
        self.regs.vram.t = VramAddr::from(state.scroll);
        self.regs.vram.x = state.fine_x & 0b111;
        self.regs.vram.w = state.write_toggle;
        self.regs.read_buffer = state.read_buffer;
        self.open_bus.load_state(state.open_bus);
        self.vblank.load_state(state.vblank);
        self.scanline = state.scanline;
        self.x = state.x;
        self.scanline_end = state.scanline_end;
        self.cycle_phase = state.cycle_phase;
        self.even_odd_toggle = state.even_odd_toggle;
        self.beats = state.beats;
        self.cpu_ticks = state.cpu_ticks;
        self.frame = state.frame;
        self.bg.load_state(state.bg);
        self.pat_addr = state.pat_addr;
        self.io_addr = state.io_addr;
        if state.sprites.selected as usize > memory::SPRITES_PER_LINE
            || state.sprites.scanned > 64
        {
            log::warn!(
                "clamping sprite counters from snapshot (scanned {}, selected {})",
                state.sprites.scanned,
                state.sprites.selected
            );
        }
        self.sprites.load_state(&state.sprites);
        Ok(())
    }
}
