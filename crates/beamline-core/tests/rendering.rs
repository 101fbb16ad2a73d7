mod common;

use beamline_core::{memory::Register, MasterPalette, Ppu, Region, SCREEN_WIDTH};
use common::{run_until, TestBus};

/// Uploads one sprite record through the OAM ports.
fn write_sprite(ppu: &mut Ppu, bus: &mut TestBus, index: u8, y: u8, tile: u8, attr: u8, x: u8) {
    ppu.write(Register::OamAddr.addr(), index * 4, bus);
    for byte in [y, tile, attr, x] {
        ppu.write(Register::OamData.addr(), byte, bus);
    }
}

/// Parks every sprite off-screen so evaluation finds nothing by default.
fn clear_oam(ppu: &mut Ppu, bus: &mut TestBus) {
    ppu.write(Register::OamAddr.addr(), 0, bus);
    for _ in 0..256 {
        ppu.write(Register::OamData.addr(), 0xFF, bus);
    }
}

fn set_palette(ppu: &mut Ppu, bus: &mut TestBus, offset: u8, value: u8) {
    ppu.write(Register::Addr.addr(), 0x3F, bus);
    ppu.write(Register::Addr.addr(), offset, bus);
    ppu.write(Register::Data.addr(), value, bus);
}

/// Background + sprite scene: solid background tiles, sprite 0 at (20, 30).
fn scene(sprite_attr: u8) -> (Ppu, TestBus) {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::with_solid_tile_zero();

    clear_oam(&mut ppu, &mut bus);
    write_sprite(&mut ppu, &mut bus, 0, 29, 0, sprite_attr, 20);
    set_palette(&mut ppu, &mut bus, 0x01, 0x16); // background color 1
    set_palette(&mut ppu, &mut bus, 0x11, 0x27); // sprite palette 4, color 1

    // Both layers on, including the left columns.
    ppu.write(Register::Mask.addr(), 0b0001_1110, &mut bus);
    (ppu, bus)
}

#[test]
fn sprite_zero_hit_fires_where_sprite_covers_background() {
    let (mut ppu, mut bus) = scene(0);

    run_until(&mut ppu, &mut bus, 29, 340);
    let before = ppu.read(Register::Status.addr(), &mut bus);
    assert_eq!(before & 0x40, 0, "no hit before the sprite's scanline");

    run_until(&mut ppu, &mut bus, 30, 25);
    let after = ppu.read(Register::Status.addr(), &mut bus);
    assert_ne!(after & 0x40, 0, "hit once the overlap is composited");
}

#[test]
fn front_sprite_pixel_wins_over_background() {
    let (mut ppu, mut bus) = scene(0);
    run_until(&mut ppu, &mut bus, 31, 0);

    let fb = ppu.framebuffer();
    let sprite_px = fb[30 * SCREEN_WIDTH + 20];
    let bg_px = fb[30 * SCREEN_WIDTH + 100];
    assert_eq!(sprite_px, 0xFF00_0000 | MasterPalette::NTSC.rgb(0x27));
    assert_eq!(bg_px, 0xFF00_0000 | MasterPalette::NTSC.rgb(0x16));
}

#[test]
fn behind_background_sprite_still_registers_the_hit() {
    let (mut ppu, mut bus) = scene(0b0010_0000); // priority: behind
    run_until(&mut ppu, &mut bus, 31, 0);

    let fb = ppu.framebuffer();
    assert_eq!(
        fb[30 * SCREEN_WIDTH + 20],
        0xFF00_0000 | MasterPalette::NTSC.rgb(0x16),
        "background shows through"
    );
    let status = ppu.read(Register::Status.addr(), &mut bus);
    assert_ne!(status & 0x40, 0, "hit detection ignores priority");
}

#[test]
fn left_edge_mask_suppresses_background_columns() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::with_solid_tile_zero();
    clear_oam(&mut ppu, &mut bus);
    set_palette(&mut ppu, &mut bus, 0x00, 0x0D); // backdrop
    set_palette(&mut ppu, &mut bus, 0x01, 0x16);

    // Background on, left-8 column disabled.
    ppu.write(Register::Mask.addr(), 0b0000_1000, &mut bus);
    run_until(&mut ppu, &mut bus, 31, 0);

    let fb = ppu.framebuffer();
    assert_eq!(
        fb[30 * SCREEN_WIDTH + 3],
        0xFF00_0000 | MasterPalette::NTSC.rgb(0x0D),
        "masked column falls back to the backdrop"
    );
    assert_eq!(
        fb[30 * SCREEN_WIDTH + 30],
        0xFF00_0000 | MasterPalette::NTSC.rgb(0x16)
    );
}

#[test]
fn greyscale_masks_the_composed_color() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::with_solid_tile_zero();
    clear_oam(&mut ppu, &mut bus);
    set_palette(&mut ppu, &mut bus, 0x01, 0x16);

    // Background + greyscale: color 0x16 collapses to row color 0x10.
    ppu.write(Register::Mask.addr(), 0b0000_1001, &mut bus);
    run_until(&mut ppu, &mut bus, 31, 0);

    assert_eq!(
        ppu.framebuffer()[30 * SCREEN_WIDTH + 30],
        0xFF00_0000 | MasterPalette::NTSC.rgb(0x10)
    );
}

#[test]
fn parked_palette_address_shows_through_when_rendering_is_off() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();

    set_palette(&mut ppu, &mut bus, 0x05, 0x2C);
    // Park v inside palette space with both layers disabled.
    ppu.write(Register::Addr.addr(), 0x3F, &mut bus);
    ppu.write(Register::Addr.addr(), 0x05, &mut bus);

    run_until(&mut ppu, &mut bus, 31, 0);
    assert_eq!(
        ppu.framebuffer()[30 * SCREEN_WIDTH + 100],
        0xFF00_0000 | MasterPalette::NTSC.rgb(0x2C)
    );
}

#[test]
fn emphasis_bits_extend_the_resolver_index() {
    struct IndexProbe {
        max_index: u16,
    }
    impl beamline_core::VideoBus for IndexProbe {
        fn read(&mut self, _addr: u16) -> u8 {
            0
        }
        fn write(&mut self, _addr: u16, _value: u8) {}
        fn resolve_color(&mut self, _x: u16, _y: u16, index: u16, _phase: u8) -> u32 {
            self.max_index = self.max_index.max(index);
            u32::from(index)
        }
    }

    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut probe = IndexProbe { max_index: 0 };
    // All three emphasis bits + background enable.
    ppu.write(0x2001, 0b1110_1000, &mut probe);
    // Enough cycles to get from the post-power vblank into visible lines.
    for _ in 0..(341 * 80 / 3) {
        ppu.tick(&mut probe);
    }
    assert_eq!(probe.max_index >> 6, 0b111, "emphasis occupies bits 6-8");
}

#[test]
fn sprite_overflow_flag_set_on_ninth_candidate() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::with_solid_tile_zero();
    clear_oam(&mut ppu, &mut bus);
    for i in 0..9 {
        write_sprite(&mut ppu, &mut bus, i, 49, 0, 0, 8 * i);
    }
    ppu.write(Register::Mask.addr(), 0b0001_1000, &mut bus);

    run_until(&mut ppu, &mut bus, 51, 0);
    let status = ppu.read(Register::Status.addr(), &mut bus);
    assert_ne!(status & 0x20, 0, "ninth in-range sprite sets the flag");
}
