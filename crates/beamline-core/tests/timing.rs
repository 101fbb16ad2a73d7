mod common;

use beamline_core::{memory::Register, Ppu, Region};
use common::{tick_n, TestBus};

const NTSC_FRAME_BEATS: u64 = 341 * 262;
const PAL_FRAME_BEATS: u64 = 341 * 312;

#[test]
fn power_then_vblank_flag_read() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();

    // From the post-power position (start of the vblank region) one full
    // frame returns to it; one more beat raises the flag.
    assert_eq!(ppu.position(), (241, 0));
    tick_n(&mut ppu, &mut bus, ((NTSC_FRAME_BEATS + 1) / 3) as usize);
    assert_eq!(ppu.beats(), NTSC_FRAME_BEATS + 1);

    let first = ppu.read(Register::Status.addr(), &mut bus);
    assert_ne!(first & 0x80, 0, "vblank flag should be set");
    let second = ppu.read(Register::Status.addr(), &mut bus);
    assert_eq!(second & 0x80, 0, "the read must clear the flag");
}

#[test]
fn ntsc_frame_cadence_alternates_when_background_is_on() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();
    ppu.write(Register::Mask.addr(), 0b0000_1000, &mut bus); // background on

    while bus.vertical_blanks.len() < 6 {
        ppu.tick(&mut bus);
    }
    let deltas: Vec<u64> = bus
        .vertical_blanks
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();

    // One beat disappears from the pre-render line on alternating frames.
    for pair in deltas.windows(2) {
        assert_eq!(pair[0] + pair[1], 2 * NTSC_FRAME_BEATS - 1);
    }
    assert!(deltas.contains(&NTSC_FRAME_BEATS));
    assert!(deltas.contains(&(NTSC_FRAME_BEATS - 1)));
}

#[test]
fn ntsc_frame_cadence_is_constant_when_rendering_is_off() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();

    while bus.vertical_blanks.len() < 4 {
        ppu.tick(&mut bus);
    }
    for w in bus.vertical_blanks.windows(2) {
        assert_eq!(w[1] - w[0], NTSC_FRAME_BEATS);
    }
}

#[test]
fn pal_frames_never_shorten() {
    let mut ppu = Ppu::new(Region::Pal);
    ppu.power();
    let mut bus = TestBus::new();
    ppu.write(Register::Mask.addr(), 0b0000_1000, &mut bus);

    while bus.vertical_blanks.len() < 4 {
        ppu.tick(&mut bus);
    }
    for w in bus.vertical_blanks.windows(2) {
        assert_eq!(w[1] - w[0], PAL_FRAME_BEATS);
    }
}

#[test]
fn pal_ticks_average_three_point_two_beats() {
    let mut ppu = Ppu::new(Region::Pal);
    ppu.power();
    let mut bus = TestBus::new();
    tick_n(&mut ppu, &mut bus, 100);
    assert_eq!(ppu.beats(), 320);
}

#[test]
fn frame_complete_fires_once_per_frame_at_the_end_of_line_239() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();

    while bus.frame_completes.len() < 3 {
        ppu.tick(&mut bus);
    }
    for w in bus.frame_completes.windows(2) {
        assert_eq!(w[1] - w[0], NTSC_FRAME_BEATS);
    }
    // frame_complete leads the vblank callback by the idle scanline 240.
    let fc = bus.frame_completes[0];
    let vb = *bus
        .vertical_blanks
        .iter()
        .find(|&&b| b > fc)
        .expect("a vblank follows every frame");
    assert_eq!(vb - fc, 341);
}

#[test]
fn nmi_rises_three_beats_after_vblank_entry_and_tracks_the_flag() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();
    ppu.write(Register::Control.addr(), 0x80, &mut bus); // NMI enable

    while bus.nmi_rises.is_empty() {
        ppu.tick(&mut bus);
    }
    let vb = bus.vertical_blanks[0];
    assert_eq!(bus.nmi_rises[0] - vb, 3);
    assert!(ppu.nmi_level());

    // Acknowledging the flag drops the line on the next rest beat.
    let _ = ppu.read(Register::Status.addr(), &mut bus);
    tick_n(&mut ppu, &mut bus, 1);
    assert!(!bus.nmi, "nmi releases once the flag is gone");
}

#[test]
fn enabling_nmi_mid_vblank_asserts_the_line() {
    let mut ppu = Ppu::new(Region::Ntsc);
    ppu.power();
    let mut bus = TestBus::new();

    while bus.vertical_blanks.is_empty() {
        ppu.tick(&mut bus);
    }
    tick_n(&mut ppu, &mut bus, 4); // well past the raise
    assert!(!bus.nmi, "NMI disabled: line stays low");

    ppu.write(Register::Control.addr(), 0x80, &mut bus);
    tick_n(&mut ppu, &mut bus, 1);
    assert!(bus.nmi, "line follows InVBlank && NMIenabled");
}
