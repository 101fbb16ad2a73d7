use super::savestate::VblankSequencerState;

/// Phase of the vblank edge sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) enum VblankPhase {
    /// The status register was just scheduled to clear; a short countdown
    /// runs before the NMI line is driven again.
    ClearingStatus,
    /// At rest: the NMI line is rewritten every beat from current state.
    #[default]
    Idle,
    /// The vblank flag raise is in flight.
    RaisingVblank,
}

/// One beat's worth of sequencer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VblankAction {
    /// Zero the whole status register (vblank, sprite-0 hit, overflow).
    ClearStatus,
    /// Set the vblank flag.
    SetInVblank,
    /// Drive the CPU NMI line from `InVBlank && NMI-enabled`.
    DriveNmi,
    /// Transitional beat; nothing observable happens.
    None,
}

/// Edge sequencer for the vblank flag and the NMI line.
///
/// Raising and clearing the flag are not instantaneous on entry to the
/// bounding scanlines: the raise lands one beat in and the NMI line resumes
/// two beats in; the clear lands one beat into the pre-render wrap with the
/// line resuming five beats later. A `$2002` read cancels any in-flight
/// transition back to rest — unless the sequencer is on the very beat that
/// clears the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct VblankSequencer {
    phase: VblankPhase,
    countdown: u8,
}

const RAISE_BEATS: u8 = 2;
const CLEAR_BEATS: u8 = 5;

impl VblankSequencer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedules the vblank flag raise (entry to scanline 241).
    pub(crate) fn begin_raise(&mut self) {
        self.phase = VblankPhase::RaisingVblank;
        self.countdown = RAISE_BEATS;
    }

    /// Schedules the status clear (wrap to the pre-render scanline).
    pub(crate) fn begin_clear(&mut self) {
        self.phase = VblankPhase::ClearingStatus;
        self.countdown = CLEAR_BEATS;
    }

    /// `$2002` read side effect: collapse an in-flight transition to rest.
    /// The initial clearing beat is the one state a read cannot cancel.
    pub(crate) fn cancel_on_status_read(&mut self) {
        let uncancellable =
            self.phase == VblankPhase::ClearingStatus && self.countdown == CLEAR_BEATS;
        if !uncancellable {
            self.phase = VblankPhase::Idle;
            self.countdown = 0;
        }
    }

    /// Advances one beat and reports what the driver must do this beat.
    pub(crate) fn tick(&mut self) -> VblankAction {
        match (self.phase, self.countdown) {
            (VblankPhase::Idle, _) => VblankAction::DriveNmi,
            (VblankPhase::RaisingVblank, RAISE_BEATS) => {
                self.countdown -= 1;
                VblankAction::SetInVblank
            }
            (VblankPhase::ClearingStatus, CLEAR_BEATS) => {
                self.countdown -= 1;
                VblankAction::ClearStatus
            }
            (_, 1) => {
                self.phase = VblankPhase::Idle;
                self.countdown = 0;
                VblankAction::None
            }
            _ => {
                self.countdown -= 1;
                VblankAction::None
            }
        }
    }

    pub(crate) fn save_state(&self) -> VblankSequencerState {
        VblankSequencerState {
            phase: match self.phase {
                VblankPhase::ClearingStatus => 0,
                VblankPhase::Idle => 1,
                VblankPhase::RaisingVblank => 2,
            },
            countdown: self.countdown,
        }
    }

    pub(crate) fn load_state(&mut self, state: VblankSequencerState) {
        self.countdown = state.countdown.min(CLEAR_BEATS);
        self.phase = match state.phase {
            0 if self.countdown > 0 => VblankPhase::ClearingStatus,
            2 if self.countdown > 0 => VblankPhase::RaisingVblank,
            _ => VblankPhase::Idle,
        };
        if self.phase == VblankPhase::Idle {
            self.countdown = 0;
        }
    }
}
