//! Repeat-loop state machine.
//!
//! `Idle` or `Looping`; a loop is either `Running` or waiting to learn
//! whether a pause notification came from the user.

use tracing::{debug, info};

use crate::types::{CaptionSegment, RepeatState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Running,
    PendingPauseConfirm,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Idle,
    Looping {
        index: usize,
        segment: CaptionSegment,
        phase: LoopPhase,
    },
}

/// Result of the pause confirmation window closing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PauseOutcome {
    /// No confirmation was pending
    Ignored,
    /// Player stayed paused: the loop was dropped
    UserPaused,
    /// Player is running again: rewind to `start` and keep looping
    Resume { start: f64 },
}

#[derive(Debug, Clone)]
pub struct RepeatLoopController {
    mode: Mode,
    epsilon: f64,
}

impl RepeatLoopController {
    pub fn new(epsilon: f64) -> Self {
        Self {
            mode: Mode::Idle,
            epsilon,
        }
    }

    /// Pin `segment` and return the position to seek to
    pub fn engage(&mut self, index: usize, segment: CaptionSegment) -> f64 {
        let start = segment.start;
        info!(index, start, duration = segment.duration, "repeat loop engaged");
        self.mode = Mode::Looping {
            index,
            segment,
            phase: LoopPhase::Running,
        };
        start
    }

    /// Drop the loop. Returns whether one was active.
    pub fn disengage(&mut self) -> bool {
        let was_looping = self.is_looping();
        if was_looping {
            info!("repeat loop released");
        }
        self.mode = Mode::Idle;
        was_looping
    }

    pub fn is_looping(&self) -> bool {
        matches!(self.mode, Mode::Looping { .. })
    }

    pub fn phase(&self) -> Option<LoopPhase> {
        match &self.mode {
            Mode::Idle => None,
            Mode::Looping { phase, .. } => Some(*phase),
        }
    }

    pub fn pinned_index(&self) -> Option<usize> {
        match &self.mode {
            Mode::Idle => None,
            Mode::Looping { index, .. } => Some(*index),
        }
    }

    pub fn state(&self) -> RepeatState {
        match &self.mode {
            Mode::Idle => RepeatState::idle(),
            Mode::Looping { index, segment, .. } => RepeatState::looping(*index, segment.clone()),
        }
    }

    /// Start of the pinned segment if `time` has reached its end (less ε)
    pub fn boundary_reached(&self, time: f64) -> Option<f64> {
        match &self.mode {
            Mode::Looping { segment, .. } if time >= segment.end() - self.epsilon => {
                debug!(time, rewind_to = segment.start, "loop boundary reached");
                Some(segment.start)
            }
            _ => None,
        }
    }

    /// Handle a paused notification. Returns true when a confirmation
    /// window should be (re)armed.
    pub fn on_paused(&mut self) -> bool {
        match &mut self.mode {
            Mode::Looping { phase, .. } => {
                *phase = LoopPhase::PendingPauseConfirm;
                true
            }
            Mode::Idle => false,
        }
    }

    /// Close the confirmation window given whether the player is still paused
    pub fn confirm_pause(&mut self, still_paused: bool) -> PauseOutcome {
        let start = match &mut self.mode {
            Mode::Looping {
                segment,
                phase: phase @ LoopPhase::PendingPauseConfirm,
                ..
            } => {
                *phase = LoopPhase::Running;
                segment.start
            }
            _ => return PauseOutcome::Ignored,
        };

        if still_paused {
            info!("pause confirmed as user intent; leaving repeat loop");
            self.mode = Mode::Idle;
            PauseOutcome::UserPaused
        } else {
            debug!(start, "transient pause during loop; resuming");
            PauseOutcome::Resume { start }
        }
    }
}
