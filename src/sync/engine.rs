//! The sync engine: one owner for captions, clock, loop and scroll state.
//!
//! Every input is a method that updates state and returns the commands the
//! caller must carry out (player transport, scroll requests, timers). The
//! engine never reads a clock or touches the player itself, so any sequence
//! of events can be replayed deterministically.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::ClockSampler;
use super::player::PlayerState;
use super::repeat::{LoopPhase, PauseOutcome, RepeatLoopController};
use super::resolver::{resolve_active, Resolution};
use super::scroll::ScrollSync;
use super::timers::TimerKind;
use crate::config::SyncTimings;
use crate::fetch::FetchError;
use crate::types::{CaptionIndex, RepeatState};

/// Side effects requested by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Seek { seconds: f64, exact: bool },
    Play,
    Pause,
    /// Bring caption `index` into view
    ScrollTo(usize),
    /// Arm (or re-arm) the timer of this kind
    Arm(TimerKind, Duration),
    Cancel(TimerKind),
}

/// Keyboard shortcuts understood by the interaction surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    TogglePlayback,
    ToggleRepeat,
    ToggleAutoScroll,
}

impl Shortcut {
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            ' ' | 'k' => Some(Self::TogglePlayback),
            'r' => Some(Self::ToggleRepeat),
            'a' => Some(Self::ToggleAutoScroll),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadStatus {
    #[default]
    Empty,
    Loading,
    Ready {
        segments: usize,
    },
    Failed(String),
}

/// Engine state as the UI sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSnapshot {
    pub active_index: Option<usize>,
    pub repeat: RepeatState,
    pub pause_pending: bool,
    pub auto_scroll: bool,
    pub user_scrolling: bool,
    pub current_time: f64,
    pub load: LoadStatus,
    pub languages: Vec<String>,
}

pub struct SyncEngine {
    timings: SyncTimings,
    captions: CaptionIndex,
    active: Option<usize>,
    clock: ClockSampler,
    repeat: RepeatLoopController,
    scroll: ScrollSync,
    player_attached: bool,
    player_state: PlayerState,
    load: LoadStatus,
    load_generation: u64,
}

impl SyncEngine {
    pub fn new(timings: SyncTimings) -> Self {
        Self {
            timings,
            captions: CaptionIndex::default(),
            active: None,
            clock: ClockSampler::new(),
            repeat: RepeatLoopController::new(timings.loop_epsilon),
            scroll: ScrollSync::new(),
            player_attached: false,
            player_state: PlayerState::Unstarted,
            load: LoadStatus::Empty,
            load_generation: 0,
        }
    }

    pub fn timings(&self) -> &SyncTimings {
        &self.timings
    }

    pub fn captions(&self) -> &CaptionIndex {
        &self.captions
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn repeat_state(&self) -> RepeatState {
        self.repeat.state()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn is_seeking(&self) -> bool {
        self.clock.is_seeking()
    }

    /// Whether the next poll should read the player at all
    pub fn wants_sample(&self) -> bool {
        self.player_attached && self.clock.accepts_samples()
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            active_index: self.active,
            repeat: self.repeat.state(),
            pause_pending: self.repeat.phase() == Some(LoopPhase::PendingPauseConfirm),
            auto_scroll: self.scroll.auto_scroll(),
            user_scrolling: self.scroll.user_scrolling(),
            current_time: self.clock.current_time(),
            load: self.load.clone(),
            languages: self.captions.languages(),
        }
    }

    /// Discard the current session's captions and loop ahead of a new fetch.
    ///
    /// Returns the generation a matching `finish_load` must carry.
    pub fn begin_load(&mut self) -> (u64, Vec<Command>) {
        self.load_generation = self.load_generation.wrapping_add(1);
        self.captions = CaptionIndex::default();
        self.active = None;
        self.repeat.disengage();
        self.load = LoadStatus::Loading;
        info!(generation = self.load_generation, "transcript load started");
        (
            self.load_generation,
            vec![Command::Cancel(TimerKind::PauseConfirm)],
        )
    }

    /// Install a fetch result. Stale generations are ignored; returns
    /// whether the result was applied.
    pub fn finish_load(
        &mut self,
        generation: u64,
        result: Result<CaptionIndex, FetchError>,
    ) -> bool {
        if generation != self.load_generation {
            debug!(
                generation,
                current = self.load_generation,
                "discarding superseded transcript"
            );
            return false;
        }
        let result = result.and_then(|index| {
            if index.is_empty() {
                Err(FetchError::Empty)
            } else {
                Ok(index)
            }
        });
        match result {
            Ok(index) => {
                info!(
                    segments = index.len(),
                    languages = ?index.languages(),
                    "transcript loaded"
                );
                self.load = LoadStatus::Ready {
                    segments: index.len(),
                };
                self.captions = index;
            }
            Err(err) => {
                warn!(error = %err, "transcript load failed");
                self.captions = CaptionIndex::default();
                self.repeat.disengage();
                self.load = LoadStatus::Failed(err.to_string());
            }
        }
        self.active = None;
        true
    }

    /// Player became ready: (re)start the single poll loop
    pub fn on_player_ready(&mut self) -> Vec<Command> {
        self.player_attached = true;
        let generation = self.clock.start();
        info!(generation, "player ready; clock sampling started");
        vec![Command::Arm(TimerKind::Poll, self.timings.poll_interval())]
    }

    /// A poll tick fired. `raw` is the player read, if one was taken.
    pub fn on_poll(&mut self, raw: Option<f64>) -> Vec<Command> {
        if !self.clock.is_running() {
            return Vec::new();
        }
        let mut commands = match raw {
            Some(raw) => self.on_sample(raw),
            None => Vec::new(),
        };
        commands.push(Command::Arm(TimerKind::Poll, self.timings.poll_interval()));
        commands
    }

    /// Process one clock sample: resolve the active caption, enforce the
    /// loop boundary, then decide on auto-scroll.
    pub fn on_sample(&mut self, raw: f64) -> Vec<Command> {
        let Some(time) = self.clock.publish(raw) else {
            return Vec::new();
        };
        if self.captions.is_empty() {
            return Vec::new();
        }

        let repeat = self.repeat.state();
        let changed = match resolve_active(time, &self.captions, self.active, &repeat) {
            Resolution::Changed(index) => {
                debug!(index, time, "active caption changed");
                self.active = Some(index);
                Some(index)
            }
            Resolution::Pinned { candidate, pinned } => {
                debug!(candidate, pinned, time, "sample outside pinned segment");
                None
            }
            Resolution::Unchanged => None,
        };

        let mut commands = Vec::new();
        if let Some(start) = self.repeat.boundary_reached(time) {
            commands.extend(self.seek(start));
        }
        if let Some(index) = changed {
            if self.scroll.should_scroll(index, &repeat) {
                commands.push(Command::ScrollTo(index));
            }
        }
        commands
    }

    pub fn on_seek_settled(&mut self) {
        self.clock.settle();
    }

    pub fn on_player_state(&mut self, state: PlayerState) -> Vec<Command> {
        if !self.player_attached {
            return Vec::new();
        }
        self.player_state = state;
        if state == PlayerState::Paused && self.repeat.on_paused() {
            debug!("pause during loop; awaiting confirmation");
            return vec![Command::Arm(
                TimerKind::PauseConfirm,
                self.timings.pause_confirm(),
            )];
        }
        Vec::new()
    }

    /// The pause confirmation window closed; `current` is the player state now
    pub fn on_pause_confirm(&mut self, current: PlayerState) -> Vec<Command> {
        if !self.player_attached {
            return Vec::new();
        }
        self.player_state = current;
        match self.repeat.confirm_pause(current == PlayerState::Paused) {
            PauseOutcome::Resume { start } => {
                let mut commands = self.seek(start);
                commands.push(self.play());
                commands
            }
            PauseOutcome::UserPaused | PauseOutcome::Ignored => Vec::new(),
        }
    }

    pub fn on_user_scroll(&mut self) -> Vec<Command> {
        self.scroll.on_user_scroll();
        vec![Command::Arm(
            TimerKind::ScrollCooldown,
            self.timings.scroll_cooldown(),
        )]
    }

    pub fn on_scroll_cooldown_elapsed(&mut self) {
        self.scroll.on_cooldown_elapsed();
    }

    /// Clicking a caption always loops it from the start
    pub fn click_caption(&mut self, index: usize) -> Vec<Command> {
        if !self.player_attached {
            return Vec::new();
        }
        let Some(segment) = self.captions.get(index).cloned() else {
            debug!(index, "click on unknown caption ignored");
            return Vec::new();
        };

        let start = self.repeat.engage(index, segment);
        self.active = Some(index);
        let mut commands = vec![Command::Cancel(TimerKind::PauseConfirm)];
        commands.extend(self.seek(start));
        commands.push(self.play());
        if self.scroll.should_scroll(index, &self.repeat.state()) {
            commands.push(Command::ScrollTo(index));
        }
        commands
    }

    pub fn toggle_repeat(&mut self) -> Vec<Command> {
        if self.repeat.disengage() {
            return vec![Command::Cancel(TimerKind::PauseConfirm)];
        }
        let Some((index, segment)) = self
            .active
            .and_then(|index| self.captions.get(index).cloned().map(|s| (index, s)))
        else {
            debug!("repeat toggle ignored; no active caption");
            return Vec::new();
        };

        let start = self.repeat.engage(index, segment);
        if !self.player_attached {
            return Vec::new();
        }
        let mut commands = self.seek(start);
        commands.push(self.play());
        commands
    }

    pub fn toggle_auto_scroll(&mut self) -> Vec<Command> {
        let enabled = self.scroll.toggle_auto_scroll();
        info!(enabled, "auto-scroll toggled");
        Vec::new()
    }

    pub fn toggle_playback(&mut self) -> Vec<Command> {
        if !self.player_attached {
            return Vec::new();
        }
        if self.player_state == PlayerState::Playing {
            self.player_state = PlayerState::Paused;
            vec![Command::Pause]
        } else {
            vec![self.play()]
        }
    }

    pub fn handle_shortcut(&mut self, shortcut: Shortcut) -> Vec<Command> {
        match shortcut {
            Shortcut::TogglePlayback => self.toggle_playback(),
            Shortcut::ToggleRepeat => self.toggle_repeat(),
            Shortcut::ToggleAutoScroll => self.toggle_auto_scroll(),
        }
    }

    /// Stop sampling and cancel every timer
    pub fn shutdown(&mut self) -> Vec<Command> {
        self.clock.stop();
        self.player_attached = false;
        info!("sync engine shut down");
        [
            TimerKind::Poll,
            TimerKind::SeekSettle,
            TimerKind::PauseConfirm,
            TimerKind::ScrollCooldown,
        ]
        .into_iter()
        .map(Command::Cancel)
        .collect()
    }

    /// Ask the player to play; the cached state follows so the playback
    /// shortcut stays in step before the player reports back
    fn play(&mut self) -> Command {
        self.player_state = PlayerState::Playing;
        Command::Play
    }

    fn seek(&mut self, seconds: f64) -> Vec<Command> {
        self.clock.begin_seek(seconds);
        vec![
            Command::Seek {
                seconds,
                exact: true,
            },
            Command::Arm(TimerKind::SeekSettle, self.timings.seek_guard()),
        ]
    }
}
