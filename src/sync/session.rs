use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::engine::{Command, Shortcut, SyncEngine, SyncSnapshot};
use super::player::{PlayerBackend, PlayerState};
use super::timers::{TimerKind, TimerSet};
use super::{Result, SyncError};
use crate::config::SyncTimings;
use crate::fetch::{FetchError, TranscriptFetcher};
use crate::types::CaptionIndex;

/// Messages from the session thread to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Snapshot(SyncSnapshot),
    /// A transcript was installed; sent before the matching snapshot
    CaptionsLoaded(CaptionIndex),
    ScrollTo(usize),
    /// A load request was refused before touching any state
    InputRejected(String),
}

enum SessionCommand {
    Load(String),
    PlayerReady(Box<dyn PlayerBackend>),
    PlayerState(PlayerState),
    UserScrolled,
    ClickCaption(usize),
    Shortcut(Shortcut),
    FetchCompleted {
        generation: u64,
        result: std::result::Result<CaptionIndex, FetchError>,
    },
    Shutdown,
}

#[derive(Clone)]
pub struct SessionController {
    tx: Sender<SessionCommand>,
}

impl SessionController {
    pub fn load(&self, source: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::Load(source.into()), "request transcript")
    }

    /// Hand the session a ready player; replaces any previous one
    pub fn player_ready(&self, player: impl PlayerBackend + 'static) -> Result<()> {
        self.send(
            SessionCommand::PlayerReady(Box::new(player)),
            "attach player",
        )
    }

    pub fn player_state_changed(&self, state: PlayerState) -> Result<()> {
        self.send(SessionCommand::PlayerState(state), "forward player state")
    }

    pub fn user_scrolled(&self) -> Result<()> {
        self.send(SessionCommand::UserScrolled, "forward scroll")
    }

    pub fn click_caption(&self, index: usize) -> Result<()> {
        self.send(SessionCommand::ClickCaption(index), "forward caption click")
    }

    pub fn shortcut(&self, shortcut: Shortcut) -> Result<()> {
        self.send(SessionCommand::Shortcut(shortcut), "forward shortcut")
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown, "shutdown session")
    }

    fn send(&self, command: SessionCommand, label: &str) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| SyncError::new(format!("failed to {}", label)))
    }
}

/// Owns the session thread. Dropping it shuts the thread down.
pub struct SessionRuntime {
    controller: SessionController,
    updates: Receiver<SessionUpdate>,
    join: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    pub fn new(timings: SyncTimings, fetcher: Arc<dyn TranscriptFetcher>) -> Result<Self> {
        timings
            .validate()
            .map_err(|err| SyncError::new(err.to_string()))?;
        let (command_tx, command_rx) = channel();
        let (update_tx, update_rx) = channel();
        let worker = SessionWorker {
            engine: SyncEngine::new(timings),
            player: None,
            timers: TimerSet::new(),
            fetcher,
            commands: command_tx.clone(),
            updates: update_tx,
            last_snapshot: None,
        };
        let join = thread::Builder::new()
            .name("caption-sync".to_string())
            .spawn(move || worker.run(command_rx))
            .map_err(|err| {
                error!(error = %err, "failed to spawn caption sync thread");
                SyncError::new(err.to_string())
            })?;
        info!(
            poll_ms = timings.poll_interval_ms,
            seek_guard_ms = timings.seek_guard_ms,
            "caption sync session started"
        );
        Ok(Self {
            controller: SessionController { tx: command_tx },
            updates: update_rx,
            join: Some(join),
        })
    }

    pub fn controller(&self) -> SessionController {
        self.controller.clone()
    }

    pub fn try_recv(&self) -> Option<SessionUpdate> {
        self.updates.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionUpdate> {
        self.updates.recv_timeout(timeout).ok()
    }

    pub fn drain(&self) -> Vec<SessionUpdate> {
        self.updates.try_iter().collect()
    }

    /// Block until a snapshot satisfies `predicate`, or the timeout passes
    pub fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<SyncSnapshot>
    where
        F: FnMut(&SyncSnapshot) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.updates.recv_timeout(remaining) {
                Ok(SessionUpdate::Snapshot(snapshot)) if predicate(&snapshot) => {
                    return Some(snapshot)
                }
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Drop for SessionRuntime {
    fn drop(&mut self) {
        let _ = self.controller.shutdown();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

struct SessionWorker {
    engine: SyncEngine,
    player: Option<Box<dyn PlayerBackend>>,
    timers: TimerSet,
    fetcher: Arc<dyn TranscriptFetcher>,
    commands: Sender<SessionCommand>,
    updates: Sender<SessionUpdate>,
    last_snapshot: Option<SyncSnapshot>,
}

impl SessionWorker {
    fn run(mut self, commands: Receiver<SessionCommand>) {
        info!("caption sync thread running");
        self.publish();
        loop {
            // The worker keeps a sender for fetch completions, so the channel
            // never disconnects; only `Shutdown` ends the loop.
            let received = match self.timers.next_deadline() {
                Some(deadline) => commands
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => commands.recv().ok(),
            };
            match received {
                Some(SessionCommand::Shutdown) => {
                    info!("received shutdown command");
                    break;
                }
                Some(command) => self.handle(command),
                None => {}
            }
            self.fire_due_timers();
            self.publish();
        }
        let teardown = self.engine.shutdown();
        self.apply(teardown);
        self.player = None;
        info!("caption sync thread exiting");
    }

    fn handle(&mut self, command: SessionCommand) {
        let commands = match command {
            SessionCommand::Load(source) => self.start_load(source),
            SessionCommand::PlayerReady(player) => {
                self.player = Some(player);
                self.engine.on_player_ready()
            }
            SessionCommand::PlayerState(state) => {
                if self.player.is_none() {
                    debug!(?state, "player state before ready ignored");
                    return;
                }
                self.engine.on_player_state(state)
            }
            SessionCommand::UserScrolled => self.engine.on_user_scroll(),
            SessionCommand::ClickCaption(index) => self.engine.click_caption(index),
            SessionCommand::Shortcut(shortcut) => self.engine.handle_shortcut(shortcut),
            SessionCommand::FetchCompleted { generation, result } => {
                let applied = self.engine.finish_load(generation, result);
                if applied && !self.engine.captions().is_empty() {
                    let _ = self
                        .updates
                        .send(SessionUpdate::CaptionsLoaded(self.engine.captions().clone()));
                }
                Vec::new()
            }
            SessionCommand::Shutdown => Vec::new(),
        };
        self.apply(commands);
    }

    fn start_load(&mut self, source: String) -> Vec<Command> {
        if source.trim().is_empty() {
            warn!("transcript request without a video source");
            let _ = self
                .updates
                .send(SessionUpdate::InputRejected(FetchError::InvalidInput.to_string()));
            return Vec::new();
        }

        let (generation, commands) = self.engine.begin_load();
        let fetcher = Arc::clone(&self.fetcher);
        let completions = self.commands.clone();
        let spawned = thread::Builder::new()
            .name("transcript-fetch".to_string())
            .spawn(move || {
                let result = fetcher.fetch(&source);
                let _ = completions.send(SessionCommand::FetchCompleted { generation, result });
            });
        if let Err(err) = spawned {
            error!(error = %err, "failed to spawn transcript fetch");
            self.engine
                .finish_load(generation, Err(FetchError::Network(err.to_string())));
        }
        commands
    }

    fn fire_due_timers(&mut self) {
        loop {
            let due = self.timers.take_due(Instant::now());
            if due.is_empty() {
                return;
            }
            for kind in due {
                let commands = match kind {
                    TimerKind::Poll => {
                        let raw = match (&self.player, self.engine.wants_sample()) {
                            (Some(player), true) => Some(player.current_time()),
                            _ => None,
                        };
                        self.engine.on_poll(raw)
                    }
                    TimerKind::SeekSettle => {
                        self.engine.on_seek_settled();
                        Vec::new()
                    }
                    TimerKind::PauseConfirm => {
                        let state = self
                            .player
                            .as_ref()
                            .map(|player| player.state())
                            .unwrap_or_default();
                        self.engine.on_pause_confirm(state)
                    }
                    TimerKind::ScrollCooldown => {
                        self.engine.on_scroll_cooldown_elapsed();
                        Vec::new()
                    }
                };
                self.apply(commands);
            }
        }
    }

    fn apply(&mut self, commands: Vec<Command>) {
        let now = Instant::now();
        for command in commands {
            match command {
                Command::Seek { seconds, exact } => {
                    if let Some(player) = self.player.as_mut() {
                        player.seek_to(seconds, exact);
                    }
                }
                Command::Play => {
                    if let Some(player) = self.player.as_mut() {
                        player.play();
                    }
                }
                Command::Pause => {
                    if let Some(player) = self.player.as_mut() {
                        player.pause();
                    }
                }
                Command::ScrollTo(index) => {
                    let _ = self.updates.send(SessionUpdate::ScrollTo(index));
                }
                Command::Arm(kind, after) => self.timers.arm(kind, now, after),
                Command::Cancel(kind) => {
                    self.timers.cancel(kind);
                }
            }
        }
    }

    fn publish(&mut self) {
        let snapshot = self.engine.snapshot();
        if self.last_snapshot.as_ref() == Some(&snapshot) {
            return;
        }
        let _ = self.updates.send(SessionUpdate::Snapshot(snapshot.clone()));
        self.last_snapshot = Some(snapshot);
    }
}
