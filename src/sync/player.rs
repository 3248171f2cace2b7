use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;

/// Player states as reported by the video backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Playing,
    Paused,
    Buffering,
    Ended,
    Cued,
}

/// The external video player.
///
/// Implementations wrap whatever actually renders video; the engine only
/// reads time and state and issues transport commands.
pub trait PlayerBackend: Send {
    fn current_time(&self) -> f64;
    fn seek_to(&mut self, seconds: f64, exact: bool);
    fn play(&mut self);
    fn pause(&mut self);
    fn state(&self) -> PlayerState;
}

#[derive(Debug)]
struct SimulatedInner {
    position: f64,
    state: PlayerState,
    anchor: Option<Instant>,
    wall_clock: bool,
    seeks: Vec<(f64, bool)>,
}

impl SimulatedInner {
    fn position_now(&self) -> f64 {
        match (self.state, self.anchor) {
            (PlayerState::Playing, Some(anchor)) if self.wall_clock => {
                self.position + anchor.elapsed().as_secs_f64()
            }
            _ => self.position,
        }
    }

    fn fold_elapsed(&mut self) {
        self.position = self.position_now();
        self.anchor = (self.state == PlayerState::Playing).then(Instant::now);
    }
}

/// In-process player used by `replay` and tests.
///
/// Clones share one underlying player, so a test can keep a handle while the
/// session thread drives another.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    inner: Arc<Mutex<SimulatedInner>>,
}

impl SimulatedPlayer {
    /// Player whose position follows the wall clock while playing
    pub fn new(position: f64) -> Self {
        Self::build(position, true)
    }

    /// Player whose position only moves through `advance`/`set_position`
    pub fn manual(position: f64) -> Self {
        Self::build(position, false)
    }

    fn build(position: f64, wall_clock: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimulatedInner {
                position,
                state: PlayerState::Unstarted,
                anchor: None,
                wall_clock,
                seeks: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn advance(&self, seconds: f64) {
        let mut inner = self.lock();
        inner.fold_elapsed();
        inner.position += seconds;
    }

    pub fn set_position(&self, seconds: f64) {
        let mut inner = self.lock();
        inner.fold_elapsed();
        inner.position = seconds;
    }

    /// Change state as if the user or the backend did it
    pub fn set_state(&self, state: PlayerState) {
        let mut inner = self.lock();
        inner.fold_elapsed();
        inner.state = state;
        inner.anchor = (state == PlayerState::Playing).then(Instant::now);
    }

    /// Every seek issued so far, as `(target, exact)`
    pub fn seeks(&self) -> Vec<(f64, bool)> {
        self.lock().seeks.clone()
    }
}

impl PlayerBackend for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        self.lock().position_now()
    }

    fn seek_to(&mut self, seconds: f64, exact: bool) {
        debug!(seconds, exact, "simulated seek");
        let mut inner = self.lock();
        inner.fold_elapsed();
        inner.position = seconds;
        inner.seeks.push((seconds, exact));
    }

    fn play(&mut self) {
        self.set_state(PlayerState::Playing);
    }

    fn pause(&mut self) {
        self.set_state(PlayerState::Paused);
    }

    fn state(&self) -> PlayerState {
        self.lock().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_player_moves_only_when_told() {
        let mut player = SimulatedPlayer::manual(1.0);
        player.play();
        assert_eq!(player.current_time(), 1.0);
        player.advance(0.5);
        assert_eq!(player.current_time(), 1.5);
    }

    #[test]
    fn clones_share_state_and_record_seeks() {
        let handle = SimulatedPlayer::manual(4.9);
        let mut driven = handle.clone();
        driven.seek_to(0.0, true);
        driven.pause();
        assert_eq!(handle.current_time(), 0.0);
        assert_eq!(handle.state(), PlayerState::Paused);
        assert_eq!(handle.seeks(), vec![(0.0, true)]);
    }

    #[test]
    fn wall_clock_player_advances_while_playing() {
        let mut player = SimulatedPlayer::new(2.0);
        player.play();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(player.current_time() > 2.0);
        player.pause();
        let frozen = player.current_time();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(player.current_time(), frozen);
    }
}
