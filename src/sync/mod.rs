pub mod clock;
pub mod engine;
pub mod player;
pub mod repeat;
pub mod resolver;
pub mod scroll;
pub mod session;
pub mod timers;

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub use engine::{Command, LoadStatus, Shortcut, SyncEngine, SyncSnapshot};
pub use player::{PlayerBackend, PlayerState, SimulatedPlayer};
pub use session::{SessionController, SessionRuntime, SessionUpdate};
pub use timers::TimerKind;

/// Convenient alias for results returned by the sync runtime.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Lightweight error type for the session runtime plumbing.
#[derive(Debug, Clone)]
pub struct SyncError {
    message: Arc<str>,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for SyncError {}
