use crate::types::RepeatState;

/// Auto-scroll gating.
///
/// `auto_scroll` is the user's global preference; `user_scrolling` is the
/// temporary manual override. They never affect each other.
#[derive(Debug, Clone)]
pub struct ScrollSync {
    auto_scroll: bool,
    user_scrolling: bool,
    cooldown_pending: bool,
}

impl Default for ScrollSync {
    fn default() -> Self {
        Self {
            auto_scroll: true,
            user_scrolling: false,
            cooldown_pending: false,
        }
    }
}

impl ScrollSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user-originated scroll; the caller (re)arms the cooldown
    pub fn on_user_scroll(&mut self) {
        self.user_scrolling = true;
        self.cooldown_pending = true;
    }

    pub fn on_cooldown_elapsed(&mut self) {
        self.user_scrolling = false;
        self.cooldown_pending = false;
    }

    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        self.auto_scroll
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn user_scrolling(&self) -> bool {
        self.user_scrolling
    }

    pub fn cooldown_pending(&self) -> bool {
        self.cooldown_pending
    }

    /// Whether the view may be moved to `target` right now
    pub fn should_scroll(&self, target: usize, repeat: &RepeatState) -> bool {
        self.auto_scroll && !self.user_scrolling && (!repeat.active || repeat.pins(target))
    }
}
