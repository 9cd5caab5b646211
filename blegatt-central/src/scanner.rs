//! Scan session bookkeeping.
//!
//! The backend runs at most one scan at a time. Sessions carry a generation
//! counter so a timer belonging to a superseded session never stops its
//! successor.

use std::time::Duration;

/// Options for [`start_scanning`](crate::BleCentral::start_scanning).
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Stop automatically after this long. `None` scans until
    /// [`stop_scanning`](crate::BleCentral::stop_scanning).
    pub duration: Option<Duration>,
    /// Skip the runtime permission prompt; the caller vouches the
    /// permission is already held.
    pub skip_permission_check: bool,
}

#[derive(Default)]
pub struct ScanSessions {
    active: bool,
    generation: u64,
}

impl ScanSessions {
    /// Starts a new session, superseding any active one. Returns the new
    /// session's generation and whether a previous session was displaced.
    pub fn begin(&mut self) -> (u64, bool) {
        let displaced = self.active;
        self.generation += 1;
        self.active = true;
        (self.generation, displaced)
    }

    /// Ends the current session. Returns whether a session was active.
    pub fn end(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }

    /// Ends the session only if `generation` is still the current one.
    /// A stale timer firing after a restart is a no-op.
    pub fn end_if_current(&mut self, generation: u64) -> bool {
        if self.active && self.generation == generation {
            self.active = false;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_does_not_stop_new_session() {
        let mut sessions = ScanSessions::default();
        let (old, _) = sessions.begin();
        let (new, displaced) = sessions.begin();
        assert!(displaced);

        assert!(!sessions.end_if_current(old));
        assert!(sessions.is_active());
        assert!(sessions.end_if_current(new));
        assert!(!sessions.is_active());
    }

    #[test]
    fn end_is_idempotent() {
        let mut sessions = ScanSessions::default();
        sessions.begin();
        assert!(sessions.end());
        assert!(!sessions.end());
    }
}
