//! Continuous button hold tracking

/// Reports once a button has been held continuously for `required_ms`.
///
/// Fed with the time since the previous update and the current button
/// state. The count starts at the first update that sees the button down;
/// any release restarts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldDetector {
    required_ms: u32,
    held_ms: Option<u32>,
}

impl HoldDetector {
    pub const fn new(required_ms: u32) -> Self {
        Self {
            required_ms,
            held_ms: None,
        }
    }

    /// Returns true once the hold reaches the required duration
    pub fn update(&mut self, elapsed_ms: u32, pressed: bool) -> bool {
        if !pressed {
            self.held_ms = None;
            return false;
        }
        let held = match self.held_ms {
            Some(held) => held.saturating_add(elapsed_ms),
            None => 0,
        };
        self.held_ms = Some(held);
        held >= self.required_ms
    }

    pub fn reset(&mut self) {
        self.held_ms = None;
    }

    /// Time held so far, zero while released
    pub fn held_ms(&self) -> u32 {
        self.held_ms.unwrap_or(0)
    }

    pub fn required_ms(&self) -> u32 {
        self.required_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_completes() {
        let mut hold = HoldDetector::new(5_000);
        // Press seen, then ten more polls 500 ms apart
        assert!(!hold.update(500, true));
        for _ in 0..9 {
            assert!(!hold.update(500, true));
        }
        assert_eq!(hold.held_ms(), 4_500);
        assert!(hold.update(500, true));
    }

    #[test]
    fn test_release_restarts() {
        let mut hold = HoldDetector::new(1_000);
        assert!(!hold.update(500, true));
        assert!(!hold.update(500, true));
        assert!(!hold.update(500, false));
        assert_eq!(hold.held_ms(), 0);
        assert!(!hold.update(500, true));
        assert!(!hold.update(500, true));
        assert!(hold.update(500, true));
    }

    #[test]
    fn test_reset() {
        let mut hold = HoldDetector::new(1_000);
        hold.update(0, true);
        hold.update(900, true);
        hold.reset();
        assert!(!hold.update(500, true));
        assert_eq!(hold.held_ms(), 0);
    }
}
