//! Scan engine gate: decode pacing and attach/detach lifecycle.
//!
//! The decoder itself lives outside the core (a keyboard-wedge scanner
//! or the console input line); this gate decides whether a decode is
//! consumed, enforces the fixed cool-down window between decodes, and
//! models the engine being torn down while the session gate is closed
//! or a fetch is in flight.

use std::time::{Duration, Instant};

/// Engine lifecycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerPhase {
    /// No engine attached; decodes are dropped
    Detached,
    /// Armed and consuming decodes
    Active,
    /// Paused after a decode; auto-resumes at `until`
    Cooling { until: Instant },
}

#[derive(Debug)]
pub struct Scanner {
    phase: ScannerPhase,
    cooldown: Duration,
}

impl Scanner {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            phase: ScannerPhase::Detached,
            cooldown,
        }
    }

    /// Acquire the engine. A no-op when already attached, so the engine
    /// is never instantiated twice.
    pub fn attach(&mut self) {
        if self.phase == ScannerPhase::Detached {
            self.phase = ScannerPhase::Active;
        }
    }

    /// Release the engine, cancelling any pending cool-down
    pub fn detach(&mut self) {
        self.phase = ScannerPhase::Detached;
    }

    pub fn phase(&self) -> ScannerPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == ScannerPhase::Active
    }

    /// Consume one decode. Returns false while detached or cooling; on
    /// success the gate enters the cool-down window.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.phase {
            ScannerPhase::Active => {
                self.phase = ScannerPhase::Cooling {
                    until: now + self.cooldown,
                };
                true
            }
            _ => false,
        }
    }

    /// Auto-resume once the cool-down window has passed
    pub fn tick(&mut self, now: Instant) {
        if let ScannerPhase::Cooling { until } = self.phase
            && now >= until
        {
            self.phase = ScannerPhase::Active;
        }
    }

    /// Time left in the cool-down, for the console countdown
    pub fn cooling_remaining(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            ScannerPhase::Cooling { until } => Some(until.saturating_duration_since(now)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(3);

    #[test]
    fn detached_rejects_decodes() {
        let mut scanner = Scanner::new(COOLDOWN);
        assert!(!scanner.accept(Instant::now()));
    }

    #[test]
    fn accept_enters_cooldown_and_rejects_repeats() {
        let mut scanner = Scanner::new(COOLDOWN);
        scanner.attach();
        let t0 = Instant::now();

        assert!(scanner.accept(t0));
        assert!(!scanner.accept(t0));
        assert!(!scanner.accept(t0 + Duration::from_secs(2)));
        assert_eq!(
            scanner.cooling_remaining(t0 + Duration::from_secs(1)),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn tick_resumes_after_window() {
        let mut scanner = Scanner::new(COOLDOWN);
        scanner.attach();
        let t0 = Instant::now();
        scanner.accept(t0);

        scanner.tick(t0 + Duration::from_secs(2));
        assert!(!scanner.is_active());
        scanner.tick(t0 + COOLDOWN);
        assert!(scanner.is_active());
        assert!(scanner.accept(t0 + COOLDOWN));
    }

    #[test]
    fn detach_wins_over_cooldown() {
        let mut scanner = Scanner::new(COOLDOWN);
        scanner.attach();
        let t0 = Instant::now();
        scanner.accept(t0);

        scanner.detach();
        scanner.tick(t0 + COOLDOWN);
        assert_eq!(scanner.phase(), ScannerPhase::Detached);
        assert!(!scanner.accept(t0 + COOLDOWN));
    }

    #[test]
    fn attach_is_idempotent_mid_cooldown() {
        let mut scanner = Scanner::new(COOLDOWN);
        scanner.attach();
        let t0 = Instant::now();
        scanner.accept(t0);

        // Re-attaching must not cut the cool-down short
        scanner.attach();
        assert!(!scanner.is_active());
        assert!(matches!(scanner.phase(), ScannerPhase::Cooling { .. }));
    }
}
