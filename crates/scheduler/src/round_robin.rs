//! Round-robin phase clock.

use std::time::Duration;

use contracts::{Lane, LightState};

/// Fixed-length GREEN then YELLOW phases cycling N → E → S → W.
///
/// Phase boundaries are derived from the start of the current phase, never
/// from the tick that noticed them, so a late tick does not stretch or
/// shorten any later phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseClock {
    lane: Lane,
    phase_start: Duration,
    green: Duration,
    phase: Duration,
}

impl PhaseClock {
    /// Start `lane` on a fresh GREEN phase at `now`.
    ///
    /// `green` must be non-zero so that a phase always has positive length.
    pub fn new(lane: Lane, now: Duration, green: Duration, yellow: Duration) -> Self {
        debug_assert!(!green.is_zero(), "GREEN time must be positive");
        Self {
            lane,
            phase_start: now,
            green,
            phase: green + yellow,
        }
    }

    /// Lane currently holding the round-robin turn.
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// Start time of the current phase.
    pub fn phase_start(&self) -> Duration {
        self.phase_start
    }

    /// Length of one GREEN + YELLOW phase.
    pub fn phase_length(&self) -> Duration {
        self.phase
    }

    /// Restart the current lane on a fresh GREEN phase.
    pub fn restart(&mut self, now: Duration) {
        self.phase_start = now;
    }

    /// Move the clock forward to `now`, skipping any whole phases that elapsed.
    ///
    /// Returns the number of phase boundaries crossed. Times earlier than the
    /// current phase start are ignored.
    pub fn advance(&mut self, now: Duration) -> u64 {
        let elapsed = now.saturating_sub(self.phase_start);
        let phase_nanos = self.phase.as_nanos().max(1);
        let crossed = elapsed.as_nanos() / phase_nanos;
        if crossed == 0 {
            return 0;
        }

        let offset = u64::try_from(crossed * phase_nanos).unwrap_or(u64::MAX);
        self.phase_start += Duration::from_nanos(offset);

        let steps = (crossed % Lane::COUNT as u128) as usize;
        self.lane = Lane::from_index((self.lane.index() + steps) % Lane::COUNT)
            .unwrap_or(self.lane);

        u64::try_from(crossed).unwrap_or(u64::MAX)
    }

    /// Light shown by the active lane at `now` (call [`PhaseClock::advance`] first).
    pub fn state_at(&self, now: Duration) -> LightState {
        if now.saturating_sub(self.phase_start) < self.green {
            LightState::Green
        } else {
            LightState::Yellow
        }
    }
}
