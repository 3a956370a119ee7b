//! Desired angle smoothing across control cycles

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of slots in the smoothing buffer.
pub const NUM_STEPS: usize = 5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Circular buffer of target angles indexed by the control tick.
///
/// The solver runs at about a fifth of the control rate, so averaging over five
/// cycles spreads each step change in the target over the solver period.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AngleSmoother {
    steps: [f64; NUM_STEPS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AngleSmoother {
    /// Create an empty (all zero) smoother.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot used by the given tick.
    pub fn slot(tick: u64) -> usize {
        (tick % NUM_STEPS as u64) as usize
    }

    /// Write the target angle into the tick's slot and return the new mean.
    pub fn inject(&mut self, tick: u64, angle_deg: f64) -> f64 {
        self.steps[Self::slot(tick)] = angle_deg;
        self.mean()
    }

    /// Zero the tick's slot, leaving the others untouched.
    pub fn zero(&mut self, tick: u64) {
        self.steps[Self::slot(tick)] = 0.0;
    }

    /// Mean of all slots.
    pub fn mean(&self) -> f64 {
        self.steps.iter().sum::<f64>() / NUM_STEPS as f64
    }

    /// Contents of the buffer.
    pub fn steps(&self) -> &[f64; NUM_STEPS] {
        &self.steps
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_slot_wraps() {
        assert_eq!(AngleSmoother::slot(0), 0);
        assert_eq!(AngleSmoother::slot(4), 4);
        assert_eq!(AngleSmoother::slot(5), 0);
        assert_eq!(AngleSmoother::slot(1_000_003), 3);
    }

    #[test]
    fn test_mean_of_recent() {
        let mut s = AngleSmoother::new();

        assert_eq!(s.inject(0, 5.0), 1.0);
        assert_eq!(s.inject(1, 5.0), 2.0);

        // Five further injections replace every slot
        for (tick, angle) in (2..7).zip([1.0, 2.0, 3.0, 4.0, 5.0].iter()) {
            s.inject(tick, *angle);
        }
        assert_eq!(s.mean(), 3.0);
    }

    #[test]
    fn test_settles_to_held_target() {
        let mut s = AngleSmoother::new();

        let mut out = 0.0;
        for tick in 10..15 {
            out = s.inject(tick, 12.5);
        }
        assert_eq!(out, 12.5);
        assert_eq!(s.inject(15, 12.5), 12.5);
    }

    #[test]
    fn test_zero_current_slot() {
        let mut s = AngleSmoother::new();
        for tick in 0..5 {
            s.inject(tick, 10.0);
        }

        s.zero(7);

        assert_eq!(s.steps(), &[10.0, 10.0, 0.0, 10.0, 10.0]);
        assert_eq!(s.mean(), 8.0);
    }
}
