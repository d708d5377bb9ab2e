//! Fixed-timestep pacing against the wall clock.
//!
//! The scheduler converts elapsed real time into a whole number of ticks.
//! Leftover time stays in an accumulator so the host can interpolate
//! between a unit's previous and current position. A single gap longer
//! than the lag clamp (for example after the host was suspended) is cut
//! down instead of being replayed as a burst of catch-up ticks.

use std::time::Duration;

use tracing::debug;

use crate::command::FactionController;
use crate::data::Difficulty;
use crate::math::Fixed;
use crate::rng::RandomSource;
use crate::simulation::{Simulation, TickEvents};

/// Longest single gap the scheduler will account for.
pub const LAG_CLAMP: Duration = Duration::from_secs(1);

/// Fixed-timestep tick pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickScheduler {
    tick_duration: Duration,
    accumulator: Duration,
    ticks_issued: u64,
}

impl TickScheduler {
    /// Pace ticks `tick_duration` apart.
    ///
    /// A zero duration is treated as one millisecond.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration: tick_duration.max(Duration::from_millis(1)),
            accumulator: Duration::ZERO,
            ticks_issued: 0,
        }
    }

    /// Pace ticks at a difficulty's tick duration.
    #[must_use]
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        Self::new(difficulty.tick_duration())
    }

    /// Wall-clock length of one tick.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Ticks handed out so far.
    #[must_use]
    pub const fn ticks_issued(&self) -> u64 {
        self.ticks_issued
    }

    /// Account for `elapsed` wall-clock time and return how many whole
    /// ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let elapsed = if elapsed > LAG_CLAMP {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "Lag clamped");
            LAG_CLAMP
        } else {
            elapsed
        };
        self.accumulator += elapsed;

        let mut due = 0;
        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            due += 1;
        }
        self.ticks_issued += u64::from(due);
        due
    }

    /// Fraction of the next tick already elapsed, in `[0, 1)`.
    #[must_use]
    pub fn alpha(&self) -> Fixed {
        let done = Fixed::from_num(self.accumulator.as_micros() as u64);
        let whole = Fixed::from_num(self.tick_duration.as_micros() as u64);
        if whole <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        (done / whole).clamp(Fixed::ZERO, Fixed::ONE - Fixed::DELTA)
    }

    /// Step `sim` by however many ticks `elapsed` makes due.
    ///
    /// Stops early once the match is over.
    pub fn run_for<R, C>(
        &mut self,
        sim: &mut Simulation<R>,
        controller: &mut C,
        elapsed: Duration,
    ) -> Vec<TickEvents>
    where
        R: RandomSource,
        C: FactionController + ?Sized,
    {
        let due = self.advance(elapsed);
        let mut events = Vec::with_capacity(due as usize);
        for _ in 0..due {
            if sim.is_over() {
                break;
            }
            events.push(sim.step_with_controller(controller));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::IdleController;
    use crate::math::ratio;
    use crate::simulation::MatchConfig;

    #[test]
    fn test_whole_ticks_and_remainder() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(100));
        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(scheduler.alpha(), ratio(1, 2));
        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);
        assert_eq!(scheduler.alpha(), Fixed::ZERO);
        assert_eq!(scheduler.ticks_issued(), 3);
    }

    #[test]
    fn test_lag_clamp() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(100));
        assert_eq!(scheduler.advance(Duration::from_secs(30)), 10);
        assert_eq!(scheduler.alpha(), Fixed::ZERO);
    }

    #[test]
    fn test_alpha_stays_below_one() {
        let mut scheduler = TickScheduler::new(Duration::from_millis(35));
        for step in 1..200 {
            scheduler.advance(Duration::from_micros(step * 137));
            let alpha = scheduler.alpha();
            assert!(alpha >= Fixed::ZERO && alpha < Fixed::ONE);
        }
    }

    #[test]
    fn test_difficulty_pacing() {
        let scheduler = TickScheduler::for_difficulty(Difficulty::Inferno);
        assert_eq!(scheduler.tick_duration(), Duration::from_millis(35));
    }

    #[test]
    fn test_run_for_steps_simulation() {
        let mut sim = Simulation::new(MatchConfig::default());
        let mut scheduler = TickScheduler::for_difficulty(Difficulty::Medium);
        let events = scheduler.run_for(&mut sim, &mut IdleController, Duration::from_millis(350));
        assert_eq!(events.len(), 3);
        assert_eq!(sim.tick(), 3);
        assert_eq!(events[2].tick, 3);
    }
}
