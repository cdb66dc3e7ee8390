//! Brew-duration strategies.
//!
//! The machine asks a [`BrewTime`] for each admitted job's duration, so tests
//! can swap the 20–55 second production range for millisecond brews.

use std::time::Duration;

use rand::Rng;

/// Shortest brew in seconds.
pub const MIN_BREW_SECONDS: u64 = 20;
/// Longest brew in seconds.
pub const MAX_BREW_SECONDS: u64 = 55;

/// Source of brew durations.
pub trait BrewTime: Send + Sync {
    fn brew_duration(&self) -> Duration;
}

impl<F> BrewTime for F
where
    F: Fn() -> Duration + Send + Sync,
{
    fn brew_duration(&self) -> Duration {
        self()
    }
}

/// Uniformly random whole-second durations within an inclusive range.
#[derive(Debug, Clone, Copy)]
pub struct RandomBrewTime {
    min_secs: u64,
    max_secs: u64,
}

impl RandomBrewTime {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: max_secs.max(min_secs),
        }
    }
}

impl Default for RandomBrewTime {
    fn default() -> Self {
        Self::new(MIN_BREW_SECONDS, MAX_BREW_SECONDS)
    }
}

impl BrewTime for RandomBrewTime {
    fn brew_duration(&self) -> Duration {
        let secs = rand::thread_rng().gen_range(self.min_secs..=self.max_secs);
        Duration::from_secs(secs)
    }
}

/// Always returns the same duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedBrewTime(pub Duration);

impl FixedBrewTime {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl BrewTime for FixedBrewTime {
    fn brew_duration(&self) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_durations_stay_in_range() {
        let brew = RandomBrewTime::default();
        for _ in 0..200 {
            let d = brew.brew_duration();
            assert!(d >= Duration::from_secs(MIN_BREW_SECONDS));
            assert!(d <= Duration::from_secs(MAX_BREW_SECONDS));
        }
    }

    #[test]
    fn inverted_range_is_normalized() {
        let brew = RandomBrewTime::new(9, 3);
        for _ in 0..50 {
            let secs = brew.brew_duration().as_secs();
            assert!((3..=9).contains(&secs));
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let brew = RandomBrewTime::new(7, 7);
        assert_eq!(brew.brew_duration(), Duration::from_secs(7));
    }

    #[test]
    fn closures_are_brew_times() {
        let brew = || Duration::from_millis(10);
        assert_eq!(brew.brew_duration(), Duration::from_millis(10));
        assert_eq!(FixedBrewTime::from_millis(5).brew_duration(), Duration::from_millis(5));
    }
}
