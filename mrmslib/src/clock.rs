//! Monotonic time, in milliseconds.

/// A point in time, counted in milliseconds from an arbitrary start.
pub type Instant = fugit::TimerInstantU64<1000>;

/// A span of time, in milliseconds.
pub type Duration = fugit::MillisDurationU64;

/// A monotonic clock.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

impl<C> Clock for &mut C
where
    C: Clock,
{
    fn now(&mut self) -> Instant {
        (**self).now()
    }
}

/// A [Clock] counting from when it was created.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&mut self) -> Instant {
        Instant::from_ticks(self.start.elapsed().as_millis() as u64)
    }
}

/// A [Clock] that only moves when told to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManualClock {
    millis: u64,
}

impl ManualClock {
    pub const fn new(millis: u64) -> Self {
        Self { millis }
    }

    pub fn advance(&mut self, by: Duration) {
        self.millis += by.ticks();
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Instant {
        Instant::from_ticks(self.millis)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manual_clock() {
        let mut clock = ManualClock::new(5);
        assert_eq!(clock.now().ticks(), 5);
        clock.advance(Duration::millis(100));
        assert_eq!(clock.now().ticks(), 105);
        assert_eq!(clock.now() - Instant::from_ticks(5), Duration::millis(100));
    }

    #[cfg(feature = "std")]
    #[test]
    fn std_clock_moves_forward() {
        let mut clock = StdClock::new();
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(clock.now() > a);
    }
}
