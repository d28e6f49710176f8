use std::time::{Duration, Instant};

/// Fixed-rate frame clock. Each `tick` sleeps until one period after the
/// previous deadline, so work done between ticks does not stretch the cadence.
pub struct Interval {
    next_tick: Instant,
    period: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            next_tick: Instant::now() + period,
            period,
        }
    }

    /// Restarts the cadence from now.
    pub fn reset(&mut self) {
        self.next_tick = Instant::now() + self.period;
    }

    pub fn tick(&mut self) {
        let now = Instant::now();

        if now < self.next_tick {
            std::thread::sleep(self.next_tick - now);
            self.next_tick += self.period;
        } else {
            // fell behind (scheduler hiccup), don't try to catch up
            self.next_tick = now + self.period;
        }
    }
}
