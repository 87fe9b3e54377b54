//! Simulated clock.
//!
//! Steps from `start` (inclusive) to `end` (exclusive) in increments of one
//! resolution step. Each call to [`Clock::advance`] yields the next tick.

use chrono::{Duration, NaiveDateTime};

use super::resolution::Resolution;

#[derive(Debug, Clone)]
pub struct Clock {
    next: NaiveDateTime,
    now: Option<NaiveDateTime>,
    end: NaiveDateTime,
    step: Duration,
}

impl Clock {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, resolution: Resolution) -> Self {
        Self {
            next: start,
            now: None,
            end,
            step: resolution.step(),
        }
    }

    /// The most recent tick, `None` before the first advance.
    pub fn now(&self) -> Option<NaiveDateTime> {
        self.now
    }

    /// Exclusive end of the run.
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.end
    }

    /// Move to the next tick. Returns `None` once `end` is reached.
    pub fn advance(&mut self) -> Option<NaiveDateTime> {
        if self.is_done() {
            return None;
        }
        let tick = self.next;
        self.now = Some(tick);
        self.next = tick + self.step;
        Some(tick)
    }

    /// Number of ticks left, including the next one.
    pub fn remaining(&self) -> usize {
        if self.is_done() {
            return 0;
        }
        let span = self.end - self.next;
        let step = self.step.num_seconds().max(1);
        ((span.num_seconds() + step - 1) / step) as usize
    }
}

impl Iterator for Clock {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}
