//! Relative volume indicator.
//!
//! RDV(n) = V[i] / mean(V[i-n+1..=i])
//! The window includes the latest bar. When the window mean is zero the value
//! is 0.0. Ready after n qualifying bars.

use std::collections::VecDeque;

use super::{Indicator, IndicatorType};
use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct RelativeVolume {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    samples: usize,
    value: f64,
}

impl RelativeVolume {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            samples: 0,
            value: 0.0,
        }
    }
}

impl Indicator for RelativeVolume {
    fn update(&mut self, bar: &Bar) {
        if !bar.is_qualifying() {
            return;
        }
        let volume = bar.volume as f64;
        self.window.push_back(volume);
        self.sum += volume;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.samples += 1;

        let mean = self.sum / self.window.len() as f64;
        self.value = if mean > 0.0 { volume / mean } else { 0.0 };
    }

    fn period(&self) -> usize {
        self.period
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Rdv(self.period)
    }

    fn raw_value(&self) -> f64 {
        self.value
    }
}
