//! Standard Deviation indicator.
//!
//! Population standard deviation over the last n closing prices.
//! STDDEV(n) = sqrt(sum((C[j] - mean)^2) / n)

use std::collections::VecDeque;

use super::{Indicator, IndicatorType};
use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct Stddev {
    period: usize,
    window: VecDeque<f64>,
    samples: usize,
}

impl Stddev {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            window: VecDeque::with_capacity(period),
            samples: 0,
        }
    }
}

impl Indicator for Stddev {
    fn update(&mut self, bar: &Bar) {
        if !bar.is_qualifying() {
            return;
        }
        self.window.push_back(bar.close);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.samples += 1;
    }

    fn period(&self) -> usize {
        self.period
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Stddev(self.period)
    }

    // Recomputed from the window on read so no running-sum drift builds up.
    fn raw_value(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let n = self.window.len() as f64;
        let mean: f64 = self.window.iter().sum::<f64>() / n;
        let variance: f64 = self
            .window
            .iter()
            .map(|c| {
                let diff = c - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        variance.sqrt()
    }
}
