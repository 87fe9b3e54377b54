//! Simple Moving Average of close.

use std::collections::VecDeque;

use super::{Indicator, IndicatorType};
use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
    samples: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
            samples: 0,
        }
    }
}

impl Indicator for Sma {
    fn update(&mut self, bar: &Bar) {
        if !bar.is_qualifying() {
            return;
        }
        self.window.push_back(bar.close);
        self.sum += bar.close;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
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
        IndicatorType::Sma(self.period)
    }

    fn raw_value(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.sum / self.window.len() as f64
        }
    }
}
