//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: the first (n-1) bars are not ready.

use super::{Indicator, IndicatorType};
use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed_sum: f64,
    ema: f64,
    samples: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            ema: 0.0,
            samples: 0,
        }
    }

    pub fn smoothing(&self) -> f64 {
        self.k
    }
}

impl Indicator for Ema {
    fn update(&mut self, bar: &Bar) {
        if !bar.is_qualifying() {
            return;
        }
        self.samples += 1;
        if self.samples < self.period {
            self.seed_sum += bar.close;
        } else if self.samples == self.period {
            self.seed_sum += bar.close;
            self.ema = self.seed_sum / self.period as f64;
        } else {
            self.ema = bar.close * self.k + self.ema * (1.0 - self.k);
        }
    }

    fn period(&self) -> usize {
        self.period
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Ema(self.period)
    }

    fn raw_value(&self) -> f64 {
        self.ema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn run(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut ema = Ema::new(period);
        make_bars(prices)
            .iter()
            .map(|bar| {
                ema.update(bar);
                ema.current().ok()
            })
            .collect()
    }

    #[test]
    fn ema_warmup() {
        let values = run(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[3].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn ema_period_1() {
        let values = run(&[10.0, 20.0, 30.0], 1);
        assert!((values[0].unwrap() - 10.0).abs() < f64::EPSILON);
        assert!((values[1].unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((values[2].unwrap() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_seed_is_sma() {
        let values = run(&[10.0, 20.0, 30.0], 3);
        let expected_sma = (10.0 + 20.0 + 30.0) / 3.0;
        assert!((values[2].unwrap() - expected_sma).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = run(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        let k = 2.0 / 4.0;
        let sma = (10.0 + 20.0 + 30.0) / 3.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert!((values[3].unwrap() - ema_3).abs() < f64::EPSILON);
        assert!((values[4].unwrap() - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let values = run(&[100.0, 100.0, 100.0, 100.0, 100.0], 3);
        for v in &values[2..] {
            assert!((v.unwrap() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_smoothing_factor() {
        let ema = Ema::new(10);
        assert!((ema.smoothing() - 2.0 / 11.0).abs() < f64::EPSILON);
    }
}
