//! OBV (On-Balance Volume) indicator.

use super::{Indicator, IndicatorType};
use crate::domain::bar::Bar;

/// On-Balance Volume.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// Ready after the first bar.
#[derive(Debug, Clone, Default)]
pub struct Obv {
    obv: f64,
    prev_close: Option<f64>,
    samples: usize,
}

impl Obv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indicator for Obv {
    fn update(&mut self, bar: &Bar) {
        if !bar.is_qualifying() {
            return;
        }
        let volume = bar.volume as f64;
        match self.prev_close {
            None => self.obv = volume,
            Some(prev) if bar.close > prev => self.obv += volume,
            Some(prev) if bar.close < prev => self.obv -= volume,
            Some(_) => {}
        }
        self.prev_close = Some(bar.close);
        self.samples += 1;
    }

    fn period(&self) -> usize {
        1
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Obv
    }

    fn raw_value(&self) -> f64 {
        self.obv
    }
}
