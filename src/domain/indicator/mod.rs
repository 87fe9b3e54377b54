//! Streaming technical indicators.
//!
//! Every indicator is fed one bar at a time through [`Indicator::update`] and
//! becomes ready after `period()` qualifying bars. Reading the value before
//! that fails with [`ReplayError::NotReady`].
//!
//! - `IndicatorType`: identity + parameters (hashable, used as a key)
//! - `Indicator`: the rolling state machine behind a type

pub mod ema;
pub mod obv;
pub mod rdv;
pub mod sma;
pub mod stddev;

use std::fmt;

use crate::domain::bar::Bar;
use crate::domain::error::ReplayError;

pub use ema::Ema;
pub use obv::Obv;
pub use rdv::RelativeVolume;
pub use sma::Sma;
pub use stddev::Stddev;

pub trait Indicator: fmt::Debug + Send {
    /// Feed one bar. Non-qualifying bars are ignored.
    fn update(&mut self, bar: &Bar);

    /// Number of qualifying bars needed before the value is valid.
    fn period(&self) -> usize;

    /// Qualifying bars seen so far.
    fn samples(&self) -> usize;

    fn indicator_type(&self) -> IndicatorType;

    /// Unchecked value; meaningless until ready.
    fn raw_value(&self) -> f64;

    fn is_ready(&self) -> bool {
        self.samples() >= self.period()
    }

    fn current(&self) -> Result<f64, ReplayError> {
        if self.is_ready() {
            Ok(self.raw_value())
        } else {
            Err(ReplayError::NotReady {
                indicator: self.indicator_type().to_string(),
                samples: self.samples(),
                period: self.period(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Rdv(usize),
    Sma(usize),
    Ema(usize),
    Stddev(usize),
    Obv,
}

impl IndicatorType {
    /// Bars of lookback needed before the indicator is ready.
    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Rdv(n)
            | IndicatorType::Sma(n)
            | IndicatorType::Ema(n)
            | IndicatorType::Stddev(n) => *n,
            IndicatorType::Obv => 1,
        }
    }

    /// Fresh, empty indicator state for this type.
    pub fn build(&self) -> Box<dyn Indicator> {
        match *self {
            IndicatorType::Rdv(n) => Box::new(RelativeVolume::new(n)),
            IndicatorType::Sma(n) => Box::new(Sma::new(n)),
            IndicatorType::Ema(n) => Box::new(Ema::new(n)),
            IndicatorType::Stddev(n) => Box::new(Stddev::new(n)),
            IndicatorType::Obv => Box::new(Obv::new()),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Rdv(period) => write!(f, "RDV({})", period),
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Rdv(2).to_string(), "RDV(2)");
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::Obv.to_string(), "OBV");
    }

    #[test]
    fn build_matches_type() {
        for ty in [
            IndicatorType::Rdv(3),
            IndicatorType::Sma(5),
            IndicatorType::Ema(4),
            IndicatorType::Stddev(6),
            IndicatorType::Obv,
        ] {
            let ind = ty.build();
            assert_eq!(ind.indicator_type(), ty);
            assert_eq!(ind.period(), ty.period());
            assert!(!ind.is_ready());
        }
    }

    #[test]
    fn current_before_ready_is_not_ready_error() {
        let ind = IndicatorType::Sma(3).build();
        match ind.current() {
            Err(ReplayError::NotReady {
                indicator,
                samples,
                period,
            }) => {
                assert_eq!(indicator, "SMA(3)");
                assert_eq!(samples, 0);
                assert_eq!(period, 3);
            }
            other => panic!("expected NotReady, got {:?}", other),
        }
    }

    #[test]
    fn non_qualifying_bars_do_not_count() {
        let mut ind = IndicatorType::Sma(2).build();
        let mut bars = test_support::make_bars(&[10.0, 20.0, 30.0]);
        bars[1].close = f64::NAN;
        ind.update(&bars[0]);
        ind.update(&bars[1]);
        assert!(!ind.is_ready());
        ind.update(&bars[2]);
        assert!(ind.is_ready());
        assert!((ind.current().unwrap() - 20.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn ready_exactly_at_period(period in 1usize..30, extra in 0usize..10) {
            let kinds = [
                IndicatorType::Rdv(period),
                IndicatorType::Sma(period),
                IndicatorType::Ema(period),
                IndicatorType::Stddev(period),
            ];
            let prices: Vec<f64> = (0..period + extra).map(|i| 100.0 + i as f64).collect();
            let bars = test_support::make_bars(&prices);
            for ty in kinds {
                let mut ind = ty.build();
                for (i, bar) in bars.iter().enumerate() {
                    ind.update(bar);
                    let updates = i + 1;
                    prop_assert_eq!(ind.is_ready(), updates >= period);
                    prop_assert_eq!(ind.current().is_ok(), updates >= period);
                }
            }
        }
    }
}
