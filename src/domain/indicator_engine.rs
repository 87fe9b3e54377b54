//! Registry of live indicators, keyed by symbol and indicator type.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::bar::Bar;
use crate::domain::error::ReplayError;
use crate::domain::indicator::{Indicator, IndicatorType};

/// Handle returned when an indicator is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndicatorHandle {
    pub symbol: String,
    pub kind: IndicatorType,
}

impl fmt::Display for IndicatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.kind)
    }
}

#[derive(Debug, Default)]
pub struct IndicatorEngine {
    indicators: BTreeMap<IndicatorHandle, Box<dyn Indicator>>,
    updates: usize,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `kind` on `symbol`. Registering the same pair twice returns
    /// the existing handle and keeps the existing state.
    pub fn register(&mut self, symbol: &str, kind: IndicatorType) -> IndicatorHandle {
        let handle = IndicatorHandle {
            symbol: symbol.to_uppercase(),
            kind,
        };
        self.indicators
            .entry(handle.clone())
            .or_insert_with(|| kind.build());
        handle
    }

    /// Feed a bar to every indicator on its symbol.
    pub fn update(&mut self, bar: &Bar) {
        for (handle, indicator) in self.indicators.iter_mut() {
            if handle.symbol == bar.symbol {
                indicator.update(bar);
            }
        }
        self.updates += 1;
    }

    pub fn is_ready(&self, handle: &IndicatorHandle) -> bool {
        self.indicators
            .get(handle)
            .map(|i| i.is_ready())
            .unwrap_or(false)
    }

    pub fn current(&self, handle: &IndicatorHandle) -> Result<f64, ReplayError> {
        match self.indicators.get(handle) {
            Some(indicator) => indicator.current(),
            None => Err(ReplayError::NotReady {
                indicator: handle.to_string(),
                samples: 0,
                period: handle.kind.period(),
            }),
        }
    }

    pub fn samples(&self, handle: &IndicatorHandle) -> usize {
        self.indicators
            .get(handle)
            .map(|i| i.samples())
            .unwrap_or(0)
    }

    pub fn all_ready(&self) -> bool {
        self.indicators.values().all(|i| i.is_ready())
    }

    /// Longest lookback across registered indicators, 0 when none.
    pub fn max_period(&self) -> usize {
        self.indicators
            .values()
            .map(|i| i.period())
            .max()
            .unwrap_or(0)
    }

    pub fn handles(&self) -> impl Iterator<Item = &IndicatorHandle> {
        self.indicators.keys()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Bars fed through [`IndicatorEngine::update`] so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}
