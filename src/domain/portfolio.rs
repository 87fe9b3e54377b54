//! Portfolio ledger: cash, positions and equity tracking.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::order::Fill;
use super::position::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: BTreeMap<String, Position>,
    pub realized_pnl: f64,
    pub total_commission: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            positions: BTreeMap::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            equity_curve: Vec::new(),
        }
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Signed quantity held, 0 when flat.
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map(|p| p.quantity).unwrap_or(0.0)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Book a fill against cash and the matching position.
    pub fn apply_fill(&mut self, fill: &Fill) {
        self.cash -= fill.cash_outflow();
        self.total_commission += fill.commission;

        let position = self
            .positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::new(fill.symbol.clone(), 0.0, fill.price));
        self.realized_pnl += position.apply(fill.quantity, fill.price);
        position.last_price = fill.price;

        if position.is_flat() {
            self.positions.remove(&fill.symbol);
        }
    }

    /// Update last prices for every held symbol present in `prices`.
    pub fn mark_to_market(&mut self, prices: &BTreeMap<String, f64>) {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(&price) = prices.get(symbol) {
                position.last_price = price;
            }
        }
    }

    pub fn positions_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    /// Sum of absolute position values.
    pub fn gross_exposure(&self) -> f64 {
        self.positions.values().map(Position::exposure).sum()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions.values().map(Position::unrealized_pnl).sum()
    }

    /// Cash plus signed position values at the last marks.
    pub fn total_value(&self) -> f64 {
        self.cash + self.positions_value()
    }

    pub fn record_equity(&mut self, time: NaiveDateTime) {
        let equity = self.total_value();
        self.equity_curve.push(EquityPoint { time, equity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderId;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2013, 10, 7)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn fill(symbol: &str, quantity: f64, price: f64, commission: f64) -> Fill {
        Fill {
            order_id: OrderId(1),
            symbol: symbol.into(),
            time: at(10),
            quantity,
            price,
            commission,
        }
    }

    fn prices(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn new_portfolio() {
        let portfolio = Portfolio::new(100000.0);
        assert!((portfolio.cash - 100000.0).abs() < f64::EPSILON);
        assert!((portfolio.initial_capital - 100000.0).abs() < f64::EPSILON);
        assert!(portfolio.positions.is_empty());
        assert!(portfolio.equity_curve.is_empty());
        assert!((portfolio.total_value() - 100000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_fill_moves_cash_into_position() {
        let mut portfolio = Portfolio::new(100000.0);
        portfolio.apply_fill(&fill("SPY", 100.0, 150.0, 5.0));

        assert!((portfolio.cash - 84995.0).abs() < 1e-9);
        assert_eq!(portfolio.quantity("SPY"), 100.0);
        assert!((portfolio.total_commission - 5.0).abs() < f64::EPSILON);
        assert!((portfolio.total_value() - 99995.0).abs() < 1e-9);
    }

    #[test]
    fn round_trip_realizes_pnl_and_removes_position() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.apply_fill(&fill("SPY", 10.0, 100.0, 0.0));
        portfolio.apply_fill(&fill("SPY", -10.0, 110.0, 0.0));

        assert!(!portfolio.has_position("SPY"));
        assert!((portfolio.realized_pnl - 100.0).abs() < 1e-9);
        assert!((portfolio.cash - 10100.0).abs() < 1e-9);
    }

    #[test]
    fn short_sale_credits_cash() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.apply_fill(&fill("SPY", -10.0, 100.0, 0.0));
        assert!((portfolio.cash - 11000.0).abs() < 1e-9);
        assert!((portfolio.total_value() - 10000.0).abs() < 1e-9);

        portfolio.mark_to_market(&prices(&[("SPY", 90.0)]));
        assert!((portfolio.total_value() - 10100.0).abs() < 1e-9);
        assert!((portfolio.unrealized_pnl() - 100.0).abs() < 1e-9);
        assert!((portfolio.gross_exposure() - 900.0).abs() < 1e-9);
    }

    #[test]
    fn mark_to_market_ignores_unknown_symbols() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.apply_fill(&fill("SPY", 10.0, 100.0, 0.0));
        portfolio.mark_to_market(&prices(&[("QQQ", 1.0), ("SPY", 120.0)]));

        assert!((portfolio.positions_value() - 1200.0).abs() < 1e-9);
        assert!((portfolio.unrealized_pnl() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn record_equity_uses_total_value() {
        let mut portfolio = Portfolio::new(10000.0);
        portfolio.apply_fill(&fill("SPY", 10.0, 100.0, 0.0));
        portfolio.mark_to_market(&prices(&[("SPY", 105.0)]));
        portfolio.record_equity(at(11));

        assert_eq!(portfolio.equity_curve.len(), 1);
        assert_eq!(portfolio.equity_curve[0].time, at(11));
        assert!((portfolio.equity_curve[0].equity - 10050.0).abs() < 1e-9);
    }
}
