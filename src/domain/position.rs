//! Open position in one instrument.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Signed share quantity; negative when short.
    pub quantity: f64,
    /// Volume-weighted average cost of the open quantity.
    pub avg_cost: f64,
    pub last_price: f64,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_cost: price,
            last_price: price,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }

    /// Signed value at the last mark: negative for shorts.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.last_price
    }

    /// Absolute value at the last mark.
    pub fn exposure(&self) -> f64 {
        self.market_value().abs()
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.quantity * (self.last_price - self.avg_cost)
    }

    /// Apply a signed fill and return the realized P&L it books.
    ///
    /// Adding on the same side moves the average cost to the VWAP. Reducing
    /// keeps the average and realizes the closed part. Crossing zero realizes
    /// the whole old position and opens the remainder at `price`.
    pub fn apply(&mut self, quantity: f64, price: f64) -> f64 {
        let old = self.quantity;
        let new = old + quantity;

        if old == 0.0 || old.signum() == quantity.signum() {
            let cost = old * self.avg_cost + quantity * price;
            self.quantity = new;
            self.avg_cost = if new == 0.0 { 0.0 } else { cost / new };
            return 0.0;
        }

        let closed = quantity.abs().min(old.abs()) * old.signum();
        let realized = closed * (price - self.avg_cost);
        self.quantity = new;
        if new == 0.0 {
            self.avg_cost = 0.0;
        } else if new.signum() != old.signum() {
            self.avg_cost = price;
        }
        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_long_position() -> Position {
        let mut pos = Position::new("SPY", 100.0, 50.0);
        pos.last_price = 55.0;
        pos
    }

    fn sample_short_position() -> Position {
        let mut pos = Position::new("SPY", -100.0, 100.0);
        pos.last_price = 90.0;
        pos
    }

    #[test]
    fn side_predicates() {
        assert!(sample_long_position().is_long());
        assert!(sample_short_position().is_short());
        assert!(Position::new("SPY", 0.0, 1.0).is_flat());
    }

    #[test]
    fn market_value_is_signed() {
        assert!((sample_long_position().market_value() - 5500.0).abs() < f64::EPSILON);
        assert!((sample_short_position().market_value() - (-9000.0)).abs() < f64::EPSILON);
        assert!((sample_short_position().exposure() - 9000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        assert!((sample_long_position().unrealized_pnl() - 500.0).abs() < f64::EPSILON);
        assert!((sample_short_position().unrealized_pnl() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adding_moves_average_to_vwap() {
        let mut pos = Position::new("SPY", 100.0, 50.0);
        let realized = pos.apply(100.0, 60.0);
        assert_eq!(realized, 0.0);
        assert_eq!(pos.quantity, 200.0);
        assert!((pos.avg_cost - 55.0).abs() < 1e-12);
    }

    #[test]
    fn reducing_keeps_average_and_realizes() {
        let mut pos = Position::new("SPY", 100.0, 50.0);
        let realized = pos.apply(-40.0, 60.0);
        assert!((realized - 400.0).abs() < 1e-12);
        assert_eq!(pos.quantity, 60.0);
        assert!((pos.avg_cost - 50.0).abs() < 1e-12);
    }

    #[test]
    fn closing_flattens() {
        let mut pos = Position::new("SPY", -10.0, 100.0);
        let realized = pos.apply(10.0, 90.0);
        assert!((realized - 100.0).abs() < 1e-12);
        assert!(pos.is_flat());
    }

    #[test]
    fn crossing_zero_resets_average() {
        let mut pos = Position::new("SPY", 10.0, 100.0);
        let realized = pos.apply(-15.0, 110.0);
        assert!((realized - 100.0).abs() < 1e-12);
        assert_eq!(pos.quantity, -5.0);
        assert!((pos.avg_cost - 110.0).abs() < 1e-12);
    }
}
