//! Performance metrics computed from a finished run.

use super::order::{OrderEvent, OrderStatus};
use super::portfolio::{EquityPoint, Portfolio};
use super::resolution::Window;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of consecutive equity points below the running peak.
    pub max_drawdown_duration: usize,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_commission: f64,
    pub orders_filled: usize,
    pub orders_rejected: usize,
    pub orders_canceled: usize,
}

impl Metrics {
    /// Returns are annualized over the calendar length of `window`. Sharpe and
    /// Sortino scale by equity points per calendar year, so ticks without
    /// bars count as periods.
    pub fn compute(
        portfolio: &Portfolio,
        events: &[OrderEvent],
        window: Window,
        risk_free_rate: f64,
    ) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let initial_capital = portfolio.initial_capital;
        let years = (window.end - window.start).num_seconds() as f64 / SECONDS_PER_YEAR;
        let periods_per_year = if years > 0.0 {
            equity_curve.len() as f64 / years
        } else {
            0.0
        };

        let final_value = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);

        let period_rf = if periods_per_year > 0.0 {
            risk_free_rate / periods_per_year
        } else {
            0.0
        };
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(equity_curve, period_rf, periods_per_year);

        let count = |status: OrderStatus| events.iter().filter(|e| e.status == status).count();

        Metrics {
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            realized_pnl: portfolio.realized_pnl,
            unrealized_pnl: portfolio.unrealized_pnl(),
            total_commission: portfolio.total_commission,
            orders_filled: count(OrderStatus::Filled),
            orders_rejected: count(OrderStatus::Rejected),
            orders_canceled: count(OrderStatus::Canceled),
        }
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(
    equity_curve: &[EquityPoint],
    period_rf: f64,
    periods_per_year: f64,
) -> (f64, f64) {
    if equity_curve.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - period_rf;
    let annualizer = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * annualizer
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * annualizer
    } else {
        0.0
    };

    (sharpe, sortino)
}
