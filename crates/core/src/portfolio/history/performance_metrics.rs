//! Window statistics over a snapshot series.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use super::history_model::{DailyReturn, PerformanceReport, PortfolioValueSnapshot};
use crate::constants::DECIMAL_PRECISION;

const TRADING_DAYS_PER_YEAR: i64 = 252;

fn pct_change(from: Decimal, to: Decimal) -> Option<Decimal> {
    if from.is_zero() {
        None
    } else {
        Some(((to - from) / from * dec!(100)).round_dp(DECIMAL_PRECISION))
    }
}

/// Day-over-day returns. A day whose previous value is zero has no return.
pub fn daily_returns(snapshots: &[PortfolioValueSnapshot]) -> Vec<DailyReturn> {
    snapshots
        .windows(2)
        .filter_map(|pair| {
            pct_change(pair[0].total_value, pair[1].total_value).map(|return_pct| DailyReturn {
                date: pair[1].snapshot_date,
                value: pair[1].total_value,
                return_pct,
            })
        })
        .collect()
}

/// Population standard deviation.
pub fn population_std_dev(values: &[Decimal]) -> Decimal {
    if values.len() < 2 {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len());
    let mean = values.iter().copied().sum::<Decimal>() / n;
    let variance = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / n;
    variance.sqrt().unwrap_or(Decimal::ZERO)
}

/// Largest peak-to-trough decline in percent of the peak.
pub fn max_drawdown_pct(values: &[Decimal]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for value in values {
        if *value > peak {
            peak = *value;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - *value) / peak * dec!(100);
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst.round_dp(DECIMAL_PRECISION)
}

/// Builds the report for an ascending snapshot series. Returns `None` when
/// the window holds no snapshot.
pub fn calculate_performance(
    portfolio_id: &str,
    snapshots: &[PortfolioValueSnapshot],
) -> Option<PerformanceReport> {
    let first = snapshots.first()?;
    let last = snapshots.last()?;

    let returns = daily_returns(snapshots);
    let return_values: Vec<Decimal> = returns.iter().map(|r| r.return_pct).collect();
    let volatility = population_std_dev(&return_values);
    let annualization = Decimal::from(TRADING_DAYS_PER_YEAR)
        .sqrt()
        .unwrap_or(Decimal::ONE);

    let best_day = returns.iter().max_by(|a, b| a.return_pct.cmp(&b.return_pct)).cloned();
    let worst_day = returns.iter().min_by(|a, b| a.return_pct.cmp(&b.return_pct)).cloned();
    let values: Vec<Decimal> = snapshots.iter().map(|s| s.total_value).collect();

    Some(PerformanceReport {
        portfolio_id: portfolio_id.to_string(),
        start_date: first.snapshot_date,
        end_date: last.snapshot_date,
        data_points: snapshots.len(),
        start_value: first.total_value,
        end_value: last.total_value,
        total_return_pct: pct_change(first.total_value, last.total_value).unwrap_or(Decimal::ZERO),
        daily_returns: returns,
        volatility_pct: volatility.round_dp(DECIMAL_PRECISION),
        annualized_volatility_pct: (volatility * annualization).round_dp(DECIMAL_PRECISION),
        best_day,
        worst_day,
        max_drawdown_pct: max_drawdown_pct(&values),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::history::SnapshotSource;
    use chrono::NaiveDate;

    fn snap(day: u32, value: Decimal) -> PortfolioValueSnapshot {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        PortfolioValueSnapshot {
            portfolio_id: "p1".to_string(),
            snapshot_date: date,
            total_value: value,
            total_cost: Decimal::ZERO,
            cash_balance: Decimal::ZERO,
            holdings_count: 0,
            unrealized_gain: Decimal::ZERO,
            return_pct: Decimal::ZERO,
            source: SnapshotSource::Backfill,
            created_at: date.and_hms_opt(0, 0, 0).unwrap(),
            updated_at: date.and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_window_return_uses_first_snapshot_in_window() {
        let series = vec![snap(4, dec!(200)), snap(5, dec!(220)), snap(6, dec!(210))];
        let report = calculate_performance("p1", &series).unwrap();
        assert_eq!(report.total_return_pct, dec!(5));
        assert_eq!(report.data_points, 3);
        assert_eq!(report.daily_returns.len(), 2);
        assert_eq!(report.best_day.unwrap().return_pct, dec!(10));
        assert_eq!(report.worst_day.unwrap().date, NaiveDate::from_ymd_opt(2024, 3, 6).unwrap());
    }

    #[test]
    fn test_population_std_dev() {
        let values = [dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9)];
        assert_eq!(population_std_dev(&values).round_dp(6), dec!(2));
        assert_eq!(population_std_dev(&[dec!(3)]), Decimal::ZERO);
    }

    #[test]
    fn test_max_drawdown() {
        let values = [dec!(100), dec!(120), dec!(90), dec!(130), dec!(117)];
        assert_eq!(max_drawdown_pct(&values), dec!(25));
    }

    #[test]
    fn test_zero_previous_value_has_no_return() {
        let series = vec![snap(4, Decimal::ZERO), snap(5, dec!(100)), snap(6, dec!(110))];
        let report = calculate_performance("p1", &series).unwrap();
        assert_eq!(report.daily_returns.len(), 1);
        assert_eq!(report.total_return_pct, Decimal::ZERO);
    }

    #[test]
    fn test_empty_window() {
        assert!(calculate_performance("p1", &[]).is_none());
    }
}
