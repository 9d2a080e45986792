use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::valuation_model::{CashSource, HoldingValuation, PortfolioValuation};
use crate::constants::DECIMAL_PRECISION;
use crate::portfolio::holdings::ReconstructedHoldings;
use crate::quotes::PriceOrigin;

/// `(unrealized_gain, return_pct)` for a portfolio total. The return is zero
/// when there is no cost to measure against.
pub fn derive_gain_and_return(
    total_value: Decimal,
    total_cost: Decimal,
    cash_balance: Decimal,
) -> (Decimal, Decimal) {
    let unrealized_gain = total_value - total_cost - cash_balance;
    let return_pct = if total_cost.is_zero() {
        Decimal::ZERO
    } else {
        (unrealized_gain / total_cost * dec!(100)).round_dp(DECIMAL_PRECISION)
    };
    (unrealized_gain, return_pct)
}

/// Builds a valuation from valued holdings and a cash balance.
pub fn calculate_valuation(
    reconstructed: ReconstructedHoldings,
    cash_balance: Decimal,
    cash_source: CashSource,
) -> PortfolioValuation {
    let holdings_value = reconstructed.market_value_base();
    let total_cost = reconstructed.total_cost_base();
    let total_value = cash_balance + holdings_value;
    let (unrealized_gain, return_pct) =
        derive_gain_and_return(total_value, total_cost, cash_balance);

    let mut holdings: Vec<HoldingValuation> = reconstructed
        .holdings
        .values()
        .map(|holding| HoldingValuation {
            security_id: holding.security_id.clone(),
            symbol: holding.symbol.clone(),
            quantity: holding.quantity,
            currency: holding.currency.clone(),
            price: holding.price.unwrap_or(Decimal::ZERO),
            price_date: holding.price_date,
            price_origin: holding.price_origin.unwrap_or(PriceOrigin::Missing),
            market_value: holding.market_value,
            market_value_base: holding.market_value_base,
            cost_base: holding.total_cost_base,
            unrealized_gain_base: holding.unrealized_gain_base,
            weight_pct: if holdings_value.is_zero() {
                Decimal::ZERO
            } else {
                (holding.market_value_base / holdings_value * dec!(100)).round_dp(DECIMAL_PRECISION)
            },
        })
        .collect();
    holdings.sort_by(|a, b| b.market_value_base.cmp(&a.market_value_base));

    PortfolioValuation {
        portfolio_id: reconstructed.portfolio_id,
        valuation_date: reconstructed.as_of_date,
        base_currency: reconstructed.base_currency,
        total_value,
        total_cost,
        cash_balance,
        cash_source,
        holdings_value,
        holdings_count: holdings.len() as i64,
        unrealized_gain,
        return_pct,
        realized_gain: reconstructed.realized_gain_base,
        holdings,
        warnings: reconstructed.warnings,
    }
}
