use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::QUANTITY_THRESHOLD;
use crate::quotes::PriceOrigin;
use crate::transactions::SplitRatio;

pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// One acquisition batch. Lots live only for the duration of a single
/// reconstruction and are rebuilt from the ledger every time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub transaction_id: i64,
    pub acquisition_date: NaiveDate,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    /// Price per unit in the security's currency, split-adjusted.
    pub unit_price: Decimal,
    /// Remaining cost of the lot in the security's currency.
    pub cost: Decimal,
    /// Remaining cost of the lot in the portfolio base currency, at acquisition-date rates.
    pub cost_base: Decimal,
}

/// Quantity and cost taken out of the open lots by a sale or transfer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LotRelief {
    pub quantity: Decimal,
    pub cost: Decimal,
    pub cost_base: Decimal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub security_id: String,
    pub symbol: String,
    /// Security quote currency.
    pub currency: String,
    pub base_currency: String,
    pub quantity: Decimal,
    pub lots: Vec<Lot>,
    pub total_cost: Decimal,
    pub total_cost_base: Decimal,
    pub realized_gain: Decimal,
    pub realized_gain_base: Decimal,
    pub dividends_received: Decimal,
    pub dividends_received_base: Decimal,
    pub interest_received_base: Decimal,
    pub fees_paid_base: Decimal,
    /// Cash put into the position minus cash taken out of it, in base currency.
    pub net_cash_invested_base: Decimal,
    pub first_acquired: Option<NaiveDate>,
    pub price: Option<Decimal>,
    pub price_date: Option<NaiveDate>,
    pub price_origin: Option<PriceOrigin>,
    pub market_value: Decimal,
    pub market_value_base: Decimal,
    pub unrealized_gain_base: Decimal,
}

impl Holding {
    pub fn new(security_id: &str, symbol: &str, currency: &str, base_currency: &str) -> Self {
        Holding {
            security_id: security_id.to_string(),
            symbol: symbol.to_string(),
            currency: currency.to_string(),
            base_currency: base_currency.to_string(),
            quantity: Decimal::ZERO,
            lots: Vec::new(),
            total_cost: Decimal::ZERO,
            total_cost_base: Decimal::ZERO,
            realized_gain: Decimal::ZERO,
            realized_gain_base: Decimal::ZERO,
            dividends_received: Decimal::ZERO,
            dividends_received_base: Decimal::ZERO,
            interest_received_base: Decimal::ZERO,
            fees_paid_base: Decimal::ZERO,
            net_cash_invested_base: Decimal::ZERO,
            first_acquired: None,
            price: None,
            price_date: None,
            price_origin: None,
            market_value: Decimal::ZERO,
            market_value_base: Decimal::ZERO,
            unrealized_gain_base: Decimal::ZERO,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO && is_quantity_significant(&self.quantity)
    }

    /// Average cost per unit in the security's currency.
    pub fn average_cost(&self) -> Decimal {
        if self.is_open() {
            self.total_cost / self.quantity
        } else {
            Decimal::ZERO
        }
    }

    /// Recomputes quantity and cost from the open lots.
    pub fn recalculate_aggregates(&mut self) {
        self.quantity = self.lots.iter().map(|lot| lot.remaining_quantity).sum();
        self.total_cost = self.lots.iter().map(|lot| lot.cost).sum();
        self.total_cost_base = self.lots.iter().map(|lot| lot.cost_base).sum();
    }

    pub fn add_lot(&mut self, lot: Lot) {
        if self.first_acquired.is_none() {
            self.first_acquired = Some(lot.acquisition_date);
        }
        self.lots.push(lot);
        self.recalculate_aggregates();
    }

    /// Consumes the oldest lots first. Asking for more than is held consumes
    /// everything and logs a warning; the returned relief holds what was actually removed.
    pub fn reduce_lots_fifo(&mut self, quantity: Decimal) -> LotRelief {
        let mut relief = LotRelief::default();
        if quantity <= Decimal::ZERO {
            return relief;
        }
        if quantity > self.quantity {
            warn!(
                "Reducing {} by {} exceeds held quantity {}; consuming all open lots",
                self.symbol, quantity, self.quantity
            );
        }

        let mut outstanding = quantity;
        for lot in self.lots.iter_mut() {
            if outstanding <= Decimal::ZERO {
                break;
            }
            if lot.remaining_quantity <= Decimal::ZERO {
                continue;
            }
            let taken = lot.remaining_quantity.min(outstanding);
            let cost_taken = lot.cost * taken / lot.remaining_quantity;
            let cost_base_taken = lot.cost_base * taken / lot.remaining_quantity;

            lot.remaining_quantity -= taken;
            lot.cost -= cost_taken;
            lot.cost_base -= cost_base_taken;

            relief.quantity += taken;
            relief.cost += cost_taken;
            relief.cost_base += cost_base_taken;
            outstanding -= taken;
        }

        self.lots
            .retain(|lot| is_quantity_significant(&lot.remaining_quantity));
        self.recalculate_aggregates();
        relief
    }

    /// Scales every open lot; total cost is unchanged.
    pub fn apply_split(&mut self, ratio: &SplitRatio) {
        for lot in self.lots.iter_mut() {
            lot.original_quantity = ratio.scale_quantity(lot.original_quantity);
            lot.remaining_quantity = ratio.scale_quantity(lot.remaining_quantity);
            lot.unit_price = ratio.scale_price(lot.unit_price);
        }
        self.recalculate_aggregates();
    }

    /// Spreads a cost reduction over open lots in proportion to their cost,
    /// never taking a lot below zero. Returns the reduction actually applied.
    pub fn reduce_cost_basis(
        &mut self,
        amount: Decimal,
        amount_base: Decimal,
    ) -> (Decimal, Decimal) {
        let applied = amount.min(self.total_cost).max(Decimal::ZERO);
        let applied_base = amount_base.min(self.total_cost_base).max(Decimal::ZERO);
        let total_cost = self.total_cost;
        let total_cost_base = self.total_cost_base;

        for lot in self.lots.iter_mut() {
            if !total_cost.is_zero() {
                lot.cost -= applied * lot.cost / total_cost;
            }
            if !total_cost_base.is_zero() {
                lot.cost_base -= applied_base * lot.cost_base / total_cost_base;
            }
        }
        self.recalculate_aggregates();
        (applied, applied_base)
    }

    /// Adds cost to open lots in proportion to their remaining quantity.
    /// Returns false when there is no open lot to carry the cost.
    pub fn capitalize_cost(&mut self, amount: Decimal, amount_base: Decimal) -> bool {
        let quantity = self.quantity;
        if !self.is_open() {
            return false;
        }
        for lot in self.lots.iter_mut() {
            let share = lot.remaining_quantity / quantity;
            lot.cost += amount * share;
            lot.cost_base += amount_base * share;
        }
        self.recalculate_aggregates();
        true
    }

    /// Fills the valuation fields from a resolved price. `price_to_security`
    /// and `price_to_base` convert one unit of the price currency.
    pub fn apply_valuation(
        &mut self,
        price: Decimal,
        price_date: Option<NaiveDate>,
        origin: PriceOrigin,
        price_to_security: Decimal,
        price_to_base: Decimal,
    ) {
        self.price = Some(price);
        self.price_date = price_date;
        self.price_origin = Some(origin);
        self.market_value = self.quantity * price * price_to_security;
        self.market_value_base = self.quantity * price * price_to_base;
        self.unrealized_gain_base = self.market_value_base - self.total_cost_base;
    }
}

/// Portfolio-level cash movements derived from the ledger, in base currency.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    /// Cash spent on purchases, fees included.
    pub purchases: Decimal,
    /// Cash received from sales, net of fees.
    pub sale_proceeds: Decimal,
    /// Net dividends and interest.
    pub income: Decimal,
    /// Stand-alone fees and fees on transfers.
    pub fees: Decimal,
}

impl CashSummary {
    pub fn balance(&self) -> Decimal {
        self.deposits - self.withdrawals - self.purchases + self.sale_proceeds + self.income
            - self.fees
    }
}

/// A degraded step during reconstruction that did not abort it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructionWarning {
    pub transaction_id: Option<i64>,
    pub security_id: Option<String>,
    pub message: String,
}

/// Output of replaying a portfolio's ledger up to a date.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconstructedHoldings {
    pub portfolio_id: String,
    pub base_currency: String,
    pub as_of_date: NaiveDate,
    /// Open positions keyed by security id; closed positions are excluded.
    pub holdings: BTreeMap<String, Holding>,
    pub cash: CashSummary,
    /// Realized gain across all positions, closed ones included.
    pub realized_gain_base: Decimal,
    /// True when the ledger holds DEPOSIT or WITHDRAWAL records.
    pub has_external_flows: bool,
    pub last_transaction_id: Option<i64>,
    pub warnings: Vec<ReconstructionWarning>,
}

impl ReconstructedHoldings {
    pub fn total_cost_base(&self) -> Decimal {
        self.holdings.values().map(|h| h.total_cost_base).sum()
    }

    pub fn market_value_base(&self) -> Decimal {
        self.holdings.values().map(|h| h.market_value_base).sum()
    }
}
