use log::{debug, error, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::holdings_model::{
    CashSummary, Holding, Lot, ReconstructedHoldings, ReconstructionWarning,
};
use crate::errors::{CalculatorError, Result};
use crate::fx::FxServiceTrait;
use crate::portfolios::Portfolio;
use crate::securities::Security;
use crate::settings::FeePolicy;
use crate::transactions::{parse_split_ratio, Transaction, TransactionType};
use chrono::NaiveDate;

/// Replays a portfolio's ledger into holdings. Pure over its inputs apart
/// from rate lookups; nothing is persisted.
#[derive(Clone)]
pub struct HoldingsCalculator {
    fx_service: Arc<dyn FxServiceTrait>,
    fee_policy: FeePolicy,
}

/// Per-transaction rates: into the security currency and into the base currency.
#[derive(Debug, Clone, Copy)]
struct TransactionRates {
    to_security: Decimal,
    to_base: Decimal,
}

struct ReplayState<'a> {
    portfolio: &'a Portfolio,
    holdings: BTreeMap<String, Holding>,
    cash: CashSummary,
    realized_gain_base: Decimal,
    has_external_flows: bool,
    warnings: Vec<ReconstructionWarning>,
}

impl<'a> ReplayState<'a> {
    fn warn(&mut self, transaction: &Transaction, message: String) {
        warn!("Transaction {}: {}", transaction.id, message);
        self.warnings.push(ReconstructionWarning {
            transaction_id: Some(transaction.id),
            security_id: transaction.security_id.clone(),
            message,
        });
    }
}

impl HoldingsCalculator {
    pub fn new(fx_service: Arc<dyn FxServiceTrait>, fee_policy: FeePolicy) -> Self {
        Self {
            fx_service,
            fee_policy,
        }
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    /// Replays `transactions` dated on or before `as_of` in (date, id) order.
    ///
    /// A transaction referencing a security absent from `securities` aborts
    /// the replay. Missing rates degrade to the latest known rate, then to the
    /// unconverted amount, each recorded as a warning.
    pub fn calculate(
        &self,
        portfolio: &Portfolio,
        securities: &HashMap<String, Security>,
        transactions: &[Transaction],
        as_of: NaiveDate,
    ) -> Result<ReconstructedHoldings> {
        let mut ordered: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.portfolio_id == portfolio.id && t.transaction_date <= as_of)
            .collect();
        ordered.sort_by_key(|t| t.replay_key());

        let mut state = ReplayState {
            portfolio,
            holdings: BTreeMap::new(),
            cash: CashSummary::default(),
            realized_gain_base: Decimal::ZERO,
            has_external_flows: false,
            warnings: Vec::new(),
        };

        for transaction in &ordered {
            self.process_transaction(&mut state, securities, transaction)?;
        }

        let last_transaction_id = ordered.iter().map(|t| t.id).max();
        let realized_gain_base = state.realized_gain_base;
        let holdings = state
            .holdings
            .into_iter()
            .filter(|(_, holding)| holding.is_open())
            .collect();

        debug!(
            "Reconstructed portfolio {} as of {} from {} transactions",
            portfolio.id,
            as_of,
            ordered.len()
        );

        Ok(ReconstructedHoldings {
            portfolio_id: portfolio.id.clone(),
            base_currency: portfolio.base_currency.clone(),
            as_of_date: as_of,
            holdings,
            cash: state.cash,
            realized_gain_base,
            has_external_flows: state.has_external_flows,
            last_transaction_id,
            warnings: state.warnings,
        })
    }

    fn process_transaction(
        &self,
        state: &mut ReplayState<'_>,
        securities: &HashMap<String, Security>,
        transaction: &Transaction,
    ) -> Result<()> {
        let security = match transaction.security_id.as_deref() {
            Some(security_id) => Some(securities.get(security_id).ok_or_else(|| {
                CalculatorError::UnknownSecurity {
                    security_id: security_id.to_string(),
                    transaction_id: transaction.id,
                }
            })?),
            None if transaction.transaction_type.requires_security() => {
                return Err(CalculatorError::MissingSecurity {
                    transaction_id: transaction.id,
                    transaction_type: transaction.transaction_type.as_str().to_string(),
                }
                .into());
            }
            None => None,
        };

        let rates = self.transaction_rates(state, transaction, security);

        match (transaction.transaction_type, security) {
            (TransactionType::Buy, Some(security)) => {
                self.process_buy(state, security, transaction, rates)
            }
            (TransactionType::Sell, Some(security)) => {
                self.process_sell(state, security, transaction, rates)
            }
            (TransactionType::Dividend, Some(security)) => {
                self.process_dividend(state, security, transaction, rates)
            }
            (TransactionType::Split, Some(security)) => {
                self.process_split(state, security, transaction)
            }
            (TransactionType::TransferIn, Some(security)) => {
                self.process_transfer_in(state, security, transaction, rates)
            }
            (TransactionType::TransferOut, Some(security)) => {
                self.process_transfer_out(state, security, transaction, rates)
            }
            (TransactionType::Fee, security) => {
                self.process_fee(state, security, transaction, rates)
            }
            (TransactionType::Interest, security) => {
                self.process_interest(state, security, transaction, rates)
            }
            (TransactionType::Deposit, _) => {
                state.has_external_flows = true;
                state.cash.deposits += transaction.gross_amount() * rates.to_base;
                state.cash.fees += transaction.fee * rates.to_base;
            }
            (TransactionType::Withdrawal, _) => {
                state.has_external_flows = true;
                state.cash.withdrawals += transaction.gross_amount() * rates.to_base;
                state.cash.fees += transaction.fee * rates.to_base;
            }
            (kind, None) => {
                error!("Transaction {} of type {} has no security", transaction.id, kind.as_str());
            }
        }
        Ok(())
    }

    fn holding_for<'s>(state: &'s mut ReplayState<'_>, security: &Security) -> &'s mut Holding {
        let base_currency = state.portfolio.base_currency.clone();
        state
            .holdings
            .entry(security.id.clone())
            .or_insert_with(|| {
                Holding::new(&security.id, &security.symbol, &security.currency, &base_currency)
            })
    }

    fn process_buy(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let trade_value = transaction.trade_value();
        let cash_spent = trade_value + transaction.fee;
        let capitalized = match self.fee_policy {
            FeePolicy::Capitalize => cash_spent,
            FeePolicy::Expense => trade_value,
        };

        let holding = Self::holding_for(state, security);
        holding.add_lot(Lot {
            transaction_id: transaction.id,
            acquisition_date: transaction.transaction_date,
            original_quantity: transaction.quantity,
            remaining_quantity: transaction.quantity,
            unit_price: transaction.unit_price * rates.to_security,
            cost: capitalized * rates.to_security,
            cost_base: capitalized * rates.to_base,
        });
        holding.fees_paid_base += transaction.fee * rates.to_base;
        holding.net_cash_invested_base += cash_spent * rates.to_base;

        state.cash.purchases += cash_spent * rates.to_base;
    }

    fn process_sell(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let fee_policy = self.fee_policy;
        let holding = Self::holding_for(state, security);
        let held = holding.quantity;
        let relief = holding.reduce_lots_fifo(transaction.quantity);

        let gross = relief.quantity * transaction.unit_price;
        let proceeds = match fee_policy {
            FeePolicy::Capitalize => gross - transaction.fee,
            FeePolicy::Expense => gross,
        };
        let realized = proceeds * rates.to_security - relief.cost;
        let realized_base = proceeds * rates.to_base - relief.cost_base;

        holding.realized_gain += realized;
        holding.realized_gain_base += realized_base;
        holding.fees_paid_base += transaction.fee * rates.to_base;

        let cash_received = (transaction.trade_value() - transaction.fee) * rates.to_base;
        holding.net_cash_invested_base -= cash_received;

        state.realized_gain_base += realized_base;
        state.cash.sale_proceeds += cash_received;

        if transaction.quantity > held {
            state.warn(
                transaction,
                format!(
                    "sell of {} {} exceeds held quantity {}",
                    transaction.quantity, security.symbol, held
                ),
            );
        }
    }

    fn process_dividend(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let net = transaction.gross_amount() - transaction.fee;
        let holding = Self::holding_for(state, security);
        holding.reduce_cost_basis(net * rates.to_security, net * rates.to_base);
        holding.dividends_received += net * rates.to_security;
        holding.dividends_received_base += net * rates.to_base;
        holding.fees_paid_base += transaction.fee * rates.to_base;

        state.cash.income += net * rates.to_base;
    }

    fn process_split(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
    ) {
        let parsed = transaction
            .split_ratio
            .as_deref()
            .map(parse_split_ratio);

        match parsed {
            Some(Ok(ratio)) => {
                Self::holding_for(state, security).apply_split(&ratio);
            }
            _ => {
                let quantity = transaction.quantity;
                let ratio = transaction.split_ratio.clone().unwrap_or_default();
                if quantity > Decimal::ZERO {
                    Self::holding_for(state, security).add_lot(Lot {
                        transaction_id: transaction.id,
                        acquisition_date: transaction.transaction_date,
                        original_quantity: quantity,
                        remaining_quantity: quantity,
                        unit_price: Decimal::ZERO,
                        cost: Decimal::ZERO,
                        cost_base: Decimal::ZERO,
                    });
                }
                state.warn(
                    transaction,
                    format!(
                        "malformed split ratio '{}' for {}; added {} units instead",
                        ratio, security.symbol, quantity
                    ),
                );
            }
        }
    }

    fn process_transfer_in(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let carried = match self.fee_policy {
            FeePolicy::Capitalize => transaction.trade_value() + transaction.fee,
            FeePolicy::Expense => transaction.trade_value(),
        };
        let holding = Self::holding_for(state, security);
        holding.add_lot(Lot {
            transaction_id: transaction.id,
            acquisition_date: transaction.transaction_date,
            original_quantity: transaction.quantity,
            remaining_quantity: transaction.quantity,
            unit_price: transaction.unit_price * rates.to_security,
            cost: carried * rates.to_security,
            cost_base: carried * rates.to_base,
        });
        holding.fees_paid_base += transaction.fee * rates.to_base;
        state.cash.fees += transaction.fee * rates.to_base;
    }

    fn process_transfer_out(
        &self,
        state: &mut ReplayState<'_>,
        security: &Security,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let holding = Self::holding_for(state, security);
        let held = holding.quantity;
        holding.reduce_lots_fifo(transaction.quantity);
        holding.fees_paid_base += transaction.fee * rates.to_base;
        state.cash.fees += transaction.fee * rates.to_base;

        if transaction.quantity > held {
            state.warn(
                transaction,
                format!(
                    "transfer of {} {} exceeds held quantity {}",
                    transaction.quantity, security.symbol, held
                ),
            );
        }
    }

    fn process_fee(
        &self,
        state: &mut ReplayState<'_>,
        security: Option<&Security>,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let fee = transaction.amount.unwrap_or(Decimal::ZERO) + transaction.fee;
        let fee_base = fee * rates.to_base;
        state.cash.fees += fee_base;

        let Some(security) = security else {
            return;
        };
        let fee_policy = self.fee_policy;
        let holding = Self::holding_for(state, security);
        holding.fees_paid_base += fee_base;
        holding.net_cash_invested_base += fee_base;
        if fee_policy == FeePolicy::Capitalize
            && !holding.capitalize_cost(fee * rates.to_security, fee_base)
        {
            debug!(
                "Fee transaction {} on closed position {} not capitalized",
                transaction.id, security.symbol
            );
        }
    }

    fn process_interest(
        &self,
        state: &mut ReplayState<'_>,
        security: Option<&Security>,
        transaction: &Transaction,
        rates: TransactionRates,
    ) {
        let net_base = (transaction.gross_amount() - transaction.fee) * rates.to_base;
        state.cash.income += net_base;
        if let Some(security) = security {
            let holding = Self::holding_for(state, security);
            holding.interest_received_base += net_base;
            holding.fees_paid_base += transaction.fee * rates.to_base;
        }
    }

    fn transaction_rates(
        &self,
        state: &mut ReplayState<'_>,
        transaction: &Transaction,
        security: Option<&Security>,
    ) -> TransactionRates {
        let to_base = self.base_rate(state, transaction);
        let to_security = match security {
            Some(security) => self.transaction_rate(
                state,
                transaction,
                &transaction.currency,
                &security.currency,
            ),
            None => Decimal::ONE,
        };
        TransactionRates {
            to_security,
            to_base,
        }
    }

    fn base_rate(&self, state: &mut ReplayState<'_>, transaction: &Transaction) -> Decimal {
        let lookup = transaction_base_rate(
            self.fx_service.as_ref(),
            transaction,
            &state.portfolio.base_currency,
        );
        if let Some(message) = lookup.degraded {
            state.warn(transaction, message);
        }
        lookup.rate
    }

    fn transaction_rate(
        &self,
        state: &mut ReplayState<'_>,
        transaction: &Transaction,
        from: &str,
        to: &str,
    ) -> Decimal {
        let lookup = rate_with_fallback(
            self.fx_service.as_ref(),
            from,
            to,
            transaction.transaction_date,
        );
        if let Some(message) = lookup.degraded {
            state.warn(transaction, message);
        }
        lookup.rate
    }
}

/// A rate plus the reason it is degraded, if it is.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLookup {
    pub rate: Decimal,
    pub degraded: Option<String>,
}

/// Rate from the transaction currency into `base_currency`: pre-resolved
/// base amount, then pre-resolved rate, then `rate_with_fallback` on the
/// transaction date.
pub fn transaction_base_rate(
    fx_service: &dyn FxServiceTrait,
    transaction: &Transaction,
    base_currency: &str,
) -> RateLookup {
    let gross = transaction.gross_amount();
    if let Some(base_amount) = transaction.base_amount {
        if !gross.is_zero() {
            return RateLookup {
                rate: base_amount / gross,
                degraded: None,
            };
        }
    }
    if let Some(rate) = transaction.fx_rate {
        return RateLookup {
            rate,
            degraded: None,
        };
    }
    rate_with_fallback(
        fx_service,
        &transaction.currency,
        base_currency,
        transaction.transaction_date,
    )
}

/// Rate on `date`, else the latest known rate, else 1 (amount left
/// unconverted). Never fails; the degraded cases carry a message.
pub fn rate_with_fallback(
    fx_service: &dyn FxServiceTrait,
    from: &str,
    to: &str,
    date: NaiveDate,
) -> RateLookup {
    if from == to {
        return RateLookup {
            rate: Decimal::ONE,
            degraded: None,
        };
    }
    match fx_service.get_exchange_rate_for_date(from, to, date) {
        Ok(rate) => RateLookup {
            rate,
            degraded: None,
        },
        Err(e) => match fx_service.get_latest_known_rate(from, to) {
            Ok(rate) => RateLookup {
                rate,
                degraded: Some(format!(
                    "no {}/{} rate on {} ({}); used latest known rate {}",
                    from, to, date, e, rate
                )),
            },
            Err(_) => {
                error!(
                    "No {}/{} rate available for {}; amount left unconverted",
                    from, to, date
                );
                RateLookup {
                    rate: Decimal::ONE,
                    degraded: Some(format!(
                        "no {}/{} rate available; amount left unconverted",
                        from, to
                    )),
                }
            }
        },
    }
}
