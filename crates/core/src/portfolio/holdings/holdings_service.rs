use crate::errors::Result;
use crate::fx::FxServiceTrait;
use crate::portfolios::PortfolioRepositoryTrait;
use crate::quotes::{resolve_price, PriceOrigin, PriceSourceTrait};
use crate::securities::{Security, SecurityRepositoryTrait};
use crate::settings::FeePolicy;
use crate::transactions::TransactionRepositoryTrait;
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::holdings_calculator::{rate_with_fallback, HoldingsCalculator};
use super::holdings_model::{Holding, ReconstructedHoldings, ReconstructionWarning};

pub trait HoldingsServiceTrait: Send + Sync {
    /// Replays the ledger up to `as_of` and values every open position at
    /// that date's price and rate.
    fn reconstruct_holdings(&self, portfolio_id: &str, as_of: NaiveDate)
        -> Result<ReconstructedHoldings>;

    /// A single valued position, or `None` when it is closed or never held.
    fn get_holding(
        &self,
        portfolio_id: &str,
        security_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Holding>>;
}

pub struct HoldingsService {
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    security_repository: Arc<dyn SecurityRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    price_source: Arc<dyn PriceSourceTrait>,
    fx_service: Arc<dyn FxServiceTrait>,
    calculator: HoldingsCalculator,
}

impl HoldingsService {
    pub fn new(
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        security_repository: Arc<dyn SecurityRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        price_source: Arc<dyn PriceSourceTrait>,
        fx_service: Arc<dyn FxServiceTrait>,
        fee_policy: FeePolicy,
    ) -> Self {
        Self {
            portfolio_repository,
            security_repository,
            transaction_repository,
            price_source,
            calculator: HoldingsCalculator::new(fx_service.clone(), fee_policy),
            fx_service,
        }
    }

    fn load_securities(&self, security_ids: Vec<String>) -> Result<HashMap<String, Security>> {
        if security_ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .security_repository
            .list_by_ids(&security_ids)?
            .into_iter()
            .map(|security| (security.id.clone(), security))
            .collect())
    }

    fn value_holding(
        &self,
        holding: &mut Holding,
        security: &Security,
        as_of: NaiveDate,
        warnings: &mut Vec<ReconstructionWarning>,
    ) -> Result<()> {
        let resolved = resolve_price(self.price_source.as_ref(), security, as_of)?;
        if resolved.origin == PriceOrigin::Missing {
            warnings.push(ReconstructionWarning {
                transaction_id: None,
                security_id: Some(security.id.clone()),
                message: format!(
                    "no price for {} as of {}; valued at zero",
                    security.symbol, as_of
                ),
            });
        }

        let to_security = rate_with_fallback(
            self.fx_service.as_ref(),
            &resolved.currency,
            &security.currency,
            as_of,
        );
        let to_base = rate_with_fallback(
            self.fx_service.as_ref(),
            &resolved.currency,
            &holding.base_currency,
            as_of,
        );
        for message in [to_security.degraded, to_base.degraded].into_iter().flatten() {
            warnings.push(ReconstructionWarning {
                transaction_id: None,
                security_id: Some(security.id.clone()),
                message,
            });
        }

        holding.apply_valuation(
            resolved.price,
            resolved.price_date,
            resolved.origin,
            to_security.rate,
            to_base.rate,
        );
        Ok(())
    }
}

impl HoldingsServiceTrait for HoldingsService {
    fn reconstruct_holdings(
        &self,
        portfolio_id: &str,
        as_of: NaiveDate,
    ) -> Result<ReconstructedHoldings> {
        let portfolio = self.portfolio_repository.get_by_id(portfolio_id)?;
        let transactions = self
            .transaction_repository
            .list_for_portfolio(portfolio_id, Some(as_of))?;

        let mut security_ids: Vec<String> = transactions
            .iter()
            .filter_map(|t| t.security_id.clone())
            .collect();
        security_ids.sort();
        security_ids.dedup();
        let securities = self.load_securities(security_ids)?;

        let mut reconstructed =
            self.calculator
                .calculate(&portfolio, &securities, &transactions, as_of)?;

        let mut warnings = std::mem::take(&mut reconstructed.warnings);
        for holding in reconstructed.holdings.values_mut() {
            if let Some(security) = securities.get(&holding.security_id) {
                self.value_holding(holding, security, as_of, &mut warnings)?;
            }
        }
        reconstructed.warnings = warnings;

        debug!(
            "Portfolio {} as of {}: {} open positions, {} warnings",
            portfolio_id,
            as_of,
            reconstructed.holdings.len(),
            reconstructed.warnings.len()
        );
        Ok(reconstructed)
    }

    fn get_holding(
        &self,
        portfolio_id: &str,
        security_id: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Holding>> {
        let mut reconstructed = self.reconstruct_holdings(portfolio_id, as_of)?;
        Ok(reconstructed.holdings.remove(security_id))
    }
}
