use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::flow_classifier::{portfolio_flow_scope, signed_flow_amount, FlowScope};
use super::performance_model::{CashFlow, XirrCacheEntry, XirrResult};
use super::performance_traits::XirrCacheRepositoryTrait;
use super::xirr::XirrSolver;
use crate::errors::Result;
use crate::fx::FxServiceTrait;
use crate::portfolio::holdings::{transaction_base_rate, HoldingsServiceTrait};
use crate::portfolio::valuation::ValuationServiceTrait;
use crate::portfolios::PortfolioRepositoryTrait;
use crate::settings::Settings;
use crate::transactions::{Transaction, TransactionRepositoryTrait};
use crate::utils::time_utils::{valuation_date_from_utc, DEFAULT_VALUATION_TZ};

pub trait PerformanceServiceTrait: Send + Sync {
    /// Money-weighted return of the whole portfolio up to today.
    fn portfolio_xirr(&self, portfolio_id: &str, force: bool) -> Result<XirrResult>;

    /// Money-weighted return of one position up to today.
    fn asset_xirr(&self, portfolio_id: &str, security_id: &str, force: bool)
        -> Result<XirrResult>;

    /// Drops cached results of the portfolio.
    fn invalidate_xirr(&self, portfolio_id: &str) -> Result<usize>;
}

pub struct PerformanceService {
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
    holdings_service: Arc<dyn HoldingsServiceTrait>,
    fx_service: Arc<dyn FxServiceTrait>,
    cache_repository: Arc<dyn XirrCacheRepositoryTrait>,
    solver: XirrSolver,
    valuation_tz: Tz,
}

impl PerformanceService {
    pub fn new(
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
        holdings_service: Arc<dyn HoldingsServiceTrait>,
        fx_service: Arc<dyn FxServiceTrait>,
        cache_repository: Arc<dyn XirrCacheRepositoryTrait>,
    ) -> Self {
        Self {
            portfolio_repository,
            transaction_repository,
            valuation_service,
            holdings_service,
            fx_service,
            cache_repository,
            solver: XirrSolver::default(),
            valuation_tz: DEFAULT_VALUATION_TZ,
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Result<Self> {
        self.solver = XirrSolver::new(settings.xirr_min_span_days);
        self.valuation_tz = settings.valuation_tz()?;
        Ok(self)
    }

    fn today(&self) -> NaiveDate {
        valuation_date_from_utc(Utc::now(), self.valuation_tz)
    }

    fn ledger_flows(
        &self,
        transactions: &[Transaction],
        scope: FlowScope,
        base_currency: &str,
    ) -> Vec<CashFlow> {
        transactions
            .iter()
            .filter_map(|transaction| {
                let amount = signed_flow_amount(transaction, scope)?;
                let lookup =
                    transaction_base_rate(self.fx_service.as_ref(), transaction, base_currency);
                if let Some(message) = lookup.degraded {
                    warn!("XIRR flow of transaction {}: {}", transaction.id, message);
                }
                Some(CashFlow::new(transaction.transaction_date, amount * lookup.rate))
            })
            .collect()
    }

    fn cached(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
        latest_transaction_id: Option<i64>,
        today: NaiveDate,
    ) -> Option<XirrResult> {
        match self.cache_repository.get_entry(portfolio_id, security_id) {
            Ok(Some(entry)) if entry.is_valid_for(latest_transaction_id, today) => {
                Some(entry.to_result())
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Reading cached XIRR of {} failed: {}", portfolio_id, e);
                None
            }
        }
    }

    fn store(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
        latest_transaction_id: Option<i64>,
        result: &XirrResult,
    ) {
        let Some(last_transaction_id) = latest_transaction_id else {
            return;
        };
        let entry = XirrCacheEntry {
            portfolio_id: portfolio_id.to_string(),
            security_id: security_id.map(str::to_string),
            rate: result.rate,
            reason: result.reason,
            method: result.method,
            last_transaction_id,
            calculated_at: Utc::now().with_timezone(&self.valuation_tz).naive_local(),
        };
        if let Err(e) = self.cache_repository.save_entry(&entry) {
            warn!("Caching XIRR of {} failed: {}", portfolio_id, e);
        }
    }

    fn solve_with_terminal(&self, mut flows: Vec<CashFlow>, terminal: CashFlow) -> XirrResult {
        if !terminal.amount.is_zero() {
            flows.push(terminal);
        }
        self.solver.solve(&flows)
    }
}

impl PerformanceServiceTrait for PerformanceService {
    fn portfolio_xirr(&self, portfolio_id: &str, force: bool) -> Result<XirrResult> {
        let today = self.today();
        let latest = self
            .transaction_repository
            .latest_transaction_id(portfolio_id, None)?;
        if !force {
            if let Some(result) = self.cached(portfolio_id, None, latest, today) {
                return Ok(result);
            }
        }

        let portfolio = self.portfolio_repository.get_by_id(portfolio_id)?;
        let transactions = self
            .transaction_repository
            .list_for_portfolio(portfolio_id, Some(today))?;
        let scope = portfolio_flow_scope(&transactions);
        let flows = self.ledger_flows(&transactions, scope, &portfolio.base_currency);

        let valuation = self.valuation_service.value_on_date(portfolio_id, today)?;
        let terminal_value = match scope {
            FlowScope::ExternalCash => valuation.total_value,
            // Income was already counted as a flow; the cash it built up is not.
            FlowScope::Trades => valuation.holdings_value,
        };

        let result = self.solve_with_terminal(flows, CashFlow::new(today, terminal_value));
        debug!("Portfolio {} XIRR: {:?}", portfolio_id, result.rate);
        self.store(portfolio_id, None, latest, &result);
        Ok(result)
    }

    fn asset_xirr(
        &self,
        portfolio_id: &str,
        security_id: &str,
        force: bool,
    ) -> Result<XirrResult> {
        let today = self.today();
        let latest = self
            .transaction_repository
            .latest_transaction_id(portfolio_id, Some(security_id))?;
        if !force {
            if let Some(result) = self.cached(portfolio_id, Some(security_id), latest, today) {
                return Ok(result);
            }
        }

        let portfolio = self.portfolio_repository.get_by_id(portfolio_id)?;
        let transactions = self.transaction_repository.list_for_security(
            portfolio_id,
            security_id,
            Some(today),
        )?;
        let flows = self.ledger_flows(&transactions, FlowScope::Trades, &portfolio.base_currency);
        let terminal_value = self
            .holdings_service
            .get_holding(portfolio_id, security_id, today)?
            .map(|holding| holding.market_value_base)
            .unwrap_or(Decimal::ZERO);

        let result = self.solve_with_terminal(flows, CashFlow::new(today, terminal_value));
        self.store(portfolio_id, Some(security_id), latest, &result);
        Ok(result)
    }

    fn invalidate_xirr(&self, portfolio_id: &str) -> Result<usize> {
        self.cache_repository.invalidate_portfolio(portfolio_id)
    }
}
