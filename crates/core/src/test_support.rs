//! In-memory repositories and fixtures shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::errors::{DatabaseError, Error, Result};
use crate::fx::{ExchangeRate, FxRepositoryTrait, FxService, NewExchangeRate, RateSource};
use crate::portfolio::history::{HistoryService, PortfolioValueSnapshot, SnapshotRepositoryTrait};
use crate::portfolio::holdings::HoldingsService;
use crate::portfolio::performance::{PerformanceService, XirrCacheEntry, XirrCacheRepositoryTrait};
use crate::portfolio::valuation::ValuationService;
use crate::portfolios::{
    CashLedgerEntry, CashLedgerTrait, NewPortfolio, Portfolio, PortfolioRepositoryTrait,
};
use crate::quotes::{DataSource, PriceSourceTrait, Quote};
use crate::securities::{NewSecurity, Security, SecurityKind, SecurityRepositoryTrait};
use crate::settings::FeePolicy;
use crate::transactions::{NewTransaction, Transaction, TransactionRepositoryTrait, TransactionType};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn timestamp() -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap()
}

fn not_found(what: String) -> Error {
    Error::Database(DatabaseError::NotFound(what))
}

pub fn portfolio(id: &str, base_currency: &str) -> Portfolio {
    Portfolio {
        id: id.to_string(),
        name: format!("Portfolio {}", id),
        base_currency: base_currency.to_string(),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn security(id: &str, currency: &str) -> Security {
    Security {
        id: id.to_string(),
        symbol: id.to_string(),
        name: None,
        currency: currency.to_string(),
        kind: SecurityKind::Equity,
        current_price: None,
        price_updated_at: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// A USD transaction in portfolio `p1` with every amount zeroed.
pub fn transaction(
    id: i64,
    kind: TransactionType,
    security_id: Option<&str>,
    on: NaiveDate,
) -> Transaction {
    Transaction {
        id,
        portfolio_id: "p1".to_string(),
        security_id: security_id.map(str::to_string),
        transaction_type: kind,
        transaction_date: on,
        quantity: Decimal::ZERO,
        unit_price: Decimal::ZERO,
        amount: None,
        fee: Decimal::ZERO,
        currency: "USD".to_string(),
        fx_rate: None,
        base_amount: None,
        split_ratio: None,
        notes: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn trade(
    id: i64,
    kind: TransactionType,
    security_id: &str,
    on: NaiveDate,
    quantity: Decimal,
    unit_price: Decimal,
    fee: Decimal,
) -> Transaction {
    Transaction {
        quantity,
        unit_price,
        fee,
        ..transaction(id, kind, Some(security_id), on)
    }
}

pub fn cash(id: i64, kind: TransactionType, on: NaiveDate, amount: Decimal) -> Transaction {
    Transaction {
        amount: Some(amount),
        ..transaction(id, kind, None, on)
    }
}

pub fn new_transaction_from(t: &Transaction) -> NewTransaction {
    NewTransaction {
        portfolio_id: t.portfolio_id.clone(),
        security_id: t.security_id.clone(),
        transaction_type: t.transaction_type,
        transaction_date: t.transaction_date,
        quantity: t.quantity,
        unit_price: t.unit_price,
        amount: t.amount,
        fee: t.fee,
        currency: t.currency.clone(),
        fx_rate: t.fx_rate,
        base_amount: t.base_amount,
        split_ratio: t.split_ratio.clone(),
        notes: t.notes.clone(),
    }
}

// --- Portfolios ---

#[derive(Default)]
pub struct InMemoryPortfolios {
    portfolios: Mutex<Vec<Portfolio>>,
}

impl InMemoryPortfolios {
    pub fn insert(&self, portfolio: Portfolio) {
        self.portfolios.lock().unwrap().push(portfolio);
    }
}

impl PortfolioRepositoryTrait for InMemoryPortfolios {
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        self.portfolios
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == portfolio_id)
            .cloned()
            .ok_or_else(|| not_found(format!("portfolio {}", portfolio_id)))
    }

    fn list(&self) -> Result<Vec<Portfolio>> {
        Ok(self.portfolios.lock().unwrap().clone())
    }

    fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;
        let mut created = portfolio(
            &new_portfolio.id.unwrap_or_else(|| "generated".to_string()),
            &new_portfolio.base_currency,
        );
        created.name = new_portfolio.name;
        self.insert(created.clone());
        Ok(created)
    }
}

// --- Securities ---

#[derive(Default)]
pub struct InMemorySecurities {
    securities: Mutex<HashMap<String, Security>>,
}

impl InMemorySecurities {
    pub fn insert(&self, security: Security) {
        self.securities
            .lock()
            .unwrap()
            .insert(security.id.clone(), security);
    }
}

impl SecurityRepositoryTrait for InMemorySecurities {
    fn get_by_id(&self, security_id: &str) -> Result<Security> {
        self.securities
            .lock()
            .unwrap()
            .get(security_id)
            .cloned()
            .ok_or_else(|| not_found(format!("security {}", security_id)))
    }

    fn list(&self) -> Result<Vec<Security>> {
        Ok(self.securities.lock().unwrap().values().cloned().collect())
    }

    fn list_by_ids(&self, security_ids: &[String]) -> Result<Vec<Security>> {
        let securities = self.securities.lock().unwrap();
        Ok(security_ids
            .iter()
            .filter_map(|id| securities.get(id).cloned())
            .collect())
    }

    fn create(&self, new_security: NewSecurity) -> Result<Security> {
        new_security.validate()?;
        let mut created = security(
            &new_security.id.unwrap_or_else(|| new_security.symbol.clone()),
            &new_security.currency,
        );
        created.symbol = new_security.symbol;
        created.kind = new_security.kind;
        created.current_price = new_security.current_price;
        self.insert(created.clone());
        Ok(created)
    }

    fn update_current_price(
        &self,
        security_id: &str,
        price: Decimal,
        as_of: NaiveDateTime,
    ) -> Result<Security> {
        let mut securities = self.securities.lock().unwrap();
        let security = securities
            .get_mut(security_id)
            .ok_or_else(|| not_found(format!("security {}", security_id)))?;
        security.current_price = Some(price);
        security.price_updated_at = Some(as_of);
        Ok(security.clone())
    }
}

// --- Transactions ---

pub struct InMemoryTransactions {
    transactions: Mutex<Vec<Transaction>>,
    next_id: AtomicI64,
}

impl Default for InMemoryTransactions {
    fn default() -> Self {
        Self {
            transactions: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryTransactions {
    /// Stores a fully formed transaction, keeping its id.
    pub fn insert(&self, transaction: Transaction) {
        self.next_id.fetch_max(transaction.id + 1, Ordering::SeqCst);
        self.transactions.lock().unwrap().push(transaction);
    }

    fn sorted(&self, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut found: Vec<Transaction> = self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| keep(t))
            .cloned()
            .collect();
        found.sort_by_key(|t| t.replay_key());
        found
    }

    fn materialize(id: i64, new_transaction: NewTransaction) -> Transaction {
        Transaction {
            id,
            portfolio_id: new_transaction.portfolio_id,
            security_id: new_transaction.security_id,
            transaction_type: new_transaction.transaction_type,
            transaction_date: new_transaction.transaction_date,
            quantity: new_transaction.quantity,
            unit_price: new_transaction.unit_price,
            amount: new_transaction.amount,
            fee: new_transaction.fee,
            currency: new_transaction.currency,
            fx_rate: new_transaction.fx_rate,
            base_amount: new_transaction.base_amount,
            split_ratio: new_transaction.split_ratio,
            notes: new_transaction.notes,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }
}

impl TransactionRepositoryTrait for InMemoryTransactions {
    fn get_by_id(&self, transaction_id: i64) -> Result<Transaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == transaction_id)
            .cloned()
            .ok_or_else(|| not_found(format!("transaction {}", transaction_id)))
    }

    fn list_for_portfolio(
        &self,
        portfolio_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>> {
        Ok(self.sorted(|t| {
            t.portfolio_id == portfolio_id && as_of.map_or(true, |d| t.transaction_date <= d)
        }))
    }

    fn list_for_security(
        &self,
        portfolio_id: &str,
        security_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>> {
        Ok(self.sorted(|t| {
            t.portfolio_id == portfolio_id
                && t.security_id.as_deref() == Some(security_id)
                && as_of.map_or(true, |d| t.transaction_date <= d)
        }))
    }

    fn earliest_transaction_date(&self, portfolio_id: &str) -> Result<Option<NaiveDate>> {
        Ok(self
            .sorted(|t| t.portfolio_id == portfolio_id)
            .first()
            .map(|t| t.transaction_date))
    }

    fn latest_transaction_id(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
    ) -> Result<Option<i64>> {
        Ok(self
            .sorted(|t| {
                t.portfolio_id == portfolio_id
                    && security_id.map_or(true, |s| t.security_id.as_deref() == Some(s))
            })
            .iter()
            .map(|t| t.id)
            .max())
    }

    fn create(&self, new_transaction: NewTransaction) -> Result<Transaction> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = Self::materialize(id, new_transaction);
        self.transactions.lock().unwrap().push(created.clone());
        Ok(created)
    }

    fn update(&self, transaction_id: i64, update: NewTransaction) -> Result<Transaction> {
        let mut transactions = self.transactions.lock().unwrap();
        let slot = transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| not_found(format!("transaction {}", transaction_id)))?;
        *slot = Self::materialize(transaction_id, update);
        Ok(slot.clone())
    }

    fn delete(&self, transaction_id: i64) -> Result<Transaction> {
        let mut transactions = self.transactions.lock().unwrap();
        let index = transactions
            .iter()
            .position(|t| t.id == transaction_id)
            .ok_or_else(|| not_found(format!("transaction {}", transaction_id)))?;
        Ok(transactions.remove(index))
    }
}

// --- Prices ---

#[derive(Default)]
pub struct InMemoryPrices {
    quotes: Mutex<Vec<Quote>>,
    current: Mutex<HashMap<String, Decimal>>,
}

impl InMemoryPrices {
    pub fn add_quote(&self, security_id: &str, on: NaiveDate, close: Decimal, currency: &str) {
        self.quotes.lock().unwrap().push(Quote {
            security_id: security_id.to_string(),
            quote_date: on,
            close,
            currency: currency.to_string(),
            data_source: DataSource::Manual,
        });
    }

    pub fn set_current(&self, security_id: &str, price: Decimal) {
        self.current
            .lock()
            .unwrap()
            .insert(security_id.to_string(), price);
    }
}

impl PriceSourceTrait for InMemoryPrices {
    fn price_on_or_before(&self, security_id: &str, on: NaiveDate) -> Result<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.security_id == security_id && q.quote_date <= on)
            .max_by_key(|q| q.quote_date)
            .cloned())
    }

    fn current_price(&self, security_id: &str) -> Result<Option<Decimal>> {
        Ok(self.current.lock().unwrap().get(security_id).copied())
    }
}

// --- FX ---

#[derive(Default)]
pub struct InMemoryFxRates {
    rates: Mutex<Vec<ExchangeRate>>,
}

impl InMemoryFxRates {
    pub fn add(&self, from: &str, to: &str, on: NaiveDate, rate: Decimal) {
        self.save_exchange_rate(NewExchangeRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate,
            rate_date: on,
            source: RateSource::Manual,
        })
        .unwrap();
    }
}

impl FxRepositoryTrait for InMemoryFxRates {
    fn get_rate_on_or_before(
        &self,
        from: &str,
        to: &str,
        on: NaiveDate,
    ) -> Result<Option<ExchangeRate>> {
        Ok(self
            .rates
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to && r.rate_date <= on)
            .max_by_key(|r| r.rate_date)
            .cloned())
    }

    fn get_rate_history(&self, from: &str, to: &str) -> Result<Vec<ExchangeRate>> {
        let mut history: Vec<ExchangeRate> = self
            .rates
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.from_currency == from && r.to_currency == to)
            .cloned()
            .collect();
        history.sort_by_key(|r| r.rate_date);
        Ok(history)
    }

    fn save_exchange_rate(&self, rate: NewExchangeRate) -> Result<ExchangeRate> {
        let mut rates = self.rates.lock().unwrap();
        rates.retain(|r| {
            !(r.from_currency == rate.from_currency
                && r.to_currency == rate.to_currency
                && r.rate_date == rate.rate_date)
        });
        let saved = ExchangeRate {
            id: rates.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            from_currency: rate.from_currency,
            to_currency: rate.to_currency,
            rate: rate.rate,
            rate_date: rate.rate_date,
            source: rate.source,
        };
        rates.push(saved.clone());
        Ok(saved)
    }

    fn delete_exchange_rate(&self, rate_id: i64) -> Result<()> {
        self.rates.lock().unwrap().retain(|r| r.id != rate_id);
        Ok(())
    }
}

// --- Cash ledger ---

#[derive(Default)]
pub struct InMemoryCashLedger {
    entries: Mutex<Vec<CashLedgerEntry>>,
}

impl CashLedgerTrait for InMemoryCashLedger {
    fn balance_as_of(&self, portfolio_id: &str, on: NaiveDate) -> Result<Option<Decimal>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.portfolio_id == portfolio_id && e.entry_date <= on)
            .max_by_key(|e| e.entry_date)
            .map(|e| e.balance))
    }

    fn record_balance(&self, entry: CashLedgerEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|e| {
            !(e.portfolio_id == entry.portfolio_id && e.entry_date == entry.entry_date)
        });
        entries.push(entry);
        Ok(())
    }
}

// --- Snapshots ---

#[derive(Default)]
pub struct InMemorySnapshots {
    rows: Mutex<BTreeMap<(String, NaiveDate), PortfolioValueSnapshot>>,
    /// Dates whose upsert fails with a query error.
    failing_dates: Mutex<HashSet<NaiveDate>>,
    /// Dates whose upsert reports a unique violation, as if another writer won.
    racing_dates: Mutex<HashSet<NaiveDate>>,
    pub upserts: AtomicUsize,
}

impl InMemorySnapshots {
    pub fn fail_on(&self, on: NaiveDate) {
        self.failing_dates.lock().unwrap().insert(on);
    }

    pub fn race_on(&self, on: NaiveDate) {
        self.racing_dates.lock().unwrap().insert(on);
    }

    pub fn count(&self, portfolio_id: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(p, _)| p == portfolio_id)
            .count()
    }

    pub fn insert(&self, snapshot: PortfolioValueSnapshot) {
        self.rows.lock().unwrap().insert(
            (snapshot.portfolio_id.clone(), snapshot.snapshot_date),
            snapshot,
        );
    }
}

impl SnapshotRepositoryTrait for InMemorySnapshots {
    fn get_snapshot(
        &self,
        portfolio_id: &str,
        on: NaiveDate,
    ) -> Result<Option<PortfolioValueSnapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(portfolio_id.to_string(), on))
            .cloned())
    }

    fn get_snapshots_in_range(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PortfolioValueSnapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                s.portfolio_id == portfolio_id && s.snapshot_date >= start && s.snapshot_date <= end
            })
            .cloned()
            .collect())
    }

    fn get_snapshot_dates(
        &self,
        portfolio_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        Ok(self
            .get_snapshots_in_range(portfolio_id, start, end)?
            .into_iter()
            .map(|s| s.snapshot_date)
            .collect())
    }

    fn upsert_snapshot(&self, snapshot: &PortfolioValueSnapshot) -> Result<bool> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_dates.lock().unwrap().contains(&snapshot.snapshot_date) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "disk I/O error".to_string(),
            )));
        }
        if self.racing_dates.lock().unwrap().contains(&snapshot.snapshot_date) {
            return Err(Error::Database(DatabaseError::UniqueViolation(
                "portfolio_value_history".to_string(),
            )));
        }

        let mut rows = self.rows.lock().unwrap();
        let key = (snapshot.portfolio_id.clone(), snapshot.snapshot_date);
        let mut stored = snapshot.clone();
        stored.recompute_derived();
        match rows.get(&key) {
            Some(existing) => {
                stored.created_at = existing.created_at;
                rows.insert(key, stored);
                Ok(false)
            }
            None => {
                rows.insert(key, stored);
                Ok(true)
            }
        }
    }

    fn delete_snapshots_from(&self, portfolio_id: &str, from: NaiveDate) -> Result<usize> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|(p, d), _| !(p == portfolio_id && *d >= from));
        Ok(before - rows.len())
    }
}

// --- XIRR cache ---

#[derive(Default)]
pub struct InMemoryXirrCache {
    entries: Mutex<HashMap<(String, Option<String>), XirrCacheEntry>>,
}

impl InMemoryXirrCache {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl XirrCacheRepositoryTrait for InMemoryXirrCache {
    fn get_entry(
        &self,
        portfolio_id: &str,
        security_id: Option<&str>,
    ) -> Result<Option<XirrCacheEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(portfolio_id.to_string(), security_id.map(str::to_string)))
            .cloned())
    }

    fn save_entry(&self, entry: &XirrCacheEntry) -> Result<()> {
        self.entries.lock().unwrap().insert(
            (entry.portfolio_id.clone(), entry.security_id.clone()),
            entry.clone(),
        );
        Ok(())
    }

    fn invalidate_portfolio(&self, portfolio_id: &str) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(p, _), _| p != portfolio_id);
        Ok(before - entries.len())
    }
}

/// Every service wired over in-memory storage.
pub struct TestWorld {
    pub portfolios: Arc<InMemoryPortfolios>,
    pub securities: Arc<InMemorySecurities>,
    pub transactions: Arc<InMemoryTransactions>,
    pub prices: Arc<InMemoryPrices>,
    pub fx_rates: Arc<InMemoryFxRates>,
    pub cash_ledger: Arc<InMemoryCashLedger>,
    pub snapshots: Arc<InMemorySnapshots>,
    pub xirr_cache: Arc<InMemoryXirrCache>,
    pub fx_service: Arc<FxService>,
    pub holdings_service: Arc<HoldingsService>,
    pub valuation_service: Arc<ValuationService>,
    pub history_service: Arc<HistoryService>,
    pub performance_service: Arc<PerformanceService>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_fee_policy(FeePolicy::Capitalize)
    }

    pub fn with_fee_policy(fee_policy: FeePolicy) -> Self {
        let portfolios = Arc::new(InMemoryPortfolios::default());
        let securities = Arc::new(InMemorySecurities::default());
        let transactions = Arc::new(InMemoryTransactions::default());
        let prices = Arc::new(InMemoryPrices::default());
        let fx_rates = Arc::new(InMemoryFxRates::default());
        let cash_ledger = Arc::new(InMemoryCashLedger::default());
        let snapshots = Arc::new(InMemorySnapshots::default());
        let xirr_cache = Arc::new(InMemoryXirrCache::default());

        let fx_service = Arc::new(FxService::new(fx_rates.clone()));
        let holdings_service = Arc::new(HoldingsService::new(
            portfolios.clone(),
            securities.clone(),
            transactions.clone(),
            prices.clone(),
            fx_service.clone(),
            fee_policy,
        ));
        let valuation_service = Arc::new(ValuationService::new(
            holdings_service.clone(),
            cash_ledger.clone(),
        ));
        let history_service = Arc::new(HistoryService::new(
            valuation_service.clone(),
            snapshots.clone(),
            portfolios.clone(),
            transactions.clone(),
        ));
        let performance_service = Arc::new(PerformanceService::new(
            portfolios.clone(),
            transactions.clone(),
            valuation_service.clone(),
            holdings_service.clone(),
            fx_service.clone(),
            xirr_cache.clone(),
        ));

        Self {
            portfolios,
            securities,
            transactions,
            prices,
            fx_rates,
            cash_ledger,
            snapshots,
            xirr_cache,
            fx_service,
            holdings_service,
            valuation_service,
            history_service,
            performance_service,
        }
    }

    /// Portfolio `p1` in `base_currency` holding nothing yet.
    pub fn with_portfolio(self, base_currency: &str) -> Self {
        self.portfolios.insert(portfolio("p1", base_currency));
        self
    }

    pub fn with_security(self, id: &str, currency: &str) -> Self {
        self.securities.insert(security(id, currency));
        self
    }
}
