//! Ordered strategies for resolving a stored rate between two major currencies.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::fx_traits::FxRepositoryTrait;
use crate::errors::Result;

/// One way of producing a rate from stored data. Returns `Ok(None)` when the
/// strategy does not apply or has nothing stored; errors are storage failures.
pub trait RateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(
        &self,
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>>;
}

/// Stored `from -> to` rate, latest on or before the date.
pub struct DirectRate;

impl RateStrategy for DirectRate {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn resolve(
        &self,
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        Ok(repository
            .get_rate_on_or_before(from, to, date)?
            .map(|r| r.rate)
            .filter(|rate| !rate.is_zero()))
    }
}

/// Reciprocal of the stored `to -> from` rate.
pub struct InverseRate;

impl RateStrategy for InverseRate {
    fn name(&self) -> &'static str {
        "inverse"
    }

    fn resolve(
        &self,
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        Ok(repository
            .get_rate_on_or_before(to, from, date)?
            .map(|r| r.rate)
            .filter(|rate| !rate.is_zero())
            .map(|rate| Decimal::ONE / rate))
    }
}

/// Cross rate through a reference currency; each leg is direct or inverse.
pub struct TriangulatedRate {
    via: String,
}

impl TriangulatedRate {
    pub fn new(via: impl Into<String>) -> Self {
        Self { via: via.into() }
    }

    fn leg(
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        match DirectRate.resolve(repository, from, to, date)? {
            Some(rate) => Ok(Some(rate)),
            None => InverseRate.resolve(repository, from, to, date),
        }
    }
}

impl RateStrategy for TriangulatedRate {
    fn name(&self) -> &'static str {
        "triangulated"
    }

    fn resolve(
        &self,
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        if from == self.via || to == self.via {
            return Ok(None);
        }
        let Some(first) = Self::leg(repository, from, &self.via, date)? else {
            return Ok(None);
        };
        let Some(second) = Self::leg(repository, &self.via, to, date)? else {
            return Ok(None);
        };
        Ok(Some(first * second))
    }
}

/// Tries each strategy in order and returns the first hit.
pub struct RateResolver {
    strategies: Vec<Box<dyn RateStrategy>>,
}

impl RateResolver {
    pub fn new(strategies: Vec<Box<dyn RateStrategy>>) -> Self {
        Self { strategies }
    }

    /// Direct, then inverse, then triangulated through `reference_currency`.
    pub fn with_reference_currency(reference_currency: &str) -> Self {
        Self::new(vec![
            Box::new(DirectRate),
            Box::new(InverseRate),
            Box::new(TriangulatedRate::new(reference_currency)),
        ])
    }

    pub fn resolve(
        &self,
        repository: &dyn FxRepositoryTrait,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>> {
        for strategy in &self.strategies {
            if let Some(rate) = strategy.resolve(repository, from, to, date)? {
                log::trace!(
                    "Resolved {}/{} on {} via {} strategy",
                    from,
                    to,
                    date,
                    strategy.name()
                );
                return Ok(Some(rate));
            }
        }
        Ok(None)
    }
}
