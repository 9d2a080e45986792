use super::currency::{
    from_major_multiplier, is_valid_currency_code, minor_unit_rule, normalize_currency_code,
    to_major_multiplier,
};
use super::fx_errors::FxError;
use super::fx_model::{ExchangeRate, NewExchangeRate, RateSource};
use super::fx_traits::{ExchangeRateProviderTrait, FxRepositoryTrait, FxServiceTrait};
use super::rate_cache::RateCache;
use super::rate_resolver::RateResolver;
use crate::constants::{DEFAULT_FX_CACHE_TTL_SECS, DEFAULT_REFERENCE_CURRENCY};
use crate::errors::Result;
use crate::settings::Settings;
use crate::utils::time_utils::{valuation_date_from_utc, DEFAULT_VALUATION_TZ};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct FxService {
    repository: Arc<dyn FxRepositoryTrait>,
    provider: Option<Arc<dyn ExchangeRateProviderTrait>>,
    resolver: Arc<RateResolver>,
    cache: Arc<RateCache>,
    valuation_tz: Tz,
}

impl FxService {
    pub fn new(repository: Arc<dyn FxRepositoryTrait>) -> Self {
        Self {
            repository,
            provider: None,
            resolver: Arc::new(RateResolver::with_reference_currency(
                DEFAULT_REFERENCE_CURRENCY,
            )),
            cache: Arc::new(RateCache::new(Duration::from_secs(
                DEFAULT_FX_CACHE_TTL_SECS,
            ))),
            valuation_tz: DEFAULT_VALUATION_TZ,
        }
    }

    /// Applies the reference currency, cache TTL and valuation time zone.
    pub fn with_settings(mut self, settings: &Settings) -> Result<Self> {
        self.resolver = Arc::new(RateResolver::with_reference_currency(
            &settings.reference_currency,
        ));
        self.cache = Arc::new(RateCache::new(Duration::from_secs(
            settings.fx_cache_ttl_secs,
        )));
        self.valuation_tz = settings.valuation_tz()?;
        Ok(self)
    }

    /// Sets the provider consulted for today's rates.
    pub fn with_provider(mut self, provider: Arc<dyn ExchangeRateProviderTrait>) -> Self {
        self.provider = Some(provider);
        self
    }

    fn today(&self) -> NaiveDate {
        valuation_date_from_utc(Utc::now(), self.valuation_tz)
    }

    fn far_future() -> NaiveDate {
        NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
    }

    fn validate_code(code: &str) -> Result<()> {
        if is_valid_currency_code(code) {
            Ok(())
        } else {
            Err(FxError::InvalidCurrencyCode(code.to_string()).into())
        }
    }

    /// Stored rates are keyed by major currencies, which is what every lookup
    /// normalizes to.
    fn validate_stored_code(code: &str) -> Result<()> {
        Self::validate_code(code)?;
        match minor_unit_rule(code) {
            Some(rule) => Err(FxError::InvalidCurrencyCode(format!(
                "{} is a minor unit; store the rate against {}",
                code, rule.major_code
            ))
            .into()),
            None => Ok(()),
        }
    }

    /// Splits a raw pair into its major currencies and the multiplier that
    /// carries the minor-unit correction of both sides.
    fn normalize_currency_pair<'a>(from: &'a str, to: &'a str) -> (&'a str, &'a str, Decimal) {
        (
            normalize_currency_code(from),
            normalize_currency_code(to),
            to_major_multiplier(from) * from_major_multiplier(to),
        )
    }

    /// Resolves a rate between two major currencies, including the cache and
    /// the same-day provider fetch.
    fn resolve_major_rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<Option<Decimal>> {
        if from == to {
            return Ok(Some(Decimal::ONE));
        }
        if let Some(rate) = self.cache.get(from, to, date) {
            return Ok(Some(rate));
        }

        let mut resolved = self.resolver.resolve(self.repository.as_ref(), from, to, date)?;
        if resolved.is_none() && date == self.today() && self.fetch_and_store(from, to, date)? {
            resolved = self.resolver.resolve(self.repository.as_ref(), from, to, date)?;
        }

        if let Some(rate) = resolved {
            self.cache.insert(from, to, date, rate);
        }
        Ok(resolved)
    }

    /// Asks the provider for today's rate and persists it. Provider failures
    /// are logged and reported as "nothing fetched".
    fn fetch_and_store(&self, from: &str, to: &str, date: NaiveDate) -> Result<bool> {
        let Some(provider) = &self.provider else {
            return Ok(false);
        };
        let fetched = match provider.fetch_rate(from, to) {
            Ok(Some(rate)) if rate > Decimal::ZERO => rate,
            Ok(_) => {
                log::debug!("Rate provider has no rate for {}/{}", from, to);
                return Ok(false);
            }
            Err(e) => {
                log::warn!("Failed to fetch {}/{} from rate provider: {}", from, to, e);
                return Ok(false);
            }
        };

        self.repository.save_exchange_rate(NewExchangeRate {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            rate: fetched,
            rate_date: date,
            source: RateSource::Provider,
        })?;
        self.cache.clear();
        log::info!("Stored provider rate {}/{} = {} for {}", from, to, fetched, date);
        Ok(true)
    }
}

impl FxServiceTrait for FxService {
    fn get_exchange_rate_for_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        if from_currency == to_currency {
            return Ok(Decimal::ONE);
        }
        Self::validate_code(from_currency)?;
        Self::validate_code(to_currency)?;

        let (from, to, multiplier) = Self::normalize_currency_pair(from_currency, to_currency);
        if from == to {
            return Ok(multiplier);
        }

        match self.resolve_major_rate(from, to, date)? {
            Some(rate) => Ok(rate * multiplier),
            None => Err(FxError::RateNotFound(format!(
                "no rate for {} on or before {}",
                ExchangeRate::pair_key(from, to),
                date
            ))
            .into()),
        }
    }

    fn convert_currency_for_date(
        &self,
        amount: Decimal,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        if from_currency == to_currency {
            return Ok(amount);
        }
        let rate = self
            .get_exchange_rate_for_date(from_currency, to_currency, date)
            .map_err(|e| {
                FxError::ConversionError(format!(
                    "cannot convert {} {} to {} on {}: {}",
                    amount, from_currency, to_currency, date, e
                ))
            })?;
        Ok(amount * rate)
    }

    fn get_latest_known_rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal> {
        if from_currency == to_currency {
            return Ok(Decimal::ONE);
        }
        Self::validate_code(from_currency)?;
        Self::validate_code(to_currency)?;

        let (from, to, multiplier) = Self::normalize_currency_pair(from_currency, to_currency);
        if from == to {
            return Ok(multiplier);
        }

        self.resolver
            .resolve(self.repository.as_ref(), from, to, Self::far_future())?
            .map(|rate| rate * multiplier)
            .ok_or_else(|| {
                FxError::RateNotFound(format!(
                    "no rate has ever been stored for {}",
                    ExchangeRate::pair_key(from, to)
                ))
                .into()
            })
    }

    fn add_exchange_rate(&self, new_rate: NewExchangeRate) -> Result<ExchangeRate> {
        Self::validate_stored_code(&new_rate.from_currency)?;
        Self::validate_stored_code(&new_rate.to_currency)?;
        new_rate.validate()?;

        let saved = self.repository.save_exchange_rate(new_rate)?;
        self.cache.clear();
        log::debug!(
            "Saved {} rate {} for {}",
            saved.source.as_str(),
            ExchangeRate::pair_key(&saved.from_currency, &saved.to_currency),
            saved.rate_date
        );
        Ok(saved)
    }

    fn delete_exchange_rate(&self, rate_id: i64) -> Result<()> {
        self.repository.delete_exchange_rate(rate_id)?;
        self.cache.clear();
        Ok(())
    }

    fn get_rate_history(
        &self,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Vec<ExchangeRate>> {
        self.repository.get_rate_history(from_currency, to_currency)
    }
}
