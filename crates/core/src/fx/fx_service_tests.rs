#[cfg(test)]
mod tests {
    use crate::errors::{Error, Result};
    use crate::fx::{
        ExchangeRate, ExchangeRateProviderTrait, FxError, FxRepositoryTrait, FxService,
        FxServiceTrait, NewExchangeRate, RateSource,
    };
    use crate::settings::Settings;
    use crate::utils::time_utils::valuation_date_today;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // --- Mock FxRepository ---
    #[derive(Default)]
    struct MockFxRepository {
        rates: Mutex<Vec<ExchangeRate>>,
        lookups: AtomicUsize,
    }

    impl MockFxRepository {
        fn with_rates(rates: &[(&str, &str, NaiveDate, Decimal)]) -> Self {
            let repo = Self::default();
            for (from, to, date, rate) in rates {
                repo.save_exchange_rate(NewExchangeRate {
                    from_currency: from.to_string(),
                    to_currency: to.to_string(),
                    rate: *rate,
                    rate_date: *date,
                    source: RateSource::Manual,
                })
                .unwrap();
            }
            repo
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl FxRepositoryTrait for MockFxRepository {
        fn get_rate_on_or_before(
            &self,
            from: &str,
            to: &str,
            date: NaiveDate,
        ) -> Result<Option<ExchangeRate>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rates
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.from_currency == from && r.to_currency == to && r.rate_date <= date)
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
                id: rates.len() as i64 + 1,
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

    // --- Mock rate provider ---
    struct MockProvider {
        rate: Option<Decimal>,
        calls: AtomicUsize,
    }

    impl ExchangeRateProviderTrait for MockProvider {
        fn fetch_rate(&self, _from: &str, _to: &str) -> Result<Option<Decimal>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rate)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(rates: &[(&str, &str, NaiveDate, Decimal)]) -> (FxService, Arc<MockFxRepository>) {
        let repo = Arc::new(MockFxRepository::with_rates(rates));
        (FxService::new(repo.clone()), repo)
    }

    #[test]
    fn test_identity_rate_is_one() {
        let (fx, _) = service(&[]);
        let rate = fx
            .get_exchange_rate_for_date("EUR", "EUR", date(2024, 1, 2))
            .unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[test]
    fn test_direct_rate_uses_latest_on_or_before() {
        let (fx, _) = service(&[
            ("EUR", "USD", date(2024, 1, 2), dec!(1.10)),
            ("EUR", "USD", date(2024, 1, 5), dec!(1.12)),
        ]);
        assert_eq!(
            fx.get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 4)).unwrap(),
            dec!(1.10)
        );
        assert_eq!(
            fx.get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 9)).unwrap(),
            dec!(1.12)
        );
    }

    #[test]
    fn test_inverse_rate_is_derived() {
        let (fx, _) = service(&[("USD", "EUR", date(2024, 1, 2), dec!(0.8))]);
        let rate = fx
            .get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 2))
            .unwrap();
        assert_eq!(rate, dec!(1.25));
    }

    #[test]
    fn test_triangulates_through_reference_currency() {
        // EUR->USD stored directly, CAD->USD stored so USD->CAD is an inverse leg.
        let (fx, _) = service(&[
            ("EUR", "USD", date(2024, 1, 2), dec!(1.10)),
            ("CAD", "USD", date(2024, 1, 2), dec!(0.5)),
        ]);
        let rate = fx
            .get_exchange_rate_for_date("EUR", "CAD", date(2024, 1, 3))
            .unwrap();
        assert_eq!(rate, dec!(2.20));
    }

    #[test]
    fn test_minor_unit_same_nominal_currency() {
        let (fx, _) = service(&[]);
        let day = date(2024, 1, 2);
        assert_eq!(fx.get_exchange_rate_for_date("GBp", "GBP", day).unwrap(), dec!(0.01));
        assert_eq!(fx.get_exchange_rate_for_date("GBP", "GBX", day).unwrap(), dec!(100));
        assert_eq!(
            fx.convert_currency_for_date(dec!(12345), "GBp", "GBP", day).unwrap(),
            dec!(123.45)
        );
    }

    #[test]
    fn test_minor_unit_cross_currency() {
        let (fx, _) = service(&[("GBP", "USD", date(2024, 1, 2), dec!(1.25))]);
        let converted = fx
            .convert_currency_for_date(dec!(10000), "GBp", "USD", date(2024, 1, 2))
            .unwrap();
        assert_eq!(converted, dec!(125));
    }

    #[test]
    fn test_missing_rate_reports_not_found() {
        let (fx, _) = service(&[]);
        let err = fx
            .get_exchange_rate_for_date("EUR", "JPY", date(2020, 1, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::RateNotFound(_))));

        let err = fx
            .convert_currency_for_date(dec!(5), "EUR", "JPY", date(2020, 1, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::ConversionError(_))));
    }

    #[test]
    fn test_rate_before_first_stored_date_is_not_found() {
        let (fx, _) = service(&[("EUR", "USD", date(2024, 1, 5), dec!(1.10))]);
        assert!(fx
            .get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 4))
            .is_err());
    }

    #[test]
    fn test_invalid_currency_code_rejected() {
        let (fx, _) = service(&[]);
        let err = fx
            .get_exchange_rate_for_date("EURO", "USD", date(2024, 1, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));
    }

    #[test]
    fn test_lowercase_code_rejected() {
        let (fx, _) = service(&[("USD", "EUR", date(2024, 1, 2), dec!(0.9))]);
        let err = fx
            .get_exchange_rate_for_date("usd", "EUR", date(2024, 1, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));
    }

    #[test]
    fn test_add_exchange_rate_rejects_minor_unit_pair() {
        let (fx, repo) = service(&[]);
        let err = fx
            .add_exchange_rate(NewExchangeRate {
                from_currency: "GBp".to_string(),
                to_currency: "USD".to_string(),
                rate: dec!(0.0125),
                rate_date: date(2024, 1, 2),
                source: RateSource::Manual,
            })
            .unwrap_err();
        assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));
        assert!(repo.get_rate_history("GBp", "USD").unwrap().is_empty());

        fx.add_exchange_rate(NewExchangeRate {
            from_currency: "GBP".to_string(),
            to_currency: "USD".to_string(),
            rate: dec!(1.25),
            rate_date: date(2024, 1, 2),
            source: RateSource::Manual,
        })
        .unwrap();
        assert_eq!(
            fx.get_exchange_rate_for_date("GBp", "USD", date(2024, 1, 3)).unwrap(),
            dec!(0.0125)
        );
    }

    #[test]
    fn test_resolved_rates_are_cached() {
        let (fx, repo) = service(&[("EUR", "USD", date(2024, 1, 2), dec!(1.10))]);
        fx.get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 2)).unwrap();
        let after_first = repo.lookup_count();
        fx.get_exchange_rate_for_date("EUR", "USD", date(2024, 1, 2)).unwrap();
        assert_eq!(repo.lookup_count(), after_first);
    }

    #[test]
    fn test_add_exchange_rate_invalidates_cache() {
        let (fx, _) = service(&[("EUR", "USD", date(2024, 1, 2), dec!(1.10))]);
        let day = date(2024, 1, 2);
        assert_eq!(fx.get_exchange_rate_for_date("EUR", "USD", day).unwrap(), dec!(1.10));

        fx.add_exchange_rate(NewExchangeRate {
            from_currency: "EUR".to_string(),
            to_currency: "USD".to_string(),
            rate: dec!(1.20),
            rate_date: day,
            source: RateSource::Manual,
        })
        .unwrap();

        assert_eq!(fx.get_exchange_rate_for_date("EUR", "USD", day).unwrap(), dec!(1.20));
    }

    #[test]
    fn test_add_exchange_rate_rejects_non_positive_rate() {
        let (fx, _) = service(&[]);
        let result = fx.add_exchange_rate(NewExchangeRate {
            from_currency: "EUR".to_string(),
            to_currency: "USD".to_string(),
            rate: Decimal::ZERO,
            rate_date: date(2024, 1, 2),
            source: RateSource::Manual,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_fetch_only_for_today() {
        let repo = Arc::new(MockFxRepository::default());
        let provider = Arc::new(MockProvider {
            rate: Some(dec!(150)),
            calls: AtomicUsize::new(0),
        });
        let fx = FxService::new(repo.clone()).with_provider(provider.clone());

        assert!(fx
            .get_exchange_rate_for_date("USD", "JPY", date(2020, 6, 1))
            .is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let today = valuation_date_today();
        let rate = fx.get_exchange_rate_for_date("USD", "JPY", today).unwrap();
        assert_eq!(rate, dec!(150));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let stored = repo.get_rate_history("USD", "JPY").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source, RateSource::Provider);
    }

    #[test]
    fn test_latest_known_rate_ignores_date() {
        let (fx, _) = service(&[
            ("EUR", "USD", date(2023, 1, 2), dec!(1.05)),
            ("EUR", "USD", date(2023, 6, 1), dec!(1.09)),
        ]);
        assert_eq!(fx.get_latest_known_rate("EUR", "USD").unwrap(), dec!(1.09));
        assert_eq!(fx.get_latest_known_rate("GBp", "GBP").unwrap(), dec!(0.01));
        assert!(fx.get_latest_known_rate("EUR", "JPY").is_err());
    }

    #[test]
    fn test_settings_change_reference_currency() {
        let repo = Arc::new(MockFxRepository::with_rates(&[
            ("EUR", "CHF", date(2024, 1, 2), dec!(0.95)),
            ("CHF", "SEK", date(2024, 1, 2), dec!(12)),
        ]));
        let settings = Settings {
            reference_currency: "CHF".to_string(),
            ..Settings::default()
        };
        let fx = FxService::new(repo).with_settings(&settings).unwrap();
        assert_eq!(
            fx.get_exchange_rate_for_date("EUR", "SEK", date(2024, 1, 2)).unwrap(),
            dec!(11.40)
        );
    }
}
