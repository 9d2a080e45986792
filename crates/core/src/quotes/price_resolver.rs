use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::model::{PriceOrigin, ResolvedPrice};
use super::store::PriceSourceTrait;
use crate::errors::Result;
use crate::securities::Security;

/// Finds the price to value `security` at on `date`: exact quote, latest
/// prior quote, current price, else zero with a warning.
pub fn resolve_price(
    source: &dyn PriceSourceTrait,
    security: &Security,
    date: NaiveDate,
) -> Result<ResolvedPrice> {
    if let Some(quote) = source.price_on_or_before(&security.id, date)? {
        let origin = if quote.quote_date == date {
            PriceOrigin::Exact
        } else {
            PriceOrigin::Prior
        };
        return Ok(ResolvedPrice {
            price: quote.close,
            price_date: Some(quote.quote_date),
            currency: quote.currency,
            origin,
        });
    }

    let current = match source.current_price(&security.id)? {
        Some(price) => Some(price),
        None => security.current_price,
    };
    if let Some(price) = current {
        log::debug!(
            "No quote for {} on or before {}, using current price {}",
            security.symbol,
            date,
            price
        );
        return Ok(ResolvedPrice {
            price,
            price_date: None,
            currency: security.currency.clone(),
            origin: PriceOrigin::Current,
        });
    }

    log::warn!(
        "No price known for {} as of {}; valuing at zero",
        security.symbol,
        date
    );
    Ok(ResolvedPrice {
        price: Decimal::ZERO,
        price_date: None,
        currency: security.currency.clone(),
        origin: PriceOrigin::Missing,
    })
}
