//! Minor-unit currency codes.
//!
//! Some exchanges quote securities in a subunit of the nominal currency
//! (London in pence, Johannesburg in cents, Tel Aviv in agorot). The flag is a
//! property of the quoted code itself, so `GBp -> GBP` is a real conversion
//! with factor 0.01 even though both sides are pounds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinorUnitRule {
    pub minor_code: &'static str,
    pub major_code: &'static str,
    /// Value of one minor unit in the major currency.
    pub factor: Decimal,
    pub label: &'static str,
}

const MINOR_UNIT_RULES: [MinorUnitRule; 6] = [
    MinorUnitRule {
        minor_code: "GBp",
        major_code: "GBP",
        factor: dec!(0.01),
        label: "Pence",
    },
    MinorUnitRule {
        minor_code: "GBX",
        major_code: "GBP",
        factor: dec!(0.01),
        label: "Pence",
    },
    MinorUnitRule {
        minor_code: "ZAc",
        major_code: "ZAR",
        factor: dec!(0.01),
        label: "SA Cents",
    },
    MinorUnitRule {
        minor_code: "ZAC",
        major_code: "ZAR",
        factor: dec!(0.01),
        label: "SA Cents",
    },
    MinorUnitRule {
        minor_code: "ILA",
        major_code: "ILS",
        factor: dec!(0.01),
        label: "Agorot",
    },
    MinorUnitRule {
        minor_code: "KWF",
        major_code: "KWD",
        factor: dec!(0.01),
        label: "Fils",
    },
];

/// Returns the minor-unit rule for a currency code, if the code is quoted in a subunit.
pub fn minor_unit_rule(code: &str) -> Option<&'static MinorUnitRule> {
    MINOR_UNIT_RULES.iter().find(|rule| rule.minor_code == code)
}

/// Returns the nominal (major) currency code used for FX lookups.
pub fn normalize_currency_code(code: &str) -> &str {
    minor_unit_rule(code).map_or(code, |rule| rule.major_code)
}

/// Multiplier that turns an amount in `code` into its major currency.
/// `Decimal::ONE` for codes quoted in their major unit.
pub fn to_major_multiplier(code: &str) -> Decimal {
    minor_unit_rule(code).map_or(Decimal::ONE, |rule| rule.factor)
}

/// Multiplier that turns an amount in the major currency into `code`.
pub fn from_major_multiplier(code: &str) -> Decimal {
    minor_unit_rule(code).map_or(Decimal::ONE, |rule| Decimal::ONE / rule.factor)
}

/// Converts an amount quoted in a possibly minor unit into its major unit
/// and returns the major currency code.
pub fn normalize_amount(amount: Decimal, code: &str) -> (Decimal, &str) {
    match minor_unit_rule(code) {
        Some(rule) => (amount * rule.factor, rule.major_code),
        None => (amount, code),
    }
}

/// Three uppercase letters, or one of the mixed-case minor-unit codes.
pub fn is_valid_currency_code(code: &str) -> bool {
    minor_unit_rule(code).is_some()
        || (code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()))
}
