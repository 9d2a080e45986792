/// Decimal precision for stored monetary values
pub const DECIMAL_PRECISION: u32 = 6;

/// Quantity threshold for significant positions
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Reference currency used to triangulate cross rates when no direct or inverse rate exists
pub const DEFAULT_REFERENCE_CURRENCY: &str = "USD";

/// Time-to-live of cached FX lookups, in seconds
pub const DEFAULT_FX_CACHE_TTL_SECS: u64 = 3600;

/// Minimum span between first and last cash flow for XIRR, in days
pub const DEFAULT_XIRR_MIN_SPAN_DAYS: i64 = 7;

/// Number of per-day error messages kept in a backfill result
pub const DEFAULT_BACKFILL_ERROR_LIMIT: usize = 10;
