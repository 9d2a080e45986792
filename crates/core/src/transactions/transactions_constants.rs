/// Transaction types
///
/// Purchase of a security. Decreases cash and opens a FIFO lot.
pub const TRANSACTION_TYPE_BUY: &str = "BUY";

/// Disposal of a security. Consumes the oldest lots first and realizes a gain.
pub const TRANSACTION_TYPE_SELL: &str = "SELL";

/// Cash dividend. Reduces the running cost basis of the position.
pub const TRANSACTION_TYPE_DIVIDEND: &str = "DIVIDEND";

/// Stock split or reverse split, ratio "N:M". Cost basis is unchanged.
pub const TRANSACTION_TYPE_SPLIT: &str = "SPLIT";

/// Stand-alone fee, optionally tied to a security.
pub const TRANSACTION_TYPE_FEE: &str = "FEE";

/// Interest earned on cash or fixed income.
pub const TRANSACTION_TYPE_INTEREST: &str = "INTEREST";

/// Securities moved in with their cost basis. No cash effect.
pub const TRANSACTION_TYPE_TRANSFER_IN: &str = "TRANSFER_IN";

/// Securities moved out at cost. No realized gain.
pub const TRANSACTION_TYPE_TRANSFER_OUT: &str = "TRANSFER_OUT";

/// External cash into the portfolio.
pub const TRANSACTION_TYPE_DEPOSIT: &str = "DEPOSIT";

/// External cash out of the portfolio.
pub const TRANSACTION_TYPE_WITHDRAWAL: &str = "WITHDRAWAL";

/// Separator between the two sides of a split ratio.
pub const SPLIT_RATIO_SEPARATOR: char = ':';
