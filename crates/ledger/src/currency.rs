use serde::{Deserialize, Serialize};

use blockbill_core::{BillingError, BillingResult};

/// Lowercase ISO-ish currency code (e.g. `usd`, `eur`, `blk`).
///
/// `blk` is the store-credit currency: one block is exactly one `blk`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

/// Currency code of store-credit blocks.
pub const BLOCK_CURRENCY: &str = "blk";

impl Currency {
    /// Parse and normalize a currency code.
    ///
    /// Codes are lowercased; 2 to 8 ASCII letters.
    pub fn new(code: impl AsRef<str>) -> BillingResult<Self> {
        let code = code.as_ref().trim().to_ascii_lowercase();
        if code.len() < 2 || code.len() > 8 || !code.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(BillingError::validation(format!(
                "invalid currency code: {code:?}"
            )));
        }
        Ok(Self(code))
    }

    /// The store-credit currency.
    pub fn blocks() -> Self {
        Self(BLOCK_CURRENCY.to_string())
    }

    pub fn is_blocks(&self) -> bool {
        self.0 == BLOCK_CURRENCY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
