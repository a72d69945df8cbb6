//! Engine configuration.

/// Environment variable overriding the block lifetime.
pub const BLOCKS_DAYS_ALIVE_VAR: &str = "BLOCKBILL_BLOCKS_DAYS_ALIVE";

const DEFAULT_BLOCKS_DAYS_ALIVE: i64 = 365;

/// Tunables of the billing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingConfig {
    /// How many days a block stays spendable after minting.
    pub blocks_days_alive: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            blocks_days_alive: DEFAULT_BLOCKS_DAYS_ALIVE,
        }
    }
}

impl BillingConfig {
    pub fn new(blocks_days_alive: i64) -> Self {
        Self { blocks_days_alive }
    }

    /// Read configuration from the process environment, falling back to
    /// defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let blocks_days_alive = lookup(BLOCKS_DAYS_ALIVE_VAR)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_BLOCKS_DAYS_ALIVE);

        Self { blocks_days_alive }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a_year() {
        assert_eq!(BillingConfig::default().blocks_days_alive, 365);
    }

    #[test]
    fn reads_ttl_from_lookup() {
        let config = BillingConfig::from_lookup(|key| {
            (key == BLOCKS_DAYS_ALIVE_VAR).then(|| "30".to_string())
        });
        assert_eq!(config.blocks_days_alive, 30);
    }

    #[test]
    fn rejects_garbage_and_non_positive_values() {
        let config = BillingConfig::from_lookup(|_| Some("soon".to_string()));
        assert_eq!(config.blocks_days_alive, 365);

        let config = BillingConfig::from_lookup(|_| Some("-3".to_string()));
        assert_eq!(config.blocks_days_alive, 365);
    }
}
