//! Height-scoped fee configuration.
//!
//! These parameters drive gas pricing, pledges and stake limits. A chain
//! carries a list of them, each active from its `start_height` on.

use ldvm_primitives::{LDC, MILLI_LDC};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Fee parameters active from `start_height`. Amounts are in nano LDC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// First block height using this configuration
    #[serde(default)]
    pub start_height: u64,

    /// Block gas above which the gas price rises
    #[serde(default = "default_threshold_gas")]
    pub threshold_gas: u64,

    /// Maximum gas of a single transaction
    #[serde(default = "default_max_tx_gas")]
    pub max_tx_gas: u64,

    /// Lower bound of the block gas price
    #[serde(default = "default_min_gas_price")]
    pub min_gas_price: u64,

    /// Upper bound of the block gas price
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price: u64,

    /// Share of fees rebated to validators, in parts per thousand
    #[serde(default = "default_gas_rebate_rate")]
    pub gas_rebate_rate: u64,

    /// Byte budget of the transactions in one block
    #[serde(default = "default_max_block_tx_bytes")]
    pub max_block_tx_bytes: u64,

    /// Native balance a token account must keep
    #[serde(default = "default_min_token_pledge")]
    pub min_token_pledge: u64,

    /// Native balance a stake account must keep
    #[serde(default = "default_min_stake_pledge")]
    pub min_stake_pledge: u64,

    /// Minimum stake of a validator
    #[serde(default = "default_min_validator_stake")]
    pub min_validator_stake: u64,

    /// Maximum stake of a validator
    #[serde(default = "default_max_validator_stake")]
    pub max_validator_stake: u64,

    /// Minimum amount of a delegation
    #[serde(default = "default_min_delegator_stake")]
    pub min_delegator_stake: u64,

    /// Minimum withdraw fee of a validator stake, in parts per million
    #[serde(default = "default_min_delegation_fee")]
    pub min_delegation_fee: u64,

    /// Native balance a plain account must keep
    #[serde(default = "default_non_transferable_balance")]
    pub non_transferable_balance: u64,
}

// Default value functions
const fn default_threshold_gas() -> u64 {
    1000
}

const fn default_max_tx_gas() -> u64 {
    42_000_000
}

const fn default_min_gas_price() -> u64 {
    10_000
}

const fn default_max_gas_price() -> u64 {
    100_000
}

const fn default_gas_rebate_rate() -> u64 {
    1000
}

const fn default_max_block_tx_bytes() -> u64 {
    4_200_000
}

const fn default_min_token_pledge() -> u64 {
    10_000 * LDC
}

const fn default_min_stake_pledge() -> u64 {
    1_000 * LDC
}

const fn default_min_validator_stake() -> u64 {
    1_000_000 * LDC
}

const fn default_max_validator_stake() -> u64 {
    10_000_000 * LDC
}

const fn default_min_delegator_stake() -> u64 {
    1_000 * LDC
}

const fn default_min_delegation_fee() -> u64 {
    100_000
}

const fn default_non_transferable_balance() -> u64 {
    MILLI_LDC
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            start_height: 0,
            threshold_gas: default_threshold_gas(),
            max_tx_gas: default_max_tx_gas(),
            min_gas_price: default_min_gas_price(),
            max_gas_price: default_max_gas_price(),
            gas_rebate_rate: default_gas_rebate_rate(),
            max_block_tx_bytes: default_max_block_tx_bytes(),
            min_token_pledge: default_min_token_pledge(),
            min_stake_pledge: default_min_stake_pledge(),
            min_validator_stake: default_min_validator_stake(),
            max_validator_stake: default_max_validator_stake(),
            min_delegator_stake: default_min_delegator_stake(),
            min_delegation_fee: default_min_delegation_fee(),
            non_transferable_balance: default_non_transferable_balance(),
        }
    }
}

impl FeeConfig {
    /// Checks internal consistency.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_gas_price == 0 || self.min_gas_price > self.max_gas_price {
            return Err(ConfigError::invalid(
                "fee_config",
                format!(
                    "gas price range {}..={} is empty",
                    self.min_gas_price, self.max_gas_price
                ),
            ));
        }
        if self.max_tx_gas == 0 || self.threshold_gas == 0 {
            return Err(ConfigError::invalid(
                "fee_config",
                "max_tx_gas and threshold_gas must be positive",
            ));
        }
        if self.gas_rebate_rate > 1000 {
            return Err(ConfigError::invalid(
                "fee_config",
                format!("gas_rebate_rate {} exceeds 1000", self.gas_rebate_rate),
            ));
        }
        if self.min_validator_stake > self.max_validator_stake {
            return Err(ConfigError::invalid(
                "fee_config",
                "min_validator_stake exceeds max_validator_stake",
            ));
        }
        if self.max_block_tx_bytes == 0 {
            return Err(ConfigError::invalid(
                "fee_config",
                "max_block_tx_bytes must be positive",
            ));
        }
        Ok(())
    }

    /// Gas price of the next block given the parent's price and gas used.
    ///
    /// The price rises by 1/8 for each multiple of `threshold_gas` above the
    /// threshold and falls by 1/8 below it, clamped to the configured range.
    #[must_use]
    pub fn next_gas_price(&self, parent_price: u64, parent_gas: u64) -> u64 {
        let price = parent_price.clamp(self.min_gas_price, self.max_gas_price);
        let next = if parent_gas > self.threshold_gas {
            let steps = parent_gas / self.threshold_gas;
            price.saturating_add(price / 8 * steps.min(8))
        } else if parent_gas < self.threshold_gas {
            price.saturating_sub(price / 8)
        } else {
            price
        };
        next.clamp(self.min_gas_price, self.max_gas_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FeeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_price_range() {
        let config = FeeConfig {
            min_gas_price: 10,
            max_gas_price: 5,
            ..FeeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_next_gas_price() {
        let config = FeeConfig::default();
        let min = config.min_gas_price;
        // below threshold never drops under the minimum
        assert_eq!(config.next_gas_price(min, 0), min);
        // at threshold the price is stable
        assert_eq!(config.next_gas_price(20_000, config.threshold_gas), 20_000);
        // above threshold rises
        assert!(config.next_gas_price(20_000, config.threshold_gas * 3) > 20_000);
        // clamped to the maximum
        assert_eq!(
            config.next_gas_price(config.max_gas_price, u64::MAX),
            config.max_gas_price
        );
    }
}
