//! Chain configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::fee::FeeConfig;
use crate::network::NetworkType;

/// Chain-wide settings shared by every node of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Network type
    #[serde(default)]
    pub network: NetworkType,

    /// Custom chain id (overrides the network default if set)
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Fee configurations, sorted by `start_height`
    #[serde(default = "default_fee_configs")]
    pub fee_configs: Vec<FeeConfig>,
}

fn default_fee_configs() -> Vec<FeeConfig> {
    vec![FeeConfig::default()]
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::for_network(NetworkType::MainNet)
    }
}

impl ChainConfig {
    /// Create configuration for a specific network type
    #[must_use]
    pub fn for_network(network: NetworkType) -> Self {
        Self {
            network,
            chain_id: None,
            fee_configs: default_fee_configs(),
        }
    }

    /// Get the effective chain id
    #[must_use]
    pub fn effective_chain_id(&self) -> u64 {
        self.chain_id.unwrap_or_else(|| self.network.chain_id())
    }

    /// Fee configuration active at `height`: the last one whose
    /// `start_height` is not above it.
    ///
    /// Panics if `fee_configs` is empty, which [`validate`](Self::validate)
    /// rules out.
    #[must_use]
    pub fn fee(&self, height: u64) -> &FeeConfig {
        self.fee_configs
            .iter()
            .rev()
            .find(|cfg| cfg.start_height <= height)
            .unwrap_or(&self.fee_configs[0])
    }

    /// Checks the fee schedule and every fee configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let Some(first) = self.fee_configs.first() else {
            return Err(ConfigError::invalid("fee_configs", "at least one fee config is required"));
        };
        if first.start_height != 0 {
            return Err(ConfigError::invalid(
                "fee_configs",
                "the first fee config must start at height 0",
            ));
        }
        for pair in self.fee_configs.windows(2) {
            if pair[1].start_height <= pair[0].start_height {
                return Err(ConfigError::invalid(
                    "fee_configs",
                    format!(
                        "start heights must increase, got {} after {}",
                        pair[1].start_height, pair[0].start_height
                    ),
                ));
            }
        }
        for cfg in &self.fee_configs {
            cfg.validate()?;
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loading chain config");
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_chain_id() {
        let mut config = ChainConfig::for_network(NetworkType::TestNet);
        assert_eq!(config.effective_chain_id(), NetworkType::TestNet.chain_id());
        config.chain_id = Some(42);
        assert_eq!(config.effective_chain_id(), 42);
    }

    #[test]
    fn test_fee_by_height() {
        let mut config = ChainConfig::default();
        config.fee_configs.push(FeeConfig {
            start_height: 100,
            max_tx_gas: 7,
            ..FeeConfig::default()
        });
        assert!(config.validate().is_ok());
        assert_eq!(config.fee(0).start_height, 0);
        assert_eq!(config.fee(99).start_height, 0);
        assert_eq!(config.fee(100).max_tx_gas, 7);
        assert_eq!(config.fee(u64::MAX).max_tx_gas, 7);
    }

    #[test]
    fn test_unsorted_fee_configs_rejected() {
        let mut config = ChainConfig::default();
        config.fee_configs.push(FeeConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = ChainConfig::from_toml_str(
            r#"
            network = "local"

            [[fee_configs]]
            start_height = 0
            threshold_gas = 500
            non_transferable_balance = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.network, NetworkType::Local);
        assert_eq!(config.fee(0).threshold_gas, 500);
        assert_eq!(config.fee(0).non_transferable_balance, 42);
        assert_eq!(config.fee(0).max_tx_gas, 42_000_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.toml");
        std::fs::write(&path, "network = \"testnet\"\n").unwrap();
        let config = ChainConfig::load_from_file(&path).unwrap();
        assert_eq!(config.network, NetworkType::TestNet);
        assert_eq!(config.fee_configs.len(), 1);

        assert!(ChainConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}
