//! Node configuration file.

use std::path::Path;

use anyhow::Context;
use ldvm_chain::Genesis;
use ldvm_config::ChainConfig;
use ldvm_txpool::TxPoolConfig;
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;

/// Everything a node reads at startup, one TOML document.
///
/// ```toml
/// [chain]
/// network = "local"
///
/// [txpool]
/// max_entries = 10000
///
/// [genesis]
/// timestamp = 1700000000
/// alloc = [{ address = "0x0101010101010101010101010101010101010101", balance = 1000000000 }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network and fee schedule
    #[serde(default)]
    pub chain: ChainConfig,

    /// Transaction pool limits
    #[serde(default)]
    pub txpool: TxPoolConfig,

    /// Initial state, used only when the store is empty
    #[serde(default)]
    pub genesis: Genesis,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl NodeConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content).context("invalid node config")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Checks every section.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.chain.validate()?;
        if self.txpool.max_entries == 0 {
            anyhow::bail!("txpool.max_entries must be positive");
        }
        if usize::from(self.genesis.native_threshold) > self.genesis.native_keepers.len() {
            anyhow::bail!(
                "genesis.native_threshold {} exceeds {} keepers",
                self.genesis.native_threshold,
                self.genesis.native_keepers.len()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_config::NetworkType;
    use ldvm_primitives::Address;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = NodeConfig::from_toml_str(
            r#"
            [chain]
            network = "local"
            chain_id = 42

            [txpool]
            max_entries = 10

            [genesis]
            timestamp = 1700000000
            native_keepers = ["0x0202020202020202020202020202020202020202"]
            native_threshold = 1
            alloc = [{ address = "0x0101010101010101010101010101010101010101", balance = 7 }]

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.chain.network, NetworkType::Local);
        assert_eq!(config.chain.effective_chain_id(), 42);
        assert_eq!(config.txpool.max_entries, 10);
        assert_eq!(config.genesis.alloc[0].address, Address::new([1; 20]));
        assert_eq!(config.genesis.alloc[0].balance, 7);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_invalid_documents() {
        assert!(NodeConfig::from_toml_str("[txpool]\nmax_entries = 0\n").is_err());
        assert!(NodeConfig::from_toml_str("[genesis]\nnative_threshold = 1\n").is_err());
        assert!(NodeConfig::from_toml_str("chain = 1").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "[chain]\nnetwork = \"testnet\"\n").unwrap();
        let config = NodeConfig::load(&path).unwrap();
        assert_eq!(config.chain.network, NetworkType::TestNet);

        let err = NodeConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
