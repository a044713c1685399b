//! Chain network type and identity.

use serde::{Deserialize, Serialize};

/// LDVM network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Public main network
    #[default]
    MainNet,
    /// Public test network
    TestNet,
    /// Private/local network
    Local,
}

impl NetworkType {
    /// Chain id carried by every transaction of the network.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        match self {
            Self::MainNet => 2357,
            Self::TestNet => 23572,
            Self::Local => 2357_0000,
        }
    }
}

impl std::str::FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::MainNet),
            "testnet" | "test" => Ok(Self::TestNet),
            "local" | "private" => Ok(Self::Local),
            other => Err(format!("unknown network {other}")),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainNet => write!(f, "mainnet"),
            Self::TestNet => write!(f, "testnet"),
            Self::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_str() {
        assert_eq!("mainnet".parse::<NetworkType>().ok(), Some(NetworkType::MainNet));
        assert_eq!("TESTNET".parse::<NetworkType>().ok(), Some(NetworkType::TestNet));
        assert_eq!("private".parse::<NetworkType>().ok(), Some(NetworkType::Local));
        assert!("unknown".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_chain_ids_differ() {
        assert_ne!(NetworkType::MainNet.chain_id(), NetworkType::TestNet.chain_id());
        assert_ne!(NetworkType::TestNet.chain_id(), NetworkType::Local.chain_id());
    }
}
