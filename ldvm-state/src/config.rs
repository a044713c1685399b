//! Account, stake and lending settings carried by transactions and stored on
//! accounts.

use ldvm_primitives::{BigUint, Key, Keys, TokenSymbol, TxType};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Withdraw fee bounds of a stake, in parts per million.
pub const MIN_WITHDRAW_FEE: u64 = 1;
pub const MAX_WITHDRAW_FEE: u64 = 200_000;

/// Interest bounds of a lending, in parts per million per day.
pub const MIN_INTEREST: u64 = 1;
pub const MAX_INTEREST: u64 = 10_000;

/// Keeper settings applied when an account is created or updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub threshold: u16,
    pub keepers: Keys,
    pub approver: Option<Key>,
    pub approve_list: Option<Vec<TxType>>,
    /// Total supply of a token account.
    pub amount: Option<BigUint>,
}

impl AccountConfig {
    /// Checks the keeper set and threshold.
    pub fn validate(&self) -> LedgerResult<()> {
        self.keepers.validate()?;
        if usize::from(self.threshold) > self.keepers.len() {
            return Err(LedgerError::invalid_keepers(format!(
                "invalid threshold, expected <= {}, got {}",
                self.keepers.len(),
                self.threshold
            )));
        }
        if let Some(approver) = &self.approver {
            if !approver.is_empty() {
                approver.validate()?;
            }
        }
        if self.approve_list.is_some() && self.approver.is_none() {
            return Err(LedgerError::invalid_keepers("approve list without approver"));
        }
        Ok(())
    }

    /// Token and stake accounts cannot sign for themselves, so they need at
    /// least one keeper.
    pub fn validate_managed(&self) -> LedgerResult<()> {
        self.validate()?;
        if self.threshold == 0 || self.keepers.is_empty() {
            return Err(LedgerError::invalid_keepers(
                "invalid threshold, expected >= 1, got 0",
            ));
        }
        Ok(())
    }
}

/// Kind of stake pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StakeType {
    /// Plain delegation pool.
    Pool,
    /// Validator stake, bounded by the validator stake limits.
    Validator,
}

impl From<StakeType> for u8 {
    fn from(value: StakeType) -> Self {
        match value {
            StakeType::Pool => 0,
            StakeType::Validator => 1,
        }
    }
}

impl TryFrom<u8> for StakeType {
    type Error = LedgerError;

    fn try_from(value: u8) -> LedgerResult<Self> {
        match value {
            0 => Ok(StakeType::Pool),
            1 => Ok(StakeType::Validator),
            other => Err(LedgerError::malformed(
                "stake config",
                format!("unknown stake type {other}"),
            )),
        }
    }
}

/// Settings of a stake account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeConfig {
    pub token: TokenSymbol,
    #[serde(rename = "type")]
    pub stake_type: StakeType,
    /// Unix time before which the stake cannot be reset or destroyed.
    pub lock_time: u64,
    /// Parts per million kept by the stake on every withdrawal.
    pub withdraw_fee: u64,
    pub min_amount: BigUint,
    pub max_amount: BigUint,
}

impl StakeConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if !self.token.is_valid() {
            return Err(LedgerError::malformed(
                "stake config",
                format!("invalid token {}", self.token),
            ));
        }
        if !(MIN_WITHDRAW_FEE..=MAX_WITHDRAW_FEE).contains(&self.withdraw_fee) {
            return Err(LedgerError::malformed(
                "stake config",
                format!(
                    "invalid withdraw fee, expected {MIN_WITHDRAW_FEE}..={MAX_WITHDRAW_FEE}, got {}",
                    self.withdraw_fee
                ),
            ));
        }
        if self.min_amount.is_zero() {
            return Err(LedgerError::malformed(
                "stake config",
                "invalid min amount, expected > 0",
            ));
        }
        if self.min_amount > self.max_amount {
            return Err(LedgerError::malformed(
                "stake config",
                format!(
                    "invalid max amount, expected >= {}, got {}",
                    self.min_amount, self.max_amount
                ),
            ));
        }
        Ok(())
    }
}

/// Settings of an open lending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LendingConfig {
    pub token: TokenSymbol,
    /// Parts per million per day while the loan is current.
    pub daily_interest: u64,
    /// Parts per million per day after the due time.
    pub overdue_interest: u64,
    pub min_amount: BigUint,
    pub max_amount: BigUint,
}

impl LendingConfig {
    pub fn validate(&self) -> LedgerResult<()> {
        if !self.token.is_valid() {
            return Err(LedgerError::malformed(
                "lending config",
                format!("invalid token {}", self.token),
            ));
        }
        for (name, rate) in [
            ("daily interest", self.daily_interest),
            ("overdue interest", self.overdue_interest),
        ] {
            if !(MIN_INTEREST..=MAX_INTEREST).contains(&rate) {
                return Err(LedgerError::malformed(
                    "lending config",
                    format!("invalid {name}, expected {MIN_INTEREST}..={MAX_INTEREST}, got {rate}"),
                ));
            }
        }
        if self.min_amount.is_zero() || self.min_amount > self.max_amount {
            return Err(LedgerError::malformed(
                "lending config",
                format!(
                    "invalid amount range {}..={}",
                    self.min_amount, self.max_amount
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::Address;

    fn stake_config() -> StakeConfig {
        StakeConfig {
            token: TokenSymbol::NATIVE,
            stake_type: StakeType::Pool,
            lock_time: 0,
            withdraw_fee: 10_000,
            min_amount: BigUint::from(10u64),
            max_amount: BigUint::from(1_000_000u64),
        }
    }

    #[test]
    fn test_stake_config_bounds() {
        assert!(stake_config().validate().is_ok());
        let mut cfg = stake_config();
        cfg.withdraw_fee = 0;
        assert!(cfg.validate().is_err());
        cfg.withdraw_fee = 200_001;
        assert!(cfg.validate().is_err());
        cfg.withdraw_fee = 200_000;
        cfg.max_amount = BigUint::from(9u64);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_stake_type_wire_form() {
        let bytes = serde_cbor::to_vec(&StakeType::Validator).unwrap();
        assert_eq!(bytes, vec![0x01]);
        assert!(serde_cbor::from_slice::<StakeType>(&[0x02]).is_err());
    }

    #[test]
    fn test_lending_config_bounds() {
        let mut cfg = LendingConfig {
            token: TokenSymbol::NATIVE,
            daily_interest: 10,
            overdue_interest: 100,
            min_amount: BigUint::from(1u64),
            max_amount: BigUint::from(100u64),
        };
        assert!(cfg.validate().is_ok());
        cfg.overdue_interest = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_account_config_threshold() {
        let key = Key::from(Address::new([1u8; 20]));
        let mut cfg = AccountConfig {
            threshold: 2,
            keepers: Keys::new(vec![key]),
            ..AccountConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.threshold = 1;
        assert!(cfg.validate_managed().is_ok());
        cfg.threshold = 0;
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_managed().is_err());
    }
}
