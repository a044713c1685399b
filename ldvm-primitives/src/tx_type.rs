//! Transaction type tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PrimitiveError, PrimitiveResult};

/// Tag of a transaction kind. The wire form is the `u16` discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(u16)]
pub enum TxType {
    // transfer family
    Transfer = 0,
    TransferPay = 1,
    TransferCash = 2,
    TransferMultiple = 3,
    Exchange = 4,

    // account administration
    AddNonceTable = 16,
    UpdateAccountInfo = 17,
    CreateToken = 18,
    DestroyToken = 19,
    CreateStake = 20,
    ResetStake = 21,
    DestroyStake = 22,
    TakeStake = 23,
    WithdrawStake = 24,
    UpdateStakeApprover = 25,
    OpenLending = 26,
    CloseLending = 27,
    Borrow = 28,
    Repay = 29,

    // models and data
    CreateModel = 32,
    UpdateModelInfo = 33,
    CreateData = 34,
    UpdateData = 35,
    UpdateDataInfo = 36,
    DeleteData = 37,

    Punish = 48,
}

impl TxType {
    /// Every kind, in tag order.
    pub const ALL: [TxType; 26] = [
        TxType::Transfer,
        TxType::TransferPay,
        TxType::TransferCash,
        TxType::TransferMultiple,
        TxType::Exchange,
        TxType::AddNonceTable,
        TxType::UpdateAccountInfo,
        TxType::CreateToken,
        TxType::DestroyToken,
        TxType::CreateStake,
        TxType::ResetStake,
        TxType::DestroyStake,
        TxType::TakeStake,
        TxType::WithdrawStake,
        TxType::UpdateStakeApprover,
        TxType::OpenLending,
        TxType::CloseLending,
        TxType::Borrow,
        TxType::Repay,
        TxType::CreateModel,
        TxType::UpdateModelInfo,
        TxType::CreateData,
        TxType::UpdateData,
        TxType::UpdateDataInfo,
        TxType::DeleteData,
        TxType::Punish,
    ];

    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| *ty as u16 == value)
    }

    /// Base gas charged before the per-byte surcharge.
    #[must_use]
    pub fn base_gas(self) -> u64 {
        match self {
            TxType::Transfer
            | TxType::TransferPay
            | TxType::TransferCash
            | TxType::TransferMultiple
            | TxType::Exchange
            | TxType::Borrow
            | TxType::Repay
            | TxType::Punish => 42,
            TxType::CreateModel => 500,
            TxType::CreateData
            | TxType::UpdateData
            | TxType::UpdateDataInfo
            | TxType::DeleteData
            | TxType::UpdateModelInfo => 100,
            TxType::AddNonceTable
            | TxType::UpdateAccountInfo
            | TxType::CreateToken
            | TxType::DestroyToken
            | TxType::CreateStake
            | TxType::ResetStake
            | TxType::DestroyStake
            | TxType::TakeStake
            | TxType::WithdrawStake
            | TxType::UpdateStakeApprover
            | TxType::OpenLending
            | TxType::CloseLending => 1000,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TxType::Transfer => "TypeTransfer",
            TxType::TransferPay => "TypeTransferPay",
            TxType::TransferCash => "TypeTransferCash",
            TxType::TransferMultiple => "TypeTransferMultiple",
            TxType::Exchange => "TypeExchange",
            TxType::AddNonceTable => "TypeAddNonceTable",
            TxType::UpdateAccountInfo => "TypeUpdateAccountInfo",
            TxType::CreateToken => "TypeCreateToken",
            TxType::DestroyToken => "TypeDestroyToken",
            TxType::CreateStake => "TypeCreateStake",
            TxType::ResetStake => "TypeResetStake",
            TxType::DestroyStake => "TypeDestroyStake",
            TxType::TakeStake => "TypeTakeStake",
            TxType::WithdrawStake => "TypeWithdrawStake",
            TxType::UpdateStakeApprover => "TypeUpdateStakeApprover",
            TxType::OpenLending => "TypeOpenLending",
            TxType::CloseLending => "TypeCloseLending",
            TxType::Borrow => "TypeBorrow",
            TxType::Repay => "TypeRepay",
            TxType::CreateModel => "TypeCreateModel",
            TxType::UpdateModelInfo => "TypeUpdateModelInfo",
            TxType::CreateData => "TypeCreateData",
            TxType::UpdateData => "TypeUpdateData",
            TxType::UpdateDataInfo => "TypeUpdateDataInfo",
            TxType::DeleteData => "TypeDeleteData",
            TxType::Punish => "TypePunish",
        }
    }
}

impl From<TxType> for u16 {
    fn from(value: TxType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for TxType {
    type Error = PrimitiveError;

    fn try_from(value: u16) -> PrimitiveResult<Self> {
        Self::from_u16(value)
            .ok_or_else(|| PrimitiveError::invalid_format(format!("unknown tx type {value}")))
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for ty in TxType::ALL {
            assert_eq!(TxType::from_u16(ty as u16), Some(ty));
        }
        assert_eq!(TxType::from_u16(999), None);
        assert!(TxType::try_from(5u16).is_err());
    }

    #[test]
    fn test_all_is_sorted_and_unique() {
        for pair in TxType::ALL.windows(2) {
            assert!((pair[0] as u16) < (pair[1] as u16));
        }
    }

    #[test]
    fn test_base_gas() {
        assert_eq!(TxType::Transfer.base_gas(), 42);
        assert_eq!(TxType::CreateToken.base_gas(), 1000);
        assert_eq!(TxType::CreateModel.base_gas(), 500);
        assert_eq!(TxType::UpdateData.base_gas(), 100);
    }

    #[test]
    fn test_serde_as_number() {
        let bytes = serde_cbor::to_vec(&TxType::CreateData).unwrap();
        assert_eq!(bytes, serde_cbor::to_vec(&34u16).unwrap());
        let back: TxType = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(back, TxType::CreateData);
        assert_eq!(TxType::CreateData.to_string(), "TypeCreateData");
    }
}
