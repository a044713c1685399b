//! Kind-specific payloads carried in [`TxData::data`](crate::TxData::data).

use ldvm_primitives::{
    from_canonical_slice, to_canonical_vec, Address, BigUint, DataId, Key, Keys, ModelId,
    PrimitiveResult, TokenSymbol, TxType,
};
use ldvm_state::{AccountConfig, StakeConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{TxError, TxResult};

/// Decodes the canonical payload of a `tx_type` transaction.
pub fn decode_payload<T>(tx_type: TxType, data: &[u8]) -> TxResult<T>
where
    T: Serialize + DeserializeOwned,
{
    if data.is_empty() {
        return Err(TxError::malformed(tx_type, "missing payload"));
    }
    from_canonical_slice(data)
        .map_err(|err| TxError::malformed(tx_type, format!("invalid payload: {err}")))
}

/// Encodes a payload for [`TxData::data`](crate::TxData::data).
pub fn encode_payload<T: Serialize>(payload: &T) -> PrimitiveResult<Vec<u8>> {
    to_canonical_vec(payload)
}

/// An invoice (`TransferPay`) or a check (`TransferCash`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxTransfer {
    /// Nonce-table entry of the issuer consumed when cashed.
    pub nonce: u64,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub token: Option<TokenSymbol>,
    pub amount: BigUint,
    /// Invoice expiry, or nonce-table group of a check.
    pub expire: u64,
    pub memo: Option<String>,
}

/// One recipient of a `TransferMultiple`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub to: Address,
    pub amount: BigUint,
}

/// Sale offer of a token account, taken by an `Exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxExchanger {
    pub nonce: u64,
    /// Seller account.
    pub from: Address,
    /// Token sold.
    pub sell: TokenSymbol,
    /// Token the seller accepts as payment.
    pub receive: TokenSymbol,
    /// Largest amount of `sell` one exchange may buy.
    pub quota: BigUint,
    /// Smallest amount of `sell` one exchange may buy.
    pub minimum: BigUint,
    /// Units of `receive` per whole `sell` unit (10^9 base units).
    pub price: BigUint,
    /// Nonce-table group of the offer.
    pub expire: u64,
}

/// Loan offer of a lender, taken by a `Borrow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBorrow {
    pub nonce: u64,
    /// Lender.
    pub from: Address,
    /// Borrower.
    pub to: Address,
    pub token: Option<TokenSymbol>,
    pub amount: BigUint,
    /// Nonce-table group of the offer.
    pub expire: u64,
    /// Loan due time, zero for none.
    pub due_time: u64,
}

/// `AddNonceTable` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceTableUpdate {
    pub expire: u64,
    pub nonces: Vec<u64>,
}

/// Account settings for `UpdateAccountInfo`, `CreateToken` and
/// `CreateStake`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxAccounter {
    pub threshold: Option<u16>,
    pub keepers: Option<Keys>,
    pub approver: Option<Key>,
    pub approve_list: Option<Vec<TxType>>,
    /// Total supply of a new token.
    pub amount: Option<BigUint>,
    /// Settings of a new stake.
    pub stake: Option<StakeConfig>,
}

impl TxAccounter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threshold.is_none()
            && self.keepers.is_none()
            && self.approver.is_none()
            && self.approve_list.is_none()
            && self.amount.is_none()
            && self.stake.is_none()
    }

    /// Keeper settings of a new token or stake account.
    #[must_use]
    pub fn account_config(&self) -> AccountConfig {
        AccountConfig {
            threshold: self.threshold.unwrap_or_default(),
            keepers: self.keepers.clone().unwrap_or_default(),
            approver: self.approver.clone(),
            approve_list: self.approve_list.clone(),
            amount: self.amount.clone(),
        }
    }
}

/// `UpdateStakeApprover` payload. `None` clears the approver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeApproverUpdate {
    pub approver: Option<Key>,
}

/// `UpdateModelInfo` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfoUpdate {
    pub id: ModelId,
    pub threshold: Option<u16>,
    pub keepers: Option<Keys>,
    pub approver: Option<Key>,
}

/// `UpdateData` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUpdate {
    pub id: DataId,
    /// Version being replaced.
    pub version: u64,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

/// `UpdateDataInfo` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfoUpdate {
    pub id: DataId,
    pub version: u64,
    pub threshold: Option<u16>,
    pub keepers: Option<Keys>,
    pub approver: Option<Key>,
    pub approve_list: Option<Vec<TxType>>,
}

/// `DeleteData` and `Punish` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRef {
    pub id: DataId,
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_payload() {
        let update = NonceTableUpdate {
            expire: 100,
            nonces: vec![1, 2, 3],
        };
        let bytes = encode_payload(&update).unwrap();
        let decoded: NonceTableUpdate = decode_payload(TxType::AddNonceTable, &bytes).unwrap();
        assert_eq!(decoded, update);

        let err = decode_payload::<NonceTableUpdate>(TxType::AddNonceTable, &[])
            .unwrap_err()
            .to_string();
        assert_eq!(err, "TypeAddNonceTable: missing payload");
        assert!(decode_payload::<NonceTableUpdate>(TxType::AddNonceTable, &bytes[1..]).is_err());
    }

    #[test]
    fn test_accounter_config() {
        let accounter = TxAccounter {
            threshold: Some(1),
            amount: Some(BigUint::from(5u64)),
            ..TxAccounter::default()
        };
        assert!(!accounter.is_empty());
        let cfg = accounter.account_config();
        assert_eq!(cfg.threshold, 1);
        assert!(cfg.keepers.is_empty());
        assert_eq!(cfg.amount, Some(BigUint::from(5u64)));
        assert!(TxAccounter::default().is_empty());
    }
}
