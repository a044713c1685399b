//! Models: named schemas that data records are validated against.

use ldvm_primitives::{
    from_canonical_slice, sha3_256, to_canonical_vec, Key, Keys, ModelId, MAX_KEEPERS,
};
use ldvm_store::{Prefix, Record};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::name::NameRecord;

const MAX_MODEL_NAME_LEN: usize = 64;

/// How payloads of a model are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ModelKind {
    /// Opaque bytes.
    Raw,
    /// Any well-formed canonical CBOR value.
    Cbor,
    /// Any JSON document.
    Json,
    /// [`NameRecord`] payloads, indexed by name.
    NameService,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::Raw,
        ModelKind::Cbor,
        ModelKind::Json,
        ModelKind::NameService,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Raw => "RawModel",
            ModelKind::Cbor => "CBORModel",
            ModelKind::Json => "JSONModel",
            ModelKind::NameService => "NameService",
        }
    }

    /// Checks `payload` against the model kind.
    pub fn validate_payload(self, payload: &[u8]) -> LedgerResult<()> {
        match self {
            ModelKind::Raw => Ok(()),
            ModelKind::Cbor => from_canonical_slice::<serde_cbor::Value>(payload)
                .map(|_| ())
                .map_err(|err| LedgerError::malformed("CBOR payload", err.to_string())),
            ModelKind::Json => serde_json::from_slice::<serde_json::Value>(payload)
                .map(|_| ())
                .map_err(|err| LedgerError::malformed("JSON payload", err.to_string())),
            ModelKind::NameService => NameRecord::from_payload(payload).map(|_| ()),
        }
    }
}

impl From<ModelKind> for u8 {
    fn from(value: ModelKind) -> Self {
        match value {
            ModelKind::Raw => 0,
            ModelKind::Cbor => 1,
            ModelKind::Json => 2,
            ModelKind::NameService => 3,
        }
    }
}

impl TryFrom<u8> for ModelKind {
    type Error = LedgerError;

    fn try_from(value: u8) -> LedgerResult<Self> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| u8::from(*kind) == value)
            .ok_or_else(|| LedgerError::malformed("model", format!("unknown model kind {value}")))
    }
}

/// A model record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: ModelKind,
    pub threshold: u16,
    pub keepers: Keys,
    pub approver: Option<Key>,
    #[serde(with = "serde_bytes")]
    pub schema: Vec<u8>,
    /// Assigned on creation.
    pub id: ModelId,
}

impl Record for ModelInfo {
    const PREFIX: Prefix = Prefix::Model;
}

impl ModelInfo {
    /// The built-in model of `kind`, keeperless and at a fixed id.
    #[must_use]
    pub fn builtin(kind: ModelKind) -> Self {
        let name = kind.name().to_string();
        let id = ModelId::from_tx_id(&sha3_256(format!("LDVM:{name}").as_bytes()));
        Self {
            name,
            kind,
            threshold: 0,
            keepers: Keys::default(),
            approver: None,
            schema: Vec::new(),
            id,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.name.is_empty()
            || self.name.len() > MAX_MODEL_NAME_LEN
            || !self.name.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(LedgerError::malformed(
                "model",
                format!("invalid name {:?}", self.name),
            ));
        }
        self.keepers.validate()?;
        if self.keepers.len() > MAX_KEEPERS || usize::from(self.threshold) > self.keepers.len() {
            return Err(LedgerError::invalid_keepers(format!(
                "invalid threshold, expected <= {}, got {}",
                self.keepers.len(),
                self.threshold
            )));
        }
        if self.threshold == 0 && !self.keepers.is_empty() {
            return Err(LedgerError::invalid_keepers(
                "invalid threshold, expected >= 1, got 0",
            ));
        }
        Ok(())
    }

    /// Keeperless models can never be updated.
    #[must_use]
    pub fn satisfy_signing(&self, signers: &Keys) -> bool {
        self.threshold > 0 && self.keepers.count_signed(signers) >= usize::from(self.threshold)
    }

    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> LedgerResult<Self> {
        let model: ModelInfo = from_canonical_slice(data)
            .map_err(|err| LedgerError::corrupted("model", err.to_string()))?;
        model.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::Address;

    #[test]
    fn test_builtin_models() {
        let ids: Vec<ModelId> = ModelKind::ALL
            .iter()
            .map(|kind| ModelInfo::builtin(*kind).id)
            .collect();
        for (i, id) in ids.iter().enumerate() {
            assert!(!ids[i + 1..].contains(id));
        }
        let json = ModelInfo::builtin(ModelKind::Json);
        json.validate().unwrap();
        assert!(!json.satisfy_signing(&Keys::default()));
    }

    #[test]
    fn test_validate_payload() {
        assert!(ModelKind::Raw.validate_payload(&[0xff]).is_ok());
        assert!(ModelKind::Json.validate_payload(br#"{"a":1}"#).is_ok());
        assert!(ModelKind::Json.validate_payload(b"{").is_err());
        let cbor = serde_cbor::to_vec(&vec![1u8, 2]).unwrap();
        assert!(ModelKind::Cbor.validate_payload(&cbor).is_ok());
        assert!(ModelKind::Cbor.validate_payload(&[0x18, 0x01]).is_err());
        assert!(ModelKind::NameService.validate_payload(&cbor).is_err());
    }

    #[test]
    fn test_model_round_trip() {
        let model = ModelInfo {
            name: "Profile".into(),
            kind: ModelKind::Json,
            threshold: 1,
            keepers: Keys::new(vec![Key::from(Address::new([3u8; 20]))]),
            approver: None,
            schema: b"type Profile struct {}".to_vec(),
            id: ModelId::new([4u8; 20]),
        };
        let bytes = model.to_bytes().unwrap();
        assert_eq!(ModelInfo::from_bytes(&bytes).unwrap(), model);
        assert!(model.satisfy_signing(&Keys::new(vec![Key::from(Address::new([3u8; 20]))])));
    }
}
