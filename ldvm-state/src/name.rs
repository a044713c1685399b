//! Name-service records.

use ldvm_primitives::{from_canonical_slice, to_canonical_vec, Address};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Payload of a data record under the name-service model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Lowercase DNS-style name, unique across the chain.
    pub name: String,
    pub linked: Option<Address>,
    pub records: Vec<String>,
}

/// Checks a lowercase DNS-style name: dot separated labels of `a-z`, `0-9`
/// and inner `-`.
pub fn validate_name(name: &str) -> LedgerResult<()> {
    let invalid = |reason: &str| LedgerError::malformed("name", format!("{name:?}: {reason}"));
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid("length out of range"));
    }
    for label in name.split('.') {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(invalid("bad label length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("label starts or ends with '-'"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(invalid("invalid character"));
        }
    }
    Ok(())
}

impl NameRecord {
    pub fn validate(&self) -> LedgerResult<()> {
        validate_name(&self.name)?;
        if self.records.iter().any(String::is_empty) {
            return Err(LedgerError::malformed("name", "empty record"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    /// Decodes and validates a name-service payload.
    pub fn from_payload(payload: &[u8]) -> LedgerResult<Self> {
        let record: NameRecord = from_canonical_slice(payload)
            .map_err(|err| LedgerError::malformed("name record", err.to_string()))?;
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        for ok in ["ldc", "a.b", "my-name.ldc", "x1.y2"] {
            assert!(validate_name(ok).is_ok(), "{ok}");
        }
        for bad in ["", "LDC", "a..b", "-a", "a-", "a_b", "名字", &"a".repeat(64)] {
            assert!(validate_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let record = NameRecord {
            name: "ldc.io".into(),
            linked: Some(Address::new([1u8; 20])),
            records: vec!["txt=hello".into()],
        };
        let bytes = record.to_bytes().unwrap();
        assert_eq!(NameRecord::from_payload(&bytes).unwrap(), record);
        assert!(NameRecord::from_payload(b"not cbor").is_err());
    }
}
