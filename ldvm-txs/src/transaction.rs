//! Wire form of transactions and block entries.

use ldvm_primitives::{
    from_canonical_slice, sha3_256, to_canonical_vec, Address, BigUint, Hash256, LocalSigner,
    PrimitiveResult, Signature, TokenSymbol, TxType,
};
use serde::{Deserialize, Serialize};

use crate::error::{TxError, TxResult};

/// Unsigned transaction body. Signatures cover its canonical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxData {
    /// Raw type tag; unknown tags decode and fail in the pipeline.
    pub tx_type: u16,
    pub chain_id: u64,
    pub nonce: u64,
    /// Tip per gas offered to the block builder, nano-LDC.
    pub gas_tip: u64,
    /// Maximum gas price plus tip the sender accepts, nano-LDC.
    pub gas_fee_cap: u64,
    pub from: Address,
    pub to: Option<Address>,
    /// Native token when absent.
    pub token: Option<TokenSymbol>,
    pub amount: Option<BigUint>,
    /// Kind-specific payload, canonical CBOR unless noted.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl TxData {
    pub fn unsigned_bytes(&self) -> PrimitiveResult<Vec<u8>> {
        to_canonical_vec(self)
    }

    /// Token moved by the transaction.
    #[must_use]
    pub fn token(&self) -> TokenSymbol {
        self.token.unwrap_or(TokenSymbol::NATIVE)
    }
}

/// A signed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx: TxData,
    pub signatures: Vec<Signature>,
    /// Counter-signatures of a second party (payee, issuer, seller, stake
    /// keepers or lender, depending on the kind).
    pub ex_signatures: Option<Vec<Signature>>,
}

impl Transaction {
    #[must_use]
    pub fn new(tx: TxData) -> Self {
        Self {
            tx,
            signatures: Vec::new(),
            ex_signatures: None,
        }
    }

    /// Appends the sender-side signature of `signer`.
    pub fn sign(&mut self, signer: &LocalSigner) -> PrimitiveResult<()> {
        let message = self.tx.unsigned_bytes()?;
        self.signatures.push(signer.sign(&message)?);
        Ok(())
    }

    /// Appends a counter-signature of `signer` over [`ex_message`](Self::ex_message).
    pub fn sign_ex(&mut self, signer: &LocalSigner) -> PrimitiveResult<()> {
        let message = self.ex_message()?;
        let signature = signer.sign(&message)?;
        self.ex_signatures.get_or_insert_with(Vec::new).push(signature);
        Ok(())
    }

    /// Message covered by counter-signatures: the whole unsigned body for a
    /// stake delegation, the payload alone for offers signed before the
    /// transaction exists.
    pub fn ex_message(&self) -> PrimitiveResult<Vec<u8>> {
        if self.tx.tx_type == u16::from(TxType::TakeStake) {
            self.tx.unsigned_bytes()
        } else {
            Ok(self.tx.data.clone())
        }
    }

    pub fn to_bytes(&self) -> PrimitiveResult<Vec<u8>> {
        to_canonical_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> PrimitiveResult<Self> {
        from_canonical_slice(data)
    }

    pub fn id(&self) -> PrimitiveResult<Hash256> {
        Ok(sha3_256(&self.to_bytes()?))
    }
}

/// One entry of a block body: a transaction or an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxEntry {
    Tx(Transaction),
    Batch(Vec<Transaction>),
}

impl TxEntry {
    pub fn to_bytes(&self) -> PrimitiveResult<Vec<u8>> {
        to_canonical_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> TxResult<Self> {
        from_canonical_slice(data).map_err(TxError::from)
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        match self {
            TxEntry::Tx(tx) => std::slice::from_ref(tx),
            TxEntry::Batch(txs) => txs,
        }
    }
}
