//! Envelope checks and fee handling shared by every transaction kind.

use ldvm_primitives::{sha3_256, Address, BigUint, Hash256, Keys, SignerRecovery, TokenSymbol, TxType};
use ldvm_state::{Account, AccountKind};
use num_traits::Zero;
use tracing::trace;

use crate::context::BlockContext;
use crate::error::{ledger_error, TxError, TxResult};
use crate::transaction::Transaction;

/// Fees of a transaction at the executing block's gas price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fees {
    /// Paid to the block miner.
    pub tip: BigUint,
    /// Burned into the native token account.
    pub fee: BigUint,
    /// `tip + fee`, debited from the sender.
    pub cost: BigUint,
}

/// Kinds a token account may send.
const TOKEN_SENDER_TYPES: &[TxType] = &[
    TxType::Transfer,
    TxType::UpdateAccountInfo,
    TxType::DestroyToken,
    TxType::OpenLending,
    TxType::CloseLending,
];

/// Kinds a stake account may send.
const STAKE_SENDER_TYPES: &[TxType] = &[
    TxType::UpdateAccountInfo,
    TxType::TakeStake,
    TxType::WithdrawStake,
    TxType::ResetStake,
    TxType::DestroyStake,
    TxType::OpenLending,
    TxType::CloseLending,
];

/// Whether an account of `kind` may send `tx_type`.
#[must_use]
pub fn sender_allowed(kind: AccountKind, tx_type: TxType) -> bool {
    match kind {
        AccountKind::Native => true,
        AccountKind::Token => TOKEN_SENDER_TYPES.contains(&tx_type),
        AccountKind::Stake => STAKE_SENDER_TYPES.contains(&tx_type),
    }
}

/// Kinds that change who controls the sender and need one extra signature.
fn needs_signing_plus(tx_type: TxType) -> bool {
    matches!(
        tx_type,
        TxType::UpdateAccountInfo | TxType::DestroyToken | TxType::ResetStake | TxType::DestroyStake
    )
}

/// A decoded transaction with its signers recovered.
#[derive(Debug, Clone)]
pub struct TxBase {
    raw: Transaction,
    tx_type: TxType,
    id: Hash256,
    size: u64,
    gas: u64,
    token: TokenSymbol,
    amount: BigUint,
    signers: Keys,
    ex_signers: Keys,
}

impl TxBase {
    /// Decodes the envelope: type tag, field shape and signatures.
    pub fn new(raw: Transaction, recovery: &dyn SignerRecovery) -> TxResult<Self> {
        let tx_type = TxType::from_u16(raw.tx.tx_type).ok_or(TxError::UnknownTxType(raw.tx.tx_type))?;
        let malformed = |message: String| TxError::malformed(tx_type, message);

        if raw.signatures.is_empty() {
            return Err(malformed("missing signatures".into()));
        }
        if raw.tx.to == Some(raw.tx.from) {
            return Err(malformed(format!("invalid to, should not be {}", raw.tx.from)));
        }
        if raw.tx.amount.is_some() && raw.tx.to.is_none() {
            return Err(malformed("amount without recipient".into()));
        }
        let token = raw.tx.token();
        if !token.is_valid() {
            return Err(malformed(format!("invalid token {token}")));
        }

        let bytes = raw.to_bytes()?;
        let size = bytes.len() as u64;
        let signers = recovery.derive_signers(&raw.tx.unsigned_bytes()?, &raw.signatures)?;
        let ex_signers = match &raw.ex_signatures {
            None => Keys::default(),
            Some(sigs) if sigs.is_empty() => return Err(malformed("empty exSignatures".into())),
            Some(sigs) => recovery.derive_signers(&raw.ex_message()?, sigs)?,
        };
        Ok(Self {
            amount: raw.tx.amount.clone().unwrap_or_default(),
            id: sha3_256(&bytes),
            gas: tx_type.base_gas().saturating_add(size),
            raw,
            tx_type,
            size,
            token,
            signers,
            ex_signers,
        })
    }

    #[must_use]
    pub fn raw(&self) -> &Transaction {
        &self.raw
    }

    #[must_use]
    pub fn tx_type(&self) -> TxType {
        self.tx_type
    }

    #[must_use]
    pub fn id(&self) -> Hash256 {
        self.id
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn gas(&self) -> u64 {
        self.gas
    }

    /// Tip per byte, scaled by 1000.
    #[must_use]
    pub fn priority(&self) -> u64 {
        self.raw
            .tx
            .gas_tip
            .saturating_mul(self.gas)
            .saturating_mul(1000)
            / self.size.max(1)
    }

    #[must_use]
    pub fn from(&self) -> Address {
        self.raw.tx.from
    }

    #[must_use]
    pub fn to(&self) -> Option<Address> {
        self.raw.tx.to
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.raw.tx.nonce
    }

    #[must_use]
    pub fn token(&self) -> TokenSymbol {
        self.token
    }

    /// Zero when absent.
    #[must_use]
    pub fn amount(&self) -> &BigUint {
        &self.amount
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.raw.tx.data
    }

    #[must_use]
    pub fn signers(&self) -> &Keys {
        &self.signers
    }

    #[must_use]
    pub fn ex_signers(&self) -> &Keys {
        &self.ex_signers
    }

    pub(crate) fn malformed<S: Into<String>>(&self, message: S) -> TxError {
        TxError::malformed(self.tx_type, message)
    }

    pub(crate) fn rejected<S: Into<String>>(&self, message: S) -> TxError {
        TxError::rejected(self.tx_type, message)
    }

    pub(crate) fn ledger(&self) -> impl Fn(ldvm_state::LedgerError) -> TxError {
        ledger_error(self.tx_type)
    }

    // ---------------------------------------------------------------------
    // shape helpers
    // ---------------------------------------------------------------------

    pub(crate) fn require_to(&self) -> TxResult<Address> {
        self.to().ok_or_else(|| self.malformed("missing recipient"))
    }

    pub(crate) fn forbid_to(&self) -> TxResult<()> {
        match self.to() {
            Some(to) => Err(self.malformed(format!("invalid to, expected none, got {to}"))),
            None => Ok(()),
        }
    }

    pub(crate) fn require_amount(&self) -> TxResult<()> {
        if self.amount.is_zero() {
            return Err(self.malformed("invalid amount, expected > 0"));
        }
        Ok(())
    }

    pub(crate) fn forbid_amount(&self) -> TxResult<()> {
        if self.raw.tx.amount.is_some() {
            return Err(self.malformed("invalid amount, expected none"));
        }
        Ok(())
    }

    pub(crate) fn forbid_token(&self) -> TxResult<()> {
        if !self.token.is_native() {
            return Err(self.malformed(format!("invalid token, expected none, got {}", self.token)));
        }
        Ok(())
    }

    pub(crate) fn forbid_data(&self) -> TxResult<()> {
        if !self.data().is_empty() {
            return Err(self.malformed("invalid data, expected empty"));
        }
        Ok(())
    }

    pub(crate) fn require_ex_signers(&self) -> TxResult<()> {
        if self.ex_signers.is_empty() {
            return Err(self.malformed("missing exSignatures"));
        }
        Ok(())
    }

    pub(crate) fn forbid_ex_signers(&self) -> TxResult<()> {
        if self.raw.ex_signatures.is_some() {
            return Err(self.malformed("invalid exSignatures, expected none"));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // verify / accept
    // ---------------------------------------------------------------------

    /// Fees at the block gas price. The fee cap must cover the price; the
    /// tip is capped by what the fee cap leaves.
    pub fn fees(&self, gas_price: u64) -> TxResult<Fees> {
        let tx = &self.raw.tx;
        if tx.gas_fee_cap < gas_price {
            return Err(self.rejected(format!(
                "invalid gasFeeCap, expected >= {gas_price}, got {}",
                tx.gas_fee_cap
            )));
        }
        let tip_rate = tx.gas_tip.min(tx.gas_fee_cap - gas_price);
        let gas = BigUint::from(self.gas);
        let tip = &gas * tip_rate;
        let fee = &gas * gas_price;
        let cost = &tip + &fee;
        Ok(Fees { tip, fee, cost })
    }

    /// Checks the parts every kind shares: chain, gas, sender kind,
    /// signatures, approver, nonce, and that the sender can pay the cost
    /// plus `debit` of the transaction token.
    pub fn verify_base(&self, ctx: &dyn BlockContext, debit: &BigUint) -> TxResult<Fees> {
        if self.raw.tx.chain_id != ctx.chain_id() {
            return Err(self.malformed(format!(
                "invalid chainID, expected {}, got {}",
                ctx.chain_id(),
                self.raw.tx.chain_id
            )));
        }
        let max_gas = ctx.fee_config().max_tx_gas;
        if self.gas > max_gas {
            return Err(self.malformed(format!(
                "gas too large, expected <= {max_gas}, got {}",
                self.gas
            )));
        }
        let fees = self.fees(ctx.gas_price())?;

        let handle = ctx.load_account(&self.from())?;
        let sender = handle.read();
        self.check_sender(&sender)?;
        sender.check_nonce(self.nonce()).map_err(self.ledger())?;
        if self.token.is_native() {
            sender
                .check_balance(&TokenSymbol::NATIVE, &(&fees.cost + debit), true)
                .map_err(self.ledger())?;
        } else {
            sender
                .check_balance(&TokenSymbol::NATIVE, &fees.cost, true)
                .map_err(self.ledger())?;
            sender
                .check_balance(&self.token, debit, false)
                .map_err(self.ledger())?;
        }
        Ok(fees)
    }

    fn check_sender(&self, sender: &Account) -> TxResult<()> {
        if !sender_allowed(sender.kind, self.tx_type) {
            return Err(self.rejected(format!(
                "{} can not send {}",
                sender.kind, self.tx_type
            )));
        }
        let signed = if needs_signing_plus(self.tx_type) {
            sender.satisfy_signing_plus(&self.signers)
        } else {
            sender.satisfy_signing(&self.signers)
        };
        if !signed {
            return Err(self.rejected(format!("{} need more signatures", self.from())));
        }
        if sender.need_approve(self.tx_type) {
            let approved = sender
                .approver
                .as_ref()
                .is_some_and(|approver| self.signers.has(approver));
            if !approved {
                return Err(self.rejected(format!("{} need approver signing", self.from())));
            }
        }
        Ok(())
    }

    /// Debits the cost and advances the sender nonce, moves `amount` to the
    /// recipient when `move_amount` is set, then pays the tip to the miner
    /// and the fee to the native token account.
    pub fn accept_base(&self, ctx: &dyn BlockContext, move_amount: bool) -> TxResult<Fees> {
        let fees = self.fees(ctx.gas_price())?;
        {
            let handle = ctx.load_account(&self.from())?;
            let mut sender = handle.write();
            sender
                .sub_by_nonce(&TokenSymbol::NATIVE, self.nonce(), &fees.cost)
                .map_err(self.ledger())?;
            if move_amount {
                sender.sub(&self.token, &self.amount).map_err(self.ledger())?;
            }
        }
        if move_amount {
            let to = self.require_to()?;
            self.credit(ctx, &to, &self.token, &self.amount)?;
        }
        self.credit(ctx, &ctx.miner(), &TokenSymbol::NATIVE, &fees.tip)?;
        self.credit(ctx, &Address::NATIVE_TOKEN, &TokenSymbol::NATIVE, &fees.fee)?;
        trace!(tx = %self.id, tip = %fees.tip, fee = %fees.fee, "fees charged");
        Ok(fees)
    }

    /// Credits `amount` unless it is zero.
    pub(crate) fn credit(
        &self,
        ctx: &dyn BlockContext,
        address: &Address,
        token: &TokenSymbol,
        amount: &BigUint,
    ) -> TxResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let handle = ctx.load_account(address)?;
        let mut account = handle.write();
        account.add(token, amount).map_err(self.ledger())
    }

    /// Pays every balance collected in `refund` to its address.
    pub(crate) fn pay_refund(&self, ctx: &dyn BlockContext, refund: &Account) -> TxResult<()> {
        self.credit(ctx, &refund.address, &TokenSymbol::NATIVE, &refund.balance)?;
        for (token, amount) in &refund.tokens {
            self.credit(ctx, &refund.address, token, amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TxData;
    use ldvm_primitives::{DefaultRecovery, LocalSigner};

    fn base(tx: TxData, signer: &LocalSigner) -> TxResult<TxBase> {
        let mut raw = Transaction::new(tx);
        raw.sign(signer).unwrap();
        TxBase::new(raw, &DefaultRecovery)
    }

    fn transfer(signer: &LocalSigner) -> TxData {
        TxData {
            tx_type: u16::from(TxType::Transfer),
            chain_id: 2357,
            gas_tip: 100,
            gas_fee_cap: 1000,
            from: signer.address(),
            to: Some(Address::new([2u8; 20])),
            amount: Some(BigUint::from(10u64)),
            ..TxData::default()
        }
    }

    #[test]
    fn test_envelope_shape() {
        let signer = LocalSigner::random_ed25519();
        let tx = base(transfer(&signer), &signer).unwrap();
        assert_eq!(tx.tx_type(), TxType::Transfer);
        assert!(tx.signers().has(&signer.key()));
        assert_eq!(tx.gas(), 42 + tx.size());
        assert_eq!(tx.priority(), 100 * tx.gas() * 1000 / tx.size());

        let mut unknown = transfer(&signer);
        unknown.tx_type = 99;
        assert!(matches!(base(unknown, &signer), Err(TxError::UnknownTxType(99))));

        let mut self_transfer = transfer(&signer);
        self_transfer.to = Some(signer.address());
        assert!(base(self_transfer, &signer).is_err());

        let mut no_to = transfer(&signer);
        no_to.to = None;
        assert!(base(no_to, &signer).is_err());

        let unsigned = Transaction::new(transfer(&signer));
        assert!(TxBase::new(unsigned, &DefaultRecovery).is_err());
    }

    #[test]
    fn test_fees() {
        let signer = LocalSigner::random_secp256k1();
        let tx = base(transfer(&signer), &signer).unwrap();
        let gas = BigUint::from(tx.gas());

        let fees = tx.fees(500).unwrap();
        assert_eq!(fees.fee, &gas * 500u64);
        assert_eq!(fees.tip, &gas * 100u64);
        assert_eq!(fees.cost, &gas * 600u64);

        // the fee cap leaves 50 per gas for the tip
        let fees = tx.fees(950).unwrap();
        assert_eq!(fees.tip, &gas * 50u64);

        assert_eq!(tx.fees(1001).unwrap_err().class(), ldvm_primitives::ErrorClass::SemanticRejection);
    }

    #[test]
    fn test_sender_legality() {
        assert!(sender_allowed(AccountKind::Native, TxType::Punish));
        assert!(sender_allowed(AccountKind::Token, TxType::Transfer));
        assert!(!sender_allowed(AccountKind::Token, TxType::TransferPay));
        assert!(sender_allowed(AccountKind::Stake, TxType::WithdrawStake));
        assert!(!sender_allowed(AccountKind::Stake, TxType::Transfer));
    }
}
