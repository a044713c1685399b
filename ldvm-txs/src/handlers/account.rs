//! Nonce table and keeper administration.

use ldvm_primitives::{BigUint, MAX_NONCES_PER_GROUP};
use num_traits::Zero;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, NonceTableUpdate, TxAccounter};
use crate::tx::TxHandler;

/// Registers nonces in the sender's nonce table. Groups that expired
/// before the block time are retired first.
#[derive(Debug, Clone)]
pub struct AddNonceTable {
    base: TxBase,
    update: NonceTableUpdate,
}

impl AddNonceTable {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let update = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, update })
    }
}

impl TxHandler for AddNonceTable {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        let count = self.update.nonces.len();
        if count == 0 || count > MAX_NONCES_PER_GROUP {
            return Err(base.malformed(format!(
                "expected 1..={MAX_NONCES_PER_GROUP} nonces, got {count}"
            )));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let mut probe = ctx.load_account(&base.from())?.read().clone();
        probe.retire_nonce_table(ctx.timestamp());
        probe
            .check_nonce_table(self.update.expire, &self.update.nonces)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.from())?;
        let mut sender = handle.write();
        sender.retire_nonce_table(ctx.timestamp());
        sender
            .add_nonce_table(self.update.expire, &self.update.nonces)
            .map_err(base.ledger())
    }
}

/// Replaces keepers, threshold, approver or approve list of the sender.
#[derive(Debug, Clone)]
pub struct UpdateAccountInfo {
    base: TxBase,
    info: TxAccounter,
}

impl UpdateAccountInfo {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let info = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, info })
    }

    fn apply(&self, account: &mut ldvm_state::Account) -> TxResult<()> {
        let info = &self.info;
        account
            .update_keepers(
                info.threshold,
                info.keepers.as_ref(),
                info.approver.as_ref(),
                info.approve_list.as_deref(),
            )
            .map_err(self.base.ledger())
    }
}

impl TxHandler for UpdateAccountInfo {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        let info = &self.info;
        if info.amount.is_some() || info.stake.is_some() {
            return Err(base.malformed("invalid account info, unexpected amount or stake"));
        }
        if info.is_empty() {
            return Err(base.malformed("nothing to update"));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let mut probe = ctx.load_account(&base.from())?.read().clone();
        self.apply(&mut probe)
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.from())?;
        let mut sender = handle.write();
        self.apply(&mut sender)
    }
}
