//! Lending: open, close, borrow and repay.

use ldvm_primitives::{BigUint, TokenSymbol};
use ldvm_state::LendingConfig;
use num_traits::Zero;
use tracing::debug;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, TxBorrow};
use crate::tx::TxHandler;

/// Opens lending on the sender's account.
#[derive(Debug, Clone)]
pub struct OpenLending {
    base: TxBase,
    config: LendingConfig,
}

impl OpenLending {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let config = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, config })
    }
}

impl TxHandler for OpenLending {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        self.config.validate().map_err(base.ledger())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let mut probe = ctx.load_account(&base.from())?.read().clone();
        probe.open_lending(&self.config).map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.from())?;
        let mut sender = handle.write();
        sender.open_lending(&self.config).map_err(base.ledger())
    }
}

/// Closes the sender's lending once every loan is repaid.
#[derive(Debug, Clone)]
pub struct CloseLending {
    base: TxBase,
}

impl CloseLending {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for CloseLending {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_data()?;
        base.forbid_ex_signers()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let mut probe = ctx.load_account(&base.from())?.read().clone();
        probe.close_lending().map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.from())?;
        let mut sender = handle.write();
        sender.close_lending().map_err(base.ledger())
    }
}

/// Takes a loan offered and signed by the lender at `to`, consuming one
/// nonce of the lender's nonce table.
#[derive(Debug, Clone)]
pub struct Borrow {
    base: TxBase,
    offer: TxBorrow,
}

impl Borrow {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let offer = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, offer })
    }
}

impl TxHandler for Borrow {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let lender = base.require_to()?;
        base.require_amount()?;
        base.require_ex_signers()?;
        let offer = &self.offer;
        if offer.from != lender || offer.to != base.from() {
            return Err(base.malformed("invalid lender or borrower, does not match the offer"));
        }
        if offer.token.unwrap_or(TokenSymbol::NATIVE) != base.token() {
            return Err(base.malformed("invalid token, does not match the offer"));
        }
        if offer.amount != *base.amount() {
            return Err(base.malformed(format!(
                "invalid amount, expected {}, got {}",
                offer.amount,
                base.amount()
            )));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let handle = ctx.load_account(&self.offer.from)?;
        let lender = handle.read();
        if !lender.satisfy_signing(base.ex_signers()) {
            return Err(base.rejected("invalid exSignatures for lender"));
        }
        lender
            .check_nonce_table_entry(self.offer.expire, self.offer.nonce)
            .map_err(base.ledger())?;
        lender
            .check_borrow(&base.token(), &base.from(), base.amount(), self.offer.due_time)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        {
            let handle = ctx.load_account(&self.offer.from)?;
            let mut lender = handle.write();
            lender
                .sub_by_nonce_table(&base.token(), self.offer.expire, self.offer.nonce, &BigUint::zero())
                .map_err(base.ledger())?;
            lender
                .borrow(&base.token(), base.from(), base.amount(), self.offer.due_time)
                .map_err(base.ledger())?;
        }
        base.credit(ctx, &base.from(), &base.token(), base.amount())?;
        debug!(tx = %base.id(), lender = %self.offer.from, amount = %base.amount(), "borrowed");
        Ok(())
    }
}

/// Repays up to `amount` to the lender at `to`. Only what is owed is
/// debited.
#[derive(Debug, Clone)]
pub struct Repay {
    base: TxBase,
}

impl Repay {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for Repay {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.require_to()?;
        base.require_amount()?;
        base.forbid_data()?;
        base.forbid_ex_signers()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        let actual = {
            let handle = ctx.load_account(&base.require_to()?)?;
            let lender = handle.read();
            lender
                .check_repay(&base.token(), &base.from(), base.amount())
                .map_err(base.ledger())?
        };
        base.verify_base(ctx, &actual).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let actual = {
            let handle = ctx.load_account(&base.require_to()?)?;
            let mut lender = handle.write();
            lender
                .repay(&base.token(), base.from(), base.amount())
                .map_err(base.ledger())?
        };
        let handle = ctx.load_account(&base.from())?;
        let mut sender = handle.write();
        sender.sub(&base.token(), &actual).map_err(base.ledger())
    }
}
