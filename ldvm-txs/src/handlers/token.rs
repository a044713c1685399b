//! Token creation and destruction.

use ldvm_primitives::{BigUint, TokenSymbol};
use ldvm_state::{Account, AccountConfig};
use num_traits::Zero;
use tracing::info;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, TxAccounter};
use crate::tx::TxHandler;

/// Activates the token account at `to`. The sender funds its native pledge
/// with `amount`; the total supply is minted to the token account.
#[derive(Debug, Clone)]
pub struct CreateToken {
    base: TxBase,
    config: AccountConfig,
}

impl CreateToken {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let info: TxAccounter = decode_payload(base.tx_type(), base.data())?;
        if info.stake.is_some() {
            return Err(base.malformed("invalid token config, unexpected stake"));
        }
        Ok(Self {
            config: info.account_config(),
            base,
        })
    }
}

impl TxHandler for CreateToken {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.require_amount()?;
        base.forbid_token()?;
        base.forbid_ex_signers()?;
        match TokenSymbol::from_address(&to) {
            Some(symbol) if !symbol.is_native() => {}
            _ => return Err(base.malformed(format!("invalid token account {to}"))),
        }
        self.config.validate_managed().map_err(base.ledger())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        let pledge = BigUint::from(ctx.fee_config().min_token_pledge);
        if *base.amount() < pledge {
            return Err(base.rejected(format!(
                "{} need pledge {pledge}, got {}",
                base.require_to()?,
                base.amount()
            )));
        }
        base.verify_base(ctx, base.amount())?;
        let token = ctx.load_account(&base.require_to()?)?;
        let token = token.read();
        token.check_create_token(&self.config).map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, true)?;
        let to = base.require_to()?;
        let handle = ctx.load_account(&to)?;
        handle
            .write()
            .create_token(&self.config)
            .map_err(base.ledger())?;
        info!(token = %to, creator = %base.from(), "token created");
        Ok(())
    }
}

/// Destroys the sending token account once all its supply is back, paying
/// its native balance to `to`.
#[derive(Debug, Clone)]
pub struct DestroyToken {
    base: TxBase,
}

impl DestroyToken {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for DestroyToken {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.require_to()?;
        base.forbid_amount()?;
        base.forbid_token()?;
        base.forbid_data()?;
        base.forbid_ex_signers()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let handle = ctx.load_account(&base.from())?;
        let sender = handle.read();
        sender.check_destroy_token().map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let mut refund = Account::new(base.require_to()?);
        {
            let handle = ctx.load_account(&base.from())?;
            handle
                .write()
                .destroy_token(&mut refund)
                .map_err(base.ledger())?;
        }
        base.pay_refund(ctx, &refund)?;
        info!(token = %base.from(), recipient = %refund.address, refund = %refund.balance, "token destroyed");
        Ok(())
    }
}
