//! Stake lifecycle and delegation.

use ldvm_primitives::{from_canonical_slice, BigUint, StakeSymbol};
use ldvm_state::{Account, AccountConfig, StakeConfig, StakeType};
use num_traits::Zero;
use tracing::{debug, info};

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, StakeApproverUpdate, TxAccounter};
use crate::tx::TxHandler;

/// Largest pool balance a stake may hold: its own limit, further bounded by
/// the validator stake limit for validator stakes.
fn stake_cap(stake: &Account, max_validator_stake: u64) -> BigUint {
    match &stake.stake {
        Some(cfg) if cfg.stake_type == StakeType::Validator => {
            cfg.max_amount.clone().min(BigUint::from(max_validator_stake))
        }
        Some(cfg) => cfg.max_amount.clone(),
        None => BigUint::zero(),
    }
}

/// Activates the stake account at `to`, held by the sender. `amount` is the
/// native pledge, recorded as the holder's stake entry.
#[derive(Debug, Clone)]
pub struct CreateStake {
    base: TxBase,
    config: AccountConfig,
    stake: StakeConfig,
}

impl CreateStake {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let info: TxAccounter = decode_payload(base.tx_type(), base.data())?;
        let Some(stake) = info.stake.clone() else {
            return Err(base.malformed("missing stake config"));
        };
        Ok(Self {
            config: info.account_config(),
            stake,
            base,
        })
    }
}

impl TxHandler for CreateStake {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.require_amount()?;
        base.forbid_token()?;
        base.forbid_ex_signers()?;
        if StakeSymbol::from_address(&to).is_none() {
            return Err(base.malformed(format!("invalid stake account {to}")));
        }
        if self.config.amount.is_some() {
            return Err(base.malformed("invalid stake config, unexpected amount"));
        }
        self.config.validate_managed().map_err(base.ledger())?;
        self.stake.validate().map_err(base.ledger())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        let fee = ctx.fee_config();
        let min_pledge = match self.stake.stake_type {
            StakeType::Validator => fee.min_stake_pledge.max(fee.min_validator_stake),
            StakeType::Pool => fee.min_stake_pledge,
        };
        if *base.amount() < BigUint::from(min_pledge) {
            return Err(base.rejected(format!(
                "{} need pledge {min_pledge}, got {}",
                base.require_to()?,
                base.amount()
            )));
        }
        base.verify_base(ctx, base.amount())?;
        let handle = ctx.load_account(&base.require_to()?)?;
        let stake = handle.read();
        stake
            .check_create_stake(&self.config, &self.stake)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, true)?;
        let to = base.require_to()?;
        let handle = ctx.load_account(&to)?;
        handle
            .write()
            .create_stake(base.from(), base.amount(), &self.config, &self.stake)
            .map_err(base.ledger())?;
        info!(stake = %to, holder = %base.from(), "stake created");
        Ok(())
    }
}

/// Replaces the settings of the sending stake account.
#[derive(Debug, Clone)]
pub struct ResetStake {
    base: TxBase,
    stake: StakeConfig,
}

impl ResetStake {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let stake = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, stake })
    }
}

impl TxHandler for ResetStake {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        self.stake.validate().map_err(base.ledger())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let handle = ctx.load_account(&base.from())?;
        let stake = handle.read();
        stake.check_reset_stake(&self.stake).map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.from())?;
        let mut stake = handle.write();
        stake.reset_stake(&self.stake).map_err(base.ledger())
    }
}

/// Destroys the sending stake account once only its holder remains,
/// paying every balance to `to`.
#[derive(Debug, Clone)]
pub struct DestroyStake {
    base: TxBase,
}

impl DestroyStake {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for DestroyStake {
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
        let recipient = base.require_to()?;
        if !ctx.account_exists(&recipient)? {
            return Err(base.rejected(format!("recipient {recipient} does not exist")));
        }
        let handle = ctx.load_account(&base.from())?;
        let stake = handle.read();
        stake.check_destroy_stake().map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let mut refund = Account::new(base.require_to()?);
        {
            let handle = ctx.load_account(&base.from())?;
            handle
                .write()
                .destroy_stake(&mut refund)
                .map_err(base.ledger())?;
        }
        base.pay_refund(ctx, &refund)?;
        info!(stake = %base.from(), recipient = %refund.address, refund = %refund.balance, "stake destroyed");
        Ok(())
    }
}

/// Delegates `amount` to the stake at `to`, countersigned by its keepers.
/// The payload optionally carries a lock time (CBOR `u64`).
#[derive(Debug, Clone)]
pub struct TakeStake {
    base: TxBase,
    lock_time: u64,
}

impl TakeStake {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let lock_time = if base.data().is_empty() {
            0
        } else {
            from_canonical_slice(base.data())
                .map_err(|err| base.malformed(format!("invalid lock time: {err}")))?
        };
        Ok(Self { base, lock_time })
    }
}

impl TxHandler for TakeStake {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.require_amount()?;
        base.require_ex_signers()?;
        if StakeSymbol::from_address(&to).is_none() {
            return Err(base.malformed(format!("invalid stake account {to}")));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, base.amount())?;
        let handle = ctx.load_account(&base.require_to()?)?;
        let stake = handle.read();
        if !stake.satisfy_signing(base.ex_signers()) {
            return Err(base.rejected("invalid exSignatures for stake keepers"));
        }
        let cap = stake_cap(&stake, ctx.fee_config().max_validator_stake);
        stake
            .check_take_stake(&base.token(), &base.from(), base.amount(), &cap)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        {
            let handle = ctx.load_account(&base.from())?;
            handle
                .write()
                .sub(&base.token(), base.amount())
                .map_err(base.ledger())?;
        }
        let handle = ctx.load_account(&base.require_to()?)?;
        let mut stake = handle.write();
        let cap = stake_cap(&stake, ctx.fee_config().max_validator_stake);
        stake
            .take_stake(&base.token(), base.from(), base.amount(), self.lock_time, &cap)
            .map_err(base.ledger())?;
        debug!(stake = %stake.address, delegator = %base.from(), amount = %base.amount(), "stake taken");
        Ok(())
    }
}

/// Withdraws `amount` of the sender's stake at `to`, net of the withdraw
/// fee.
#[derive(Debug, Clone)]
pub struct WithdrawStake {
    base: TxBase,
}

impl WithdrawStake {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for WithdrawStake {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.require_amount()?;
        base.forbid_data()?;
        base.forbid_ex_signers()?;
        if StakeSymbol::from_address(&to).is_none() {
            return Err(base.malformed(format!("invalid stake account {to}")));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let handle = ctx.load_account(&base.require_to()?)?;
        let stake = handle.read();
        stake
            .check_withdraw_stake(&base.token(), &base.from(), base.signers(), base.amount())
            .map(|_| ())
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let payout = {
            let handle = ctx.load_account(&base.require_to()?)?;
            let mut stake = handle.write();
            stake
                .withdraw_stake(&base.token(), base.from(), base.signers(), base.amount())
                .map_err(base.ledger())?
        };
        base.credit(ctx, &base.from(), &base.token(), &payout)
    }
}

/// Sets or clears the approver guarding the sender's stake entry at `to`.
#[derive(Debug, Clone)]
pub struct UpdateStakeApprover {
    base: TxBase,
    update: StakeApproverUpdate,
}

impl UpdateStakeApprover {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let update = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, update })
    }
}

impl TxHandler for UpdateStakeApprover {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        if StakeSymbol::from_address(&to).is_none() {
            return Err(base.malformed(format!("invalid stake account {to}")));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let mut probe = ctx.load_account(&base.require_to()?)?.read().clone();
        probe
            .update_stake_approver(&base.from(), self.update.approver.as_ref(), base.signers())
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let handle = ctx.load_account(&base.require_to()?)?;
        let mut stake = handle.write();
        stake
            .update_stake_approver(&base.from(), self.update.approver.as_ref(), base.signers())
            .map_err(base.ledger())
    }
}
