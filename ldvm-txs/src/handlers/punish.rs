//! Punishment of data records by the keepers of the native token account.

use ldvm_primitives::{Address, BigUint};
use ldvm_state::DataInfo;
use num_traits::Zero;
use tracing::warn;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::handlers::data::{delete_record, load_live};
use crate::payload::{decode_payload, DataRef};
use crate::tx::TxHandler;

/// Deletes a data record. The signatures must satisfy the keepers of the
/// native token account; the sender only pays the fees.
#[derive(Debug, Clone)]
pub struct Punish {
    base: TxBase,
    target: DataRef,
}

impl Punish {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let target = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, target })
    }

    fn check(&self, ctx: &dyn BlockContext) -> TxResult<DataInfo> {
        let base = &self.base;
        {
            let handle = ctx.load_account(&Address::NATIVE_TOKEN)?;
            let authority = handle.read();
            if authority.keepers.is_empty() || !authority.satisfy_signing(base.signers()) {
                return Err(base.rejected("punishment need native token keepers signing"));
            }
        }
        load_live(base, ctx, &self.target.id, self.target.version)
    }
}

impl TxHandler for Punish {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, &BigUint::zero())?;
        self.check(ctx).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.accept_base(ctx, false)?;
        let data = self.check(ctx)?;
        warn!(data = %data.id, by = %self.base.from(), "data punished");
        delete_record(&self.base, ctx, &data)
    }
}
