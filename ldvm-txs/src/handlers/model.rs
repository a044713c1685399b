//! Model creation and administration.

use ldvm_primitives::{BigUint, ModelId};
use ldvm_state::ModelInfo;
use num_traits::Zero;
use tracing::info;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, ModelInfoUpdate};
use crate::tx::TxHandler;

/// Loads a model, rejecting unknown ids.
pub(crate) fn load_model(base: &TxBase, ctx: &dyn BlockContext, id: &ModelId) -> TxResult<ModelInfo> {
    ctx.load_model(id)?
        .ok_or_else(|| base.rejected(format!("model {id} not found")))
}

/// Registers a new model. Its id is derived from the transaction id.
#[derive(Debug, Clone)]
pub struct CreateModel {
    base: TxBase,
    model: ModelInfo,
}

impl CreateModel {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let model = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, model })
    }
}

impl TxHandler for CreateModel {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        if !self.model.id.is_zero() {
            return Err(base.malformed("invalid model id, expected zero"));
        }
        self.model.validate().map_err(base.ledger())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, &BigUint::zero()).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let mut model = self.model.clone();
        model.id = ModelId::from_tx_id(&base.id());
        if ctx.load_model(&model.id)?.is_some() {
            return Err(base.rejected(format!("model {} exists", model.id)));
        }
        ctx.save_model(&model)?;
        info!(model = %model.id, name = %model.name, "model created");
        Ok(())
    }
}

/// Replaces threshold, keepers or approver of a model.
#[derive(Debug, Clone)]
pub struct UpdateModelInfo {
    base: TxBase,
    update: ModelInfoUpdate,
}

impl UpdateModelInfo {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let update = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, update })
    }

    /// Loads the model, checks its keepers signed, and returns the updated
    /// copy.
    fn updated(&self, ctx: &dyn BlockContext) -> TxResult<ModelInfo> {
        let base = &self.base;
        let mut model = load_model(base, ctx, &self.update.id)?;
        if !model.satisfy_signing(base.signers()) {
            return Err(base.rejected(format!("model {} need more signatures", model.id)));
        }
        if let Some(approver) = &model.approver {
            if !base.signers().has(approver) {
                return Err(base.rejected(format!("model {} need approver signing", model.id)));
            }
        }
        if let Some(threshold) = self.update.threshold {
            model.threshold = threshold;
        }
        if let Some(keepers) = &self.update.keepers {
            model.keepers = keepers.clone();
        }
        if let Some(approver) = &self.update.approver {
            model.approver = (!approver.is_empty()).then(|| approver.clone());
        }
        model.validate().map_err(base.ledger())?;
        Ok(model)
    }
}

impl TxHandler for UpdateModelInfo {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        let update = &self.update;
        if update.threshold.is_none() && update.keepers.is_none() && update.approver.is_none() {
            return Err(base.malformed("nothing to update"));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, &BigUint::zero())?;
        self.updated(ctx).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.accept_base(ctx, false)?;
        let model = self.updated(ctx)?;
        ctx.save_model(&model)
    }
}
