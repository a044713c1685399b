//! Data records: create, update, update info, delete.

use ldvm_primitives::{BigUint, DataId, Keys};
use ldvm_state::{DataInfo, ModelInfo, ModelKind, NameRecord};
use num_traits::Zero;
use tracing::{debug, info};

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::handlers::model::load_model;
use crate::payload::{decode_payload, DataInfoUpdate, DataRef, DataUpdate};
use crate::tx::TxHandler;

/// Validates `payload` against `model`, returning the registered name of a
/// name-service record.
fn check_payload(base: &TxBase, model: &ModelInfo, payload: &[u8]) -> TxResult<Option<String>> {
    model.kind.validate_payload(payload).map_err(base.ledger())?;
    if model.kind == ModelKind::NameService {
        let record = NameRecord::from_payload(payload).map_err(base.ledger())?;
        return Ok(Some(record.name));
    }
    Ok(None)
}

/// Loads a live record at `version`.
pub(crate) fn load_live(
    base: &TxBase,
    ctx: &dyn BlockContext,
    id: &DataId,
    version: u64,
) -> TxResult<DataInfo> {
    let data = ctx
        .load_data(id)?
        .ok_or_else(|| base.rejected(format!("data {id} not found")))?;
    data.check_live().map_err(base.ledger())?;
    data.check_version(version).map_err(base.ledger())?;
    Ok(data)
}

/// Keeper and approver checks for changing a record.
fn check_data_signing(base: &TxBase, data: &DataInfo, signers: &Keys, plus: bool) -> TxResult<()> {
    let signed = if plus {
        data.satisfy_signing_plus(signers)
    } else {
        data.satisfy_signing(signers)
    };
    if !signed {
        return Err(base.rejected(format!("data {} need more signatures", data.id)));
    }
    if data.need_approve(base.tx_type()) {
        let approved = data
            .approver
            .as_ref()
            .is_some_and(|approver| signers.has(approver));
        if !approved {
            return Err(base.rejected(format!("data {} need approver signing", data.id)));
        }
    }
    Ok(())
}

/// Marks `data` deleted under a new version, keeps the old version, and
/// frees its name.
pub(crate) fn delete_record(base: &TxBase, ctx: &dyn BlockContext, data: &DataInfo) -> TxResult<()> {
    let model = load_model(base, ctx, &data.model_id)?;
    if model.kind == ModelKind::NameService {
        let record = NameRecord::from_payload(&data.payload).map_err(base.ledger())?;
        ctx.delete_name(&record.name)?;
    }
    ctx.save_prev_data(data)?;
    let mut deleted = data.clone();
    deleted.version += 1;
    deleted.deleted = true;
    deleted.payload.clear();
    ctx.save_data(&deleted)?;
    info!(data = %data.id, tx_type = %base.tx_type(), "data deleted");
    Ok(())
}

/// Creates a record under an existing model. Its id is derived from the
/// transaction id; name-service records also claim their name.
#[derive(Debug, Clone)]
pub struct CreateData {
    base: TxBase,
    data: DataInfo,
}

impl CreateData {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let data = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, data })
    }

    fn check(&self, ctx: &dyn BlockContext) -> TxResult<Option<String>> {
        let base = &self.base;
        let model = load_model(base, ctx, &self.data.model_id)?;
        if let Some(approver) = &model.approver {
            if !base.signers().has(approver) {
                return Err(base.rejected(format!("model {} need approver signing", model.id)));
            }
        }
        let name = check_payload(base, &model, &self.data.payload)?;
        if let Some(name) = &name {
            if let Some(owner) = ctx.load_name(name)? {
                return Err(base.rejected(format!("name {name:?} is registered by {owner}")));
            }
        }
        Ok(name)
    }
}

impl TxHandler for CreateData {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        let data = &self.data;
        if !data.id.is_zero() || data.version != 1 || data.deleted {
            return Err(base.malformed("invalid data, expected zero id, version 1, not deleted"));
        }
        data.validate().map_err(base.ledger())?;
        if !data.satisfy_signing(base.signers()) {
            return Err(base.malformed("data keepers did not sign"));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, &BigUint::zero())?;
        self.check(ctx).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        let name = self.check(ctx)?;
        let mut data = self.data.clone();
        data.id = DataId::from_tx_id(&base.id());
        if ctx.load_data(&data.id)?.is_some() {
            return Err(base.rejected(format!("data {} exists", data.id)));
        }
        ctx.save_data(&data)?;
        if let Some(name) = name {
            ctx.save_name(&name, &data.id)?;
        }
        debug!(data = %data.id, model = %data.model_id, "data created");
        Ok(())
    }
}

/// Replaces the payload of a record, keeping the previous version.
#[derive(Debug, Clone)]
pub struct UpdateData {
    base: TxBase,
    update: DataUpdate,
}

impl UpdateData {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let update = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, update })
    }

    fn check(&self, ctx: &dyn BlockContext) -> TxResult<DataInfo> {
        let base = &self.base;
        let data = load_live(base, ctx, &self.update.id, self.update.version)?;
        check_data_signing(base, &data, base.signers(), false)?;
        let model = load_model(base, ctx, &data.model_id)?;
        let name = check_payload(base, &model, &self.update.payload)?;
        if let Some(name) = name {
            let current = NameRecord::from_payload(&data.payload).map_err(base.ledger())?;
            if current.name != name {
                return Err(base.rejected(format!(
                    "name can not change, expected {:?}, got {name:?}",
                    current.name
                )));
            }
        }
        Ok(data)
    }
}

impl TxHandler for UpdateData {
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
        ctx.save_prev_data(&data)?;
        let mut next = data;
        next.version += 1;
        next.payload = self.update.payload.clone();
        ctx.save_data(&next)?;
        debug!(data = %next.id, version = next.version, "data updated");
        Ok(())
    }
}

/// Replaces keepers, threshold or approver of a record.
#[derive(Debug, Clone)]
pub struct UpdateDataInfo {
    base: TxBase,
    update: DataInfoUpdate,
}

impl UpdateDataInfo {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let update = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, update })
    }

    /// Returns the current record and its updated successor.
    fn updated(&self, ctx: &dyn BlockContext) -> TxResult<(DataInfo, DataInfo)> {
        let base = &self.base;
        let update = &self.update;
        let data = load_live(base, ctx, &update.id, update.version)?;
        check_data_signing(base, &data, base.signers(), true)?;
        let mut next = data.clone();
        next.version += 1;
        if let Some(threshold) = update.threshold {
            next.threshold = threshold;
        }
        if let Some(keepers) = &update.keepers {
            next.keepers = keepers.clone();
        }
        match &update.approver {
            Some(approver) if approver.is_empty() => {
                next.approver = None;
                next.approve_list = None;
            }
            Some(approver) => next.approver = Some(approver.clone()),
            None => {}
        }
        if let Some(list) = &update.approve_list {
            next.approve_list = Some(list.clone());
        }
        next.validate().map_err(base.ledger())?;
        Ok((data, next))
    }
}

impl TxHandler for UpdateDataInfo {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        let update = &self.update;
        if update.threshold.is_none()
            && update.keepers.is_none()
            && update.approver.is_none()
            && update.approve_list.is_none()
        {
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
        let (data, next) = self.updated(ctx)?;
        ctx.save_prev_data(&data)?;
        ctx.save_data(&next)
    }
}

/// Deletes a record on behalf of its keepers.
#[derive(Debug, Clone)]
pub struct DeleteData {
    base: TxBase,
    target: DataRef,
}

impl DeleteData {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let target = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, target })
    }

    fn check(&self, ctx: &dyn BlockContext) -> TxResult<DataInfo> {
        let base = &self.base;
        let data = load_live(base, ctx, &self.target.id, self.target.version)?;
        check_data_signing(base, &data, base.signers(), true)?;
        Ok(data)
    }
}

impl TxHandler for DeleteData {
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
        delete_record(&self.base, ctx, &data)
    }
}

