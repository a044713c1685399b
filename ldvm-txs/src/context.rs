//! The state a transaction executes against.

use std::sync::Arc;

use ldvm_config::FeeConfig;
use ldvm_primitives::{Address, DataId, ModelId};
use ldvm_state::{Account, DataInfo, ModelInfo};
use parking_lot::RwLock;

use crate::error::TxResult;

/// Shared handle to a cached account. Handlers lock one account at a time.
pub type AccountHandle = Arc<RwLock<Account>>;

/// Block-scoped view of the ledger.
///
/// Implemented by the block state. Loaded accounts are initialised for the
/// executing block (pledge, height, timestamp) with their ledger attached;
/// writes stay in the block's overlay until it is accepted.
pub trait BlockContext {
    fn chain_id(&self) -> u64;

    fn height(&self) -> u64;

    /// Unix seconds of the executing block.
    fn timestamp(&self) -> u64;

    /// Gas price of the executing block, nano-LDC per gas.
    fn gas_price(&self) -> u64;

    /// Receiver of transaction tips.
    fn miner(&self) -> Address;

    fn fee_config(&self) -> &FeeConfig;

    /// Loads the account at `address`, creating an empty one if needed.
    fn load_account(&self, address: &Address) -> TxResult<AccountHandle>;

    /// True when `address` is persisted or holds state in this block.
    fn account_exists(&self, address: &Address) -> TxResult<bool>;

    fn load_model(&self, id: &ModelId) -> TxResult<Option<ModelInfo>>;

    fn save_model(&self, model: &ModelInfo) -> TxResult<()>;

    fn load_data(&self, id: &DataId) -> TxResult<Option<DataInfo>>;

    fn save_data(&self, data: &DataInfo) -> TxResult<()>;

    /// Keeps a superseded version under the previous-data prefix.
    fn save_prev_data(&self, data: &DataInfo) -> TxResult<()>;

    /// Data record registered under a name-service name.
    fn load_name(&self, name: &str) -> TxResult<Option<DataId>>;

    fn save_name(&self, name: &str, id: &DataId) -> TxResult<()>;

    fn delete_name(&self, name: &str) -> TxResult<()>;
}
