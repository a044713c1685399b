//! Block-scoped ledger state.
//!
//! A [`BlockState`] executes the transactions of one block on top of a
//! [`VersionDb`] overlay. Accounts are cached while the block runs and
//! flushed to the overlay when their canonical bytes changed; each flush
//! also records the content hash in the block's [`StateSnapshot`], whose id
//! is the state root.

use std::collections::HashMap;
use std::sync::Arc;

use ldvm_config::FeeConfig;
use ldvm_primitives::{sha3_256, Address, DataId, Hash256, ModelId};
use ldvm_state::{Account, AccountLedger, DataInfo, ModelInfo};
use ldvm_store::{
    account_key, block_key, data_key, height_key, model_key, name_key, prev_data_key, Prefix,
    Store, VersionDb, LAST_ACCEPTED_KEY,
};
use ldvm_txs::{AccountHandle, BlockContext, TxResult};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::block::Block;
use crate::error::{ChainError, ChainResult};
use crate::snapshot::StateSnapshot;

/// Parameters of the block a state executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEnv {
    pub chain_id: u64,
    pub height: u64,
    pub timestamp: u64,
    pub gas_price: u64,
    pub miner: Address,
    pub fee: FeeConfig,
}

struct CachedAccount {
    handle: AccountHandle,
    /// Canonical bytes as last loaded or flushed
    account_bytes: Vec<u8>,
    ledger_bytes: Option<Vec<u8>>,
}

/// Ledger state of one block, or of one transaction inside it.
pub struct BlockState {
    db: VersionDb,
    env: BlockEnv,
    accounts: RwLock<HashMap<Address, CachedAccount>>,
    snapshot: Mutex<StateSnapshot>,
    root: Mutex<Option<Hash256>>,
}

impl BlockState {
    /// State writing into `db`, a pending version.
    #[must_use]
    pub fn new(db: VersionDb, env: BlockEnv, parent_root: Hash256) -> Self {
        Self {
            db,
            env,
            accounts: RwLock::new(HashMap::new()),
            snapshot: Mutex::new(StateSnapshot::new(parent_root)),
            root: Mutex::new(None),
        }
    }

    /// Read-only state of an accepted block whose writes are in `store`.
    #[must_use]
    pub fn committed(store: Arc<dyn Store>, env: BlockEnv, root: Hash256) -> Self {
        let state = Self::new(VersionDb::new(store), env, Hash256::ZERO);
        *state.root.lock() = Some(root);
        state
    }

    #[must_use]
    pub fn env(&self) -> &BlockEnv {
        &self.env
    }

    #[must_use]
    pub fn db(&self) -> &VersionDb {
        &self.db
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.db.is_committed()
    }

    /// State root set by [`save_block`](Self::save_block).
    #[must_use]
    pub fn root(&self) -> Option<Hash256> {
        *self.root.lock()
    }

    /// Changed objects recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot.lock().clone()
    }

    /// Writes every cached account whose bytes changed since it was loaded
    /// or last flushed. Returns how many objects were written.
    pub fn flush(&self) -> ChainResult<usize> {
        let mut accounts = self.accounts.write();
        let mut snapshot = self.snapshot.lock();
        let mut written = 0;
        for (address, cached) in accounts.iter_mut() {
            let account = cached.handle.read();
            let bytes = account.to_bytes()?;
            if bytes != cached.account_bytes {
                account.validate()?;
                snapshot.accounts.insert(*address, sha3_256(&bytes));
                self.db.put(Prefix::Account, account_key(address), bytes.clone())?;
                cached.account_bytes = bytes;
                written += 1;
            }
            let ledger = account.ledger_bytes()?;
            if ledger != cached.ledger_bytes {
                if let Some(bytes) = &ledger {
                    snapshot.ledgers.insert(*address, sha3_256(bytes));
                    self.db.put(Prefix::Ledger, account_key(address), bytes.clone())?;
                    written += 1;
                }
                cached.ledger_bytes = ledger;
            }
        }
        if written > 0 {
            trace!(height = self.env.height, written, "accounts flushed");
        }
        Ok(written)
    }

    /// Child state for one transaction of this block. The child reads
    /// everything written here; its writes reach this state only through
    /// [`absorb`](Self::absorb).
    pub fn derive_state(&self) -> ChainResult<BlockState> {
        self.flush()?;
        let parent = self.snapshot.lock().parent;
        Ok(Self::new(self.db.child(), self.env.clone(), parent))
    }

    /// State of a new block on top of this one. When this block is still
    /// pending the child reads through its uncommitted writes.
    pub fn derive_block(&self, env: BlockEnv) -> ChainResult<BlockState> {
        self.flush()?;
        let parent_root = match self.root() {
            Some(root) => root,
            None => self.snapshot.lock().id()?,
        };
        let db = if self.db.is_committed() {
            VersionDb::new(Arc::clone(self.db.base())).child()
        } else {
            self.db.child()
        };
        debug!(parent_height = self.env.height, height = env.height, "block state derived");
        Ok(Self::new(db, env, parent_root))
    }

    /// Moves the writes of a state made by [`derive_state`](Self::derive_state)
    /// into this one.
    pub fn absorb(&self, child: BlockState) -> ChainResult<()> {
        child.flush()?;
        self.db.absorb(&child.db)?;
        self.snapshot.lock().merge(child.snapshot.into_inner());
        // cached copies of accounts the child touched are stale now
        let mut accounts = self.accounts.write();
        for address in child.accounts.into_inner().keys() {
            accounts.remove(address);
        }
        Ok(())
    }

    /// Flushes the cache and returns the state root.
    pub fn state_root(&self) -> ChainResult<Hash256> {
        self.flush()?;
        Ok(self.snapshot.lock().id()?)
    }

    /// Persists `block` into this state. The block must carry the state
    /// root of this state, and no other block may be stored at its height.
    pub fn save_block(&self, block: &Block) -> ChainResult<Hash256> {
        if block.height != self.env.height {
            return Err(ChainError::InvalidHeight {
                expected: self.env.height,
                actual: block.height,
            });
        }
        let root = self.state_root()?;
        if block.state != root {
            return Err(ChainError::StateRootMismatch {
                expected: block.state,
                actual: root,
            });
        }
        let key = height_key(block.height);
        if self.db.has(Prefix::Height, &key)? {
            return Err(ChainError::HeightTaken(block.height));
        }

        let bytes = block.to_bytes()?;
        let id = sha3_256(&bytes);
        self.db.put(Prefix::Block, block_key(&id), bytes)?;
        self.db.put(Prefix::Height, key, id.to_vec())?;
        self.db.put(Prefix::Meta, LAST_ACCEPTED_KEY.to_vec(), id.to_vec())?;
        *self.root.lock() = Some(root);
        debug!(height = block.height, %id, state = %root, "block saved");
        Ok(id)
    }

    /// Flushes the writes to the store. Committing again is a no-op.
    pub fn commit(&self) -> ChainResult<()> {
        if self.db.is_committed() {
            return Ok(());
        }
        self.flush()?;
        self.db.commit()?;
        info!(height = self.env.height, "block state committed");
        Ok(())
    }

    /// Drops every write of this state.
    pub fn discard(&self) -> ChainResult<()> {
        self.accounts.write().clear();
        self.db.discard()?;
        debug!(height = self.env.height, "block state discarded");
        Ok(())
    }

    /// Clone of the cached or stored account at `address`.
    pub fn account(&self, address: &Address) -> ChainResult<Account> {
        let handle = self.load_account(address)?;
        let account = handle.read().clone();
        Ok(account)
    }
}

impl BlockContext for BlockState {
    fn chain_id(&self) -> u64 {
        self.env.chain_id
    }

    fn height(&self) -> u64 {
        self.env.height
    }

    fn timestamp(&self) -> u64 {
        self.env.timestamp
    }

    fn gas_price(&self) -> u64 {
        self.env.gas_price
    }

    fn miner(&self) -> Address {
        self.env.miner
    }

    fn fee_config(&self) -> &FeeConfig {
        &self.env.fee
    }

    fn load_account(&self, address: &Address) -> TxResult<AccountHandle> {
        if let Some(cached) = self.accounts.read().get(address) {
            return Ok(Arc::clone(&cached.handle));
        }

        let mut accounts = self.accounts.write();
        if let Some(cached) = accounts.get(address) {
            return Ok(Arc::clone(&cached.handle));
        }
        let key = account_key(address);
        let mut account = match self.db.get(Prefix::Account, &key)? {
            Some(bytes) => Account::from_bytes(address, &bytes)?,
            None => Account::new(*address),
        };
        if let Some(bytes) = self.db.get(Prefix::Ledger, &key)? {
            account.attach_ledger(AccountLedger::from_bytes(&bytes)?);
        }
        account.init(&self.env.fee, self.env.height, self.env.timestamp);

        let cached = CachedAccount {
            account_bytes: account.to_bytes()?,
            ledger_bytes: account.ledger_bytes()?,
            handle: Arc::new(RwLock::new(account)),
        };
        let handle = Arc::clone(&cached.handle);
        accounts.insert(*address, cached);
        Ok(handle)
    }

    fn account_exists(&self, address: &Address) -> TxResult<bool> {
        if let Some(cached) = self.accounts.read().get(address) {
            let account = cached.handle.read();
            if account.nonce > 0 || account.balance.bits() > 0 || !account.is_empty() {
                return Ok(true);
            }
        }
        Ok(self.db.get(Prefix::Account, &account_key(address))?.is_some())
    }

    fn load_model(&self, id: &ModelId) -> TxResult<Option<ModelInfo>> {
        match self.db.get(Prefix::Model, &model_key(id))? {
            Some(bytes) => Ok(Some(ModelInfo::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_model(&self, model: &ModelInfo) -> TxResult<()> {
        let bytes = model.to_bytes()?;
        self.snapshot.lock().models.insert(model.id, sha3_256(&bytes));
        self.db.put(Prefix::Model, model_key(&model.id), bytes)?;
        Ok(())
    }

    fn load_data(&self, id: &DataId) -> TxResult<Option<DataInfo>> {
        match self.db.get(Prefix::Data, &data_key(id))? {
            Some(bytes) => Ok(Some(DataInfo::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_data(&self, data: &DataInfo) -> TxResult<()> {
        let bytes = data.to_bytes()?;
        self.snapshot.lock().data.insert(data.id, sha3_256(&bytes));
        self.db.put(Prefix::Data, data_key(&data.id), bytes)?;
        Ok(())
    }

    fn save_prev_data(&self, data: &DataInfo) -> TxResult<()> {
        self.db.put(
            Prefix::PrevData,
            prev_data_key(&data.id, data.version),
            data.to_bytes()?,
        )?;
        Ok(())
    }

    fn load_name(&self, name: &str) -> TxResult<Option<DataId>> {
        match self.db.get(Prefix::Name, &name_key(name))? {
            Some(bytes) => Ok(Some(DataId::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_name(&self, name: &str, id: &DataId) -> TxResult<()> {
        self.snapshot
            .lock()
            .names
            .insert(name.to_string(), sha3_256(id.as_bytes()));
        self.db.put(Prefix::Name, name_key(name), id.to_vec())?;
        Ok(())
    }

    fn delete_name(&self, name: &str) -> TxResult<()> {
        self.snapshot.lock().names.insert(name.to_string(), Hash256::ZERO);
        self.db.delete(Prefix::Name, &name_key(name))?;
        Ok(())
    }
}

impl std::fmt::Debug for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockState")
            .field("height", &self.env.height)
            .field("db", &self.db)
            .field("cached", &self.accounts.read().len())
            .field("root", &self.root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::{BigUint, TokenSymbol};
    use ldvm_store::MemoryStore;

    fn env(height: u64) -> BlockEnv {
        BlockEnv {
            chain_id: 2357,
            height,
            timestamp: 1_700_000_000 + height,
            gas_price: 10_000,
            miner: Address::new([7; 20]),
            fee: FeeConfig::default(),
        }
    }

    fn state() -> (Arc<MemoryStore>, BlockState) {
        let store = Arc::new(MemoryStore::new());
        let db = VersionDb::new(store.clone()).child();
        (store, BlockState::new(db, env(1), Hash256::ZERO))
    }

    fn fund(state: &BlockState, address: &Address, amount: u64) {
        state
            .load_account(address)
            .unwrap()
            .write()
            .add(&TokenSymbol::NATIVE, &BigUint::from(amount))
            .unwrap();
    }

    #[test]
    fn test_untouched_accounts_are_not_written() {
        let (_, state) = state();
        let address = Address::new([1; 20]);
        let account = state.account(&address).unwrap();
        assert_eq!(account.pledge(), &BigUint::from(FeeConfig::default().non_transferable_balance));
        assert_eq!(account.height(), 1);
        assert_eq!(state.flush().unwrap(), 0);
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn test_account_exists() {
        let (_, state) = state();
        let funded = Address::new([1; 20]);
        let unknown = Address::new([2; 20]);
        state.account(&unknown).unwrap();
        assert!(!state.account_exists(&unknown).unwrap());

        fund(&state, &funded, 500);
        assert!(state.account_exists(&funded).unwrap());

        // a child sees the flushed account through the overlay
        let child = state.derive_state().unwrap();
        assert!(child.account_exists(&funded).unwrap());
        assert!(!child.account_exists(&unknown).unwrap());
    }

    #[test]
    fn test_changed_accounts_reach_the_snapshot() {
        let (store, state) = state();
        let address = Address::new([1; 20]);
        let empty_root = state.state_root().unwrap();
        fund(&state, &address, 500);
        assert_eq!(state.flush().unwrap(), 1);
        assert_eq!(state.flush().unwrap(), 0);
        assert!(state.snapshot().accounts.contains_key(&address));
        assert_ne!(state.state_root().unwrap(), empty_root);
        // nothing reaches the store before commit
        assert!(!store.has(Prefix::Account, &account_key(&address)).unwrap());

        state.commit().unwrap();
        assert!(store.has(Prefix::Account, &account_key(&address)).unwrap());
        state.commit().unwrap();
    }

    #[test]
    fn test_absorb_and_discard_children() {
        let (_, state) = state();
        let address = Address::new([1; 20]);
        fund(&state, &address, 100);

        let ok = state.derive_state().unwrap();
        fund(&ok, &address, 50);
        assert_eq!(state.account(&address).unwrap().balance, BigUint::from(100u64));
        state.absorb(ok).unwrap();
        assert_eq!(state.account(&address).unwrap().balance, BigUint::from(150u64));

        let failed = state.derive_state().unwrap();
        fund(&failed, &address, 1_000);
        failed.discard().unwrap();
        assert_eq!(state.account(&address).unwrap().balance, BigUint::from(150u64));
    }

    #[test]
    fn test_derived_block_reads_pending_parent() {
        let (_, parent) = state();
        let address = Address::new([1; 20]);
        fund(&parent, &address, 100);

        let child = parent.derive_block(env(2)).unwrap();
        let account = child.account(&address).unwrap();
        assert_eq!(account.balance, BigUint::from(100u64));
        assert_eq!(account.height(), 2);
        assert_eq!(child.snapshot().parent, parent.state_root().unwrap());

        // the child cannot commit ahead of its parent
        fund(&child, &address, 1);
        assert!(child.commit().is_err());
        parent.commit().unwrap();
        child.commit().unwrap();
    }

    #[test]
    fn test_names_and_models() {
        let (_, state) = state();
        let model = ModelInfo::builtin(ldvm_state::ModelKind::ALL[0]);
        state.save_model(&model).unwrap();
        assert_eq!(state.load_model(&model.id).unwrap(), Some(model));

        let id = DataId::new([4; 20]);
        state.save_name("ldc.io", &id).unwrap();
        assert_eq!(state.load_name("ldc.io").unwrap(), Some(id));
        state.delete_name("ldc.io").unwrap();
        assert_eq!(state.load_name("ldc.io").unwrap(), None);
        assert_eq!(state.snapshot().names["ldc.io"], Hash256::ZERO);
    }
}
