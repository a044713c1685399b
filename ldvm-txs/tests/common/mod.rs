#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use ldvm_config::FeeConfig;
use ldvm_primitives::{
    Address, BigUint, DataId, DefaultRecovery, LocalSigner, ModelId, TokenSymbol, TxType, LDC,
};
use ldvm_state::{Account, DataInfo, ModelInfo, ModelKind};
use ldvm_txs::{AccountHandle, BlockContext, Transaction, Tx, TxData, TxHandler, TxResult};
use parking_lot::{Mutex, RwLock};

pub const CHAIN_ID: u64 = 2357;
pub const GAS_PRICE: u64 = 10_000;
pub const TIMESTAMP: u64 = 1_700_000_000;

/// In-memory block context. Writes are applied directly; nothing rolls back.
pub struct MockContext {
    pub fee: FeeConfig,
    pub miner: Address,
    accounts: Mutex<HashMap<Address, AccountHandle>>,
    models: Mutex<HashMap<ModelId, ModelInfo>>,
    data: Mutex<HashMap<DataId, DataInfo>>,
    prev_data: Mutex<Vec<DataInfo>>,
    names: Mutex<HashMap<String, DataId>>,
}

impl MockContext {
    pub fn new() -> Self {
        let models = ModelKind::ALL
            .iter()
            .map(|kind| {
                let model = ModelInfo::builtin(*kind);
                (model.id, model)
            })
            .collect();
        Self {
            fee: FeeConfig::default(),
            miner: LocalSigner::random_secp256k1().address(),
            accounts: Mutex::new(HashMap::new()),
            models: Mutex::new(models),
            data: Mutex::new(HashMap::new()),
            prev_data: Mutex::new(Vec::new()),
            names: Mutex::new(HashMap::new()),
        }
    }

    pub fn fund(&self, address: &Address, amount: u64) {
        let handle = self.load_account(address).unwrap();
        handle
            .write()
            .add(&TokenSymbol::NATIVE, &BigUint::from(amount))
            .unwrap();
    }

    pub fn balance(&self, address: &Address) -> BigUint {
        self.account(address).balance
    }

    pub fn account(&self, address: &Address) -> Account {
        self.load_account(address).unwrap().read().clone()
    }

    pub fn prev_versions(&self) -> Vec<DataInfo> {
        self.prev_data.lock().clone()
    }

    /// Verifies and accepts a transaction.
    pub fn execute(&self, raw: Transaction) -> TxResult<Tx> {
        let tx = decode(raw)?;
        tx.verify(self)?;
        tx.accept(self)?;
        Ok(tx)
    }
}

impl BlockContext for MockContext {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    fn height(&self) -> u64 {
        1
    }

    fn timestamp(&self) -> u64 {
        TIMESTAMP
    }

    fn gas_price(&self) -> u64 {
        GAS_PRICE
    }

    fn miner(&self) -> Address {
        self.miner
    }

    fn fee_config(&self) -> &FeeConfig {
        &self.fee
    }

    fn load_account(&self, address: &Address) -> TxResult<AccountHandle> {
        let mut accounts = self.accounts.lock();
        let handle = accounts.entry(*address).or_insert_with(|| {
            let mut account = Account::new(*address);
            account.init(&self.fee, 1, TIMESTAMP);
            Arc::new(RwLock::new(account))
        });
        Ok(Arc::clone(handle))
    }

    fn account_exists(&self, address: &Address) -> TxResult<bool> {
        Ok(self.accounts.lock().contains_key(address))
    }

    fn load_model(&self, id: &ModelId) -> TxResult<Option<ModelInfo>> {
        Ok(self.models.lock().get(id).cloned())
    }

    fn save_model(&self, model: &ModelInfo) -> TxResult<()> {
        self.models.lock().insert(model.id, model.clone());
        Ok(())
    }

    fn load_data(&self, id: &DataId) -> TxResult<Option<DataInfo>> {
        Ok(self.data.lock().get(id).cloned())
    }

    fn save_data(&self, data: &DataInfo) -> TxResult<()> {
        self.data.lock().insert(data.id, data.clone());
        Ok(())
    }

    fn save_prev_data(&self, data: &DataInfo) -> TxResult<()> {
        self.prev_data.lock().push(data.clone());
        Ok(())
    }

    fn load_name(&self, name: &str) -> TxResult<Option<DataId>> {
        Ok(self.names.lock().get(name).copied())
    }

    fn save_name(&self, name: &str, id: &DataId) -> TxResult<()> {
        self.names.lock().insert(name.to_string(), *id);
        Ok(())
    }

    fn delete_name(&self, name: &str) -> TxResult<()> {
        self.names.lock().remove(name);
        Ok(())
    }
}

/// Envelope with sensible defaults for `tx_type` sent by `from`.
pub fn tx_data(tx_type: TxType, from: Address, nonce: u64) -> TxData {
    TxData {
        tx_type: u16::from(tx_type),
        chain_id: CHAIN_ID,
        nonce,
        gas_tip: 100,
        gas_fee_cap: GAS_PRICE * 2,
        from,
        ..TxData::default()
    }
}

pub fn sign(tx: TxData, signers: &[&LocalSigner]) -> Transaction {
    let mut raw = Transaction::new(tx);
    for signer in signers {
        raw.sign(signer).unwrap();
    }
    raw
}

pub fn sign_with_ex(tx: TxData, signers: &[&LocalSigner], ex: &[&LocalSigner]) -> Transaction {
    let mut raw = sign(tx, signers);
    for signer in ex {
        raw.sign_ex(signer).unwrap();
    }
    raw
}

pub fn decode(raw: Transaction) -> TxResult<Tx> {
    Tx::decode(raw, &DefaultRecovery)
}

pub fn ldc(amount: u64) -> BigUint {
    BigUint::from(amount * LDC)
}
