//! Account state of the LDVM ledger.
//!
//! One account exists per address. Its kind is fixed by the address: an
//! address spelling a token symbol is a token account, one spelling a stake
//! symbol is a stake account, anything else is a native account. Accounts
//! are never deleted; destroying a token or stake reverts the kind-specific
//! fields and keeps the address.

use std::collections::BTreeMap;
use std::fmt;

use ldvm_config::FeeConfig;
use ldvm_primitives::{
    from_canonical_slice, to_canonical_vec, Address, BigUint, Key, Keys, StakeSymbol, TokenSymbol,
    TxType, MAX_NONCES_PER_GROUP, MAX_NONCE_GROUPS,
};
use ldvm_store::{Prefix, Record};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{LendingConfig, StakeConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::AccountLedger;

/// Kind of an account, derived from its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AccountKind {
    Native,
    Token,
    Stake,
}

impl AccountKind {
    #[must_use]
    pub fn of(address: &Address) -> Self {
        if TokenSymbol::from_address(address).is_some() {
            AccountKind::Token
        } else if StakeSymbol::from_address(address).is_some() {
            AccountKind::Stake
        } else {
            AccountKind::Native
        }
    }
}

impl From<AccountKind> for u8 {
    fn from(value: AccountKind) -> Self {
        match value {
            AccountKind::Native => 0,
            AccountKind::Token => 1,
            AccountKind::Stake => 2,
        }
    }
}

impl TryFrom<u8> for AccountKind {
    type Error = LedgerError;

    fn try_from(value: u8) -> LedgerResult<Self> {
        match value {
            0 => Ok(AccountKind::Native),
            1 => Ok(AccountKind::Token),
            2 => Ok(AccountKind::Stake),
            other => Err(LedgerError::corrupted(
                "account",
                format!("unknown account kind {other}"),
            )),
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Native => f.write_str("NativeAccount"),
            AccountKind::Token => f.write_str("TokenAccount"),
            AccountKind::Stake => f.write_str("StakeAccount"),
        }
    }
}

/// State of one account.
///
/// The stake and lending ledgers live in [`AccountLedger`], persisted under
/// their own key and attached by the block state on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub kind: AccountKind,
    pub nonce: u64,
    /// Native token balance.
    pub balance: BigUint,
    pub threshold: u16,
    pub keepers: Keys,
    pub approver: Option<Key>,
    pub approve_list: Option<Vec<TxType>>,
    /// Non-native token balances.
    pub tokens: BTreeMap<TokenSymbol, BigUint>,
    /// Unconsumed nonces grouped by expiry time.
    pub nonce_table: BTreeMap<u64, Vec<u64>>,
    pub max_total_supply: Option<BigUint>,
    pub stake: Option<StakeConfig>,
    /// Holder of an active stake account.
    pub holder: Option<Address>,
    pub lending: Option<LendingConfig>,

    #[serde(skip)]
    pub(crate) pledge: BigUint,
    #[serde(skip)]
    pub(crate) height: u64,
    #[serde(skip)]
    pub(crate) timestamp: u64,
    #[serde(skip)]
    pub(crate) ledger: Option<AccountLedger>,
}

impl Record for Account {
    const PREFIX: Prefix = Prefix::Account;
}

impl Account {
    /// Creates an empty account at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            kind: AccountKind::of(&address),
            nonce: 0,
            balance: BigUint::zero(),
            threshold: 0,
            keepers: Keys::default(),
            approver: None,
            approve_list: None,
            tokens: BTreeMap::new(),
            nonce_table: BTreeMap::new(),
            max_total_supply: None,
            stake: None,
            holder: None,
            lending: None,
            pledge: BigUint::zero(),
            height: 0,
            timestamp: 0,
            ledger: None,
        }
    }

    /// Binds the account to the block executing against it: sets the
    /// non-transferable pledge for its kind and the block clock.
    pub fn init(&mut self, fee: &FeeConfig, height: u64, timestamp: u64) {
        let pledge = match self.kind {
            AccountKind::Native => fee.non_transferable_balance,
            AccountKind::Token => fee.min_token_pledge,
            AccountKind::Stake => fee.min_stake_pledge,
        };
        self.pledge = BigUint::from(pledge);
        self.height = height;
        self.timestamp = timestamp;
    }

    /// Attaches the stake and lending ledger loaded from the store.
    pub fn attach_ledger(&mut self, ledger: AccountLedger) {
        self.ledger = Some(ledger);
    }

    #[must_use]
    pub fn ledger(&self) -> Option<&AccountLedger> {
        self.ledger.as_ref()
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut AccountLedger {
        self.ledger.get_or_insert_with(AccountLedger::default)
    }

    #[must_use]
    pub fn pledge(&self) -> &BigUint {
        &self.pledge
    }

    #[must_use]
    pub fn height(&self) -> u64 {
        self.height
    }

    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// True while no token or stake has been created on the account. A
    /// native balance does not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threshold == 0
            && self.keepers.is_empty()
            && self.tokens.values().all(Zero::is_zero)
            && self.max_total_supply.is_none()
            && self.stake.is_none()
            && self.holder.is_none()
    }

    // ---------------------------------------------------------------------
    // balances
    // ---------------------------------------------------------------------

    #[must_use]
    pub fn balance_of(&self, token: &TokenSymbol) -> BigUint {
        if token.is_native() {
            self.balance.clone()
        } else {
            self.tokens.get(token).cloned().unwrap_or_default()
        }
    }

    fn balance_mut(&mut self, token: &TokenSymbol) -> &mut BigUint {
        if token.is_native() {
            &mut self.balance
        } else {
            self.tokens.entry(*token).or_default()
        }
    }

    /// Checks that `amount` of `token` can be debited. With `check_pledge`
    /// the native pledge must remain afterwards.
    pub fn check_balance(
        &self,
        token: &TokenSymbol,
        amount: &BigUint,
        check_pledge: bool,
    ) -> LedgerResult<()> {
        if !token.is_valid() {
            return Err(LedgerError::invalid_amount(format!("invalid token {token}")));
        }
        let mut expected = amount.clone();
        if check_pledge && token.is_native() {
            expected += &self.pledge;
        }
        let got = self.balance_of(token);
        if got < expected {
            return Err(LedgerError::InsufficientBalance {
                token: *token,
                expected,
                got,
            });
        }
        Ok(())
    }

    /// Credits a positive amount.
    pub fn add(&mut self, token: &TokenSymbol, amount: &BigUint) -> LedgerResult<()> {
        if amount.is_zero() {
            return Err(LedgerError::invalid_amount(format!(
                "{}: add zero {token}",
                self.address
            )));
        }
        if !token.is_valid() {
            return Err(LedgerError::invalid_amount(format!("invalid token {token}")));
        }
        *self.balance_mut(token) += amount;
        trace!(address = %self.address, %token, %amount, "credit");
        Ok(())
    }

    /// Debits `amount`, which may be zero but not exceed the balance.
    pub fn sub(&mut self, token: &TokenSymbol, amount: &BigUint) -> LedgerResult<()> {
        self.check_balance(token, amount, false)?;
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.balance_mut(token);
        *balance -= amount;
        if !token.is_native() && balance.is_zero() {
            self.tokens.remove(token);
        }
        trace!(address = %self.address, %token, %amount, "debit");
        Ok(())
    }

    /// Debits `amount` and advances the nonce, failing unless `nonce` is the
    /// current one.
    pub fn sub_by_nonce(
        &mut self,
        token: &TokenSymbol,
        nonce: u64,
        amount: &BigUint,
    ) -> LedgerResult<()> {
        self.check_nonce(nonce)?;
        self.sub(token, amount)?;
        self.nonce += 1;
        Ok(())
    }

    pub fn check_nonce(&self, nonce: u64) -> LedgerResult<()> {
        if self.nonce != nonce {
            return Err(LedgerError::NonceMismatch {
                expected: self.nonce,
                got: nonce,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // nonce table
    // ---------------------------------------------------------------------

    /// Checks that `nonces` can be registered under `expire`.
    pub fn check_nonce_table(&self, expire: u64, nonces: &[u64]) -> LedgerResult<()> {
        if nonces.is_empty() || nonces.len() > MAX_NONCES_PER_GROUP {
            return Err(LedgerError::nonce_table(format!(
                "expected 1..={MAX_NONCES_PER_GROUP} nonces, got {}",
                nonces.len()
            )));
        }
        if expire <= self.timestamp {
            return Err(LedgerError::nonce_table(format!(
                "expire {expire} is not after {}",
                self.timestamp
            )));
        }
        let group = self.nonce_table.get(&expire);
        if group.is_none() && self.nonce_table.len() >= MAX_NONCE_GROUPS {
            return Err(LedgerError::nonce_table(format!(
                "too many groups, expected <= {MAX_NONCE_GROUPS}"
            )));
        }
        let mut seen = std::collections::BTreeSet::new();
        for nonce in nonces {
            let exists = group.is_some_and(|g| g.binary_search(nonce).is_ok());
            if exists || !seen.insert(*nonce) {
                return Err(LedgerError::NonceExists {
                    expire,
                    nonce: *nonce,
                });
            }
        }
        Ok(())
    }

    /// Registers `nonces` under `expire`. Expired groups are not evicted
    /// here, see [`retire_nonce_table`](Self::retire_nonce_table).
    pub fn add_nonce_table(&mut self, expire: u64, nonces: &[u64]) -> LedgerResult<()> {
        self.check_nonce_table(expire, nonces)?;
        let group = self.nonce_table.entry(expire).or_default();
        group.extend_from_slice(nonces);
        group.sort_unstable();
        Ok(())
    }

    /// Drops every group that expired before `now`, returning how many.
    pub fn retire_nonce_table(&mut self, now: u64) -> usize {
        let before = self.nonce_table.len();
        self.nonce_table.retain(|expire, _| *expire >= now);
        before - self.nonce_table.len()
    }

    /// Consumes `nonce` of group `expire` and debits `amount`.
    pub fn sub_by_nonce_table(
        &mut self,
        token: &TokenSymbol,
        expire: u64,
        nonce: u64,
        amount: &BigUint,
    ) -> LedgerResult<()> {
        let index = self.check_nonce_table_entry(expire, nonce)?;
        self.sub(token, amount)?;
        if let Some(group) = self.nonce_table.get_mut(&expire) {
            group.remove(index);
            if group.is_empty() {
                self.nonce_table.remove(&expire);
            }
        }
        Ok(())
    }

    /// Checks that `nonce` of group `expire` is registered and live.
    pub fn check_nonce_table_entry(&self, expire: u64, nonce: u64) -> LedgerResult<usize> {
        if expire < self.timestamp {
            return Err(LedgerError::nonce_table(format!(
                "group {expire} expired at {}",
                self.timestamp
            )));
        }
        self.nonce_table
            .get(&expire)
            .and_then(|group| group.binary_search(&nonce).ok())
            .ok_or(LedgerError::NonceNotExists { expire, nonce })
    }

    // ---------------------------------------------------------------------
    // signing
    // ---------------------------------------------------------------------

    fn signed_count(&self, signers: &Keys) -> usize {
        let keepers = self.keepers.count_signed(signers);
        // a keeper controlling the account address is already counted
        let self_signed = signers.iter().any(|key| key.address() == self.address)
            && !self.keepers.has_address(&self.address);
        keepers + usize::from(self_signed)
    }

    /// True when the signers meet the threshold. A signature by the account's
    /// own key counts once on top of the distinct keeper signatures; at
    /// least one valid signature is always required.
    ///
    /// The self bonus is only granted when the owner actually signed, not
    /// unconditionally as `|signers ∩ keepers| + 1`.
    #[must_use]
    pub fn satisfy_signing(&self, signers: &Keys) -> bool {
        let required = usize::from(self.threshold).max(1);
        self.signed_count(signers) >= required
    }

    /// Like [`satisfy_signing`](Self::satisfy_signing) but requires one more
    /// signature when the threshold is below the keeper count. Used for
    /// destructive operations.
    #[must_use]
    pub fn satisfy_signing_plus(&self, signers: &Keys) -> bool {
        let threshold = usize::from(self.threshold);
        let required = if threshold < self.keepers.len() {
            threshold + 1
        } else {
            threshold
        };
        self.signed_count(signers) >= required.max(1)
    }

    /// True when transactions of `tx_type` need the approver's signature.
    #[must_use]
    pub fn need_approve(&self, tx_type: TxType) -> bool {
        match (&self.approver, &self.approve_list) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(list)) => list.contains(&tx_type),
        }
    }

    /// Replaces the keeper settings. The caller has verified the old
    /// threshold. An empty approver key clears the approver.
    pub fn update_keepers(
        &mut self,
        threshold: Option<u16>,
        keepers: Option<&Keys>,
        approver: Option<&Key>,
        approve_list: Option<&[TxType]>,
    ) -> LedgerResult<()> {
        let threshold = threshold.unwrap_or(self.threshold);
        let keepers = keepers.cloned().unwrap_or_else(|| self.keepers.clone());
        keepers.validate()?;
        if usize::from(threshold) > keepers.len() {
            return Err(LedgerError::invalid_keepers(format!(
                "invalid threshold, expected <= {}, got {threshold}",
                keepers.len()
            )));
        }
        if self.kind != AccountKind::Native && (threshold == 0 || keepers.is_empty()) {
            return Err(LedgerError::invalid_keepers(
                "invalid threshold, expected >= 1, got 0",
            ));
        }
        self.threshold = threshold;
        self.keepers = keepers;
        match approver {
            Some(key) if key.is_empty() => {
                self.approver = None;
                self.approve_list = None;
            }
            Some(key) => {
                key.validate()?;
                self.approver = Some(key.clone());
            }
            None => {}
        }
        if let Some(list) = approve_list {
            if self.approver.is_none() {
                return Err(LedgerError::invalid_keepers("approve list without approver"));
            }
            self.approve_list = Some(list.to_vec());
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // persistence
    // ---------------------------------------------------------------------

    /// Checks the structural invariants of the account.
    pub fn validate(&self) -> LedgerResult<()> {
        let corrupted = |message: String| LedgerError::corrupted("account", message);
        if self.kind != AccountKind::of(&self.address) {
            return Err(corrupted(format!(
                "{} cannot be a {}",
                self.address, self.kind
            )));
        }
        self.keepers
            .validate()
            .map_err(|err| corrupted(err.to_string()))?;
        if usize::from(self.threshold) > self.keepers.len() {
            return Err(corrupted(format!(
                "threshold {} exceeds {} keepers",
                self.threshold,
                self.keepers.len()
            )));
        }
        if self.nonce_table.len() > MAX_NONCE_GROUPS {
            return Err(corrupted(format!(
                "{} nonce groups",
                self.nonce_table.len()
            )));
        }
        if self.nonce_table.values().any(Vec::is_empty) {
            return Err(corrupted("empty nonce group".into()));
        }
        if self.tokens.contains_key(&TokenSymbol::NATIVE) {
            return Err(corrupted("native balance in token map".into()));
        }
        match self.kind {
            AccountKind::Native => {
                if self.max_total_supply.is_some() || self.stake.is_some() || self.holder.is_some()
                {
                    return Err(corrupted("native account with token or stake fields".into()));
                }
            }
            AccountKind::Token => {
                if self.stake.is_some() || self.holder.is_some() {
                    return Err(corrupted("token account with stake fields".into()));
                }
            }
            AccountKind::Stake => {
                if self.max_total_supply.is_some() {
                    return Err(corrupted("stake account with total supply".into()));
                }
                if self.stake.is_some() != self.holder.is_some() {
                    return Err(corrupted("stake account without holder".into()));
                }
            }
        }
        Ok(())
    }

    /// Canonical bytes, ledger excluded.
    pub fn to_bytes(&self) -> LedgerResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    /// Decodes and validates an account stored at `address`.
    pub fn from_bytes(address: &Address, data: &[u8]) -> LedgerResult<Self> {
        let account: Account = from_canonical_slice(data)
            .map_err(|err| LedgerError::corrupted("account", err.to_string()))?;
        if account.address != *address {
            return Err(LedgerError::corrupted(
                "account",
                format!("stored at {address} but encodes {}", account.address),
            ));
        }
        account.validate()?;
        Ok(account)
    }

    /// Canonical bytes of the attached ledger, if any.
    pub fn ledger_bytes(&self) -> LedgerResult<Option<Vec<u8>>> {
        self.ledger.as_ref().map(AccountLedger::to_bytes).transpose()
    }
}
