//! Stake account lifecycle and the stake ledger.

use ldvm_primitives::{mul_ppm, Address, BigUint, Key, Keys, TokenSymbol};
use num_traits::Zero;
use tracing::debug;

use crate::account::{Account, AccountKind};
use crate::config::{AccountConfig, StakeConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::StakeEntry;

impl Account {
    fn active_stake(&self) -> LedgerResult<&StakeConfig> {
        if self.kind != AccountKind::Stake {
            return Err(LedgerError::invalid_kind(
                self.address,
                format!("invalid stake account, kind {}", self.kind),
            ));
        }
        self.stake
            .as_ref()
            .ok_or_else(|| LedgerError::invalid_kind(self.address, "stake account not active"))
    }

    fn check_stake_token(&self, token: &TokenSymbol) -> LedgerResult<&StakeConfig> {
        let stake = self.active_stake()?;
        if stake.token != *token {
            return Err(LedgerError::rejected(format!(
                "invalid stake token, expected {}, got {token}",
                stake.token
            )));
        }
        Ok(stake)
    }

    fn has_foreign_stake(&self) -> bool {
        let holder = self.holder;
        self.ledger()
            .is_some_and(|ledger| ledger.stake.keys().any(|addr| Some(*addr) != holder))
    }

    pub fn check_create_stake(&self, cfg: &AccountConfig, stake: &StakeConfig) -> LedgerResult<()> {
        if self.kind != AccountKind::Stake {
            return Err(LedgerError::invalid_kind(
                self.address,
                format!("invalid stake account, kind {}", self.kind),
            ));
        }
        if !self.is_empty() {
            return Err(LedgerError::invalid_kind(self.address, "stake account exists"));
        }
        cfg.validate_managed()?;
        stake.validate()
    }

    /// Activates an empty stake account. The holder's entry is seeded with
    /// `pledge`.
    pub fn create_stake(
        &mut self,
        holder: Address,
        pledge: &BigUint,
        cfg: &AccountConfig,
        stake: &StakeConfig,
    ) -> LedgerResult<()> {
        self.check_create_stake(cfg, stake)?;
        self.threshold = cfg.threshold;
        self.keepers = cfg.keepers.clone();
        self.approver = cfg.approver.clone().filter(|key| !key.is_empty());
        self.approve_list = cfg.approve_list.clone();
        self.stake = Some(stake.clone());
        self.holder = Some(holder);
        let ledger = self.ledger_mut();
        ledger.stake.clear();
        ledger.stake.insert(
            holder,
            StakeEntry {
                amount: pledge.clone(),
                lock_time: 0,
                approver: None,
            },
        );
        debug!(stake = %self.address, %holder, %pledge, "stake created");
        Ok(())
    }

    /// Checks that `delegator` may add `amount` of `token`. The pool total
    /// after the deposit must not exceed `max_cap`.
    pub fn check_take_stake(
        &self,
        token: &TokenSymbol,
        delegator: &Address,
        amount: &BigUint,
        max_cap: &BigUint,
    ) -> LedgerResult<()> {
        let stake = self.check_stake_token(token)?;
        if amount.is_zero() {
            return Err(LedgerError::invalid_amount("invalid stake amount, expected > 0"));
        }
        let entry_total = self
            .ledger()
            .and_then(|ledger| ledger.stake.get(delegator))
            .map_or_else(BigUint::zero, |entry| entry.amount.clone())
            + amount;
        if entry_total < stake.min_amount {
            return Err(LedgerError::rejected(format!(
                "invalid stake amount, expected >= {}, got {entry_total}",
                stake.min_amount
            )));
        }
        let cap = max_cap.min(&stake.max_amount);
        let pool_total = self.balance_of(token) + amount;
        if pool_total > *cap {
            return Err(LedgerError::rejected(format!(
                "stake {} has a maximum staking limit of {cap}, got {pool_total}",
                self.address
            )));
        }
        Ok(())
    }

    /// Deposits `amount` into the pool and the delegator's entry.
    pub fn take_stake(
        &mut self,
        token: &TokenSymbol,
        delegator: Address,
        amount: &BigUint,
        lock_time: u64,
        max_cap: &BigUint,
    ) -> LedgerResult<()> {
        self.check_take_stake(token, &delegator, amount, max_cap)?;
        self.add(token, amount)?;
        let entry = self.ledger_mut().stake.entry(delegator).or_default();
        entry.amount += amount;
        entry.lock_time = entry.lock_time.max(lock_time);
        debug!(stake = %self.address, %delegator, %amount, "stake taken");
        Ok(())
    }

    /// Returns the amount paid out for withdrawing `amount`, net of the
    /// withdraw fee that stays in the pool.
    pub fn check_withdraw_stake(
        &self,
        token: &TokenSymbol,
        delegator: &Address,
        signers: &Keys,
        amount: &BigUint,
    ) -> LedgerResult<BigUint> {
        let stake = self.check_stake_token(token)?;
        if amount.is_zero() {
            return Err(LedgerError::invalid_amount("invalid withdraw amount, expected > 0"));
        }
        let entry = self
            .ledger()
            .and_then(|ledger| ledger.stake.get(delegator))
            .ok_or_else(|| LedgerError::rejected(format!("{delegator} has no stake to withdraw")))?;
        if let Some(approver) = &entry.approver {
            if !signers.has(approver) {
                return Err(LedgerError::rejected("stake withdrawal needs approver signing"));
            }
        }
        if self.timestamp < entry.lock_time {
            return Err(LedgerError::rejected(format!(
                "stake in lock, please retry after lock time {}",
                entry.lock_time
            )));
        }
        if *amount > entry.amount {
            return Err(LedgerError::rejected(format!(
                "{delegator} has an insufficient stake, expected {amount}, got {}",
                entry.amount
            )));
        }
        let withdraw = amount - mul_ppm(amount, stake.withdraw_fee);
        self.check_balance(token, &withdraw, true)?;
        Ok(withdraw)
    }

    /// Debits the delegator's entry and the pool, returning the amount to pay
    /// the delegator. Emptied entries of non-holders are removed.
    pub fn withdraw_stake(
        &mut self,
        token: &TokenSymbol,
        delegator: Address,
        signers: &Keys,
        amount: &BigUint,
    ) -> LedgerResult<BigUint> {
        let withdraw = self.check_withdraw_stake(token, &delegator, signers, amount)?;
        let holder = self.holder;
        let ledger = self.ledger_mut();
        if let Some(entry) = ledger.stake.get_mut(&delegator) {
            entry.amount -= amount;
            if entry.amount.is_zero() && Some(delegator) != holder {
                ledger.stake.remove(&delegator);
            }
        }
        self.sub(token, &withdraw)?;
        debug!(stake = %self.address, %delegator, %amount, %withdraw, "stake withdrawn");
        Ok(withdraw)
    }

    /// Sets or clears the approver of a delegator's entry. An existing
    /// approver must sign the change.
    pub fn update_stake_approver(
        &mut self,
        delegator: &Address,
        approver: Option<&Key>,
        signers: &Keys,
    ) -> LedgerResult<()> {
        self.active_stake()?;
        let entry = self
            .ledger_mut()
            .stake
            .get_mut(delegator)
            .ok_or_else(|| LedgerError::rejected(format!("{delegator} has no stake ledger")))?;
        if let Some(current) = &entry.approver {
            if !signers.has(current) {
                return Err(LedgerError::rejected("stake approver change needs approver signing"));
            }
        }
        entry.approver = match approver {
            Some(key) if !key.is_empty() => {
                key.validate()?;
                Some(key.clone())
            }
            _ => None,
        };
        Ok(())
    }

    pub fn check_reset_stake(&self, cfg: &StakeConfig) -> LedgerResult<()> {
        let stake = self.active_stake()?;
        if stake.token != cfg.token || stake.stake_type != cfg.stake_type {
            return Err(LedgerError::rejected("can't change stake type or token"));
        }
        if self.timestamp < stake.lock_time {
            return Err(LedgerError::rejected(format!(
                "stake in lock, please retry after lock time {}",
                stake.lock_time
            )));
        }
        if self.has_foreign_stake() {
            return Err(LedgerError::rejected(
                "stake ledger not empty, please withdraw all except holder",
            ));
        }
        cfg.validate()
    }

    /// Replaces the stake settings once the lock has passed and only the
    /// holder remains in the ledger.
    pub fn reset_stake(&mut self, cfg: &StakeConfig) -> LedgerResult<()> {
        self.check_reset_stake(cfg)?;
        self.stake = Some(cfg.clone());
        Ok(())
    }

    pub fn check_destroy_stake(&self) -> LedgerResult<()> {
        let stake = self.active_stake()?;
        if self.timestamp < stake.lock_time {
            return Err(LedgerError::rejected(format!(
                "stake in lock, please retry after lock time {}",
                stake.lock_time
            )));
        }
        if self.has_foreign_stake() {
            return Err(LedgerError::rejected("ledger not empty"));
        }
        if self.lending.is_some() {
            return Err(LedgerError::rejected("lending not closed"));
        }
        Ok(())
    }

    /// Pays every balance to `recipient` and reverts the account to an
    /// empty stake account.
    pub fn destroy_stake(&mut self, recipient: &mut Account) -> LedgerResult<()> {
        self.check_destroy_stake()?;
        let native = std::mem::take(&mut self.balance);
        if !native.is_zero() {
            recipient.add(&TokenSymbol::NATIVE, &native)?;
        }
        for (token, amount) in std::mem::take(&mut self.tokens) {
            if !amount.is_zero() {
                recipient.add(&token, &amount)?;
            }
        }
        self.threshold = 0;
        self.keepers = Keys::default();
        self.approver = None;
        self.approve_list = None;
        self.stake = None;
        self.holder = None;
        self.ledger_mut().stake.clear();
        debug!(stake = %self.address, recipient = %recipient.address, refund = %native, "stake destroyed");
        Ok(())
    }
}
