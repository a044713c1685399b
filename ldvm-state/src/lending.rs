//! Lending: loans from an account to borrowers, with simple daily interest.

use ldvm_primitives::{mul_ppm, Address, BigUint, TokenSymbol, SECONDS_PER_DAY};
use num_traits::Zero;
use tracing::debug;

use crate::account::Account;
use crate::config::LendingConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::LendingEntry;

/// Amount owed on `entry` at `now`.
///
/// Whole days between `update_at` and the due time accrue `daily_interest`,
/// whole days after the due time accrue `overdue_interest`. Interest is
/// simple, computed on the amount owed at `update_at`.
#[must_use]
pub fn amount_owed(cfg: &LendingConfig, entry: &LendingEntry, now: u64) -> BigUint {
    if now <= entry.update_at {
        return entry.amount.clone();
    }
    let overdue = entry.due_time > 0 && now > entry.due_time;
    let current_end = if overdue {
        entry.due_time.max(entry.update_at)
    } else {
        now
    };
    let daily_days = (current_end - entry.update_at) / SECONDS_PER_DAY;
    let overdue_days = if overdue {
        (now - entry.due_time.max(entry.update_at)) / SECONDS_PER_DAY
    } else {
        0
    };
    let mut owed = entry.amount.clone();
    if daily_days > 0 {
        owed += mul_ppm(&entry.amount, cfg.daily_interest) * daily_days;
    }
    if overdue_days > 0 {
        owed += mul_ppm(&entry.amount, cfg.overdue_interest) * overdue_days;
    }
    owed
}

impl Account {
    fn active_lending(&self, token: &TokenSymbol) -> LedgerResult<&LendingConfig> {
        let cfg = self
            .lending
            .as_ref()
            .ok_or_else(|| LedgerError::rejected(format!("{} has no lending", self.address)))?;
        if cfg.token != *token {
            return Err(LedgerError::rejected(format!(
                "invalid lending token, expected {}, got {token}",
                cfg.token
            )));
        }
        Ok(cfg)
    }

    pub fn open_lending(&mut self, cfg: &LendingConfig) -> LedgerResult<()> {
        if self.lending.is_some() {
            return Err(LedgerError::rejected("lending exists"));
        }
        cfg.validate()?;
        self.lending = Some(cfg.clone());
        self.ledger_mut().lending.clear();
        Ok(())
    }

    pub fn close_lending(&mut self) -> LedgerResult<()> {
        if self.lending.is_none() {
            return Err(LedgerError::rejected(format!("{} has no lending", self.address)));
        }
        if self.ledger().is_some_and(|ledger| !ledger.lending.is_empty()) {
            return Err(LedgerError::rejected("please repay all before close"));
        }
        self.lending = None;
        Ok(())
    }

    pub fn check_borrow(
        &self,
        token: &TokenSymbol,
        borrower: &Address,
        amount: &BigUint,
        due_time: u64,
    ) -> LedgerResult<()> {
        let cfg = self.active_lending(token)?;
        if due_time > 0 && due_time <= self.timestamp {
            return Err(LedgerError::rejected(format!(
                "invalid due time, expected > {}, got {due_time}",
                self.timestamp
            )));
        }
        if *amount < cfg.min_amount {
            return Err(LedgerError::invalid_amount(format!(
                "expected >= {}, got {amount}",
                cfg.min_amount
            )));
        }
        let owed = self
            .ledger()
            .and_then(|ledger| ledger.lending.get(borrower))
            .map_or_else(BigUint::zero, |entry| amount_owed(cfg, entry, self.timestamp));
        let total = owed + amount;
        if total > cfg.max_amount {
            return Err(LedgerError::invalid_amount(format!(
                "expected total <= {}, got {total}",
                cfg.max_amount
            )));
        }
        self.check_balance(token, amount, true)
    }

    /// Lends `amount` to `borrower`. Interest accrued on an existing loan is
    /// folded into the principal and the clock restarts.
    pub fn borrow(
        &mut self,
        token: &TokenSymbol,
        borrower: Address,
        amount: &BigUint,
        due_time: u64,
    ) -> LedgerResult<()> {
        self.check_borrow(token, &borrower, amount, due_time)?;
        let now = self.timestamp;
        let cfg = self.active_lending(token)?.clone();
        let ledger = self.ledger_mut();
        let entry = ledger.lending.entry(borrower).or_default();
        let owed = amount_owed(&cfg, entry, now);
        entry.amount = owed + amount;
        entry.update_at = now;
        entry.due_time = due_time;
        self.sub(token, amount)?;
        debug!(lender = %self.address, %borrower, %amount, due_time, "borrowed");
        Ok(())
    }

    /// Returns the amount actually repaid: `amount` capped at what is owed.
    pub fn check_repay(
        &self,
        token: &TokenSymbol,
        borrower: &Address,
        amount: &BigUint,
    ) -> LedgerResult<BigUint> {
        let cfg = self.active_lending(token)?;
        if amount.is_zero() {
            return Err(LedgerError::invalid_amount("invalid repay amount, expected > 0"));
        }
        let entry = self
            .ledger()
            .and_then(|ledger| ledger.lending.get(borrower))
            .ok_or_else(|| LedgerError::rejected(format!("{borrower} don't need to repay")))?;
        let owed = amount_owed(cfg, entry, self.timestamp);
        Ok(amount.min(&owed).clone())
    }

    /// Credits the repayment and reduces or clears the loan.
    pub fn repay(
        &mut self,
        token: &TokenSymbol,
        borrower: Address,
        amount: &BigUint,
    ) -> LedgerResult<BigUint> {
        let actual = self.check_repay(token, &borrower, amount)?;
        let now = self.timestamp;
        let cfg = self.active_lending(token)?.clone();
        let ledger = self.ledger_mut();
        let owed = ledger
            .lending
            .get(&borrower)
            .map(|entry| amount_owed(&cfg, entry, now));
        match owed {
            Some(owed) if owed > actual => {
                if let Some(entry) = ledger.lending.get_mut(&borrower) {
                    entry.amount = owed - &actual;
                    entry.update_at = now;
                }
            }
            Some(_) => {
                ledger.lending.remove(&borrower);
            }
            None => {}
        }
        self.add(token, &actual)?;
        debug!(lender = %self.address, %borrower, repaid = %actual, "repaid");
        Ok(actual)
    }
}
