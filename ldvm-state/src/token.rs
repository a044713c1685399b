//! Token account lifecycle.

use ldvm_primitives::{BigUint, TokenSymbol};
use num_traits::Zero;
use tracing::debug;

use crate::account::{Account, AccountKind};
use crate::config::AccountConfig;
use crate::error::{LedgerError, LedgerResult};

impl Account {
    /// Symbol managed by this token account.
    fn own_symbol(&self) -> LedgerResult<TokenSymbol> {
        match (self.kind, TokenSymbol::from_address(&self.address)) {
            (AccountKind::Token, Some(symbol)) => Ok(symbol),
            _ => Err(LedgerError::invalid_kind(
                self.address,
                format!("invalid token account, kind {}", self.kind),
            )),
        }
    }

    pub fn check_create_token(&self, cfg: &AccountConfig) -> LedgerResult<()> {
        self.own_symbol()?;
        if !self.is_empty() {
            return Err(LedgerError::invalid_kind(self.address, "token account exists"));
        }
        cfg.validate_managed()?;
        match &cfg.amount {
            Some(amount) if !amount.is_zero() => Ok(()),
            _ => Err(LedgerError::invalid_amount("invalid total supply, expected > 0")),
        }
    }

    /// Activates an empty token account and mints the total supply to it.
    pub fn create_token(&mut self, cfg: &AccountConfig) -> LedgerResult<()> {
        self.check_create_token(cfg)?;
        let symbol = self.own_symbol()?;
        let supply = cfg.amount.clone().unwrap_or_default();
        self.threshold = cfg.threshold;
        self.keepers = cfg.keepers.clone();
        self.approver = cfg.approver.clone().filter(|key| !key.is_empty());
        self.approve_list = cfg.approve_list.clone();
        self.max_total_supply = Some(supply.clone());
        self.add(&symbol, &supply)?;
        debug!(token = %symbol, %supply, "token created");
        Ok(())
    }

    /// Fails unless every token the account issued is back in its hands and
    /// no other token balance or lending remains.
    pub fn check_destroy_token(&self) -> LedgerResult<()> {
        let symbol = self.own_symbol()?;
        let Some(supply) = &self.max_total_supply else {
            return Err(LedgerError::invalid_kind(self.address, "token account not active"));
        };
        if self.balance_of(&symbol) != *supply
            || self
                .tokens
                .iter()
                .any(|(token, amount)| *token != symbol && !amount.is_zero())
        {
            return Err(LedgerError::rejected("some token in use"));
        }
        if self.lending.is_some() {
            return Err(LedgerError::rejected("lending not closed"));
        }
        Ok(())
    }

    /// Pays the remaining native balance to `recipient` and reverts the
    /// token fields.
    pub fn destroy_token(&mut self, recipient: &mut Account) -> LedgerResult<()> {
        self.check_destroy_token()?;
        let symbol = self.own_symbol()?;
        let native = std::mem::take(&mut self.balance);
        if !native.is_zero() {
            recipient.add(&TokenSymbol::NATIVE, &native)?;
        }
        self.threshold = 0;
        self.keepers = Default::default();
        self.approver = None;
        self.approve_list = None;
        self.max_total_supply = None;
        self.tokens.clear();
        debug!(token = %symbol, recipient = %recipient.address, refund = %native, "token destroyed");
        Ok(())
    }

    /// Amount of its own token still held by the token account.
    #[must_use]
    pub fn token_reserve(&self) -> BigUint {
        self.own_symbol()
            .map(|symbol| self.balance_of(&symbol))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldvm_primitives::{Address, Key, Keys};

    fn cfg(amount: u64) -> AccountConfig {
        AccountConfig {
            threshold: 1,
            keepers: Keys::new(vec![Key::from(Address::new([7u8; 20]))]),
            amount: Some(BigUint::from(amount)),
            ..AccountConfig::default()
        }
    }

    #[test]
    fn test_create_and_destroy_token() {
        let symbol = TokenSymbol::new("$ABC").unwrap();
        let mut token = Account::new(symbol.to_address());
        token.balance = BigUint::from(500u64);
        token.create_token(&cfg(1000)).unwrap();
        assert_eq!(token.balance_of(&symbol), BigUint::from(1000u64));
        assert_eq!(token.max_total_supply, Some(BigUint::from(1000u64)));
        assert!(token.create_token(&cfg(1000)).is_err());

        let mut holder = Account::new(Address::new([1u8; 20]));
        token.sub(&symbol, &BigUint::from(10u64)).unwrap();
        holder.add(&symbol, &BigUint::from(10u64)).unwrap();
        assert_eq!(
            token.check_destroy_token().unwrap_err().to_string(),
            "some token in use"
        );

        holder.sub(&symbol, &BigUint::from(10u64)).unwrap();
        token.add(&symbol, &BigUint::from(10u64)).unwrap();
        let mut recipient = Account::new(Address::new([2u8; 20]));
        token.destroy_token(&mut recipient).unwrap();
        assert_eq!(recipient.balance, BigUint::from(500u64));
        assert!(token.is_empty());
        assert!(token.balance.is_zero());
        token.validate().unwrap();
    }

    #[test]
    fn test_create_token_requires_token_address() {
        let mut native = Account::new(Address::new([1u8; 20]));
        assert!(native.create_token(&cfg(1)).is_err());
        let mut token = Account::new(TokenSymbol::new("$ABC").unwrap().to_address());
        assert!(token.create_token(&cfg(0)).is_err());
        let mut no_keepers = cfg(1);
        no_keepers.threshold = 0;
        no_keepers.keepers = Keys::default();
        assert!(token.create_token(&no_keepers).is_err());
    }
}
