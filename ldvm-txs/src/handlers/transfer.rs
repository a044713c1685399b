//! Value transfers: plain, invoice, check, multi-recipient and exchange.

use ldvm_primitives::{Address, BigUint, TokenSymbol, LDC, MAX_KEEPERS};
use num_traits::Zero;
use tracing::debug;

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::payload::{decode_payload, TransferItem, TxExchanger, TxTransfer};
use crate::tx::TxHandler;

/// Moves `amount` of `token` from sender to recipient.
#[derive(Debug, Clone)]
pub struct Transfer {
    base: TxBase,
}

impl Transfer {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        Ok(Self { base })
    }
}

impl TxHandler for Transfer {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        self.base.require_to()?;
        self.base.require_amount()?;
        self.base.forbid_ex_signers()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, self.base.amount()).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.accept_base(ctx, true).map(|_| ())
    }
}

/// Pays an invoice issued and signed by the payee.
#[derive(Debug, Clone)]
pub struct TransferPay {
    base: TxBase,
    invoice: TxTransfer,
}

impl TransferPay {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let invoice = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, invoice })
    }
}

impl TxHandler for TransferPay {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let to = base.require_to()?;
        base.require_amount()?;
        base.require_ex_signers()?;
        let invoice = &self.invoice;
        if invoice.to != Some(to) {
            return Err(base.malformed("invalid recipient, does not match the invoice"));
        }
        if invoice.from.is_some_and(|from| from != base.from()) {
            return Err(base.malformed("invalid sender, does not match the invoice"));
        }
        if invoice.token.unwrap_or(TokenSymbol::NATIVE) != base.token() {
            return Err(base.malformed("invalid token, does not match the invoice"));
        }
        if invoice.amount != *base.amount() {
            return Err(base.malformed(format!(
                "invalid amount, expected {}, got {}",
                invoice.amount,
                base.amount()
            )));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        if self.invoice.expire < ctx.timestamp() {
            return Err(base.rejected(format!(
                "invoice expired at {}, block time {}",
                self.invoice.expire,
                ctx.timestamp()
            )));
        }
        let payee = ctx.load_account(&base.require_to()?)?;
        if !payee.read().satisfy_signing(base.ex_signers()) {
            return Err(base.rejected("invalid exSignatures for payee"));
        }
        base.verify_base(ctx, base.amount()).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.accept_base(ctx, true).map(|_| ())
    }
}

/// Cashes a check: the issuer pays the sender, consuming one nonce from
/// the issuer's nonce table.
#[derive(Debug, Clone)]
pub struct TransferCash {
    base: TxBase,
    check: TxTransfer,
}

impl TransferCash {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let check = decode_payload(base.tx_type(), base.data())?;
        Ok(Self { base, check })
    }

    fn issuer(&self) -> TxResult<Address> {
        self.base.require_to()
    }
}

impl TxHandler for TransferCash {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let issuer = self.issuer()?;
        base.require_amount()?;
        base.require_ex_signers()?;
        let check = &self.check;
        if check.from != Some(issuer) {
            return Err(base.malformed("invalid issuer, does not match the check"));
        }
        if check.to != Some(base.from()) {
            return Err(base.malformed("invalid payee, does not match the check"));
        }
        if check.token.unwrap_or(TokenSymbol::NATIVE) != base.token() {
            return Err(base.malformed("invalid token, does not match the check"));
        }
        if check.amount != *base.amount() {
            return Err(base.malformed(format!(
                "invalid amount, expected {}, got {}",
                check.amount,
                base.amount()
            )));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, &BigUint::zero())?;
        let handle = ctx.load_account(&self.issuer()?)?;
        let issuer = handle.read();
        if !issuer.satisfy_signing(base.ex_signers()) {
            return Err(base.rejected("invalid exSignatures for issuer"));
        }
        issuer
            .check_nonce_table_entry(self.check.expire, self.check.nonce)
            .map_err(base.ledger())?;
        issuer
            .check_balance(&base.token(), base.amount(), true)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        {
            let handle = ctx.load_account(&self.issuer()?)?;
            let mut issuer = handle.write();
            issuer
                .sub_by_nonce_table(&base.token(), self.check.expire, self.check.nonce, base.amount())
                .map_err(base.ledger())?;
        }
        base.credit(ctx, &base.from(), &base.token(), base.amount())
    }
}

/// Pays several recipients from one transaction.
#[derive(Debug, Clone)]
pub struct TransferMultiple {
    base: TxBase,
    items: Vec<TransferItem>,
    total: BigUint,
}

impl TransferMultiple {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let items: Vec<TransferItem> = decode_payload(base.tx_type(), base.data())?;
        let total: BigUint = items.iter().map(|item| &item.amount).sum();
        Ok(Self { base, items, total })
    }
}

impl TxHandler for TransferMultiple {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        base.forbid_to()?;
        base.forbid_amount()?;
        base.forbid_ex_signers()?;
        if self.items.is_empty() || self.items.len() > MAX_KEEPERS {
            return Err(base.malformed(format!(
                "expected 1..={MAX_KEEPERS} recipients, got {}",
                self.items.len()
            )));
        }
        for item in &self.items {
            if item.to == base.from() {
                return Err(base.malformed(format!("invalid to, should not be {}", item.to)));
            }
            if item.amount.is_zero() {
                return Err(base.malformed(format!("invalid amount for {}, expected > 0", item.to)));
            }
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.base.verify_base(ctx, &self.total).map(|_| ())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, false)?;
        {
            let handle = ctx.load_account(&base.from())?;
            handle
                .write()
                .sub(&base.token(), &self.total)
                .map_err(base.ledger())?;
        }
        for item in &self.items {
            base.credit(ctx, &item.to, &base.token(), &item.amount)?;
        }
        Ok(())
    }
}

/// Buys a token at the price offered and signed by its seller.
///
/// The sender pays `amount` of the offer's `receive` token to the seller
/// and receives `amount * 10^9 / price` of the `sell` token, consuming one
/// nonce of the seller's nonce table.
#[derive(Debug, Clone)]
pub struct Exchange {
    base: TxBase,
    offer: TxExchanger,
    bought: BigUint,
}

impl Exchange {
    pub(crate) fn parse(base: TxBase) -> TxResult<Self> {
        let offer: TxExchanger = decode_payload(base.tx_type(), base.data())?;
        if offer.price.is_zero() {
            return Err(base.malformed("invalid price, expected > 0"));
        }
        let bought = base.amount() * LDC / &offer.price;
        Ok(Self {
            base,
            offer,
            bought,
        })
    }
}

impl TxHandler for Exchange {
    fn base(&self) -> &TxBase {
        &self.base
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        let base = &self.base;
        let offer = &self.offer;
        let to = base.require_to()?;
        base.require_amount()?;
        base.require_ex_signers()?;
        if to != offer.from {
            return Err(base.malformed("invalid to, does not match the seller"));
        }
        if base.token() != offer.receive {
            return Err(base.malformed(format!(
                "invalid token, expected {}, got {}",
                offer.receive,
                base.token()
            )));
        }
        if offer.sell == offer.receive || !offer.sell.is_valid() {
            return Err(base.malformed(format!("invalid sell token {}", offer.sell)));
        }
        if self.bought < offer.minimum || self.bought > offer.quota {
            return Err(base.malformed(format!(
                "invalid amount, buying {} of {}, expected {}..={}",
                self.bought, offer.sell, offer.minimum, offer.quota
            )));
        }
        Ok(())
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.verify_base(ctx, base.amount())?;
        let handle = ctx.load_account(&self.offer.from)?;
        let seller = handle.read();
        if !seller.satisfy_signing(base.ex_signers()) {
            return Err(base.rejected("invalid exSignatures for seller"));
        }
        seller
            .check_nonce_table_entry(self.offer.expire, self.offer.nonce)
            .map_err(base.ledger())?;
        seller
            .check_balance(&self.offer.sell, &self.bought, true)
            .map_err(base.ledger())
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        let base = &self.base;
        base.accept_base(ctx, true)?;
        {
            let handle = ctx.load_account(&self.offer.from)?;
            let mut seller = handle.write();
            seller
                .sub_by_nonce_table(&self.offer.sell, self.offer.expire, self.offer.nonce, &self.bought)
                .map_err(base.ledger())?;
        }
        base.credit(ctx, &base.from(), &self.offer.sell, &self.bought)?;
        debug!(tx = %base.id(), seller = %self.offer.from, bought = %self.bought, "exchanged");
        Ok(())
    }
}
