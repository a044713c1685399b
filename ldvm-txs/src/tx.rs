//! The three-phase transaction pipeline and dispatch over every kind.

use ldvm_primitives::{Address, Hash256, SignerRecovery, TxType};
use tracing::{debug, trace};

use crate::base::TxBase;
use crate::context::BlockContext;
use crate::error::TxResult;
use crate::handlers::*;
use crate::transaction::Transaction;

/// A transaction kind.
///
/// `syntactic_verify` is stateless. `verify` reads the block state and must
/// not change it. `accept` applies the transaction; on error the caller
/// discards everything it wrote.
pub trait TxHandler {
    fn base(&self) -> &TxBase;

    fn syntactic_verify(&self) -> TxResult<()>;

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()>;

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()>;
}

macro_rules! tx_kinds {
    ($($kind:ident),+ $(,)?) => {
        /// A decoded transaction of any kind.
        #[derive(Debug, Clone)]
        pub enum Tx {
            $($kind($kind),)+
        }

        impl Tx {
            fn parse(base: TxBase) -> TxResult<Self> {
                match base.tx_type() {
                    $(TxType::$kind => $kind::parse(base).map(Tx::$kind),)+
                }
            }

            fn handler(&self) -> &dyn TxHandler {
                match self {
                    $(Tx::$kind(tx) => tx,)+
                }
            }
        }
    };
}

tx_kinds!(
    Transfer,
    TransferPay,
    TransferCash,
    TransferMultiple,
    Exchange,
    AddNonceTable,
    UpdateAccountInfo,
    CreateToken,
    DestroyToken,
    CreateStake,
    ResetStake,
    DestroyStake,
    TakeStake,
    WithdrawStake,
    UpdateStakeApprover,
    OpenLending,
    CloseLending,
    Borrow,
    Repay,
    CreateModel,
    UpdateModelInfo,
    CreateData,
    UpdateData,
    UpdateDataInfo,
    DeleteData,
    Punish,
);

impl Tx {
    /// Decodes `raw`, recovers its signers and runs the stateless checks.
    pub fn decode(raw: Transaction, recovery: &dyn SignerRecovery) -> TxResult<Self> {
        let tx = Self::parse(TxBase::new(raw, recovery)?)?;
        tx.syntactic_verify()?;
        trace!(tx = %tx.id(), tx_type = %tx.tx_type(), "transaction decoded");
        Ok(tx)
    }

    #[must_use]
    pub fn id(&self) -> Hash256 {
        self.base().id()
    }

    #[must_use]
    pub fn tx_type(&self) -> TxType {
        self.base().tx_type()
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.base().size()
    }

    #[must_use]
    pub fn gas(&self) -> u64 {
        self.base().gas()
    }

    #[must_use]
    pub fn priority(&self) -> u64 {
        self.base().priority()
    }

    #[must_use]
    pub fn from(&self) -> Address {
        self.base().from()
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        self.base().nonce()
    }

    #[must_use]
    pub fn raw(&self) -> &Transaction {
        self.base().raw()
    }
}

impl TxHandler for Tx {
    fn base(&self) -> &TxBase {
        self.handler().base()
    }

    fn syntactic_verify(&self) -> TxResult<()> {
        self.handler().syntactic_verify()
    }

    fn verify(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.handler().verify(ctx)
    }

    fn accept(&self, ctx: &dyn BlockContext) -> TxResult<()> {
        self.handler().accept(ctx)?;
        debug!(
            tx = %self.id(),
            tx_type = %self.tx_type(),
            from = %self.from(),
            nonce = self.nonce(),
            height = ctx.height(),
            "transaction accepted"
        );
        Ok(())
    }
}
