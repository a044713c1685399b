//! One handler per transaction kind.

mod account;
mod data;
mod lending;
mod model;
mod punish;
mod stake;
mod token;
mod transfer;

pub use account::{AddNonceTable, UpdateAccountInfo};
pub use data::{CreateData, DeleteData, UpdateData, UpdateDataInfo};
pub use lending::{Borrow, CloseLending, OpenLending, Repay};
pub use model::{CreateModel, UpdateModelInfo};
pub use punish::Punish;
pub use stake::{CreateStake, DestroyStake, ResetStake, TakeStake, UpdateStakeApprover, WithdrawStake};
pub use token::{CreateToken, DestroyToken};
pub use transfer::{Exchange, Transfer, TransferCash, TransferMultiple, TransferPay};
