//! Debt simplification for shared expenses.
//!
//! The engine turns a snapshot of who owes whom into the shortest list of
//! payments that settles everyone:
//!
//! 1. [`Expense`]s and [`Payment`]s become directed [`Obligation`]s.
//! 2. [`aggregate`] nets obligations per pair and folds them into a
//!    [`NetBalance`] per user.
//! 3. [`plan`] matches the largest debtor with the largest creditor until all
//!    balances are zero, emitting [`SettlementTransaction`]s.
//!
//! Every function is pure and synchronous: inputs are borrowed, outputs are new
//! values, and nothing is shared between calls.
//!
//! ```rust
//! use engine::{Money, Obligation, UserId, simplify};
//!
//! let obligations = [
//!     Obligation::new(UserId(2), UserId(1), Money::new(50_00)).unwrap(),
//!     Obligation::new(UserId(3), UserId(1), Money::new(30_00)).unwrap(),
//! ];
//! let payments = simplify(&obligations).unwrap();
//! assert_eq!(payments.len(), 2);
//! assert_eq!(payments[0].from, UserId(2));
//! assert_eq!(payments[0].amount, Money::new(50_00));
//! ```

pub use balances::{NetBalance, PairwiseNet, aggregate, pairwise};
pub use error::EngineError;
pub use expenses::{Expense, Payment, Share};
pub use ledger::{HistoryEntry, Ledger, PayerTotal};
pub use money::Money;
pub use obligations::Obligation;
pub use settlement::{SettlementTransaction, plan, simplify};
pub use users::UserId;

mod balances;
mod error;
mod expenses;
mod ledger;
mod money;
mod obligations;
mod settlement;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
