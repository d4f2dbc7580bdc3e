//! Obligations.
//!
//! An [`Obligation`] is one directed debt fact: `debtor` owes `creditor`
//! `amount`. Expenses produce one obligation per non-payer share, recorded
//! payments produce one obligation in the opposite direction.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Money,
}

impl Obligation {
    /// Builds a validated obligation.
    pub fn new(debtor: UserId, creditor: UserId, amount: Money) -> ResultEngine<Self> {
        let obligation = Self {
            debtor,
            creditor,
            amount,
        };
        obligation.validate()?;
        Ok(obligation)
    }

    /// Checks the two invariants every obligation must hold: distinct parties
    /// and a strictly positive amount.
    ///
    /// Fields are public so records coming from storage can be built directly;
    /// the aggregator calls this on every record before using it.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.debtor == self.creditor {
            return Err(EngineError::InvalidObligation(format!(
                "user {} cannot owe themselves",
                self.debtor
            )));
        }
        if !self.amount.is_positive() {
            return Err(EngineError::InvalidObligation(format!(
                "amount owed by {} to {} must be > 0, got {}",
                self.debtor, self.creditor, self.amount
            )));
        }
        Ok(())
    }
}
