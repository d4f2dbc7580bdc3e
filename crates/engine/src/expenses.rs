//! Expenses and settle-up payments.
//!
//! An [`Expense`] is paid by one user and divided into [`Share`]s. Every share
//! held by someone other than the payer becomes an [`Obligation`] towards the
//! payer. A [`Payment`] records money handed over to settle a debt and
//! produces the reverse obligation, cancelling what it settles.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Obligation, ResultEngine, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub user_id: UserId,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: u64,
    pub title: String,
    pub amount: Money,
    pub paid_by: UserId,
    pub shares: Vec<Share>,
    pub occurred_at: DateTime<Utc>,
}

impl Expense {
    /// Builds an expense from explicit shares.
    ///
    /// The shares must cover the whole amount exactly, one share per user.
    pub fn with_shares(
        id: u64,
        title: &str,
        amount: Money,
        paid_by: UserId,
        shares: Vec<Share>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: title must not be empty"
            )));
        }
        if !amount.is_positive() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: amount must be > 0"
            )));
        }
        if shares.is_empty() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: at least one share is required"
            )));
        }

        let mut seen = BTreeSet::new();
        let mut covered = Money::ZERO;
        for share in &shares {
            if !seen.insert(share.user_id) {
                return Err(EngineError::InvalidExpense(format!(
                    "expense {id}: user {} has more than one share",
                    share.user_id
                )));
            }
            if share.amount.is_negative() {
                return Err(EngineError::InvalidExpense(format!(
                    "expense {id}: share of user {} is negative",
                    share.user_id
                )));
            }
            covered = covered.checked_add(share.amount).ok_or_else(|| {
                EngineError::InvalidAmount(format!("expense {id}: shares overflow"))
            })?;
        }
        if covered != amount {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: shares sum to {covered}, expected {amount}"
            )));
        }

        Ok(Self {
            id,
            title: title.to_string(),
            amount,
            paid_by,
            shares,
            occurred_at,
        })
    }

    /// Builds an expense split equally between `shared_with`.
    ///
    /// Participants are ordered by id; leftover cents go to the lowest ids so
    /// the shares always add up to `amount`.
    pub fn split_equally(
        id: u64,
        title: &str,
        amount: Money,
        paid_by: UserId,
        shared_with: &[UserId],
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let participants: BTreeSet<UserId> = shared_with.iter().copied().collect();
        if participants.len() != shared_with.len() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: duplicate participant"
            )));
        }
        if participants.is_empty() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: at least one participant is required"
            )));
        }
        if !amount.is_positive() {
            return Err(EngineError::InvalidExpense(format!(
                "expense {id}: amount must be > 0"
            )));
        }

        let shares = participants
            .iter()
            .zip(amount.split_even(participants.len())?)
            .map(|(&user_id, amount)| Share { user_id, amount })
            .collect();

        Self::with_shares(id, title, amount, paid_by, shares, occurred_at)
    }

    /// Share held by `user`, if any.
    #[must_use]
    pub fn share_of(&self, user: UserId) -> Option<Money> {
        self.shares
            .iter()
            .find(|share| share.user_id == user)
            .map(|share| share.amount)
    }

    /// One obligation per non-payer share with a positive amount.
    pub fn obligations(&self) -> impl Iterator<Item = Obligation> + '_ {
        self.shares
            .iter()
            .filter(|share| share.user_id != self.paid_by && share.amount.is_positive())
            .map(|share| Obligation {
                debtor: share.user_id,
                creditor: self.paid_by,
                amount: share.amount,
            })
    }
}

/// Money handed from `from` to `to` to settle outstanding debt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        from: UserId,
        to: UserId,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let payment = Self {
            from,
            to,
            amount,
            occurred_at,
        };
        payment.obligation().validate()?;
        Ok(payment)
    }

    /// After paying, the receiver owes the payer the amount handed over.
    #[must_use]
    pub fn obligation(&self) -> Obligation {
        Obligation {
            debtor: self.to,
            creditor: self.from,
            amount: self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn equal_split_assigns_remainder_to_lowest_ids() {
        let expense = Expense::split_equally(
            1,
            "Dinner",
            Money::new(1000),
            UserId(1),
            &[UserId(3), UserId(1), UserId(2)],
            at(),
        )
        .unwrap();
        assert_eq!(expense.share_of(UserId(1)), Some(Money::new(334)));
        assert_eq!(expense.share_of(UserId(2)), Some(Money::new(333)));
        assert_eq!(expense.share_of(UserId(3)), Some(Money::new(333)));
        assert_eq!(expense.share_of(UserId(4)), None);
    }

    #[test]
    fn payer_share_produces_no_obligation() {
        let expense = Expense::split_equally(
            1,
            "Taxi",
            Money::new(9000),
            UserId(1),
            &[UserId(1), UserId(2), UserId(3)],
            at(),
        )
        .unwrap();
        let obligations: Vec<Obligation> = expense.obligations().collect();
        assert_eq!(
            obligations,
            vec![
                Obligation {
                    debtor: UserId(2),
                    creditor: UserId(1),
                    amount: Money::new(3000),
                },
                Obligation {
                    debtor: UserId(3),
                    creditor: UserId(1),
                    amount: Money::new(3000),
                },
            ]
        );
    }

    #[test]
    fn zero_shares_are_skipped() {
        let expense = Expense::split_equally(
            1,
            "Gum",
            Money::new(1),
            UserId(1),
            &[UserId(1), UserId(2), UserId(3)],
            at(),
        )
        .unwrap();
        assert_eq!(expense.obligations().count(), 0);
    }

    #[test]
    fn shares_must_cover_amount() {
        let err = Expense::with_shares(
            7,
            "Groceries",
            Money::new(1000),
            UserId(1),
            vec![
                Share {
                    user_id: UserId(1),
                    amount: Money::new(500),
                },
                Share {
                    user_id: UserId(2),
                    amount: Money::new(400),
                },
            ],
            at(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidExpense(
                "expense 7: shares sum to 9.00, expected 10.00".to_string()
            )
        );
    }

    #[test]
    fn rejects_duplicate_participants_and_empty_title() {
        assert!(
            Expense::split_equally(
                1,
                "Dinner",
                Money::new(1000),
                UserId(1),
                &[UserId(2), UserId(2)],
                at()
            )
            .is_err()
        );
        assert!(
            Expense::split_equally(1, "  ", Money::new(1000), UserId(1), &[UserId(2)], at())
                .is_err()
        );
        assert!(Expense::split_equally(1, "Dinner", Money::new(1000), UserId(1), &[], at()).is_err());
    }

    #[test]
    fn payment_reverses_direction() {
        let payment = Payment::new(UserId(2), UserId(1), Money::new(2500), at()).unwrap();
        assert_eq!(
            payment.obligation(),
            Obligation {
                debtor: UserId(1),
                creditor: UserId(2),
                amount: Money::new(2500),
            }
        );
        assert!(Payment::new(UserId(2), UserId(2), Money::new(2500), at()).is_err());
        assert!(Payment::new(UserId(2), UserId(1), Money::ZERO, at()).is_err());
    }
}
