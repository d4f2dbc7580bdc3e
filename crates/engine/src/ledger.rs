//! Ledger snapshot.
//!
//! A [`Ledger`] is the consistent set of expenses and payments handed to the
//! engine by the storage layer. The engine only reads it: every query returns
//! fresh values and leaves the snapshot untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    EngineError, Expense, Money, NetBalance, Obligation, Payment, ResultEngine,
    SettlementTransaction, UserId, aggregate, pairwise, plan,
};

/// One row of a user's expense history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub expense_id: u64,
    pub title: String,
    pub total_amount: Money,
    pub paid_by: UserId,
    pub user_share: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Total paid for expenses by one user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PayerTotal {
    pub user_id: UserId,
    pub total_paid: Money,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    pub expenses: Vec<Expense>,
    pub payments: Vec<Payment>,
}

impl Ledger {
    #[must_use]
    pub fn new(expenses: Vec<Expense>, payments: Vec<Payment>) -> Self {
        Self { expenses, payments }
    }

    /// All obligations: expenses first, then payments, each in input order.
    #[must_use]
    pub fn obligations(&self) -> Vec<Obligation> {
        self.expenses
            .iter()
            .flat_map(Expense::obligations)
            .chain(self.payments.iter().map(Payment::obligation))
            .collect()
    }

    /// Entries that happened in `[from, to)`. A missing bound is open.
    #[must_use]
    pub fn between(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Ledger {
        let within = |at: DateTime<Utc>| {
            from.is_none_or(|from| at >= from) && to.is_none_or(|to| at < to)
        };
        Ledger {
            expenses: self
                .expenses
                .iter()
                .filter(|expense| within(expense.occurred_at))
                .cloned()
                .collect(),
            payments: self
                .payments
                .iter()
                .filter(|payment| within(payment.occurred_at))
                .copied()
                .collect(),
        }
    }

    pub fn balances(&self) -> ResultEngine<NetBalance> {
        aggregate(&self.obligations())
    }

    pub fn simplify(&self) -> ResultEngine<Vec<SettlementTransaction>> {
        plan(&self.balances()?)
    }

    /// Who owes whom among the counterparts of `user`, netted per pair.
    pub fn positions_for(&self, user: UserId) -> ResultEngine<Vec<Obligation>> {
        Ok(pairwise(&self.obligations())?.positions_for(user))
    }

    /// Expenses in which `user` holds a share, newest first.
    #[must_use]
    pub fn history(&self, user: UserId) -> Vec<HistoryEntry> {
        let mut history: Vec<HistoryEntry> = self
            .expenses
            .iter()
            .filter_map(|expense| {
                expense.share_of(user).map(|user_share| HistoryEntry {
                    expense_id: expense.id,
                    title: expense.title.clone(),
                    total_amount: expense.amount,
                    paid_by: expense.paid_by,
                    user_share,
                    occurred_at: expense.occurred_at,
                })
            })
            .collect();
        history.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(b.expense_id.cmp(&a.expense_id))
        });
        history
    }

    /// Payments sent or received by `user`, newest first.
    #[must_use]
    pub fn payments_for(&self, user: UserId) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|payment| payment.from == user || payment.to == user)
            .copied()
            .collect();
        payments.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        payments
    }

    /// The `limit` users who paid the most, ties by ascending id.
    pub fn leaderboard(&self, limit: usize) -> ResultEngine<Vec<PayerTotal>> {
        let mut totals: BTreeMap<UserId, Money> = BTreeMap::new();
        for expense in &self.expenses {
            let total = totals.entry(expense.paid_by).or_default();
            *total = total.checked_add(expense.amount).ok_or_else(|| {
                EngineError::InvalidAmount("total paid overflow".to_string())
            })?;
        }

        let mut board: Vec<PayerTotal> = totals
            .into_iter()
            .map(|(user_id, total_paid)| PayerTotal {
                user_id,
                total_paid,
            })
            .collect();
        board.sort_by(|a, b| {
            b.total_paid
                .cmp(&a.total_paid)
                .then(a.user_id.cmp(&b.user_id))
        });
        board.truncate(limit);
        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, 9, 30, 0).unwrap()
    }

    fn ledger() -> Ledger {
        let expenses = vec![
            Expense::split_equally(
                1,
                "Groceries",
                Money::new(9000),
                UserId(1),
                &[UserId(1), UserId(2), UserId(3)],
                day(1),
            )
            .unwrap(),
            Expense::split_equally(
                2,
                "Cinema",
                Money::new(2000),
                UserId(2),
                &[UserId(1), UserId(2)],
                day(3),
            )
            .unwrap(),
        ];
        let payments = vec![Payment::new(UserId(3), UserId(1), Money::new(1000), day(5)).unwrap()];
        Ledger::new(expenses, payments)
    }

    #[test]
    fn balances_include_payments() {
        let balances = ledger().balances().unwrap();
        assert_eq!(balances.get(UserId(1)), Money::new(4000));
        assert_eq!(balances.get(UserId(2)), Money::new(-2000));
        assert_eq!(balances.get(UserId(3)), Money::new(-2000));
    }

    #[test]
    fn simplify_settles_everyone() {
        let plan = ledger().simplify().unwrap();
        assert_eq!(
            plan,
            vec![
                SettlementTransaction {
                    from: UserId(2),
                    to: UserId(1),
                    amount: Money::new(2000),
                },
                SettlementTransaction {
                    from: UserId(3),
                    to: UserId(1),
                    amount: Money::new(2000),
                },
            ]
        );
    }

    #[test]
    fn between_filters_half_open_window() {
        let window = ledger().between(Some(day(1)), Some(day(3)));
        assert_eq!(window.expenses.len(), 1);
        assert_eq!(window.expenses[0].id, 1);
        assert!(window.payments.is_empty());

        let open = ledger().between(Some(day(2)), None);
        assert_eq!(open.expenses.len(), 1);
        assert_eq!(open.payments.len(), 1);
    }

    #[test]
    fn positions_net_each_counterpart() {
        let positions = ledger().positions_for(UserId(1)).unwrap();
        assert_eq!(
            positions,
            vec![
                Obligation {
                    debtor: UserId(2),
                    creditor: UserId(1),
                    amount: Money::new(2000),
                },
                Obligation {
                    debtor: UserId(3),
                    creditor: UserId(1),
                    amount: Money::new(2000),
                },
            ]
        );
    }

    #[test]
    fn history_is_newest_first() {
        let history = ledger().history(UserId(1));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].expense_id, 2);
        assert_eq!(history[0].user_share, Money::new(1000));
        assert_eq!(history[1].expense_id, 1);
        assert_eq!(history[1].user_share, Money::new(3000));

        assert_eq!(ledger().history(UserId(3)).len(), 1);
        assert!(ledger().history(UserId(9)).is_empty());
    }

    #[test]
    fn payments_for_matches_both_directions() {
        assert_eq!(ledger().payments_for(UserId(1)).len(), 1);
        assert_eq!(ledger().payments_for(UserId(3)).len(), 1);
        assert!(ledger().payments_for(UserId(2)).is_empty());
    }

    #[test]
    fn leaderboard_ranks_by_total_paid() {
        let board = ledger().leaderboard(5).unwrap();
        assert_eq!(
            board,
            vec![
                PayerTotal {
                    user_id: UserId(1),
                    total_paid: Money::new(9000),
                },
                PayerTotal {
                    user_id: UserId(2),
                    total_paid: Money::new(2000),
                },
            ]
        );
        assert_eq!(ledger().leaderboard(1).unwrap().len(), 1);
    }
}
