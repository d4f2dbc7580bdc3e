//! Settlement planning.
//!
//! Turns a zero-sum [`NetBalance`] into the payments that settle it. The
//! planner repeatedly matches the largest debtor with the largest creditor
//! and moves `min(debt, credit)` between them. Every step settles at least
//! one party, so `n` non-zero balances need at most `n - 1` payments.
//!
//! Equal amounts are ordered by ascending [`UserId`], which makes the output
//! a function of the balances alone.

use std::{cmp::Reverse, collections::BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, NetBalance, Obligation, ResultEngine, UserId, aggregate};

/// One payment instruction: `from` pays `to` the given `amount`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTransaction {
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
}

/// Max-heap entry: largest magnitude first, then lowest id.
type Party = (Money, Reverse<UserId>);

/// Plans the settlement payments for `balances`.
///
/// Fails with [`EngineError::ImbalancedLedger`] when the balances do not sum to
/// zero, which includes the case of a single non-zero balance.
pub fn plan(balances: &NetBalance) -> ResultEngine<Vec<SettlementTransaction>> {
    let mut debtors: BinaryHeap<Party> = BinaryHeap::new();
    let mut creditors: BinaryHeap<Party> = BinaryHeap::new();
    for (user, amount) in balances.iter() {
        if amount.is_negative() {
            let debt = amount.checked_neg().ok_or_else(|| {
                EngineError::InvalidAmount(format!("debt of user {user} is out of range"))
            })?;
            debtors.push((debt, Reverse(user)));
        } else if amount.is_positive() {
            creditors.push((amount, Reverse(user)));
        }
    }

    if debtors.len() + creditors.len() == 1 {
        tracing::warn!("single non-zero balance, nothing to settle against");
        return Err(EngineError::ImbalancedLedger(
            "a single non-zero balance cannot be settled".to_string(),
        ));
    }
    balances.ensure_balanced()?;

    let parties = debtors.len() + creditors.len();
    let mut transactions = Vec::with_capacity(parties.saturating_sub(1));
    loop {
        let (Some(&(debt, Reverse(debtor))), Some(&(credit, Reverse(creditor)))) =
            (debtors.peek(), creditors.peek())
        else {
            break;
        };
        debtors.pop();
        creditors.pop();

        let amount = debt.min(credit);
        transactions.push(SettlementTransaction {
            from: debtor,
            to: creditor,
            amount,
        });

        let debt = debt - amount;
        if !debt.is_zero() {
            debtors.push((debt, Reverse(debtor)));
        }
        let credit = credit - amount;
        if !credit.is_zero() {
            creditors.push((credit, Reverse(creditor)));
        }
    }

    // Both heaps drain together when the balances sum to zero.
    if !debtors.is_empty() || !creditors.is_empty() {
        return Err(EngineError::ImbalancedLedger(format!(
            "{} debtors and {} creditors left unmatched",
            debtors.len(),
            creditors.len()
        )));
    }

    tracing::debug!(
        parties,
        transactions = transactions.len(),
        "planned settlement"
    );
    Ok(transactions)
}

/// Aggregates `obligations` and plans their settlement in one call.
pub fn simplify(obligations: &[Obligation]) -> ResultEngine<Vec<SettlementTransaction>> {
    plan(&aggregate(obligations)?)
}
