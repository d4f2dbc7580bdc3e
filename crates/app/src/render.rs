//! Output rendering: plain text for people, pretty JSON for scripts.

use engine::{
    HistoryEntry, Money, NetBalance, Obligation, PayerTotal, Payment, SettlementTransaction,
    UserId,
};
use serde::Serialize;

use crate::{error::Result, settings::Format};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

fn emit<T: Serialize + ?Sized>(
    value: &T,
    format: Format,
    text: impl FnOnce() -> String,
) -> Result<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(value)?),
        Format::Text => Ok(text()),
    }
}

fn lines<T>(items: &[T], empty: &str, line: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(line).collect::<Vec<_>>().join("\n")
}

pub fn balances(balances: &NetBalance, format: Format) -> Result<String> {
    emit(balances, format, || {
        let rows: Vec<(UserId, Money)> = balances.iter().collect();
        lines(&rows, "Everyone is settled up.", |(user, amount)| {
            let role = if amount.is_positive() { "is owed" } else { "owes" };
            format!("user {user}: {role} {}", amount.abs())
        })
    })
}

pub fn settlements(settlements: &[SettlementTransaction], format: Format) -> Result<String> {
    emit(settlements, format, || {
        lines(settlements, "Nothing to settle.", |tx| {
            format!("user {} pays user {} {}", tx.from, tx.to, tx.amount)
        })
    })
}

/// Directed debts seen from `user`.
pub fn positions(user: UserId, positions: &[Obligation], format: Format) -> Result<String> {
    emit(positions, format, || {
        lines(positions, "No open debts.", |obligation| {
            if obligation.debtor == user {
                format!("you owe user {} {}", obligation.creditor, obligation.amount)
            } else {
                format!("user {} owes you {}", obligation.debtor, obligation.amount)
            }
        })
    })
}

pub fn history(history: &[HistoryEntry], format: Format) -> Result<String> {
    emit(history, format, || {
        lines(history, "No expenses.", |entry| {
            format!(
                "{} #{} {}: total {}, paid by user {}, your share {}",
                entry.occurred_at.format(DATE_FORMAT),
                entry.expense_id,
                entry.title,
                entry.total_amount,
                entry.paid_by,
                entry.user_share
            )
        })
    })
}

pub fn payments(payments: &[Payment], format: Format) -> Result<String> {
    emit(payments, format, || {
        lines(payments, "No payments.", |payment| {
            format!(
                "{} user {} paid user {} {}",
                payment.occurred_at.format(DATE_FORMAT),
                payment.from,
                payment.to,
                payment.amount
            )
        })
    })
}

pub fn leaderboard(board: &[PayerTotal], format: Format) -> Result<String> {
    emit(board, format, || {
        let ranked: Vec<(usize, &PayerTotal)> = board.iter().enumerate().collect();
        lines(&ranked, "No expenses.", |(index, total)| {
            format!(
                "{}. user {} paid {}",
                index + 1,
                total.user_id,
                total.total_paid
            )
        })
    })
}
