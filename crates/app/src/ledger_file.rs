//! Ledger files.
//!
//! Two formats are accepted:
//!
//! - `.json`: a full snapshot, `{ "expenses": [...], "payments": [...] }`.
//!   Each expense sets either `shared_with` (equal split) or `shares`.
//! - `.csv`: raw obligations with header `debtor,creditor,amount`.
//!
//! Obligations read from CSV are not validated here: the aggregator rejects
//! the whole batch on the first invalid row.

use std::{fs::File, io::Read, path::Path};

use chrono::{DateTime, Utc};
use engine::{
    Expense, Ledger, Money, NetBalance, Obligation, Payment, SettlementTransaction, Share, UserId,
    aggregate, pairwise,
};
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LedgerFile {
    #[serde(default)]
    expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    payments: Vec<PaymentRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExpenseRecord {
    id: u64,
    title: String,
    amount: Money,
    paid_by: UserId,
    shared_with: Option<Vec<UserId>>,
    shares: Option<Vec<Share>>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRecord> for Expense {
    type Error = AppError;

    fn try_from(record: ExpenseRecord) -> Result<Self> {
        let expense = match (record.shared_with, record.shares) {
            (Some(shared_with), None) => Expense::split_equally(
                record.id,
                &record.title,
                record.amount,
                record.paid_by,
                &shared_with,
                record.occurred_at,
            )?,
            (None, Some(shares)) => Expense::with_shares(
                record.id,
                &record.title,
                record.amount,
                record.paid_by,
                shares,
                record.occurred_at,
            )?,
            _ => {
                return Err(AppError::Ledger(format!(
                    "expense {}: set exactly one of `shared_with` or `shares`",
                    record.id
                )));
            }
        };
        Ok(expense)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PaymentRecord {
    from: UserId,
    to: UserId,
    amount: Money,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ObligationRow {
    debtor: UserId,
    creditor: UserId,
    amount: String,
}

/// What a ledger file contained.
#[derive(Debug)]
pub enum Input {
    Ledger(Ledger),
    Obligations(Vec<Obligation>),
}

impl Input {
    pub fn balances(&self) -> Result<NetBalance> {
        let balances = match self {
            Self::Ledger(ledger) => ledger.balances()?,
            Self::Obligations(obligations) => aggregate(obligations)?,
        };
        Ok(balances)
    }

    pub fn simplify(&self) -> Result<Vec<SettlementTransaction>> {
        let settlements = match self {
            Self::Ledger(ledger) => ledger.simplify()?,
            Self::Obligations(obligations) => engine::simplify(obligations)?,
        };
        Ok(settlements)
    }

    /// Netted debts in which `user` is either party.
    pub fn positions_for(&self, user: UserId) -> Result<Vec<Obligation>> {
        let positions = match self {
            Self::Ledger(ledger) => ledger.positions_for(user)?,
            Self::Obligations(obligations) => pairwise(obligations)?.positions_for(user),
        };
        Ok(positions)
    }

    /// The full snapshot, for commands that need expenses and payments.
    pub fn ledger(&self, command: &str) -> Result<&Ledger> {
        match self {
            Self::Ledger(ledger) => Ok(ledger),
            Self::Obligations(_) => Err(AppError::Unsupported(format!(
                "`{command}` needs a JSON ledger, CSV files only carry obligations"
            ))),
        }
    }

    /// Restricts the input to `[since, until)`.
    pub fn between(
        self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if since.is_none() && until.is_none() {
            return Ok(self);
        }
        match self {
            Self::Ledger(ledger) => Ok(Self::Ledger(ledger.between(since, until))),
            Self::Obligations(_) => Err(AppError::Unsupported(
                "time windows need a JSON ledger, CSV obligations carry no dates".to_string(),
            )),
        }
    }
}

/// Loads a ledger file, picking the format from its extension.
pub fn load(path: &Path) -> Result<Input> {
    let file = File::open(path)?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let input = if is_csv {
        Input::Obligations(parse_csv(file)?)
    } else {
        Input::Ledger(parse_json(file)?)
    };

    match &input {
        Input::Ledger(ledger) => tracing::info!(
            path = %path.display(),
            expenses = ledger.expenses.len(),
            payments = ledger.payments.len(),
            "loaded ledger"
        ),
        Input::Obligations(obligations) => tracing::info!(
            path = %path.display(),
            obligations = obligations.len(),
            "loaded obligations"
        ),
    }
    Ok(input)
}

pub fn parse_json(reader: impl Read) -> Result<Ledger> {
    let file: LedgerFile = serde_json::from_reader(reader)?;
    let expenses = file
        .expenses
        .into_iter()
        .map(Expense::try_from)
        .collect::<Result<Vec<_>>>()?;
    let payments = file
        .payments
        .into_iter()
        .map(|record| Payment::new(record.from, record.to, record.amount, record.occurred_at))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Ledger::new(expenses, payments))
}

pub fn parse_csv(reader: impl Read) -> Result<Vec<Obligation>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut obligations = Vec::new();
    for row in reader.deserialize() {
        let row: ObligationRow = row?;
        obligations.push(Obligation {
            debtor: row.debtor,
            creditor: row.creditor,
            amount: row.amount.parse::<Money>()?,
        });
    }
    Ok(obligations)
}
