//! Balance aggregation.
//!
//! Folds a batch of [`Obligation`]s into one signed [`NetBalance`] per user:
//!
//! - positive = the group owes the user money
//! - negative = the user owes the group money
//!
//! Obligations between the same two users are first netted per pair
//! ([`PairwiseNet`]) so that `A -> B` and `B -> A` cancel before reaching the
//! global balance. Users whose balance ends at zero are left out of the map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{EngineError, Money, Obligation, ResultEngine, UserId};

fn overflow() -> EngineError {
    EngineError::InvalidAmount("balance overflow".to_string())
}

/// Adds `amount` to `total`. The result must stay negatable, so `i64::MIN`
/// cents counts as overflow too.
fn accumulate(total: Money, amount: Money) -> ResultEngine<Money> {
    total
        .checked_add(amount)
        .filter(|sum| sum.checked_neg().is_some())
        .ok_or_else(overflow)
}

/// Net amount per unordered pair of users.
///
/// Keys are `(low, high)` with `low < high`. A positive value means `low`
/// owes `high`, a negative one means `high` owes `low`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairwiseNet {
    pairs: BTreeMap<(UserId, UserId), Money>,
}

impl PairwiseNet {
    fn record(&mut self, obligation: &Obligation) -> ResultEngine<()> {
        let (key, signed) = if obligation.debtor < obligation.creditor {
            ((obligation.debtor, obligation.creditor), obligation.amount)
        } else {
            ((obligation.creditor, obligation.debtor), -obligation.amount)
        };
        let net = self.pairs.entry(key).or_default();
        *net = accumulate(*net, signed)?;
        Ok(())
    }

    /// Number of pairs with any recorded obligation (including netted-out ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// One directed obligation per pair whose net is not zero, in pair order.
    #[must_use]
    pub fn obligations(&self) -> Vec<Obligation> {
        self.pairs
            .iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|(&(low, high), &net)| {
                if net.is_positive() {
                    Obligation {
                        debtor: low,
                        creditor: high,
                        amount: net,
                    }
                } else {
                    Obligation {
                        debtor: high,
                        creditor: low,
                        amount: -net,
                    }
                }
            })
            .collect()
    }

    /// The netted obligations in which `user` is either party.
    #[must_use]
    pub fn positions_for(&self, user: UserId) -> Vec<Obligation> {
        self.obligations()
            .into_iter()
            .filter(|obligation| obligation.debtor == user || obligation.creditor == user)
            .collect()
    }
}

/// Nets every pair of users, rejecting the whole batch on the first invalid
/// obligation.
pub fn pairwise(obligations: &[Obligation]) -> ResultEngine<PairwiseNet> {
    let mut net = PairwiseNet::default();
    for obligation in obligations {
        obligation.validate()?;
        net.record(obligation)?;
    }
    Ok(net)
}

/// Signed net balance per user, ordered by user id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetBalance {
    balances: BTreeMap<UserId, Money>,
}

impl NetBalance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `user`; users absent from the map are settled.
    #[must_use]
    pub fn get(&self, user: UserId) -> Money {
        self.balances.get(&user).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserId, Money)> + '_ {
        self.balances.iter().map(|(&user, &amount)| (user, amount))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Builds balances from `(user, amount)` pairs, summing repeated users.
    ///
    /// Zero entries are kept; the planner skips them.
    pub fn from_entries<I>(entries: I) -> ResultEngine<Self>
    where
        I: IntoIterator<Item = (UserId, Money)>,
    {
        let mut balances = Self::new();
        for (user, amount) in entries {
            balances.credit(user, amount)?;
        }
        Ok(balances)
    }

    /// Sum of all balances.
    pub fn total(&self) -> ResultEngine<Money> {
        self.balances
            .values()
            .try_fold(Money::ZERO, |acc, &amount| acc.checked_add(amount))
            .ok_or_else(overflow)
    }

    /// Fails with [`EngineError::ImbalancedLedger`] unless the balances sum
    /// to exactly zero.
    pub fn ensure_balanced(&self) -> ResultEngine<()> {
        let total = self.total()?;
        if !total.is_zero() {
            tracing::warn!(users = self.len(), %total, "net balances do not sum to zero");
            return Err(EngineError::ImbalancedLedger(format!(
                "balances sum to {total} across {} users",
                self.len()
            )));
        }
        Ok(())
    }

    fn credit(&mut self, user: UserId, amount: Money) -> ResultEngine<()> {
        let balance = self.balances.entry(user).or_default();
        *balance = accumulate(*balance, amount)?;
        Ok(())
    }
}

/// Reduces obligations to one net balance per user.
///
/// The batch is rejected as a whole if any obligation is invalid. Users that
/// end up settled are omitted from the result.
pub fn aggregate(obligations: &[Obligation]) -> ResultEngine<NetBalance> {
    let net = pairwise(obligations)?;

    let mut balances = NetBalance::new();
    for obligation in net.obligations() {
        balances.credit(obligation.debtor, -obligation.amount)?;
        balances.credit(obligation.creditor, obligation.amount)?;
    }
    balances.balances.retain(|_, amount| !amount.is_zero());

    tracing::debug!(
        obligations = obligations.len(),
        pairs = net.len(),
        users = balances.len(),
        "aggregated obligations"
    );
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owes(debtor: u64, creditor: u64, cents: i64) -> Obligation {
        Obligation {
            debtor: UserId(debtor),
            creditor: UserId(creditor),
            amount: Money::new(cents),
        }
    }

    #[test]
    fn empty_input_gives_empty_balances() {
        let balances = aggregate(&[]).unwrap();
        assert!(balances.is_empty());
        assert_eq!(balances.total().unwrap(), Money::ZERO);
    }

    #[test]
    fn folds_debtors_and_creditor() {
        let balances = aggregate(&[owes(2, 1, 5000), owes(3, 1, 3000)]).unwrap();
        assert_eq!(balances.get(UserId(1)), Money::new(8000));
        assert_eq!(balances.get(UserId(2)), Money::new(-5000));
        assert_eq!(balances.get(UserId(3)), Money::new(-3000));
        assert_eq!(balances.len(), 3);
    }

    #[test]
    fn mutual_debts_are_netted_per_pair() {
        let netted = aggregate(&[owes(1, 2, 1000), owes(2, 1, 400)]).unwrap();
        let direct = aggregate(&[owes(1, 2, 600)]).unwrap();
        assert_eq!(netted, direct);

        let net = pairwise(&[owes(1, 2, 1000), owes(2, 1, 400)]).unwrap();
        assert_eq!(net.obligations(), vec![owes(1, 2, 600)]);
    }

    #[test]
    fn fully_cancelled_pair_is_omitted() {
        let balances = aggregate(&[owes(1, 2, 1000), owes(2, 1, 1000)]).unwrap();
        assert!(balances.is_empty());

        let net = pairwise(&[owes(1, 2, 1000), owes(2, 1, 1000)]).unwrap();
        assert_eq!(net.len(), 1);
        assert!(net.obligations().is_empty());
    }

    #[test]
    fn invalid_obligation_fails_whole_batch() {
        let err = aggregate(&[owes(2, 1, 5000), owes(3, 3, 100)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidObligation(_)));

        let err = aggregate(&[owes(2, 1, 0)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidObligation(_)));
    }

    #[test]
    fn positions_only_include_the_user() {
        let net = pairwise(&[owes(2, 1, 500), owes(3, 1, 300), owes(3, 2, 100), owes(1, 3, 50)])
            .unwrap();
        assert_eq!(
            net.positions_for(UserId(3)),
            vec![owes(3, 1, 250), owes(3, 2, 100)]
        );
        assert_eq!(
            net.positions_for(UserId(1)),
            vec![owes(2, 1, 500), owes(3, 1, 250)]
        );
    }

    #[test]
    fn ensure_balanced_detects_leaks() {
        let balances =
            NetBalance::from_entries([(UserId(1), Money::new(100)), (UserId(2), Money::new(-99))])
                .unwrap();
        let err = balances.ensure_balanced().unwrap_err();
        assert!(matches!(err, EngineError::ImbalancedLedger(_)));
    }

    #[test]
    fn from_entries_sums_repeated_users() {
        let balances = NetBalance::from_entries([
            (UserId(1), Money::new(100)),
            (UserId(1), Money::new(50)),
            (UserId(2), Money::new(-150)),
        ])
        .unwrap();
        assert_eq!(balances.get(UserId(1)), Money::new(150));
        assert!(balances.ensure_balanced().is_ok());
    }

    #[test]
    fn from_entries_rejects_overflowing_user() {
        let err = NetBalance::from_entries([
            (UserId(1), Money::new(i64::MAX)),
            (UserId(1), Money::new(1)),
        ])
        .unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));

        let err = NetBalance::from_entries([(UserId(1), Money::new(i64::MIN))]).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));
    }

    #[test]
    fn total_overflow_is_invalid_amount() {
        let balances =
            NetBalance::from_entries([(UserId(1), Money::new(i64::MAX)), (UserId(2), Money::new(1))])
                .unwrap();
        assert_eq!(
            balances.total().unwrap_err(),
            EngineError::InvalidAmount("balance overflow".to_string())
        );
        assert!(matches!(
            balances.ensure_balanced(),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn pair_overflow_is_invalid_amount() {
        let err = pairwise(&[owes(1, 2, i64::MAX), owes(1, 2, 1)]).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));

        // Net of `i64::MIN` in the other direction cannot be flipped.
        let err = pairwise(&[owes(2, 1, i64::MAX), owes(2, 1, 1)]).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));
    }

    #[test]
    fn user_balance_overflow_is_invalid_amount() {
        // Each pair is in range, user 2 collects from both.
        let err = aggregate(&[owes(1, 2, i64::MAX), owes(3, 2, 1)]).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));
    }

    #[test]
    fn debt_of_i64_min_cents_is_rejected() {
        let err = aggregate(&[owes(1, 2, i64::MAX), owes(1, 3, 1)]).unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("balance overflow".to_string()));
    }
}
