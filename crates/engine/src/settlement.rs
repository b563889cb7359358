//! Balance computation and debt simplification.
//!
//! `compute_settlement` is pure: given a snapshot of users and expenses it
//! produces per-user balances and a greedy transfer plan extinguishing
//! them. It never errors; dangling references, malformed amounts and empty
//! inputs all degrade to best-effort zeros.
//!
//! The transfer plan pairs the largest debtor with the largest creditor
//! first (a two-pointer merge over the sorted balance partitions). That
//! keeps the transaction count small in the common case but is not a
//! provably minimum-count solution; the plan is deterministic because both
//! sorts are stable and break ties by user insertion order.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::records::{Expense, User};

/// Balances within this magnitude of zero are considered settled.
pub const SETTLED_TOLERANCE: f64 = 0.01;

/// A user's net position. Positive = is owed money, negative = owes money.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub name: String,
    pub net: f64,
    pub total_paid: f64,
    pub total_share: f64,
}

impl Balance {
    fn new(name: String) -> Self {
        Self {
            name,
            net: 0.0,
            total_paid: 0.0,
            total_share: 0.0,
        }
    }
}

/// One transfer of the settlement plan. `amount` is rounded to whole
/// currency units; sub-unit remainders stay in the internal balances and
/// never surface as transfers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

/// Derived settlement state: balances in user insertion order plus the
/// transfer plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub balances: Vec<Balance>,
    pub debts: Vec<Debt>,
}

/// Computes per-user balances and the greedy transfer plan.
///
/// Tolerance rules, preserved from the observed behavior:
/// - an expense whose payer is not a current user contributes no credit,
///   but its shares are still debited from matching current users;
/// - involved names that are not current users are dropped; when none
///   remain the expense is re-split across *all* current users;
/// - no users means empty balances and no debts.
pub fn compute_settlement(users: &[User], expenses: &[Expense]) -> Settlement {
    if users.is_empty() {
        return Settlement::default();
    }

    let mut balances: Vec<Balance> = Vec::with_capacity(users.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(users.len());
    for user in users {
        if !index.contains_key(user.name.as_str()) {
            index.insert(user.name.as_str(), balances.len());
            balances.push(Balance::new(user.name.clone()));
        }
    }

    for expense in expenses {
        let amount = if expense.amount.is_finite() {
            expense.amount
        } else {
            0.0
        };

        let involved: Vec<usize> = expense
            .involved
            .iter()
            .filter_map(|name| index.get(name.as_str()).copied())
            .collect();
        let split_among: Vec<usize> = if involved.is_empty() {
            (0..balances.len()).collect()
        } else {
            involved
        };
        let share = amount / split_among.len() as f64;

        if let Some(&payer) = index.get(expense.payer.as_str()) {
            balances[payer].net += amount;
            balances[payer].total_paid += amount;
        }
        for participant in split_among {
            balances[participant].net -= share;
            balances[participant].total_share += share;
        }
    }

    let debts = simplify(&balances);
    Settlement { balances, debts }
}

/// Two-pointer merge over the sorted debtor/creditor partitions.
fn simplify(balances: &[Balance]) -> Vec<Debt> {
    let mut debtors: Vec<(usize, f64)> = balances
        .iter()
        .enumerate()
        .filter(|(_, balance)| balance.net < -SETTLED_TOLERANCE)
        .map(|(position, balance)| (position, balance.net))
        .collect();
    // Stable sorts: equal balances keep insertion order, which makes the
    // emitted plan deterministic.
    debtors.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut creditors: Vec<(usize, f64)> = balances
        .iter()
        .enumerate()
        .filter(|(_, balance)| balance.net > SETTLED_TOLERANCE)
        .map(|(position, balance)| (position, balance.net))
        .collect();
    creditors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let mut debts = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].1.abs().min(creditors[j].1);

        // Transfers are displayed in whole units; an amount that rounds to
        // zero would be an empty instruction, so it is not emitted even
        // though the residual stays in the balances.
        let rounded = amount.round();
        if amount > SETTLED_TOLERANCE && rounded >= 1.0 {
            debts.push(Debt {
                from: balances[debtors[i].0].name.clone(),
                to: balances[creditors[j].0].name.clone(),
                amount: rounded,
            });
        }

        debtors[i].1 += amount;
        creditors[j].1 -= amount;

        // Both pointers may advance at once when the pair settles exactly.
        if debtors[i].1.abs() < SETTLED_TOLERANCE {
            i += 1;
        }
        if creditors[j].1 < SETTLED_TOLERANCE {
            j += 1;
        }
    }

    debts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: name.to_lowercase(),
            name: name.to_string(),
        }
    }

    fn expense(payer: &str, amount: f64, involved: &[&str]) -> Expense {
        Expense {
            id: format!("e{payer}{amount}"),
            payer: payer.to_string(),
            amount,
            description: String::new(),
            date: "2025-10-01T00:00:00Z".to_string(),
            involved: involved.iter().map(|name| name.to_string()).collect(),
        }
    }

    fn net(settlement: &Settlement, name: &str) -> f64 {
        settlement
            .balances
            .iter()
            .find(|balance| balance.name == name)
            .map(|balance| balance.net)
            .unwrap()
    }

    #[test]
    fn three_way_split_produces_expected_plan() {
        let users = [user("Alice"), user("Bob"), user("Cara")];
        let expenses = [expense("Alice", 300.0, &["Alice", "Bob", "Cara"])];

        let settlement = compute_settlement(&users, &expenses);

        assert!((net(&settlement, "Alice") - 200.0).abs() < 1e-9);
        assert!((net(&settlement, "Bob") + 100.0).abs() < 1e-9);
        assert!((net(&settlement, "Cara") + 100.0).abs() < 1e-9);

        // Bob before Cara: equal debts keep insertion order.
        assert_eq!(
            settlement.debts,
            vec![
                Debt {
                    from: "Bob".to_string(),
                    to: "Alice".to_string(),
                    amount: 100.0,
                },
                Debt {
                    from: "Cara".to_string(),
                    to: "Alice".to_string(),
                    amount: 100.0,
                },
            ]
        );
    }

    #[test]
    fn no_users_yields_empty_settlement() {
        let settlement = compute_settlement(&[], &[expense("Ghost", 50.0, &[])]);
        assert!(settlement.balances.is_empty());
        assert!(settlement.debts.is_empty());
    }

    #[test]
    fn unknown_payer_is_dropped_but_shares_still_apply() {
        let users = [user("Alice"), user("Bob")];
        let expenses = [expense("Ghost", 100.0, &["Alice", "Bob"])];

        let settlement = compute_settlement(&users, &expenses);

        // Nobody gets the credit, both still owe their share.
        assert!((net(&settlement, "Alice") + 50.0).abs() < 1e-9);
        assert!((net(&settlement, "Bob") + 50.0).abs() < 1e-9);
    }

    #[test]
    fn dangling_involved_set_resplits_across_everyone() {
        let users = [user("Alice"), user("Bob")];
        let expenses = [expense("Alice", 80.0, &["Removed", "AlsoGone"])];

        let settlement = compute_settlement(&users, &expenses);

        assert!((net(&settlement, "Alice") - 40.0).abs() < 1e-9);
        assert!((net(&settlement, "Bob") + 40.0).abs() < 1e-9);
    }

    #[test]
    fn balances_sum_to_zero() {
        let users = [user("Alice"), user("Bob"), user("Cara"), user("Dan")];
        let expenses = [
            expense("Alice", 123.45, &["Alice", "Bob"]),
            expense("Bob", 77.0, &["Cara"]),
            expense("Cara", 19.99, &[]),
            expense("Dan", 250.0, &["Alice", "Bob", "Cara", "Dan"]),
            expense("Ghost", 42.0, &["Dan"]),
        ];

        let settlement = compute_settlement(&users, &expenses);
        let total: f64 = settlement.balances.iter().map(|balance| balance.net).sum();
        // The unknown payer's credit is dropped, so the sum is offset by
        // exactly that amount; current-user-only expenses sum to zero.
        assert!((total + 42.0).abs() < SETTLED_TOLERANCE);

        let settlement = compute_settlement(&users, &expenses[..4]);
        let total: f64 = settlement.balances.iter().map(|balance| balance.net).sum();
        assert!(total.abs() < SETTLED_TOLERANCE);
    }

    #[test]
    fn executing_debts_settles_all_balances() {
        let users = [user("Alice"), user("Bob"), user("Cara"), user("Dan")];
        let expenses = [
            expense("Alice", 400.0, &["Alice", "Bob", "Cara", "Dan"]),
            expense("Bob", 120.0, &["Bob", "Cara"]),
            expense("Cara", 60.0, &["Alice", "Dan"]),
        ];

        let settlement = compute_settlement(&users, &expenses);
        let mut residual: HashMap<&str, f64> = settlement
            .balances
            .iter()
            .map(|balance| (balance.name.as_str(), balance.net))
            .collect();
        for debt in &settlement.debts {
            *residual.get_mut(debt.from.as_str()).unwrap() += debt.amount;
            *residual.get_mut(debt.to.as_str()).unwrap() -= debt.amount;
        }
        // Whole-unit rounding of transfers leaves at most a unit per user.
        for amount in residual.values() {
            assert!(amount.abs() < 1.0, "unsettled residual {amount}");
        }
    }

    #[test]
    fn no_debt_is_emitted_below_one_unit() {
        let users = [user("Alice"), user("Bob")];
        let expenses = [expense("Alice", 0.018, &["Alice", "Bob"])];

        let settlement = compute_settlement(&users, &expenses);
        assert!(settlement.debts.is_empty());

        // Above the tolerance but rounding to zero: still suppressed.
        let expenses = [expense("Alice", 0.8, &["Alice", "Bob"])];
        let settlement = compute_settlement(&users, &expenses);
        assert!(settlement.debts.is_empty());

        let expenses = [expense("Alice", 10.0, &["Alice", "Bob"])];
        let settlement = compute_settlement(&users, &expenses);
        for debt in &settlement.debts {
            assert!(debt.amount >= 1.0);
        }
    }

    #[test]
    fn computation_is_deterministic() {
        let users = [user("Alice"), user("Bob"), user("Cara")];
        let expenses = [
            expense("Alice", 90.0, &["Bob", "Cara"]),
            expense("Bob", 90.0, &["Alice", "Cara"]),
        ];

        let first = compute_settlement(&users, &expenses);
        let second = compute_settlement(&users, &expenses);
        assert_eq!(first, second);
    }

    #[test]
    fn removing_uninvolved_user_leaves_other_balances_intact() {
        let users = [user("Alice"), user("Bob"), user("Cara")];
        let expenses = [expense("Alice", 100.0, &["Alice", "Bob"])];

        let before = compute_settlement(&users, &expenses);
        let after = compute_settlement(&users[..2], &expenses);

        for balance in &after.balances {
            let previous = net(&before, &balance.name);
            assert!((balance.net - previous).abs() < SETTLED_TOLERANCE);
        }
        // Cara contributed nothing and owed nothing.
        assert!(net(&before, "Cara").abs() < SETTLED_TOLERANCE);
    }

    #[test]
    fn non_numeric_amounts_count_as_zero() {
        let users = [user("Alice"), user("Bob")];
        let mut broken = expense("Alice", f64::NAN, &["Alice", "Bob"]);
        broken.amount = f64::NAN;

        let settlement = compute_settlement(&users, &[broken]);
        assert!(net(&settlement, "Alice").abs() < SETTLED_TOLERANCE);
        assert!(settlement.debts.is_empty());
    }
}
