//! Manual balance-correction drafts and their validation rules.
//!
//! When a user declares "my real balance is X", the UI collects a set of
//! draft [`BalanceRecord`]s that must explain the difference between the
//! tracked balance and X. The rules here decide whether a record set is
//! acceptable before it is turned into registrations.
//!
//! Sign convention: a record adds to the net total if and only if its
//! *category* is exactly [`INCOME_CATEGORY`]; every other category
//! (including "Inversión") subtracts. The record's `kind` field plays no
//! part in this computation; it drives the ledger writer's aggregate math
//! instead, and the two rules disagree on purpose for records like an
//! income-kind investment. Do not unify them.

use uuid::Uuid;

use crate::{EngineError, Money, RegistrationKind, ResultEngine};

/// Category whose records count as income in the reconciliation net total.
pub const INCOME_CATEGORY: &str = "Ingreso";

/// Default category suggested for negative corrections.
pub const NEED_CATEGORY: &str = "Necesidad";

/// Acceptable distance between the net total and the declared delta.
pub const RECONCILE_TOLERANCE: Money = Money::new(1);

/// A draft ledger line, built in the UI before submission. Not persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceRecord {
    pub id: Uuid,
    pub amount: Money,
    pub kind: RegistrationKind,
    pub category: String,
    pub description: String,
}

impl BalanceRecord {
    #[must_use]
    pub fn new(
        amount: Money,
        kind: RegistrationKind,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            amount,
            kind,
            category: category.into(),
            description: description.into(),
        }
    }
}

/// Net contribution of a record set: `+amount` for [`INCOME_CATEGORY`]
/// records, `-amount` for everything else.
#[must_use]
pub fn net_total(records: &[BalanceRecord]) -> Money {
    records.iter().fold(Money::ZERO, |acc, record| {
        if record.category == INCOME_CATEGORY {
            acc + record.amount.abs()
        } else {
            acc - record.amount.abs()
        }
    })
}

/// Sum of magnitudes, ignoring sign. Display only.
#[must_use]
pub fn absolute_total(records: &[BalanceRecord]) -> Money {
    records
        .iter()
        .fold(Money::ZERO, |acc, record| acc + record.amount.abs())
}

/// Checks that `records` explains `declared_delta` within one cent.
///
/// An empty record set is always rejected with its own message.
pub fn validate_records(records: &[BalanceRecord], declared_delta: Money) -> ResultEngine<()> {
    if records.is_empty() {
        return Err(EngineError::Validation(
            "Debes agregar al menos un registro.".to_string(),
        ));
    }
    let net = net_total(records);
    let gap = (net - declared_delta).abs();
    if gap > RECONCILE_TOLERANCE {
        return Err(EngineError::Validation(format!(
            "Los registros suman {net} pero la diferencia declarada es {declared_delta}."
        )));
    }
    Ok(())
}

/// Suggested starting draft for a correction of `declared_delta`:
/// income/"Ingreso" when the balance went up, expense/"Necesidad" when it
/// went down.
#[must_use]
pub fn suggest_record(declared_delta: Money) -> BalanceRecord {
    let (kind, category) = if declared_delta.is_positive() {
        (RegistrationKind::Income, INCOME_CATEGORY)
    } else {
        (RegistrationKind::Expense, NEED_CATEGORY)
    };
    BalanceRecord::new(
        declared_delta.abs(),
        kind,
        category,
        "Ajuste de saldo".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: i64, kind: RegistrationKind, category: &str) -> BalanceRecord {
        BalanceRecord::new(Money::new(amount), kind, category, "detalle")
    }

    #[test]
    fn all_income_categories_net_equals_absolute() {
        let records = vec![
            record(10_000, RegistrationKind::Income, INCOME_CATEGORY),
            record(5_000, RegistrationKind::Income, INCOME_CATEGORY),
        ];
        assert_eq!(net_total(&records), absolute_total(&records));
    }

    #[test]
    fn any_other_category_lowers_the_net() {
        let records = vec![
            record(10_000, RegistrationKind::Income, INCOME_CATEGORY),
            record(2_000, RegistrationKind::Expense, "Consumo"),
        ];
        assert!(net_total(&records) < absolute_total(&records));
    }

    #[test]
    fn mixed_records_scenario() {
        let records = vec![
            record(100_000, RegistrationKind::Income, INCOME_CATEGORY),
            record(30_000, RegistrationKind::Expense, "Consumo"),
        ];
        assert_eq!(net_total(&records), Money::new(70_000));
        assert_eq!(absolute_total(&records), Money::new(130_000));
    }

    #[test]
    fn sign_rule_reads_category_not_kind() {
        // An income-kind record in a non-income category still subtracts:
        // the reconciliation rule and the ledger writer's aggregate rule
        // deliberately disagree here.
        let investment = record(1_000, RegistrationKind::Income, "Inversión");
        assert_eq!(net_total(std::slice::from_ref(&investment)), Money::new(-1_000));
        assert_eq!(
            investment.kind.signed(investment.amount),
            Money::new(1_000)
        );
    }

    #[test]
    fn empty_record_set_is_invalid() {
        let err = validate_records(&[], Money::new(5_000)).unwrap_err();
        match err {
            EngineError::Validation(message) => {
                assert!(message.contains("al menos un registro"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_accepts_within_one_cent() {
        let records = vec![record(50_000, RegistrationKind::Income, INCOME_CATEGORY)];
        assert!(validate_records(&records, Money::new(50_000)).is_ok());
        assert!(validate_records(&records, Money::new(50_001)).is_ok());
        assert!(validate_records(&records, Money::new(50_002)).is_err());
    }

    #[test]
    fn suggest_record_follows_delta_direction() {
        // Balance 100000 -> declared 150000: suggest an income of 50000.
        let up = suggest_record(Money::new(50_000));
        assert_eq!(up.kind, RegistrationKind::Income);
        assert_eq!(up.category, INCOME_CATEGORY);
        assert_eq!(up.amount, Money::new(50_000));
        assert!(validate_records(std::slice::from_ref(&up), Money::new(50_000)).is_ok());
        assert_eq!(net_total(std::slice::from_ref(&up)), Money::new(50_000));

        let down = suggest_record(Money::new(-20_000));
        assert_eq!(down.kind, RegistrationKind::Expense);
        assert_eq!(down.category, NEED_CATEGORY);
        assert_eq!(down.amount, Money::new(20_000));
    }
}
