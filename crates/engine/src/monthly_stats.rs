//! Per-user-per-month aggregate.
//!
//! One `MonthlyStats` document exists per user per month, created lazily on
//! the first registration and updated on every subsequent one. The document
//! id is `{year}-{month:02}_{userId}`; this format is shared with the
//! server-of-record and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Document, Money, RegistrationKind};

/// Builds the aggregate document id for a user and month.
#[must_use]
pub fn month_key(year: i32, month: u32, user_id: &str) -> String {
    format!("{year}-{month:02}_{user_id}")
}

/// The month immediately before `(year, month)`.
#[must_use]
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 { (year - 1, 12) } else { (year, month - 1) }
}

/// Needs/wants/savings/investment breakdown, each 0-100 with one-decimal
/// precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Percentages {
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
    pub investment: f64,
}

impl Percentages {
    /// Derives the breakdown from month totals.
    ///
    /// Expenses split 60/40 into needs/wants as shares of income; whatever
    /// income is left unspent counts as savings. Yields all zeros when no
    /// income was recorded.
    #[must_use]
    pub fn calculate(total_income: Money, total_expenses: Money) -> Self {
        let income = total_income.cents() as f64;
        if income <= 0.0 {
            return Self::default();
        }
        let expenses = total_expenses.cents() as f64;

        let needs = expenses * 0.6 / income * 100.0;
        let wants = expenses * 0.4 / income * 100.0;
        let savings = (income - expenses) / income * 100.0;

        Self {
            needs: round_share(needs),
            wants: round_share(wants),
            savings: round_share(savings),
            investment: 0.0,
        }
    }
}

fn round_share(value: f64) -> f64 {
    let clamped = value.clamp(0.0, 100.0);
    (clamped * 10.0).round() / 10.0
}

/// Month-over-month movement of the balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub balance_delta: Money,
    pub percentage_delta: f64,
    pub previous_month_balance: Money,
}

impl Variation {
    #[must_use]
    pub fn between(previous_month_balance: Money, balance: Money) -> Self {
        let delta = balance - previous_month_balance;
        let percentage_delta = if previous_month_balance.is_zero() {
            0.0
        } else {
            let ratio = delta.cents() as f64 / previous_month_balance.cents().abs() as f64;
            (ratio * 1000.0).round() / 10.0
        };
        Self {
            balance_delta: delta,
            percentage_delta,
            previous_month_balance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStats {
    pub user_id: String,
    pub year: i32,
    pub month: u32,
    pub total_income: Money,
    pub total_expenses: Money,
    pub balance: Money,
    pub percentages: Percentages,
    pub variation: Variation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonthlyStats {
    /// Initializes the aggregate from its first registration.
    ///
    /// `carry_in` is the balance inherited from the previous month (0 for a
    /// brand-new user); it is captured in the variation block as the
    /// previous month's balance. Percentages start zeroed and are refreshed
    /// out of band.
    #[must_use]
    pub fn seeded(
        user_id: String,
        year: i32,
        month: u32,
        kind: RegistrationKind,
        amount: Money,
        carry_in: Money,
        now: DateTime<Utc>,
    ) -> Self {
        let balance = carry_in + kind.signed(amount);
        let (total_income, total_expenses) = match kind {
            RegistrationKind::Income => (amount, Money::ZERO),
            RegistrationKind::Expense | RegistrationKind::Adjustment => (Money::ZERO, amount),
        };
        Self {
            user_id,
            year,
            month,
            total_income,
            total_expenses,
            balance,
            percentages: Percentages::default(),
            variation: Variation {
                balance_delta: Money::ZERO,
                percentage_delta: 0.0,
                previous_month_balance: carry_in,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one registration to an existing aggregate.
    pub fn apply(&mut self, kind: RegistrationKind, amount: Money, now: DateTime<Utc>) {
        match kind {
            RegistrationKind::Income => self.total_income += amount,
            RegistrationKind::Expense | RegistrationKind::Adjustment => {
                self.total_expenses += amount;
            }
        }
        self.balance += kind.signed(amount);
        self.updated_at = now;
    }

    /// The document id of this aggregate.
    #[must_use]
    pub fn key(&self) -> String {
        month_key(self.year, self.month, &self.user_id)
    }
}

impl Document for MonthlyStats {
    const COLLECTION: &'static str = "monthly_stats";
}
