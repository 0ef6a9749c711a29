//! Ledger entry primitives.
//!
//! A `BalanceRegistration` is the immutable record of one financial event.
//! It is written exactly once, together with the monthly aggregate it
//! affects, and never mutated or deleted afterwards.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Document, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Income,
    Expense,
    Adjustment,
}

impl RegistrationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Adjustment => "adjustment",
        }
    }

    /// Sign applied to the running balance: income adds, every other kind
    /// subtracts.
    #[must_use]
    pub fn signed(self, amount: Money) -> Money {
        match self {
            Self::Income => amount,
            Self::Expense | Self::Adjustment => -amount,
        }
    }
}

impl TryFrom<&str> for RegistrationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::Validation(format!(
                "tipo de registro inválido: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRegistration {
    pub id: Uuid,
    pub user_id: String,
    pub kind: RegistrationKind,
    pub description: String,
    pub category: String,
    pub amount: Money,
    /// Running balance immediately after this registration was applied.
    /// Always equal to the aggregate balance committed in the same
    /// transaction.
    pub balance_after: Money,
    pub month: u32,
    pub year: i32,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl BalanceRegistration {
    pub fn new(
        user_id: String,
        kind: RegistrationKind,
        description: String,
        category: String,
        amount: Money,
        balance_after: Money,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "el monto debe ser mayor a cero".to_string(),
            ));
        }
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(EngineError::Validation(
                "la descripción no puede estar vacía".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            description,
            category,
            amount,
            balance_after,
            month: occurred_at.month(),
            year: occurred_at.year(),
            occurred_at,
            created_at: occurred_at,
        })
    }
}

impl Document for BalanceRegistration {
    const COLLECTION: &'static str = "balance_registrations";
}
