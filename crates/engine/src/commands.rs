//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. `RegisterBalanceCmd` is also
//! the payload persisted by the offline queue, so it serializes.

use serde::{Deserialize, Serialize};

use crate::{Money, RegistrationKind};

/// Register one balance event for a user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBalanceCmd {
    pub user_id: String,
    pub kind: RegistrationKind,
    pub description: String,
    pub category: String,
    pub amount: Money,
}

impl RegisterBalanceCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: RegistrationKind,
        description: impl Into<String>,
        category: impl Into<String>,
        amount: Money,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            description: description.into(),
            category: category.into(),
            amount,
        }
    }
}
