//! Manual balance correction: turn validated draft records into ledger
//! registrations.

use crate::{
    AuthProvider, BalanceRecord, BalanceRegistration, Clock, DocumentStore, KeyValueStorage, Money,
    RegisterBalanceCmd, ResultEngine, records::validate_records,
};

use super::Engine;

impl<S, K, A, C> Engine<S, K, A, C>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
    C: Clock + Clone,
{
    /// Applies a manual correction: the draft records must explain
    /// `declared_delta` (within one cent), then each record is registered
    /// through the ledger writer in order.
    ///
    /// Each registration's aggregate math keys off the record's `kind`;
    /// the validation's net total keyed off `category`. Both rules run
    /// here, each on its own field.
    pub async fn apply_correction(
        &self,
        user_id: &str,
        declared_delta: Money,
        records: &[BalanceRecord],
    ) -> ResultEngine<Vec<BalanceRegistration>> {
        self.require_user(user_id)?;
        validate_records(records, declared_delta)?;

        let mut registrations = Vec::with_capacity(records.len());
        for record in records {
            let cmd = RegisterBalanceCmd::new(
                user_id,
                record.kind,
                record.description.clone(),
                record.category.clone(),
                record.amount.abs(),
            );
            registrations.push(self.register_balance(cmd).await?);
        }
        Ok(registrations)
    }
}
