//! Business logic layer
//!
//! Services orchestrate operations by coordinating the store, applying
//! business rules, and managing transactions.

pub mod course;
pub mod enrollment;
pub mod person;

pub use course::CourseService;
pub use enrollment::{EnrollmentManager, EnrollmentWrites};
pub use person::PersonService;

use crate::{db::StoreTransaction, metrics::TRANSACTION_ROLLBACKS_TOTAL, Result};

/// Finish a transaction according to the outcome of the work done in it.
///
/// Commits on success. On failure the transaction is rolled back and the
/// original error is returned; a rollback failure is logged, not surfaced.
pub(crate) async fn settle<T>(
    tx: Box<dyn StoreTransaction>,
    outcome: Result<T>,
    operation: &'static str,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            TRANSACTION_ROLLBACKS_TOTAL
                .with_label_values(&[operation])
                .inc();
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    operation,
                    error = %rollback_err,
                    "Failed to roll back transaction"
                );
            }
            tracing::debug!(operation, error = %err, "Transaction rolled back");
            Err(err)
        }
    }
}
