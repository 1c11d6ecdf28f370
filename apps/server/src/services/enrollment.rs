//! Enrollment manager - keeps `person_course` rows in step with their owners
//!
//! Every method runs on a transaction supplied by the caller, so enrollment
//! writes commit or roll back together with the person/course mutation that
//! triggered them.

use crate::{
    config::ReferentialIntegrityMode, db::StoreTransaction, metrics::ENROLLMENT_ROWS_WRITTEN_TOTAL,
    Error, Result,
};

/// Rows written by the enrollment manager inside one transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentWrites {
    pub inserted: u64,
    pub deleted: u64,
}

impl EnrollmentWrites {
    /// Publish the counts to metrics. Call only after the transaction committed.
    pub fn record(self) {
        ENROLLMENT_ROWS_WRITTEN_TOTAL
            .with_label_values(&["inserted"])
            .inc_by(self.inserted);
        ENROLLMENT_ROWS_WRITTEN_TOTAL
            .with_label_values(&["deleted"])
            .inc_by(self.deleted);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnrollmentManager {
    mode: ReferentialIntegrityMode,
}

impl EnrollmentManager {
    pub fn new(mode: ReferentialIntegrityMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ReferentialIntegrityMode {
        self.mode
    }

    /// Make the person's enrollments exactly `course_ids`.
    ///
    /// Duplicate IDs are collapsed, keeping first-seen order. In strict mode
    /// the person and every course must exist in this transaction, otherwise
    /// nothing is written and a validation error names the missing courses.
    ///
    /// Returns the course IDs now on record for the person and the rows written.
    pub async fn sync_person_courses(
        &self,
        tx: &mut dyn StoreTransaction,
        person_id: i64,
        course_ids: &[i64],
    ) -> Result<(Vec<i64>, EnrollmentWrites)> {
        if person_id <= 0 {
            return Err(Error::Internal(format!(
                "Enrollment sync requires a persisted person, got id {person_id}"
            )));
        }

        let wanted = dedup_preserving_order(course_ids);

        if self.mode == ReferentialIntegrityMode::Strict {
            self.ensure_references_resolve(tx, person_id, &wanted)
                .await?;
        }

        let removed = tx.delete_enrollments_for_person(person_id).await?;
        for &course_id in &wanted {
            tx.insert_enrollment(person_id, course_id).await?;
        }

        tracing::debug!(
            person_id,
            removed,
            inserted = wanted.len(),
            "Synchronized person enrollments"
        );

        let writes = EnrollmentWrites {
            inserted: wanted.len() as u64,
            deleted: removed,
        };
        Ok((wanted, writes))
    }

    /// Remove every enrollment of the person. Succeeds when there are none.
    pub async fn clear_for_person(
        &self,
        tx: &mut dyn StoreTransaction,
        person_id: i64,
    ) -> Result<EnrollmentWrites> {
        let removed = tx.delete_enrollments_for_person(person_id).await?;
        tracing::debug!(person_id, removed, "Cleared person enrollments");
        Ok(EnrollmentWrites {
            inserted: 0,
            deleted: removed,
        })
    }

    /// Remove every enrollment in the course. Succeeds when there are none.
    pub async fn clear_for_course(
        &self,
        tx: &mut dyn StoreTransaction,
        course_id: i64,
    ) -> Result<EnrollmentWrites> {
        let removed = tx.delete_enrollments_for_course(course_id).await?;
        tracing::debug!(course_id, removed, "Cleared course enrollments");
        Ok(EnrollmentWrites {
            inserted: 0,
            deleted: removed,
        })
    }

    async fn ensure_references_resolve(
        &self,
        tx: &mut dyn StoreTransaction,
        person_id: i64,
        course_ids: &[i64],
    ) -> Result<()> {
        if !tx.person_exists(person_id).await? {
            return Err(Error::Internal(format!(
                "Enrollment sync for person {person_id} that does not exist"
            )));
        }

        let existing = tx.existing_course_ids(course_ids).await?;
        let missing: Vec<String> = course_ids
            .iter()
            .filter(|id| !existing.contains(id))
            .map(|id| id.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "courses do not exist: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

fn dedup_preserving_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
