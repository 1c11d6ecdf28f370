//! Person service - CRUD for people addressed by full name
//!
//! Every mutation runs in one store transaction together with the
//! enrollment writes it implies.

use std::sync::Arc;

use crate::{
    db::{Store, StoreTransaction},
    identity::FullName,
    models::{NewPerson, Person, PersonPayload, PersonWithCourses},
    services::{settle, EnrollmentManager, EnrollmentWrites},
    Error, Result,
};

pub struct PersonService {
    store: Arc<dyn Store>,
    enrollments: EnrollmentManager,
}

impl PersonService {
    pub fn new(store: Arc<dyn Store>, enrollments: EnrollmentManager) -> Self {
        Self { store, enrollments }
    }

    pub async fn list(&self) -> Result<Vec<Person>> {
        self.store.list_people().await
    }

    pub async fn get_by_name(&self, name: &FullName) -> Result<PersonWithCourses> {
        let person = self
            .store
            .find_person_by_name(&name.first, &name.last)
            .await?
            .ok_or_else(|| not_found(name))?;
        let courses = self.store.courses_for_person(person.id).await?;
        Ok(PersonWithCourses { person, courses })
    }

    pub async fn create(&self, payload: PersonPayload) -> Result<PersonWithCourses> {
        let (new_person, course_ids) = payload.into_parts()?;

        let mut tx = self.store.begin().await?;
        let outcome = self
            .create_in(tx.as_mut(), &new_person, &course_ids)
            .await;
        let (created, writes) = settle(tx, outcome, "create_person").await?;
        writes.record();

        tracing::info!(
            person_id = created.person.id,
            courses = created.courses.len(),
            "Created person"
        );
        Ok(created)
    }

    /// Replace every field of the person currently named `name`.
    ///
    /// The ID is kept. A new name takes effect immediately and must not
    /// belong to somebody else.
    pub async fn update(
        &self,
        name: &FullName,
        payload: PersonPayload,
    ) -> Result<PersonWithCourses> {
        let mut tx = self.store.begin().await?;
        let outcome = self.update_in(tx.as_mut(), name, payload).await;
        let (updated, writes) = settle(tx, outcome, "update_person").await?;
        writes.record();

        tracing::info!(
            person_id = updated.person.id,
            courses = updated.courses.len(),
            "Updated person"
        );
        Ok(updated)
    }

    /// Delete the person and all of their enrollments.
    pub async fn delete(&self, name: &FullName) -> Result<Person> {
        let mut tx = self.store.begin().await?;
        let outcome = self.delete_in(tx.as_mut(), name).await;
        let (deleted, writes) = settle(tx, outcome, "delete_person").await?;
        writes.record();

        tracing::info!(person_id = deleted.id, "Deleted person");
        Ok(deleted)
    }

    async fn create_in(
        &self,
        tx: &mut dyn StoreTransaction,
        new_person: &NewPerson,
        course_ids: &[i64],
    ) -> Result<(PersonWithCourses, EnrollmentWrites)> {
        if tx
            .find_person_by_name(&new_person.first_name, &new_person.last_name)
            .await?
            .is_some()
        {
            return Err(conflict(new_person));
        }

        let person = tx.insert_person(new_person).await?;
        let (courses, writes) = self
            .enrollments
            .sync_person_courses(tx, person.id, course_ids)
            .await?;
        Ok((PersonWithCourses { person, courses }, writes))
    }

    async fn update_in(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &FullName,
        payload: PersonPayload,
    ) -> Result<(PersonWithCourses, EnrollmentWrites)> {
        let current = tx
            .find_person_by_name(&name.first, &name.last)
            .await?
            .ok_or_else(|| not_found(name))?;

        let (new_person, course_ids) = payload.into_parts()?;

        if let Some(holder) = tx
            .find_person_by_name(&new_person.first_name, &new_person.last_name)
            .await?
        {
            if holder.id != current.id {
                return Err(conflict(&new_person));
            }
        }

        let person = tx
            .update_person(current.id, &new_person)
            .await?
            .ok_or_else(|| not_found(name))?;
        let (courses, writes) = self
            .enrollments
            .sync_person_courses(tx, person.id, &course_ids)
            .await?;
        Ok((PersonWithCourses { person, courses }, writes))
    }

    async fn delete_in(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &FullName,
    ) -> Result<(Person, EnrollmentWrites)> {
        let person = tx
            .find_person_by_name(&name.first, &name.last)
            .await?
            .ok_or_else(|| not_found(name))?;

        let writes = self.enrollments.clear_for_person(tx, person.id).await?;
        if tx.delete_person(person.id).await? == 0 {
            return Err(not_found(name));
        }
        Ok((person, writes))
    }
}

fn not_found(name: &FullName) -> Error {
    Error::NotFound {
        entity: "Person",
        key: name.to_string(),
    }
}

fn conflict(person: &NewPerson) -> Error {
    Error::Conflict {
        entity: "Person",
        key: person.full_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReferentialIntegrityMode,
        db::{FailPoint, MemoryStore},
        models::PersonType,
    };

    struct Harness {
        store: MemoryStore,
        service: PersonService,
        courses: Vec<i64>,
    }

    async fn harness(mode: ReferentialIntegrityMode) -> Harness {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut courses = Vec::new();
        for name in ["Math 101", "Physics 101"] {
            courses.push(tx.insert_course(name).await.unwrap().id);
        }
        tx.commit().await.unwrap();

        let service = PersonService::new(Arc::new(store.clone()), EnrollmentManager::new(mode));
        Harness {
            store,
            service,
            courses,
        }
    }

    fn payload(first: &str, last: &str, courses: Vec<i64>) -> PersonPayload {
        PersonPayload {
            first_name: first.into(),
            last_name: last.into(),
            kind: "student".into(),
            age: 20,
            courses,
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_enrollments() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        let created = h
            .service
            .create(payload("John", "Doe", h.courses.clone()))
            .await
            .unwrap();
        assert!(created.person.id > 0);
        assert_eq!(created.person.kind, PersonType::Student);
        assert_eq!(created.courses, h.courses);

        let fetched = h
            .service
            .get_by_name(&FullName::new("John", "Doe"))
            .await
            .unwrap();
        assert_eq!(fetched.person, created.person);
        assert_eq!(fetched.courses, h.courses);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts_without_side_effects() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        h.service
            .create(payload("John", "Doe", vec![h.courses[0]]))
            .await
            .unwrap();

        let err = h
            .service
            .create(payload("John", "Doe", vec![h.courses[1]]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(h.store.list_people().await.unwrap().len(), 1);
        assert_eq!(h.store.enrollments().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_course_rolls_back_person_insert() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        let err = h
            .service
            .create(payload("John", "Doe", vec![h.courses[0], 999]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(h.store.list_people().await.unwrap().is_empty());
        assert!(h.store.enrollments().await.is_empty());
    }

    #[tokio::test]
    async fn failed_enrollment_insert_leaves_no_person() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        h.store.fail_once(FailPoint::InsertEnrollment);

        let err = h
            .service
            .create(payload("John", "Doe", h.courses.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(h.store.list_people().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_renames_and_replaces_courses() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        let created = h
            .service
            .create(payload("John", "Doe", vec![h.courses[0]]))
            .await
            .unwrap();

        let mut next = payload("Johnny", "Doe", vec![h.courses[1]]);
        next.age = 21;
        let updated = h
            .service
            .update(&FullName::new("John", "Doe"), next)
            .await
            .unwrap();

        assert_eq!(updated.person.id, created.person.id);
        assert_eq!(updated.person.first_name, "Johnny");
        assert_eq!(updated.person.age, 21);
        assert_eq!(updated.courses, vec![h.courses[1]]);

        let err = h
            .service
            .get_by_name(&FullName::new("John", "Doe"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_onto_another_persons_name_conflicts() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        h.service
            .create(payload("John", "Doe", vec![]))
            .await
            .unwrap();
        h.service
            .create(payload("Jane", "Roe", vec![h.courses[0]]))
            .await
            .unwrap();

        let err = h
            .service
            .update(
                &FullName::new("Jane", "Roe"),
                payload("John", "Doe", vec![h.courses[1]]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));

        let jane = h
            .service
            .get_by_name(&FullName::new("Jane", "Roe"))
            .await
            .unwrap();
        assert_eq!(jane.courses, vec![h.courses[0]]);
    }

    #[tokio::test]
    async fn update_missing_person_is_not_found() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        let err = h
            .service
            .update(&FullName::new("No", "Body"), payload("No", "Body", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_person_and_enrollments() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        h.service
            .create(payload("John", "Doe", h.courses.clone()))
            .await
            .unwrap();

        let deleted = h
            .service
            .delete(&FullName::new("John", "Doe"))
            .await
            .unwrap();
        assert_eq!(deleted.first_name, "John");
        assert!(h.store.list_people().await.unwrap().is_empty());
        assert!(h.store.enrollments().await.is_empty());

        let err = h
            .service
            .delete(&FullName::new("John", "Doe"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_person_delete_keeps_enrollments() {
        let h = harness(ReferentialIntegrityMode::Strict).await;
        h.service
            .create(payload("John", "Doe", h.courses.clone()))
            .await
            .unwrap();
        h.store.fail_once(FailPoint::DeletePerson);

        assert!(h
            .service
            .delete(&FullName::new("John", "Doe"))
            .await
            .is_err());
        assert_eq!(h.store.list_people().await.unwrap().len(), 1);
        assert_eq!(h.store.enrollments().await.len(), 2);
    }
}
