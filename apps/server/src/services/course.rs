//! Course service - CRUD for courses addressed by numeric ID

use std::sync::Arc;

use validator::Validate;

use crate::{
    db::{Store, StoreTransaction},
    models::{Course, CoursePayload},
    services::{settle, EnrollmentManager, EnrollmentWrites},
    Error, Result,
};

pub struct CourseService {
    store: Arc<dyn Store>,
    enrollments: EnrollmentManager,
}

impl CourseService {
    pub fn new(store: Arc<dyn Store>, enrollments: EnrollmentManager) -> Self {
        Self { store, enrollments }
    }

    pub async fn list(&self) -> Result<Vec<Course>> {
        self.store.list_courses().await
    }

    pub async fn get(&self, id: i64) -> Result<Course> {
        self.store
            .find_course(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, payload: CoursePayload) -> Result<Course> {
        payload.validate()?;

        let mut tx = self.store.begin().await?;
        let outcome = create_in(tx.as_mut(), &payload.name).await;
        let course = settle(tx, outcome, "create_course").await?;

        tracing::info!(course_id = course.id, "Created course");
        Ok(course)
    }

    pub async fn update(&self, id: i64, payload: CoursePayload) -> Result<Course> {
        let mut tx = self.store.begin().await?;
        let outcome = update_in(tx.as_mut(), id, payload).await;
        let course = settle(tx, outcome, "update_course").await?;

        tracing::info!(course_id = course.id, "Updated course");
        Ok(course)
    }

    /// Delete the course together with every enrollment in it.
    pub async fn delete(&self, id: i64) -> Result<Course> {
        let mut tx = self.store.begin().await?;
        let outcome = self.delete_in(tx.as_mut(), id).await;
        let (course, writes) = settle(tx, outcome, "delete_course").await?;
        writes.record();

        tracing::info!(course_id = course.id, "Deleted course");
        Ok(course)
    }

    async fn delete_in(
        &self,
        tx: &mut dyn StoreTransaction,
        id: i64,
    ) -> Result<(Course, EnrollmentWrites)> {
        let course = tx.find_course(id).await?.ok_or_else(|| not_found(id))?;

        let writes = self.enrollments.clear_for_course(tx, id).await?;
        if tx.delete_course(id).await? == 0 {
            return Err(not_found(id));
        }
        Ok((course, writes))
    }
}

async fn create_in(tx: &mut dyn StoreTransaction, name: &str) -> Result<Course> {
    if tx.find_course_by_name(name).await?.is_some() {
        return Err(conflict(name));
    }
    tx.insert_course(name).await
}

async fn update_in(
    tx: &mut dyn StoreTransaction,
    id: i64,
    payload: CoursePayload,
) -> Result<Course> {
    if tx.find_course(id).await?.is_none() {
        return Err(not_found(id));
    }

    payload.validate()?;

    if let Some(holder) = tx.find_course_by_name(&payload.name).await? {
        if holder.id != id {
            return Err(conflict(&payload.name));
        }
    }

    tx.update_course(id, &payload.name)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: i64) -> Error {
    Error::NotFound {
        entity: "Course",
        key: id.to_string(),
    }
}

fn conflict(name: &str) -> Error {
    Error::Conflict {
        entity: "Course",
        key: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReferentialIntegrityMode,
        db::{FailPoint, MemoryStore},
        models::{Enrollment, NewPerson, PersonType},
    };

    fn service(store: &MemoryStore) -> CourseService {
        CourseService::new(
            Arc::new(store.clone()),
            EnrollmentManager::new(ReferentialIntegrityMode::Strict),
        )
    }

    fn named(name: &str) -> CoursePayload {
        CoursePayload { name: name.into() }
    }

    async fn enroll(store: &MemoryStore, first: &str, course_ids: &[i64]) -> i64 {
        let mut tx = store.begin().await.unwrap();
        let person = tx
            .insert_person(&NewPerson {
                first_name: first.into(),
                last_name: "Doe".into(),
                kind: PersonType::Student,
                age: 19,
            })
            .await
            .unwrap();
        for &course_id in course_ids {
            tx.insert_enrollment(person.id, course_id).await.unwrap();
        }
        tx.commit().await.unwrap();
        person.id
    }

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let courses = service(&store);

        let math = courses.create(named("Math 101")).await.unwrap();
        let physics = courses.create(named("Physics 101")).await.unwrap();
        assert_ne!(math.id, physics.id);
        assert_eq!(courses.get(math.id).await.unwrap(), math);
        assert_eq!(courses.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_blank_and_duplicate_names() {
        let store = MemoryStore::new();
        let courses = service(&store);

        let err = courses.create(named("  ")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        courses.create(named("Math 101")).await.unwrap();
        let err = courses.create(named("Math 101")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(courses.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_checks_existence_before_payload() {
        let store = MemoryStore::new();
        let courses = service(&store);

        let err = courses.update(42, named("")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let math = courses.create(named("Math 101")).await.unwrap();
        let err = courses.update(math.id, named("")).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn update_renames_unless_name_is_taken() {
        let store = MemoryStore::new();
        let courses = service(&store);
        let math = courses.create(named("Math 101")).await.unwrap();
        let physics = courses.create(named("Physics 101")).await.unwrap();

        let renamed = courses.update(math.id, named("Math 102")).await.unwrap();
        assert_eq!(renamed.id, math.id);
        assert_eq!(renamed.name, "Math 102");

        let same = courses.update(math.id, named("Math 102")).await.unwrap();
        assert_eq!(same, renamed);

        let err = courses
            .update(math.id, named(&physics.name))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn delete_clears_enrollments_in_that_course_only() {
        let store = MemoryStore::new();
        let courses = service(&store);
        let math = courses.create(named("Math 101")).await.unwrap();
        let physics = courses.create(named("Physics 101")).await.unwrap();
        let john = enroll(&store, "John", &[math.id, physics.id]).await;
        enroll(&store, "Jane", &[math.id]).await;

        courses.delete(math.id).await.unwrap();

        assert_eq!(
            store.enrollments().await,
            vec![Enrollment {
                person_id: john,
                course_id: physics.id
            }]
        );
        let err = courses.get(math.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_course_delete_keeps_enrollments() {
        let store = MemoryStore::new();
        let courses = service(&store);
        let math = courses.create(named("Math 101")).await.unwrap();
        enroll(&store, "John", &[math.id]).await;
        store.fail_once(FailPoint::DeleteCourse);

        assert!(courses.delete(math.id).await.is_err());
        assert_eq!(courses.list().await.unwrap().len(), 1);
        assert_eq!(store.enrollments().await.len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_course_is_not_found() {
        let store = MemoryStore::new();
        let err = service(&store).delete(7).await.unwrap_err();
        assert_eq!(err.to_string(), "Course not found: 7");
    }
}
