//! Store trait definitions

use crate::{
    models::{Course, NewPerson, Person},
    Result,
};
use async_trait::async_trait;

/// Transactional relational store holding people, courses and enrollments.
///
/// Reads that need no isolation go through the store directly; every
/// mutation goes through a [`StoreTransaction`] obtained from [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// All people, in store order.
    async fn list_people(&self) -> Result<Vec<Person>>;

    /// Exact, case-sensitive lookup by natural key.
    async fn find_person_by_name(&self, first_name: &str, last_name: &str)
        -> Result<Option<Person>>;

    /// All courses, in store order.
    async fn list_courses(&self) -> Result<Vec<Course>>;

    async fn find_course(&self, id: i64) -> Result<Option<Course>>;

    /// Course IDs the person is enrolled in.
    async fn courses_for_person(&self, person_id: i64) -> Result<Vec<i64>>;

    /// Person IDs enrolled in the course.
    async fn people_for_course(&self, course_id: i64) -> Result<Vec<i64>>;

    async fn health_check(&self) -> Result<()>;
}

/// An open transaction. Dropping it without [`commit`](Self::commit) discards
/// its writes; callers are still expected to call [`rollback`](Self::rollback)
/// explicitly on failure.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_person_by_name(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Person>>;

    async fn person_exists(&mut self, id: i64) -> Result<bool>;

    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person>;

    /// Replace all scalar fields. Returns `None` when no row has `id`.
    async fn update_person(&mut self, id: i64, person: &NewPerson) -> Result<Option<Person>>;

    /// Returns the number of rows removed.
    async fn delete_person(&mut self, id: i64) -> Result<u64>;

    async fn find_course(&mut self, id: i64) -> Result<Option<Course>>;

    async fn find_course_by_name(&mut self, name: &str) -> Result<Option<Course>>;

    /// The subset of `ids` that name existing courses.
    async fn existing_course_ids(&mut self, ids: &[i64]) -> Result<Vec<i64>>;

    async fn insert_course(&mut self, name: &str) -> Result<Course>;

    /// Returns `None` when no row has `id`.
    async fn update_course(&mut self, id: i64, name: &str) -> Result<Option<Course>>;

    /// Returns the number of rows removed.
    async fn delete_course(&mut self, id: i64) -> Result<u64>;

    async fn insert_enrollment(&mut self, person_id: i64, course_id: i64) -> Result<()>;

    async fn courses_for_person(&mut self, person_id: i64) -> Result<Vec<i64>>;

    /// Returns the number of rows removed.
    async fn delete_enrollments_for_person(&mut self, person_id: i64) -> Result<u64>;

    /// Returns the number of rows removed.
    async fn delete_enrollments_for_course(&mut self, course_id: i64) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
