//! In-memory `Store` implementation.
//!
//! Tables live behind an async mutex. A transaction holds the lock for its
//! whole lifetime and works on a copy of the tables, which replaces the shared
//! copy on commit and is dropped on rollback. Transactions are therefore
//! serialized, which is plenty for tests and single-node demos.
//!
//! Failure points can be armed to make the next matching operation fail, so
//! rollback paths can be exercised deterministically.

use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    db::traits::{Store, StoreTransaction},
    models::{Course, Enrollment, NewPerson, Person},
    Error, Result,
};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertPerson,
    UpdatePerson,
    DeletePerson,
    InsertCourse,
    DeleteCourse,
    InsertEnrollment,
    DeleteEnrollments,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    people: BTreeMap<i64, Person>,
    courses: BTreeMap<i64, Course>,
    enrollments: Vec<Enrollment>,
    next_person_id: i64,
    next_course_id: i64,
}

impl Tables {
    fn person_by_name(&self, first_name: &str, last_name: &str) -> Option<&Person> {
        self.people
            .values()
            .find(|p| p.first_name == first_name && p.last_name == last_name)
    }

    fn course_by_name(&self, name: &str) -> Option<&Course> {
        self.courses.values().find(|c| c.name == name)
    }

    fn courses_for_person(&self, person_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .enrollments
            .iter()
            .filter(|e| e.person_id == person_id)
            .map(|e| e.course_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn people_for_course(&self, course_id: i64) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .map(|e| e.person_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
    armed: Arc<Mutex<Vec<FailPoint>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation matching `point` fail with an internal error.
    pub fn fail_once(&self, point: FailPoint) {
        self.armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(point);
    }

    /// Snapshot of every `person_course` row, sorted.
    pub async fn enrollments(&self) -> Vec<Enrollment> {
        let mut rows = self.tables.lock().await.enrollments.clone();
        rows.sort_unstable();
        rows
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            armed: self.armed.clone(),
        }))
    }

    async fn list_people(&self) -> Result<Vec<Person>> {
        Ok(self.tables.lock().await.people.values().cloned().collect())
    }

    async fn find_person_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Person>> {
        Ok(self
            .tables
            .lock()
            .await
            .person_by_name(first_name, last_name)
            .cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.tables.lock().await.courses.values().cloned().collect())
    }

    async fn find_course(&self, id: i64) -> Result<Option<Course>> {
        Ok(self.tables.lock().await.courses.get(&id).cloned())
    }

    async fn courses_for_person(&self, person_id: i64) -> Result<Vec<i64>> {
        Ok(self.tables.lock().await.courses_for_person(person_id))
    }

    async fn people_for_course(&self, course_id: i64) -> Result<Vec<i64>> {
        Ok(self.tables.lock().await.people_for_course(course_id))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    armed: Arc<Mutex<Vec<FailPoint>>>,
}

impl MemoryTransaction {
    fn trip(&self, point: FailPoint) -> Result<()> {
        let mut armed = self
            .armed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pos) = armed.iter().position(|p| *p == point) {
            armed.remove(pos);
            return Err(Error::Internal(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn ensure_unique_person(&self, person: &NewPerson, except: Option<i64>) -> Result<()> {
        match self
            .working
            .person_by_name(&person.first_name, &person.last_name)
        {
            Some(existing) if Some(existing.id) != except => Err(Error::Conflict {
                entity: "Person",
                key: person.full_name(),
            }),
            _ => Ok(()),
        }
    }

    fn ensure_unique_course(&self, name: &str, except: Option<i64>) -> Result<()> {
        match self.working.course_by_name(name) {
            Some(existing) if Some(existing.id) != except => Err(Error::Conflict {
                entity: "Course",
                key: name.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_person_by_name(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Person>> {
        Ok(self.working.person_by_name(first_name, last_name).cloned())
    }

    async fn person_exists(&mut self, id: i64) -> Result<bool> {
        Ok(self.working.people.contains_key(&id))
    }

    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person> {
        self.trip(FailPoint::InsertPerson)?;
        self.ensure_unique_person(person, None)?;

        self.working.next_person_id += 1;
        let created = Person {
            id: self.working.next_person_id,
            first_name: person.first_name.clone(),
            last_name: person.last_name.clone(),
            kind: person.kind,
            age: person.age,
        };
        self.working.people.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_person(&mut self, id: i64, person: &NewPerson) -> Result<Option<Person>> {
        self.trip(FailPoint::UpdatePerson)?;
        if !self.working.people.contains_key(&id) {
            return Ok(None);
        }
        self.ensure_unique_person(person, Some(id))?;

        let updated = Person {
            id,
            first_name: person.first_name.clone(),
            last_name: person.last_name.clone(),
            kind: person.kind,
            age: person.age,
        };
        self.working.people.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_person(&mut self, id: i64) -> Result<u64> {
        self.trip(FailPoint::DeletePerson)?;
        Ok(u64::from(self.working.people.remove(&id).is_some()))
    }

    async fn find_course(&mut self, id: i64) -> Result<Option<Course>> {
        Ok(self.working.courses.get(&id).cloned())
    }

    async fn find_course_by_name(&mut self, name: &str) -> Result<Option<Course>> {
        Ok(self.working.course_by_name(name).cloned())
    }

    async fn existing_course_ids(&mut self, ids: &[i64]) -> Result<Vec<i64>> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.working.courses.contains_key(id))
            .collect())
    }

    async fn insert_course(&mut self, name: &str) -> Result<Course> {
        self.trip(FailPoint::InsertCourse)?;
        self.ensure_unique_course(name, None)?;

        self.working.next_course_id += 1;
        let created = Course {
            id: self.working.next_course_id,
            name: name.to_string(),
        };
        self.working.courses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_course(&mut self, id: i64, name: &str) -> Result<Option<Course>> {
        if !self.working.courses.contains_key(&id) {
            return Ok(None);
        }
        self.ensure_unique_course(name, Some(id))?;

        let updated = Course {
            id,
            name: name.to_string(),
        };
        self.working.courses.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_course(&mut self, id: i64) -> Result<u64> {
        self.trip(FailPoint::DeleteCourse)?;
        Ok(u64::from(self.working.courses.remove(&id).is_some()))
    }

    async fn insert_enrollment(&mut self, person_id: i64, course_id: i64) -> Result<()> {
        self.trip(FailPoint::InsertEnrollment)?;

        let row = Enrollment {
            person_id,
            course_id,
        };
        if self.working.enrollments.contains(&row) {
            return Err(Error::Conflict {
                entity: "Enrollment",
                key: format!("({person_id}, {course_id})"),
            });
        }
        self.working.enrollments.push(row);
        Ok(())
    }

    async fn courses_for_person(&mut self, person_id: i64) -> Result<Vec<i64>> {
        Ok(self.working.courses_for_person(person_id))
    }

    async fn delete_enrollments_for_person(&mut self, person_id: i64) -> Result<u64> {
        self.trip(FailPoint::DeleteEnrollments)?;
        let before = self.working.enrollments.len();
        self.working.enrollments.retain(|e| e.person_id != person_id);
        Ok((before - self.working.enrollments.len()) as u64)
    }

    async fn delete_enrollments_for_course(&mut self, course_id: i64) -> Result<u64> {
        self.trip(FailPoint::DeleteEnrollments)?;
        let before = self.working.enrollments.len();
        self.working.enrollments.retain(|e| e.course_id != course_id);
        Ok((before - self.working.enrollments.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.trip(FailPoint::Commit)?;
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
