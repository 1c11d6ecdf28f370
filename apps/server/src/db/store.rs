//! PostgreSQL-backed `Store` implementation

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row};

use crate::{
    db::traits::{Store, StoreTransaction},
    models::{Course, NewPerson, Person, PersonType},
    Error, Result,
};

const PERSON_COLUMNS: &str = "id, first_name, last_name, type, age";

/// PostgreSQL-backed Store implementation
#[derive(Clone)]
pub struct PostgresStore {
    pub(crate) pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(Error::Database)?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn list_people(&self) -> Result<Vec<Person>> {
        let rows = sqlx::query(&format!("SELECT {PERSON_COLUMNS} FROM person"))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.iter().map(person_from_row).collect()
    }

    async fn find_person_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Person>> {
        let row = sqlx::query(&format!(
            "SELECT {PERSON_COLUMNS} FROM person
             WHERE first_name = $1 AND last_name = $2
             ORDER BY id
             LIMIT 1"
        ))
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(person_from_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query("SELECT id, name FROM course")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(course_from_row).collect())
    }

    async fn find_course(&self, id: i64) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT id, name FROM course WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(course_from_row))
    }

    async fn courses_for_person(&self, person_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT course_id FROM person_course WHERE person_id = $1 ORDER BY course_id",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }

    async fn people_for_course(&self, course_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT person_id FROM person_course WHERE course_id = $1 ORDER BY person_id",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

/// A PostgreSQL transaction on a pooled connection.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn find_person_by_name(
        &mut self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Person>> {
        // FOR UPDATE narrows the check-then-write window for concurrent writers.
        let row = sqlx::query(&format!(
            "SELECT {PERSON_COLUMNS} FROM person
             WHERE first_name = $1 AND last_name = $2
             ORDER BY id
             LIMIT 1
             FOR UPDATE"
        ))
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(person_from_row).transpose()
    }

    async fn person_exists(&mut self, id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM person WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Error::Database)?;

        Ok(row.is_some())
    }

    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person> {
        let row = sqlx::query(&format!(
            "INSERT INTO person (first_name, last_name, type, age)
             VALUES ($1, $2, $3, $4)
             RETURNING {PERSON_COLUMNS}"
        ))
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(person.kind.as_str())
        .bind(person.age)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_violation_as_conflict(e, "Person", person.full_name()))?;

        person_from_row(&row)
    }

    async fn update_person(&mut self, id: i64, person: &NewPerson) -> Result<Option<Person>> {
        let row = sqlx::query(&format!(
            "UPDATE person
             SET first_name = $2, last_name = $3, type = $4, age = $5
             WHERE id = $1
             RETURNING {PERSON_COLUMNS}"
        ))
        .bind(id)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(person.kind.as_str())
        .bind(person.age)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| unique_violation_as_conflict(e, "Person", person.full_name()))?;

        row.as_ref().map(person_from_row).transpose()
    }

    async fn delete_person(&mut self, id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM person WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        Ok(deleted)
    }

    async fn find_course(&mut self, id: i64) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT id, name FROM course WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(course_from_row))
    }

    async fn find_course_by_name(&mut self, name: &str) -> Result<Option<Course>> {
        let row = sqlx::query("SELECT id, name FROM course WHERE name = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(Error::Database)?;

        Ok(row.as_ref().map(course_from_row))
    }

    async fn existing_course_ids(&mut self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // FOR SHARE keeps the courses from being deleted until this transaction ends.
        let existing = sqlx::query_scalar("SELECT id FROM course WHERE id = ANY($1) FOR SHARE")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(Error::Database)?;

        Ok(existing)
    }

    async fn insert_course(&mut self, name: &str) -> Result<Course> {
        let row = sqlx::query("INSERT INTO course (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| unique_violation_as_conflict(e, "Course", name.to_string()))?;

        Ok(course_from_row(&row))
    }

    async fn update_course(&mut self, id: i64, name: &str) -> Result<Option<Course>> {
        let row = sqlx::query("UPDATE course SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| unique_violation_as_conflict(e, "Course", name.to_string()))?;

        Ok(row.as_ref().map(course_from_row))
    }

    async fn delete_course(&mut self, id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM course WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        Ok(deleted)
    }

    async fn insert_enrollment(&mut self, person_id: i64, course_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO person_course (person_id, course_id) VALUES ($1, $2)")
            .bind(person_id)
            .bind(course_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                unique_violation_as_conflict(e, "Enrollment", format!("({person_id}, {course_id})"))
            })?;

        Ok(())
    }

    async fn courses_for_person(&mut self, person_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT course_id FROM person_course WHERE person_id = $1 ORDER BY course_id",
        )
        .bind(person_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(Error::Database)?;

        Ok(ids)
    }

    async fn delete_enrollments_for_person(&mut self, person_id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM person_course WHERE person_id = $1")
            .bind(person_id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        Ok(deleted)
    }

    async fn delete_enrollments_for_course(&mut self, course_id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM person_course WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *self.tx)
            .await
            .map_err(Error::Database)?
            .rows_affected();

        Ok(deleted)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(Error::Database)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(Error::Database)
    }
}

fn person_from_row(row: &PgRow) -> Result<Person> {
    let kind: String = row.get("type");
    let kind = kind
        .parse::<PersonType>()
        .map_err(|_| Error::Internal(format!("Unknown person type in store: '{kind}'")))?;

    Ok(Person {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        kind,
        age: row.get("age"),
    })
}

fn course_from_row(row: &PgRow) -> Course {
    Course {
        id: row.get("id"),
        name: row.get("name"),
    }
}

/// Unique constraints back up the service-level duplicate checks; a
/// violation that slips past those checks is still reported as a conflict.
fn unique_violation_as_conflict(err: sqlx::Error, entity: &'static str, key: String) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict { entity, key };
        }
    }
    Error::Database(err)
}
