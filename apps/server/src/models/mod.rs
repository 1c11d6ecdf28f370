//! Domain records and request payloads

pub mod course;
pub mod enrollment;
pub mod person;

pub use course::{Course, CoursePayload};
pub use enrollment::Enrollment;
pub use person::{NewPerson, Person, PersonPayload, PersonType, PersonWithCourses};

use validator::ValidationError;

/// Rejects empty and whitespace-only strings.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
