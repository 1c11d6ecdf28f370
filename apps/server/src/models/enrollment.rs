use serde::{Deserialize, Serialize};

/// A `person_course` row: the person is enrolled in the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Enrollment {
    pub person_id: i64,
    pub course_id: i64,
}
