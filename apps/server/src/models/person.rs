use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

use super::validate_not_blank;
use crate::{Error, Result};

/// Role of a person; stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Professor,
    Student,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Professor => "professor",
            Self::Student => "student",
        }
    }
}

impl fmt::Display for PersonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "professor" => Ok(Self::Professor),
            "student" => Ok(Self::Student),
            other => Err(Error::Validation(format!(
                "type must be 'professor' or 'student', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub age: i32,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Scalar fields of a person before an ID is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub first_name: String,
    pub last_name: String,
    pub kind: PersonType,
    pub age: i32,
}

impl NewPerson {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A person together with the IDs of the courses they are enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonWithCourses {
    #[serde(flatten)]
    pub person: Person,
    pub courses: Vec<i64>,
}

/// Body of `POST /api/person` and `PUT /api/person/{name}`.
///
/// Missing fields deserialize to empty values so that they are reported by
/// validation rather than by the JSON decoder.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PersonPayload {
    /// Must not contain a space: "First Last" path segments split on the first one.
    #[serde(default)]
    #[validate(custom(function = "validate_first_name"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "last_name is required"))]
    pub last_name: String,

    #[serde(default, rename = "type")]
    #[validate(custom(
        function = "validate_person_type",
        message = "type must be 'professor' or 'student'"
    ))]
    pub kind: String,

    #[serde(default)]
    #[validate(range(min = 1, message = "age must be a positive integer"))]
    pub age: i32,

    #[serde(default)]
    pub courses: Vec<i64>,
}

impl PersonPayload {
    /// Validate the payload and split it into scalar fields and course IDs.
    pub fn into_parts(self) -> Result<(NewPerson, Vec<i64>)> {
        self.validate()?;

        let kind = self.kind.parse::<PersonType>()?;
        Ok((
            NewPerson {
                first_name: self.first_name,
                last_name: self.last_name,
                kind,
                age: self.age,
            },
            self.courses,
        ))
    }
}

fn validate_first_name(value: &str) -> std::result::Result<(), ValidationError> {
    if validate_not_blank(value).is_err() {
        let mut err = ValidationError::new("blank");
        err.message = Some("first_name is required".into());
        return Err(err);
    }
    if value.contains(' ') {
        let mut err = ValidationError::new("space");
        err.message = Some("first_name must not contain spaces".into());
        return Err(err);
    }
    Ok(())
}

fn validate_person_type(value: &str) -> std::result::Result<(), ValidationError> {
    value
        .parse::<PersonType>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("person_type"))
}
