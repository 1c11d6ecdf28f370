use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

/// Body of `POST /api/course` and `PUT /api/course/{id}`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CoursePayload {
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank", message = "name is required"))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        for name in ["", "   "] {
            let payload = CoursePayload {
                name: name.to_string(),
            };
            assert!(payload.validate().is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn missing_name_deserializes_to_invalid_payload() {
        let payload: CoursePayload = serde_json::from_str("{}").unwrap();
        let err = crate::Error::from(payload.validate().unwrap_err());
        assert!(matches!(err, crate::Error::Validation(_)));
        assert!(err.to_string().contains("name"), "{err}");
    }
}
