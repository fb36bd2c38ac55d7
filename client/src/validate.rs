//! Post-update validation of TMS echo responses.

use serde_json::Value;

use crate::error::{CicError, Resource};

/// Outcome of checking one intended field against the server's echo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCheck {
    /// Field present with the intended value.
    Written,
    /// Intended value was empty; accepted whatever the server returned.
    AcceptedEmpty,
    /// Field absent from the response.
    NotWritten,
    /// Field present with a different value.
    Mismatch { actual: String },
}

impl FieldCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Written | Self::AcceptedEmpty)
    }

    pub fn into_result(self, resource: Resource, field: &str, intended: &str) -> Result<(), CicError> {
        match self {
            Self::Written | Self::AcceptedEmpty => Ok(()),
            Self::NotWritten => Err(CicError::NotWritten {
                resource,
                field: field.to_string(),
            }),
            Self::Mismatch { actual } => Err(CicError::Mismatch {
                resource,
                field: field.to_string(),
                expected: intended.to_string(),
                actual,
            }),
        }
    }
}

/// Render a JSON value the way it travels in a form body.
pub fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn check_field(response: &Value, field: &str, intended: &str) -> FieldCheck {
    if intended.is_empty() {
        return FieldCheck::AcceptedEmpty;
    }
    match response.get(field) {
        None => FieldCheck::NotWritten,
        Some(actual) => {
            let actual = form_value(actual);
            if actual == intended {
                FieldCheck::Written
            } else {
                FieldCheck::Mismatch { actual }
            }
        }
    }
}

/// Check every field in order; the first failing field is reported.
pub fn check_fields(
    response: &Value,
    fields: &[(String, String)],
    resource: Resource,
) -> Result<(), CicError> {
    for (field, intended) in fields {
        check_field(response, field, intended).into_result(resource, field, intended)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_intended_value_always_passes() {
        assert_eq!(check_field(&json!({}), "owner", ""), FieldCheck::AcceptedEmpty);
        assert_eq!(
            check_field(&json!({"owner": "someone"}), "owner", ""),
            FieldCheck::AcceptedEmpty
        );
        assert_eq!(check_field(&Value::Null, "owner", ""), FieldCheck::AcceptedEmpty);
    }

    #[test]
    fn missing_field_is_not_written() {
        assert_eq!(
            check_field(&json!({"uuid": "u-1"}), "underMaintenance", "true"),
            FieldCheck::NotWritten
        );
    }

    #[test]
    fn different_echo_is_mismatch() {
        assert_eq!(
            check_field(&json!({"underMaintenance": false}), "underMaintenance", "true"),
            FieldCheck::Mismatch {
                actual: "false".to_string()
            }
        );
    }

    #[test]
    fn non_string_values_compare_by_rendering() {
        assert_eq!(
            check_field(&json!({"underMaintenance": true}), "underMaintenance", "true"),
            FieldCheck::Written
        );
        assert_eq!(check_field(&json!({"port": 443}), "port", "443"), FieldCheck::Written);
    }

    #[test]
    fn first_failing_field_aborts() {
        let response = json!({"a": "1", "c": "3"});
        let fields = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "4".to_string()),
        ];
        let err = check_fields(&response, &fields, Resource::Tenant).unwrap_err();
        assert!(matches!(err, CicError::NotWritten { ref field, .. } if field == "b"));
    }

    #[test]
    fn all_fields_written_passes() {
        let response = json!({"a": "1", "b": "2"});
        let fields = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        assert!(check_fields(&response, &fields, Resource::System).is_ok());
    }
}
