pub mod employee;
pub mod response;
pub mod task;
pub mod task_status;
pub mod user;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

use crate::utils::errors::{
    incorrect_type, FieldErrors, ServiceError, INVALID_DATE, NOT_A_STRING, NOT_BLANK, NOT_NULL, REQUIRED,
};

/// How a payload relates to the record it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// `PUT`: required fields must be present.
    Replace,
    /// `PATCH`: every field is optional.
    Patch,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed(crate::utils::errors::NOT_BLANK)));
    }
    Ok(())
}

/// Python-style type name of a JSON value, as used in reference-field errors.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Merges incoming payload fields with the current record, collecting
/// presence and format errors along the way.
pub(crate) struct FieldResolver {
    mode: WriteMode,
    errors: FieldErrors,
}

impl FieldResolver {
    pub fn new(mode: WriteMode) -> Self {
        FieldResolver {
            mode,
            errors: FieldErrors::default(),
        }
    }

    pub fn required_text(&mut self, field: &str, incoming: Option<Option<Value>>, current: Option<&str>) -> String {
        match incoming {
            Some(Some(value)) => self.text(field, value).unwrap_or_default(),
            Some(None) => {
                self.errors.add(field, NOT_NULL);
                String::new()
            }
            None => self.keep(field, current.map(str::to_string)).unwrap_or_default(),
        }
    }

    pub fn optional_text(&mut self, field: &str, incoming: Option<Option<Value>>, current: Option<&str>) -> Option<String> {
        match incoming {
            Some(Some(value)) => self.text(field, value),
            Some(None) => None,
            None => current.map(str::to_string),
        }
    }

    pub fn required_date(&mut self, field: &str, incoming: Option<Option<Value>>, current: Option<NaiveDate>) -> NaiveDate {
        let date = match incoming {
            Some(Some(raw)) => self.parse_date(field, &raw),
            Some(None) => {
                self.errors.add(field, NOT_NULL);
                None
            }
            None => self.keep(field, current),
        };
        // placeholder only; errors are reported before anything is written
        date.unwrap_or(NaiveDate::MIN)
    }

    pub fn optional_date(
        &mut self,
        field: &str,
        incoming: Option<Option<Value>>,
        current: Option<NaiveDate>,
    ) -> Option<NaiveDate> {
        match incoming {
            Some(Some(Value::String(raw))) if raw.trim().is_empty() => None,
            Some(Some(raw)) => self.parse_date(field, &raw),
            Some(None) => None,
            None => current,
        }
    }

    /// Reference fields take an integer or a numeric string.
    pub fn optional_id(&mut self, field: &str, incoming: Option<Option<Value>>, current: Option<i64>) -> Option<i64> {
        let value = match incoming {
            Some(Some(value)) => value,
            Some(None) => return None,
            None => return current,
        };
        let id = match &value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if id.is_none() {
            self.errors.add(field, incorrect_type(json_kind(&value)));
        }
        id
    }

    /// Folds in validator output. Fields that already failed a presence or
    /// type check keep only that message, and a blank field reports only
    /// that it is blank.
    pub fn finish(self, validated: Result<(), ValidationErrors>) -> Result<(), ServiceError> {
        let mut errors = self.errors;
        if let Err(invalid) = validated {
            for (field, messages) in FieldErrors::from(invalid).into_map() {
                if errors.contains(&field) {
                    continue;
                }
                if messages.iter().any(|m| m == NOT_BLANK) {
                    errors.add(field, NOT_BLANK);
                    continue;
                }
                for message in messages {
                    errors.add(field.clone(), message);
                }
            }
        }
        errors.into_result()
    }

    fn keep<T>(&mut self, field: &str, current: Option<T>) -> Option<T> {
        match (self.mode, current) {
            (WriteMode::Patch, Some(value)) => Some(value),
            _ => {
                self.errors.add(field, REQUIRED);
                None
            }
        }
    }

    /// Strings and numbers are taken as text; anything else is a type error.
    fn text(&mut self, field: &str, value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.errors.add(field, NOT_A_STRING);
                None
            }
        }
    }

    fn parse_date(&mut self, field: &str, raw: &Value) -> Option<NaiveDate> {
        let parsed = raw
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
        if parsed.is_none() {
            self.errors.add(field, INVALID_DATE);
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keeps_current_values() {
        let mut fields = FieldResolver::new(WriteMode::Patch);
        assert_eq!(fields.required_text("name", None, Some("Open")), "Open");
        assert_eq!(fields.optional_text("note", None, Some("kept")), Some("kept".to_string()));
        assert!(fields.finish(Ok(())).is_ok());
    }

    #[test]
    fn replace_requires_required_fields() {
        let mut fields = FieldResolver::new(WriteMode::Replace);
        fields.required_text("name", None, Some("Open"));
        let err = fields.finish(Ok(())).unwrap_err();
        match err {
            ServiceError::ValidationError(errors) => {
                assert_eq!(errors.get("name"), Some(&[REQUIRED.to_string()][..]))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn explicit_null_on_required_field_is_rejected() {
        let mut fields = FieldResolver::new(WriteMode::Patch);
        fields.required_text("name", Some(None), Some("Open"));
        assert!(fields.finish(Ok(())).is_err());
    }

    #[test]
    fn dates_must_be_iso_formatted() {
        let mut fields = FieldResolver::new(WriteMode::Create);
        assert_eq!(
            fields.optional_date("due_date", Some(Some("2024-03-01".into())), None),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(fields.optional_date("due_date", Some(Some("".into())), None), None);
        fields.optional_date("due_date", Some(Some("03/01/2024".into())), None);
        let err = fields.finish(Ok(())).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(e) if e.get("due_date").is_some()));
    }

    #[test]
    fn wrong_json_types_become_field_errors() {
        let mut fields = FieldResolver::new(WriteMode::Create);
        fields.required_text("title", Some(Some(Value::Bool(true))), None);
        assert_eq!(fields.optional_id("status", Some(Some("abc".into())), None), None);
        assert_eq!(fields.optional_id("assigned_to", Some(Some(Value::Bool(false))), None), None);
        fields.required_date("hire_date", Some(Some(20240101.into())), None);

        let err = fields.finish(Ok(())).unwrap_err();
        let ServiceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("title"), Some(&[NOT_A_STRING.to_string()][..]));
        assert_eq!(errors.get("status"), Some(&[incorrect_type("str")][..]));
        assert_eq!(errors.get("assigned_to"), Some(&[incorrect_type("bool")][..]));
        assert_eq!(errors.get("hire_date"), Some(&[INVALID_DATE.to_string()][..]));
    }

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        let mut fields = FieldResolver::new(WriteMode::Create);
        assert_eq!(fields.optional_id("status", Some(Some("3".into())), None), Some(3));
        assert_eq!(fields.optional_id("status", Some(Some(4.into())), None), Some(4));
        assert_eq!(fields.required_text("title", Some(Some(5.into())), None), "5");
        assert!(fields.finish(Ok(())).is_ok());
    }

    #[test]
    fn blank_hides_other_validator_messages() {
        let mut invalid = ValidationErrors::new();
        invalid.add("email", ValidationError::new("blank").with_message(Cow::Borrowed(NOT_BLANK)));
        invalid.add("email", ValidationError::new("email").with_message(Cow::Borrowed("Enter a valid email address.")));

        let err = FieldResolver::new(WriteMode::Create).finish(Err(invalid)).unwrap_err();
        let ServiceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("email"), Some(&[NOT_BLANK.to_string()][..]));
    }

    #[test]
    fn text_is_trimmed() {
        let mut fields = FieldResolver::new(WriteMode::Create);
        assert_eq!(fields.required_text("name", Some(Some("  Done ".into())), None), "Done");
    }
}
