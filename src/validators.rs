//! Value validators
//!
//! Validators run on a value after coercion succeeded, in the order they were
//! attached to a field. Only the first failure is reported.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorKind, FieldError};
use crate::values::{Record, Value};

/// Check applied to a coerced value
pub trait Validator: fmt::Debug + Send + Sync {
    /// Validate a value, returning the failure if any
    fn validate(&self, value: &Value) -> Result<(), FieldError>;
}

/// Length of text (in characters) or of a list (in items)
fn value_length(value: &Value) -> Option<(usize, &'static str)> {
    match value {
        Value::Text(s) | Value::Raw(s) => Some((s.chars().count(), "characters")),
        Value::List(items) => Some((items.len(), "elements")),
        _ => None,
    }
}

fn compare_to_limit(value: &Value, limit: &Decimal) -> Option<Ordering> {
    match value.to_decimal() {
        Some(d) => Some(d.cmp(limit)),
        None => match value {
            Value::Float(f) => f.partial_cmp(&limit.to_f64()?),
            _ => None,
        },
    }
}

/// Upper bound on text or list length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxLength(pub usize);

impl Validator for MaxLength {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        match value_length(value) {
            Some((len, unit)) if len > self.0 => Err(FieldError::with_message(
                ErrorKind::LengthOutOfRange,
                format!("Ensure this field has no more than {} {}.", self.0, unit),
            )),
            _ => Ok(()),
        }
    }
}

/// Lower bound on text or list length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinLength(pub usize);

impl Validator for MinLength {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        match value_length(value) {
            Some((len, unit)) if len < self.0 => Err(FieldError::with_message(
                ErrorKind::LengthOutOfRange,
                format!("Ensure this field has at least {} {}.", self.0, unit),
            )),
            _ => Ok(()),
        }
    }
}

/// Inclusive upper bound on a numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxValue(pub Decimal);

impl MaxValue {
    /// Create a bound from any integer or decimal
    pub fn new(limit: impl Into<Decimal>) -> Self {
        Self(limit.into())
    }
}

impl Validator for MaxValue {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        match compare_to_limit(value, &self.0) {
            Some(Ordering::Greater) => Err(FieldError::with_message(
                ErrorKind::OutOfRange,
                format!("Ensure this value is less than or equal to {}.", self.0),
            )),
            _ => Ok(()),
        }
    }
}

/// Inclusive lower bound on a numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinValue(pub Decimal);

impl MinValue {
    /// Create a bound from any integer or decimal
    pub fn new(limit: impl Into<Decimal>) -> Self {
        Self(limit.into())
    }
}

impl Validator for MinValue {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        match compare_to_limit(value, &self.0) {
            Some(Ordering::Less) => Err(FieldError::with_message(
                ErrorKind::OutOfRange,
                format!("Ensure this value is greater than or equal to {}.", self.0),
            )),
            _ => Ok(()),
        }
    }
}

/// Rejects text containing NUL characters
#[derive(Debug, Clone, Copy, Default)]
pub struct ProhibitNullCharacters;

impl Validator for ProhibitNullCharacters {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        match value {
            Value::Text(s) if s.contains('\0') => Err(FieldError::with_message(
                ErrorKind::ForbiddenCharacter,
                "Null characters are not allowed.",
            )),
            _ => Ok(()),
        }
    }
}

type ValidatorFn = dyn Fn(&Value) -> Result<(), FieldError> + Send + Sync;

/// Validator backed by a closure
#[derive(Clone)]
pub struct FnValidator {
    name: String,
    func: Arc<ValidatorFn>,
}

impl FnValidator {
    /// Wrap a closure under a descriptive name
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FnValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnValidator").field(&self.name).finish()
    }
}

impl Validator for FnValidator {
    fn validate(&self, value: &Value) -> Result<(), FieldError> {
        (self.func)(value)
    }
}

type RecordFn = dyn Fn(&Record) -> Result<(), FieldError> + Send + Sync;

/// Check applied to a whole record once every field validated
#[derive(Clone)]
pub struct RecordValidator {
    name: String,
    func: Arc<RecordFn>,
}

impl RecordValidator {
    /// Wrap a closure under a descriptive name
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Record) -> Result<(), FieldError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name given at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate a record
    pub fn validate(&self, record: &Record) -> Result<(), FieldError> {
        (self.func)(record)
    }
}

impl fmt::Debug for RecordValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordValidator").field(&self.name).finish()
    }
}

/// Run validators in order, stopping at the first failure
pub fn run_validators(validators: &[Arc<dyn Validator>], value: &Value) -> Result<(), FieldError> {
    validators.iter().try_for_each(|v| v.validate(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_length_on_text_counts_characters() {
        let value = Value::from("Кофе");
        assert!(MaxLength(4).validate(&value).is_ok());
        let err = MaxLength(3).validate(&value).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LengthOutOfRange);
        assert_eq!(err.message, "Ensure this field has no more than 3 characters.");
        assert!(MinLength(5).validate(&value).is_err());
    }

    #[test]
    fn test_length_on_lists() {
        let value = Value::List(vec![Value::Integer(1), Value::Integer(2)]);
        let err = MinLength(3).validate(&value).unwrap_err();
        assert_eq!(err.message, "Ensure this field has at least 3 elements.");
        assert!(MaxLength(2).validate(&value).is_ok());
    }

    #[test]
    fn test_value_bounds() {
        assert!(MaxValue::new(10).validate(&Value::Integer(10)).is_ok());
        assert_eq!(
            MaxValue::new(10).validate(&Value::Integer(11)).unwrap_err().kind,
            ErrorKind::OutOfRange
        );
        assert!(MinValue::new(0).validate(&Value::Float(-0.5)).is_err());
        let limit = Decimal::from_str("0.10").unwrap();
        assert!(MinValue(limit)
            .validate(&Value::Decimal(Decimal::from_str("0.12").unwrap()))
            .is_ok());
        assert!(MaxValue::new(1).validate(&Value::from("999")).is_ok());
    }

    #[test]
    fn test_float_beyond_decimal_range() {
        assert!(MaxValue::new(10).validate(&Value::Float(1e300)).is_err());
        assert!(MinValue::new(10).validate(&Value::Float(1e300)).is_ok());
    }

    #[test]
    fn test_null_characters() {
        assert!(ProhibitNullCharacters.validate(&Value::from("a\0b")).is_err());
        assert!(ProhibitNullCharacters.validate(&Value::from("ab")).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let validators: Vec<Arc<dyn Validator>> = vec![
            Arc::new(FnValidator::new("even", |v: &Value| match v.as_i64() {
                Some(i) if i % 2 == 0 => Ok(()),
                _ => Err(FieldError::with_message(ErrorKind::Invalid, "Must be even.")),
            })),
            Arc::new(MaxValue::new(0)),
        ];
        let err = run_validators(&validators, &Value::Integer(3)).unwrap_err();
        assert_eq!(err.message, "Must be even.");
        let err = run_validators(&validators, &Value::Integer(4)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
    }
}
