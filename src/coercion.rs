//! Value coercion
//!
//! A [`Coercer`] turns the primitive text content of a matched node into a
//! typed [`Value`], and turns a value back into its JSON representation.
//! Coercers are pure and hold only configuration, so one instance can serve
//! any number of concurrent schema applications.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ErrorKind, FieldError};
use crate::values::Value;

/// Longest numeric content accepted before parsing is attempted
pub const MAX_NUMBER_LENGTH: usize = 1000;

/// Strategy converting node content into a typed value
pub trait Coercer: fmt::Debug + Send + Sync {
    /// Convert raw node content into a value
    fn coerce(&self, raw: &str) -> Result<Value, FieldError>;

    /// JSON representation of a value produced by this coercer
    fn represent(&self, value: &Value) -> JsonValue {
        value.to_json()
    }

    /// Whether an element without text is coerced as `""` instead of
    /// being treated as null
    fn reads_empty_as_blank(&self) -> bool {
        false
    }
}

// =============================================================================
// Boolean
// =============================================================================

const TRUE_TOKENS: &[&str] = &[
    "t", "T", "y", "Y", "yes", "Yes", "YES", "true", "True", "TRUE", "on", "On", "ON", "1",
];

const FALSE_TOKENS: &[&str] = &[
    "f", "F", "n", "N", "no", "No", "NO", "false", "False", "FALSE", "off", "Off", "OFF", "0",
];

/// Boolean from a fixed set of tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCoercer;

impl Coercer for BooleanCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        let token = raw.trim();
        if TRUE_TOKENS.contains(&token) {
            Ok(Value::Bool(true))
        } else if FALSE_TOKENS.contains(&token) {
            Ok(Value::Bool(false))
        } else {
            Err(FieldError::new(ErrorKind::InvalidBoolean))
        }
    }
}

// =============================================================================
// Text
// =============================================================================

/// Text, optionally trimmed
#[derive(Debug, Clone, Copy)]
pub struct TextCoercer {
    /// Strip surrounding whitespace
    pub trim_whitespace: bool,
    /// Accept empty content
    pub allow_blank: bool,
}

impl Default for TextCoercer {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
            allow_blank: false,
        }
    }
}

impl Coercer for TextCoercer {
    fn reads_empty_as_blank(&self) -> bool {
        true
    }

    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        let text = if self.trim_whitespace { raw.trim() } else { raw };
        if text.is_empty() {
            if !self.allow_blank {
                return Err(FieldError::new(ErrorKind::BlankNotAllowed));
            }
            return Ok(Value::Text(String::new()));
        }
        Ok(Value::Text(text.to_string()))
    }
}

// =============================================================================
// Numbers
// =============================================================================

static TRAILING_ZERO_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.0*\s*$").unwrap());

fn check_number_length(raw: &str) -> Result<(), FieldError> {
    if raw.chars().count() > MAX_NUMBER_LENGTH {
        return Err(FieldError::with_message(
            ErrorKind::InvalidNumber,
            "String value too large.",
        ));
    }
    Ok(())
}

/// Base-10 integer; a zero fraction such as `796.0` is accepted
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerCoercer;

impl Coercer for IntegerCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        check_number_length(raw)?;
        let stripped = TRAILING_ZERO_FRACTION.replace(raw, "");
        stripped
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| FieldError::with_message(ErrorKind::InvalidNumber, "A valid integer is required."))
    }
}

/// Finite floating point number
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCoercer;

impl Coercer for FloatCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        check_number_length(raw)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Value::Float(value)),
            _ => Err(FieldError::new(ErrorKind::InvalidNumber)),
        }
    }
}

/// Fixed-point decimal with optional precision constraints
#[derive(Debug, Clone, Copy)]
pub struct DecimalCoercer {
    /// Maximum number of digits in total
    pub max_digits: Option<u32>,
    /// Maximum number of digits after the decimal point
    pub decimal_places: Option<u32>,
    /// Represent values as JSON strings rather than numbers
    pub coerce_to_string: bool,
}

impl Default for DecimalCoercer {
    fn default() -> Self {
        Self {
            max_digits: None,
            decimal_places: None,
            coerce_to_string: true,
        }
    }
}

impl DecimalCoercer {
    /// Create a coercer with the given precision
    pub fn new(max_digits: Option<u32>, decimal_places: Option<u32>) -> Self {
        Self {
            max_digits,
            decimal_places,
            ..Self::default()
        }
    }

    /// JSON number equal to `value`, if one exists
    ///
    /// Integral values become integers. Other values go through `f64` and are
    /// kept only when the number reads back as the same decimal.
    fn as_number(value: &Decimal) -> Option<serde_json::Number> {
        use rust_decimal::prelude::ToPrimitive;
        if value.fract().is_zero() {
            if let Some(n) = value.to_i64() {
                return Some(n.into());
            }
        }
        let number = value.to_f64().and_then(serde_json::Number::from_f64)?;
        (Self::parse(&number.to_string()) == Some(*value)).then_some(number)
    }

    fn parse(raw: &str) -> Option<Decimal> {
        let trimmed = raw.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .ok()
    }

    /// Check the digit counts of a parsed decimal against the precision
    fn check_precision(&self, value: &Decimal) -> Result<(), FieldError> {
        let scale = value.scale();
        let digits = count_digits(value.mantissa().unsigned_abs());
        let (total, whole, places) = if scale == 0 {
            (digits, digits, 0)
        } else if digits > scale {
            (digits, digits - scale, scale)
        } else {
            (scale, 0, scale)
        };

        if let Some(max_digits) = self.max_digits {
            if total > max_digits {
                return Err(FieldError::with_message(
                    ErrorKind::DigitsOutOfRange,
                    format!("Ensure that there are no more than {} digits in total.", max_digits),
                ));
            }
        }
        if let Some(decimal_places) = self.decimal_places {
            if places > decimal_places {
                return Err(FieldError::with_message(
                    ErrorKind::DigitsOutOfRange,
                    format!(
                        "Ensure that there are no more than {} decimal places.",
                        decimal_places
                    ),
                ));
            }
        }
        if let (Some(max_digits), Some(decimal_places)) = (self.max_digits, self.decimal_places) {
            let max_whole = max_digits.saturating_sub(decimal_places);
            if whole > max_whole {
                return Err(FieldError::with_message(
                    ErrorKind::DigitsOutOfRange,
                    format!(
                        "Ensure that there are no more than {} digits before the decimal point.",
                        max_whole
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn count_digits(mut n: u128) -> u32 {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

impl Coercer for DecimalCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        check_number_length(raw)?;
        let value = Self::parse(raw).ok_or_else(|| FieldError::new(ErrorKind::InvalidNumber))?;
        self.check_precision(&value)?;
        let value = match self.decimal_places {
            Some(places) => value.round_dp(places),
            None => value,
        };
        Ok(Value::Decimal(value))
    }

    fn represent(&self, value: &Value) -> JsonValue {
        match value {
            Value::Decimal(d) if !self.coerce_to_string => Self::as_number(d)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            other => other.to_json(),
        }
    }
}

// =============================================================================
// Unique identifiers
// =============================================================================

/// Output format of unique identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UuidFormat {
    /// `a9104793-9174-11eb-972c-38607706b20d`
    #[default]
    HexVerbose,
    /// `a9104793917411eb972c38607706b20d`
    Hex,
    /// `urn:uuid:a9104793-9174-11eb-972c-38607706b20d`
    Urn,
    /// Decimal integer, as a string
    Int,
}

/// Unique identifier in hyphenated 8-4-4-4-12 form, or in the text form of
/// the configured representation format
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCoercer {
    /// Representation format
    pub format: UuidFormat,
}

impl UuidCoercer {
    /// Create a coercer with the given representation format
    pub fn new(format: UuidFormat) -> Self {
        Self { format }
    }
}

fn is_hyphenated(raw: &str) -> bool {
    raw.len() == 36
        && raw.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn parse_hyphenated(raw: &str) -> Option<Uuid> {
    is_hyphenated(raw).then(|| Uuid::parse_str(raw).ok()).flatten()
}

impl UuidCoercer {
    fn parse_formatted(&self, raw: &str) -> Option<Uuid> {
        match self.format {
            UuidFormat::HexVerbose => None,
            UuidFormat::Hex => (raw.len() == 32 && raw.chars().all(|c| c.is_ascii_hexdigit()))
                .then(|| Uuid::parse_str(raw).ok())
                .flatten(),
            UuidFormat::Urn => raw.strip_prefix("urn:uuid:").and_then(parse_hyphenated),
            UuidFormat::Int => (!raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()))
                .then(|| raw.parse::<u128>().ok().map(Uuid::from_u128))
                .flatten(),
        }
    }
}

impl Coercer for UuidCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        parse_hyphenated(raw)
            .or_else(|| self.parse_formatted(raw))
            .map(Value::Uuid)
            .ok_or_else(|| FieldError::new(ErrorKind::InvalidIdentifier))
    }

    fn represent(&self, value: &Value) -> JsonValue {
        match value {
            Value::Uuid(u) => JsonValue::String(match self.format {
                UuidFormat::HexVerbose => u.hyphenated().to_string(),
                UuidFormat::Hex => u.simple().to_string(),
                UuidFormat::Urn => u.urn().to_string(),
                UuidFormat::Int => u.as_u128().to_string(),
            }),
            other => other.to_json(),
        }
    }
}

// =============================================================================
// Raw passthrough
// =============================================================================

/// Node content, unmodified and unvalidated
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCoercer;

impl Coercer for RawCoercer {
    fn coerce(&self, raw: &str) -> Result<Value, FieldError> {
        Ok(Value::Raw(raw.to_string()))
    }

    fn reads_empty_as_blank(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(result: Result<Value, FieldError>) -> ErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_boolean_tokens() {
        for token in TRUE_TOKENS {
            assert_eq!(BooleanCoercer.coerce(token).unwrap(), Value::Bool(true));
        }
        for token in FALSE_TOKENS {
            assert_eq!(BooleanCoercer.coerce(token).unwrap(), Value::Bool(false));
        }
        assert_eq!(BooleanCoercer.coerce("  true\n").unwrap(), Value::Bool(true));
        assert_eq!(kind(BooleanCoercer.coerce("maybe")), ErrorKind::InvalidBoolean);
        assert_eq!(kind(BooleanCoercer.coerce("tRUE")), ErrorKind::InvalidBoolean);
    }

    #[test]
    fn test_text_trimming_and_blank() {
        let text = TextCoercer::default();
        assert_eq!(text.coerce("  Кофе ").unwrap(), Value::from("Кофе"));
        assert_eq!(kind(text.coerce("   ")), ErrorKind::BlankNotAllowed);

        let untrimmed = TextCoercer {
            trim_whitespace: false,
            allow_blank: false,
        };
        assert_eq!(untrimmed.coerce(" a ").unwrap(), Value::from(" a "));
        assert_eq!(untrimmed.coerce("  ").unwrap(), Value::from("  "));

        let blank = TextCoercer {
            trim_whitespace: true,
            allow_blank: true,
        };
        assert_eq!(blank.coerce("  ").unwrap(), Value::from(""));
    }

    #[test]
    fn test_integer() {
        assert_eq!(IntegerCoercer.coerce("796").unwrap(), Value::Integer(796));
        assert_eq!(IntegerCoercer.coerce(" -12 ").unwrap(), Value::Integer(-12));
        assert_eq!(IntegerCoercer.coerce("796.0").unwrap(), Value::Integer(796));
        assert_eq!(IntegerCoercer.coerce("796.").unwrap(), Value::Integer(796));
        assert_eq!(kind(IntegerCoercer.coerce("796.5")), ErrorKind::InvalidNumber);
        assert_eq!(kind(IntegerCoercer.coerce("abc")), ErrorKind::InvalidNumber);
        assert_eq!(kind(IntegerCoercer.coerce(&"1".repeat(1001))), ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_float() {
        assert_eq!(FloatCoercer.coerce("0.12").unwrap(), Value::Float(0.12));
        assert_eq!(kind(FloatCoercer.coerce("inf")), ErrorKind::InvalidNumber);
        assert_eq!(kind(FloatCoercer.coerce("NaN")), ErrorKind::InvalidNumber);
        assert_eq!(kind(FloatCoercer.coerce("")), ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_decimal_precision() {
        let coercer = DecimalCoercer::new(Some(3), Some(2));
        assert_eq!(
            coercer.coerce("0.12").unwrap(),
            Value::Decimal(Decimal::from_str("0.12").unwrap())
        );
        assert_eq!(kind(coercer.coerce("0.123")), ErrorKind::DigitsOutOfRange);
        assert_eq!(kind(coercer.coerce("12.1")), ErrorKind::DigitsOutOfRange);
        assert_eq!(kind(coercer.coerce("1234")), ErrorKind::DigitsOutOfRange);
        assert_eq!(kind(coercer.coerce("x")), ErrorKind::InvalidNumber);
    }

    #[test]
    fn test_decimal_representation() {
        let value = Value::Decimal(Decimal::from_str("0.5").unwrap());
        assert_eq!(DecimalCoercer::default().represent(&value), JsonValue::from("0.5"));
        let numeric = DecimalCoercer {
            coerce_to_string: false,
            ..DecimalCoercer::default()
        };
        assert_eq!(numeric.represent(&value), JsonValue::from(0.5));

        let whole = Value::Decimal(Decimal::from_str("120.00").unwrap());
        assert_eq!(numeric.represent(&whole), JsonValue::from(120));

        // Not representable as f64 without loss
        let precise = Value::Decimal(Decimal::from_str("0.12345678901234567890").unwrap());
        assert_eq!(
            numeric.represent(&precise),
            JsonValue::from("0.12345678901234567890")
        );
    }

    #[test]
    fn test_uuid_hyphenated_only() {
        let coercer = UuidCoercer::default();
        let value = coercer.coerce("a9104793-9174-11eb-972c-38607706b20d").unwrap();
        assert_eq!(
            value,
            Value::Uuid(Uuid::parse_str("a9104793-9174-11eb-972c-38607706b20d").unwrap())
        );
        assert_eq!(
            kind(coercer.coerce("a9104793917411eb972c38607706b20d")),
            ErrorKind::InvalidIdentifier
        );
        assert_eq!(
            kind(coercer.coerce("{a9104793-9174-11eb-972c-38607706b20d}")),
            ErrorKind::InvalidIdentifier
        );
        assert_eq!(
            kind(coercer.coerce("g9104793-9174-11eb-972c-38607706b20d")),
            ErrorKind::InvalidIdentifier
        );
    }

    #[test]
    fn test_uuid_accepts_configured_format() {
        let id = Uuid::parse_str("a9104793-9174-11eb-972c-38607706b20d").unwrap();
        let cases = [
            (UuidFormat::Hex, "a9104793917411eb972c38607706b20d".to_string()),
            (UuidFormat::Urn, "urn:uuid:a9104793-9174-11eb-972c-38607706b20d".to_string()),
            (UuidFormat::Int, id.as_u128().to_string()),
        ];
        for (format, text) in cases {
            let coercer = UuidCoercer::new(format);
            assert_eq!(coercer.coerce(&text).unwrap(), Value::Uuid(id));
            assert_eq!(
                coercer.coerce("a9104793-9174-11eb-972c-38607706b20d").unwrap(),
                Value::Uuid(id)
            );
            assert_eq!(
                kind(UuidCoercer::default().coerce(&text)),
                ErrorKind::InvalidIdentifier
            );
        }
        assert_eq!(
            kind(UuidCoercer::new(UuidFormat::Int).coerce("-1")),
            ErrorKind::InvalidIdentifier
        );
        assert_eq!(
            kind(UuidCoercer::new(UuidFormat::Urn).coerce("urn:uuid:a9104793917411eb972c38607706b20d")),
            ErrorKind::InvalidIdentifier
        );
    }

    #[test]
    fn test_uuid_formats() {
        let value = UuidCoercer::default()
            .coerce("a9104793-9174-11eb-972c-38607706b20d")
            .unwrap();
        assert_eq!(
            UuidCoercer::new(UuidFormat::Hex).represent(&value),
            JsonValue::from("a9104793917411eb972c38607706b20d")
        );
        assert_eq!(
            UuidCoercer::new(UuidFormat::Urn).represent(&value),
            JsonValue::from("urn:uuid:a9104793-9174-11eb-972c-38607706b20d")
        );
        assert_eq!(
            UuidCoercer::new(UuidFormat::Int).represent(&value),
            JsonValue::from(value.as_uuid().unwrap().as_u128().to_string())
        );
    }

    #[test]
    fn test_raw_passthrough() {
        assert_eq!(RawCoercer.coerce("  ").unwrap(), Value::Raw("  ".to_string()));
    }
}
