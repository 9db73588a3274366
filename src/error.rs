//! Error types for xpath-schema
//!
//! Two families of errors live here:
//!
//! - [`Error`] covers everything that goes wrong *around* validation: a schema
//!   built with contradictory options, an unparsable path expression, a
//!   malformed XML document, I/O.
//! - [`ErrorDetail`] is the *result* of validating data. Field-level failures
//!   are values, not crate errors: a schema collects one [`ErrorDetail`] per
//!   failing field and returns them together.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::xpath::XPathParseError;

/// Result type alias using xpath-schema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xpath-schema operations
#[derive(Error, Debug)]
pub enum Error {
    /// A field or schema was configured with contradictory options
    #[error("configuration error: {0}")]
    Config(String),

    /// Path expression could not be parsed
    #[error("XPath error: {0}")]
    XPath(#[from] XPathParseError),

    /// Namespace prefix could not be resolved
    #[error("namespace error: {0}")]
    Namespace(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data did not validate against a schema
    #[error("validation failed: {0}")]
    Validation(ErrorDetail),
}

impl From<ErrorDetail> for Error {
    fn from(detail: ErrorDetail) -> Self {
        Error::Validation(detail)
    }
}

// =============================================================================
// Validation outcome errors
// =============================================================================

/// Key under which schema-level (record) validator failures are reported
pub const NON_FIELD_ERRORS_KEY: &str = "non_field_errors";

/// Kind of a field-level validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required field matched no node
    RequiredMissing,
    /// Matched node has no content and the field is not nullable
    NullNotAllowed,
    /// Scalar path matched more than one node
    AmbiguousMatch,
    /// Content is not a recognised boolean token
    InvalidBoolean,
    /// Content is not a number
    InvalidNumber,
    /// Content is not a hyphenated UUID
    InvalidIdentifier,
    /// Decimal has too many digits or decimal places
    DigitsOutOfRange,
    /// Text is blank and blanks are not allowed
    BlankNotAllowed,
    /// Text contains a forbidden character
    ForbiddenCharacter,
    /// Numeric value outside the declared bounds
    OutOfRange,
    /// Text or list length outside the declared bounds
    LengthOutOfRange,
    /// List matched nothing and empty lists are not allowed
    EmptyNotAllowed,
    /// A list field was handed a single value
    NotAList,
    /// A schema was applied to something that is not an element
    InvalidInput,
    /// Path could not be evaluated (e.g. undefined namespace prefix)
    InvalidPath,
    /// Custom validator failure
    Invalid,
}

impl ErrorKind {
    /// Get the kind as its stable string code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RequiredMissing => "required_missing",
            ErrorKind::NullNotAllowed => "null_not_allowed",
            ErrorKind::AmbiguousMatch => "ambiguous_match",
            ErrorKind::InvalidBoolean => "invalid_boolean",
            ErrorKind::InvalidNumber => "invalid_number",
            ErrorKind::InvalidIdentifier => "invalid_identifier",
            ErrorKind::DigitsOutOfRange => "digits_out_of_range",
            ErrorKind::BlankNotAllowed => "blank_not_allowed",
            ErrorKind::ForbiddenCharacter => "forbidden_character",
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::LengthOutOfRange => "length_out_of_range",
            ErrorKind::EmptyNotAllowed => "empty_not_allowed",
            ErrorKind::NotAList => "not_a_list",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::Invalid => "invalid",
        }
    }

    /// Default human readable message for this kind
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::RequiredMissing => "This field is required.",
            ErrorKind::NullNotAllowed => "This field may not be null.",
            ErrorKind::AmbiguousMatch => "Expected one value, got many.",
            ErrorKind::InvalidBoolean => "Must be a valid boolean.",
            ErrorKind::InvalidNumber => "A valid number is required.",
            ErrorKind::InvalidIdentifier => "Must be a valid UUID.",
            ErrorKind::DigitsOutOfRange => "Too many digits.",
            ErrorKind::BlankNotAllowed => "This field may not be blank.",
            ErrorKind::ForbiddenCharacter => "Forbidden characters are not allowed.",
            ErrorKind::OutOfRange => "Value is out of range.",
            ErrorKind::LengthOutOfRange => "Length is out of range.",
            ErrorKind::EmptyNotAllowed => "This list may not be empty.",
            ErrorKind::NotAList => "Expected a list of items.",
            ErrorKind::InvalidInput => "Invalid data.",
            ErrorKind::InvalidPath => "Path could not be evaluated.",
            ErrorKind::Invalid => "Invalid value.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field-level failure: kind, message and path context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Failure kind
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
    /// Path expression that was being evaluated, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FieldError {
    /// Create an error with the kind's default message
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            path: None,
        }
    }

    /// Create an error with a custom message
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
        }
    }

    /// Set the path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)?;
        if let Some(ref path) = self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

/// Ordered mapping from field name to its error
pub type FieldErrorMap = IndexMap<String, ErrorDetail>;

/// Ordered mapping from list position to the error at that position
pub type ItemErrorMap = IndexMap<usize, ErrorDetail>;

/// Error detail produced by validation
///
/// Mirrors the shape of the data being validated: a scalar field fails with
/// a single [`FieldError`], a schema with a map keyed by field name, a list
/// with a map keyed by position.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    /// Single failure
    Error(FieldError),
    /// Per-field failures of a schema
    Fields(FieldErrorMap),
    /// Per-position failures of a list
    Items(ItemErrorMap),
}

impl ErrorDetail {
    /// Single failure with the kind's default message
    pub fn kind(kind: ErrorKind) -> Self {
        ErrorDetail::Error(FieldError::new(kind))
    }

    /// Single failure with a custom message
    pub fn message(kind: ErrorKind, message: impl Into<String>) -> Self {
        ErrorDetail::Error(FieldError::with_message(kind, message))
    }

    /// Get the single error, if this is a leaf
    pub fn as_error(&self) -> Option<&FieldError> {
        match self {
            ErrorDetail::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Get the kind, if this is a leaf
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.as_error().map(|e| e.kind)
    }

    /// Get the per-field map, if this is a schema failure
    pub fn as_fields(&self) -> Option<&FieldErrorMap> {
        match self {
            ErrorDetail::Fields(map) => Some(map),
            _ => None,
        }
    }

    /// Get the per-position map, if this is a list failure
    pub fn as_items(&self) -> Option<&ItemErrorMap> {
        match self {
            ErrorDetail::Items(map) => Some(map),
            _ => None,
        }
    }

    /// Count leaf errors recursively
    pub fn leaf_count(&self) -> usize {
        match self {
            ErrorDetail::Error(_) => 1,
            ErrorDetail::Fields(map) => map.values().map(ErrorDetail::leaf_count).sum(),
            ErrorDetail::Items(map) => map.values().map(ErrorDetail::leaf_count).sum(),
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<FieldError> for ErrorDetail {
    fn from(error: FieldError) -> Self {
        ErrorDetail::Error(error)
    }
}

impl Serialize for ErrorDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ErrorDetail::Error(error) => error.serialize(serializer),
            ErrorDetail::Fields(map) => map.serialize(serializer),
            ErrorDetail::Items(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (index, detail) in map {
                    out.serialize_entry(&index.to_string(), detail)?;
                }
                out.end()
            }
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Error(error) => write!(f, "{}", error),
            ErrorDetail::Fields(map) => {
                let mut first = true;
                for (name, detail) in map {
                    if !first {
                        write!(f, "; ")?;
                    }
                    first = false;
                    write!(f, "{}: {}", name, detail)?;
                }
                Ok(())
            }
            ErrorDetail::Items(map) => {
                let mut first = true;
                for (index, detail) in map {
                    if !first {
                        write!(f, "; ")?;
                    }
                    first = false;
                    write!(f, "[{}]: {}", index, detail)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ErrorDetail {}
