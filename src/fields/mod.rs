//! Schema fields
//!
//! A field binds a path expression to a coercion strategy. Applying a field
//! to a node happens in two phases:
//!
//! 1. **extract**: resolve the path relative to the node. Zero matches are
//!    *absent*, one match is the node to read, more than one match fails with
//!    `ambiguous_match` whether or not the field is required.
//! 2. **validate**: turn the extracted node into a [`Value`] (or decide to
//!    skip the field), then run the field's validators.
//!
//! Everything a schema can hold implements [`SchemaField`]: scalar
//! [`Field`]s, [`ListField`]s, nested [`Schema`](crate::schemas::Schema)s
//! and [`ListSchema`](crate::schemas::ListSchema)s.
//!
//! ## Example
//!
//! ```rust
//! use xpath_schema::{Document, Field, FieldOptions, FieldOutcome, SchemaField, StepResolver};
//!
//! let doc = Document::parse("<Товар><ПометкаУдаления>true</ПометкаУдаления></Товар>")?;
//! let field = Field::boolean().with_path("/Товар/ПометкаУдаления")?;
//! let outcome = field.run(doc.root_element(), &StepResolver);
//! assert!(matches!(outcome, FieldOutcome::Value(v) if v.as_bool() == Some(true)));
//! # Ok::<(), xpath_schema::Error>(())
//! ```

pub(crate) mod list;

pub use list::ListField;

use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

use crate::coercion::{
    BooleanCoercer, Coercer, DecimalCoercer, FloatCoercer, IntegerCoercer, RawCoercer,
    TextCoercer, UuidCoercer, UuidFormat,
};
use crate::documents::XmlNode;
use crate::error::{Error, ErrorDetail, ErrorKind, FieldError, Result};
use crate::namespaces::NamespaceMap;
use crate::validators::{
    run_validators, MaxLength, MaxValue, MinLength, MinValue, ProhibitNullCharacters, Validator,
};
use crate::values::Value;
use crate::xpath::{ParsedXPath, PathResolver};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of the extraction phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<'a, 'input> {
    /// The path matched nothing (or the field is never read)
    Absent,
    /// Exactly one node
    One(XmlNode<'a, 'input>),
    /// Ordered sequence of nodes (list fields)
    Many(Vec<XmlNode<'a, 'input>>),
}

/// Result of the validation phase
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// Validated value
    Value(Value),
    /// Validation failure
    Error(ErrorDetail),
    /// Field is absent and optional: leave it out of the record
    Skip,
}

impl FieldOutcome {
    /// Check for a failure
    pub fn is_error(&self) -> bool {
        matches!(self, FieldOutcome::Error(_))
    }

    /// Convert into a `Result`, with `Skip` as `None`
    pub fn into_result(self) -> std::result::Result<Option<Value>, ErrorDetail> {
        match self {
            FieldOutcome::Value(value) => Ok(Some(value)),
            FieldOutcome::Error(detail) => Err(detail),
            FieldOutcome::Skip => Ok(None),
        }
    }
}

impl From<std::result::Result<Value, ErrorDetail>> for FieldOutcome {
    fn from(result: std::result::Result<Value, ErrorDetail>) -> Self {
        match result {
            Ok(value) => FieldOutcome::Value(value),
            Err(detail) => FieldOutcome::Error(detail),
        }
    }
}

// =============================================================================
// SchemaField trait
// =============================================================================

/// Anything a schema can hold under a name
pub trait SchemaField: fmt::Debug + Send + Sync {
    /// Bound path expression; `None` means the node itself
    fn path(&self) -> Option<&ParsedXPath>;

    /// Resolve the field's path relative to `node`
    fn extract<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Extracted<'a, 'input>, ErrorDetail>;

    /// Turn an extraction into a validated value
    fn validate(&self, extracted: Extracted<'_, '_>, resolver: &dyn PathResolver) -> FieldOutcome;

    /// JSON representation of a value produced by this field
    fn to_representation(&self, value: &Value) -> JsonValue;

    /// Check construction invariants
    fn check_config(&self) -> Result<()> {
        Ok(())
    }

    /// Extract then validate
    fn run(&self, node: XmlNode<'_, '_>, resolver: &dyn PathResolver) -> FieldOutcome {
        match self.extract(node, resolver) {
            Ok(extracted) => self.validate(extracted, resolver),
            Err(detail) => FieldOutcome::Error(detail),
        }
    }
}

impl<T: SchemaField + ?Sized> SchemaField for Arc<T> {
    fn path(&self) -> Option<&ParsedXPath> {
        (**self).path()
    }

    fn extract<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Extracted<'a, 'input>, ErrorDetail> {
        (**self).extract(node, resolver)
    }

    fn validate(&self, extracted: Extracted<'_, '_>, resolver: &dyn PathResolver) -> FieldOutcome {
        (**self).validate(extracted, resolver)
    }

    fn to_representation(&self, value: &Value) -> JsonValue {
        (**self).to_representation(value)
    }

    fn check_config(&self) -> Result<()> {
        (**self).check_config()
    }
}

// =============================================================================
// FieldSpec
// =============================================================================

/// Options shared by every field kind
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    /// Path expression, relative to the node the field is applied to
    pub path: Option<ParsedXPath>,
    /// Prefixes usable in `path`
    pub namespaces: NamespaceMap,
    /// Explicit required flag; derived from the other options when unset
    pub required: Option<bool>,
    /// Accept nodes without content as `Value::Null`
    pub allow_null: bool,
    /// Value used when the path matches nothing
    pub default: Option<Value>,
    /// Never read from the document
    pub read_only: bool,
    /// Validators, run in order after coercion
    pub validators: Vec<Arc<dyn Validator>>,
}

impl FieldSpec {
    /// Effective required flag
    ///
    /// Fields are required unless they have a default or are read-only.
    pub fn is_required(&self) -> bool {
        self.required
            .unwrap_or(self.default.is_none() && !self.read_only)
    }

    /// Path expression as text, for error context
    pub fn path_str(&self) -> Option<&str> {
        self.path.as_ref().map(ParsedXPath::as_str)
    }

    /// Check that the options do not contradict each other
    pub fn check(&self) -> Result<()> {
        let required = self.required == Some(true);
        if required && self.default.is_some() {
            return Err(Error::Config(
                "a field may not be both required and have a default".to_string(),
            ));
        }
        if required && self.read_only {
            return Err(Error::Config(
                "a field may not be both required and read-only".to_string(),
            ));
        }
        if matches!(self.default, Some(Value::Null)) && !self.allow_null {
            return Err(Error::Config(
                "a null default requires allow_null".to_string(),
            ));
        }
        Ok(())
    }

    /// Check options of a list-valued field
    ///
    /// Zero matches produce an empty list, so a list is never missing and an
    /// explicit `required(true)` would have no effect.
    pub fn check_list(&self) -> Result<()> {
        self.check()?;
        if self.required == Some(true) {
            return Err(Error::Config(
                "a list is never missing; use allow_empty(false) or min_length instead of required"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Attach this field's path to an error
    pub fn error(&self, error: FieldError) -> ErrorDetail {
        match self.path_str() {
            Some(path) if error.path.is_none() => ErrorDetail::Error(error.with_path(path)),
            _ => ErrorDetail::Error(error),
        }
    }

    /// Resolve the path; no path resolves to the node itself
    pub fn resolve<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Vec<XmlNode<'a, 'input>>, ErrorDetail> {
        let Some(path) = &self.path else {
            return Ok(vec![node]);
        };
        let found = resolver
            .resolve(node, path, &self.namespaces)
            .map_err(|e| self.error(FieldError::with_message(ErrorKind::InvalidPath, e.to_string())))?;
        if found.is_empty() {
            tracing::debug!(path = %path, "path matched no node");
        }
        Ok(found)
    }

    /// Extraction for scalar fields
    pub fn extract_one<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Extracted<'a, 'input>, ErrorDetail> {
        if self.read_only {
            return Ok(Extracted::Absent);
        }
        let mut found = self.resolve(node, resolver)?;
        match found.len() {
            0 => Ok(Extracted::Absent),
            1 => Ok(Extracted::One(found.remove(0))),
            count => {
                tracing::debug!(path = ?self.path_str(), count, "ambiguous match");
                Err(self.error(FieldError::new(ErrorKind::AmbiguousMatch)))
            }
        }
    }

    /// Outcome for an absent field: error, default, or skip
    pub fn absent(&self) -> FieldOutcome {
        if self.is_required() {
            return FieldOutcome::Error(self.error(FieldError::new(ErrorKind::RequiredMissing)));
        }
        match &self.default {
            Some(value) => FieldOutcome::Value(value.clone()),
            None => FieldOutcome::Skip,
        }
    }

    /// Outcome for a matched node without content that is not read as blank
    pub fn null(&self) -> FieldOutcome {
        if self.allow_null {
            FieldOutcome::Value(Value::Null)
        } else {
            FieldOutcome::Error(self.error(FieldError::new(ErrorKind::NullNotAllowed)))
        }
    }

    /// Run the validators on a coerced value
    pub fn run_validators(&self, value: Value) -> FieldOutcome {
        match run_validators(&self.validators, &value) {
            Ok(()) => FieldOutcome::Value(value),
            Err(error) => FieldOutcome::Error(self.error(error)),
        }
    }
}

/// Builder options shared by every field kind
pub trait FieldOptions: Sized {
    /// Mutable access to the shared options
    fn spec_mut(&mut self) -> &mut FieldSpec;

    /// Bind a path expression
    fn with_path(mut self, path: &str) -> Result<Self> {
        self.spec_mut().path = Some(ParsedXPath::parse(path)?);
        Ok(self)
    }

    /// Set the namespace map used to resolve path prefixes
    fn with_namespaces(mut self, namespaces: NamespaceMap) -> Self {
        self.spec_mut().namespaces = namespaces;
        self
    }

    /// Set the required flag explicitly
    fn required(mut self, required: bool) -> Self {
        self.spec_mut().required = Some(required);
        self
    }

    /// Accept nodes without content as null
    fn allow_null(mut self, allow_null: bool) -> Self {
        self.spec_mut().allow_null = allow_null;
        self
    }

    /// Value used when the path matches nothing
    fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.spec_mut().default = Some(value.into());
        self
    }

    /// Never read the field from the document
    fn read_only(mut self, read_only: bool) -> Self {
        self.spec_mut().read_only = read_only;
        self
    }

    /// Append a validator
    fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.spec_mut().validators.push(Arc::new(validator));
        self
    }
}

// =============================================================================
// Scalar fields
// =============================================================================

/// Scalar field: one node, coerced by `C`
#[derive(Debug, Clone)]
pub struct Field<C: Coercer> {
    spec: FieldSpec,
    coercer: C,
}

/// Boolean field
pub type BooleanField = Field<BooleanCoercer>;
/// Text field
pub type TextField = Field<TextCoercer>;
/// Integer field
pub type IntegerField = Field<IntegerCoercer>;
/// Floating point field
pub type FloatField = Field<FloatCoercer>;
/// Decimal field
pub type DecimalField = Field<DecimalCoercer>;
/// Unique identifier field
pub type UuidField = Field<UuidCoercer>;
/// Unvalidated passthrough field
pub type RawField = Field<RawCoercer>;

impl<C: Coercer> Field<C> {
    /// Create a path-less field with the given coercer
    pub fn new(coercer: C) -> Self {
        Self {
            spec: FieldSpec::default(),
            coercer,
        }
    }

    /// Shared options
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Coercion strategy
    pub fn coercer(&self) -> &C {
        &self.coercer
    }
}

impl<C: Coercer> FieldOptions for Field<C> {
    fn spec_mut(&mut self) -> &mut FieldSpec {
        &mut self.spec
    }
}

impl<C: Coercer> SchemaField for Field<C> {
    fn path(&self) -> Option<&ParsedXPath> {
        self.spec.path.as_ref()
    }

    fn extract<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Extracted<'a, 'input>, ErrorDetail> {
        self.spec.extract_one(node, resolver)
    }

    fn validate(&self, extracted: Extracted<'_, '_>, _resolver: &dyn PathResolver) -> FieldOutcome {
        let node = match extracted {
            Extracted::Absent => return self.spec.absent(),
            Extracted::Many(_) => {
                return FieldOutcome::Error(self.spec.error(FieldError::new(ErrorKind::AmbiguousMatch)))
            }
            Extracted::One(node) => node,
        };
        let raw = match node.text() {
            Some(raw) => raw,
            None if self.spec.allow_null || !self.coercer.reads_empty_as_blank() => {
                return self.spec.null()
            }
            None => String::new(),
        };
        match self.coercer.coerce(&raw) {
            Ok(value) => self.spec.run_validators(value),
            Err(error) => FieldOutcome::Error(self.spec.error(error)),
        }
    }

    fn to_representation(&self, value: &Value) -> JsonValue {
        self.coercer.represent(value)
    }

    fn check_config(&self) -> Result<()> {
        self.spec.check()
    }
}

impl Field<BooleanCoercer> {
    /// Boolean field
    pub fn boolean() -> Self {
        Self::new(BooleanCoercer)
    }
}

impl Field<TextCoercer> {
    /// Text field; rejects NUL characters
    pub fn text() -> Self {
        Self::new(TextCoercer::default()).with_validator(ProhibitNullCharacters)
    }

    /// Strip surrounding whitespace (default `true`)
    pub fn trim_whitespace(mut self, trim: bool) -> Self {
        self.coercer.trim_whitespace = trim;
        self
    }

    /// Accept empty text (default `false`)
    pub fn allow_blank(mut self, allow: bool) -> Self {
        self.coercer.allow_blank = allow;
        self
    }

    /// Maximum length in characters
    pub fn max_length(self, max: usize) -> Self {
        self.with_validator(MaxLength(max))
    }

    /// Minimum length in characters
    pub fn min_length(self, min: usize) -> Self {
        self.with_validator(MinLength(min))
    }
}

/// Coercers producing numbers, which accept value bounds
pub trait NumericCoercer: Coercer {}

impl NumericCoercer for IntegerCoercer {}
impl NumericCoercer for FloatCoercer {}
impl NumericCoercer for DecimalCoercer {}

impl<C: NumericCoercer> Field<C> {
    /// Inclusive upper bound
    pub fn max_value(self, limit: impl Into<rust_decimal::Decimal>) -> Self {
        self.with_validator(MaxValue::new(limit))
    }

    /// Inclusive lower bound
    pub fn min_value(self, limit: impl Into<rust_decimal::Decimal>) -> Self {
        self.with_validator(MinValue::new(limit))
    }
}

impl Field<IntegerCoercer> {
    /// Integer field
    pub fn integer() -> Self {
        Self::new(IntegerCoercer)
    }
}

impl Field<FloatCoercer> {
    /// Floating point field
    pub fn float() -> Self {
        Self::new(FloatCoercer)
    }
}

impl Field<DecimalCoercer> {
    /// Decimal field with optional precision
    pub fn decimal(max_digits: Option<u32>, decimal_places: Option<u32>) -> Self {
        Self::new(DecimalCoercer::new(max_digits, decimal_places))
    }

    /// Represent values as strings (default) or JSON numbers
    pub fn coerce_to_string(mut self, as_string: bool) -> Self {
        self.coercer.coerce_to_string = as_string;
        self
    }
}

impl Field<UuidCoercer> {
    /// Unique identifier field
    pub fn uuid() -> Self {
        Self::new(UuidCoercer::default())
    }

    /// Representation format
    pub fn format(mut self, format: UuidFormat) -> Self {
        self.coercer.format = format;
        self
    }
}

impl Field<RawCoercer> {
    /// Passthrough field; accepts blank and null content
    pub fn raw() -> Self {
        Self::new(RawCoercer).allow_null(true)
    }
}
