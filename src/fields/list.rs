//! List fields
//!
//! A [`ListField`] resolves its path to every matching node and runs a child
//! field against each of them. It never reports `ambiguous_match`: many
//! matches are the point. Failures are collected per position and the list
//! only produces a value when every item validated.

use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{Extracted, Field, FieldOptions, FieldOutcome, FieldSpec, SchemaField};
use crate::coercion::RawCoercer;
use crate::documents::XmlNode;
use crate::error::{Error, ErrorDetail, ErrorKind, FieldError, ItemErrorMap, Result};
use crate::validators::{MaxLength, MinLength};
use crate::values::Value;
use crate::xpath::{ParsedXPath, PathResolver};

/// Field whose matches form a list
#[derive(Debug, Clone)]
pub struct ListField {
    spec: FieldSpec,
    child: Arc<dyn SchemaField>,
    allow_empty: bool,
}

impl ListField {
    /// Create a list applying `child` to every match
    ///
    /// The child is applied to each matched node directly, so it must not
    /// carry a path of its own.
    pub fn new(child: impl SchemaField + 'static) -> Result<Self> {
        if let Some(path) = child.path() {
            return Err(Error::Config(format!(
                "list child must not have a path, got '{}'",
                path
            )));
        }
        child.check_config()?;
        Ok(Self {
            spec: FieldSpec::default(),
            child: Arc::new(child),
            allow_empty: true,
        })
    }

    /// List of unvalidated node contents
    pub fn raw() -> Self {
        Self {
            spec: FieldSpec::default(),
            child: Arc::new(Field::<RawCoercer>::raw()),
            allow_empty: true,
        }
    }

    /// Accept zero matches (default `true`)
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Maximum number of items
    pub fn max_length(self, max: usize) -> Self {
        self.with_validator(MaxLength(max))
    }

    /// Minimum number of items
    pub fn min_length(self, min: usize) -> Self {
        self.with_validator(MinLength(min))
    }

    /// Child applied to every item
    pub fn child(&self) -> &dyn SchemaField {
        self.child.as_ref()
    }

    /// Shared options
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }
}

impl FieldOptions for ListField {
    fn spec_mut(&mut self) -> &mut FieldSpec {
        &mut self.spec
    }
}

/// Validate every item with `child`, collecting failures by position
pub(crate) fn validate_items(
    child: &dyn SchemaField,
    items: Vec<XmlNode<'_, '_>>,
    resolver: &dyn PathResolver,
) -> std::result::Result<Vec<Value>, ErrorDetail> {
    let mut values = Vec::with_capacity(items.len());
    let mut errors = ItemErrorMap::new();
    for (index, item) in items.into_iter().enumerate() {
        match child.validate(Extracted::One(item), resolver) {
            FieldOutcome::Value(value) => values.push(value),
            FieldOutcome::Error(detail) => {
                errors.insert(index, detail);
            }
            FieldOutcome::Skip => values.push(Value::Null),
        }
    }
    if errors.is_empty() {
        Ok(values)
    } else {
        tracing::debug!(failed = errors.len(), "list items failed validation");
        Err(ErrorDetail::Items(errors))
    }
}

impl SchemaField for ListField {
    fn path(&self) -> Option<&ParsedXPath> {
        self.spec.path.as_ref()
    }

    fn extract<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Extracted<'a, 'input>, ErrorDetail> {
        if self.spec.read_only {
            return Ok(Extracted::Absent);
        }
        Ok(Extracted::Many(self.spec.resolve(node, resolver)?))
    }

    fn validate(&self, extracted: Extracted<'_, '_>, resolver: &dyn PathResolver) -> FieldOutcome {
        let items = match extracted {
            Extracted::Absent => return self.spec.absent(),
            Extracted::One(_) => {
                return FieldOutcome::Error(self.spec.error(FieldError::new(ErrorKind::NotAList)))
            }
            Extracted::Many(items) => items,
        };
        if items.is_empty() && !self.allow_empty {
            return FieldOutcome::Error(self.spec.error(FieldError::new(ErrorKind::EmptyNotAllowed)));
        }
        match validate_items(self.child.as_ref(), items, resolver) {
            Ok(values) => self.spec.run_validators(Value::List(values)),
            Err(detail) => FieldOutcome::Error(detail),
        }
    }

    fn to_representation(&self, value: &Value) -> JsonValue {
        match value {
            Value::List(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| {
                        if item.is_null() {
                            JsonValue::Null
                        } else {
                            self.child.to_representation(item)
                        }
                    })
                    .collect(),
            ),
            other => other.to_json(),
        }
    }

    fn check_config(&self) -> Result<()> {
        self.spec.check_list()?;
        self.child.check_config()
    }
}
