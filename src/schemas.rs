//! Schemas
//!
//! A [`Schema`] is an ordered set of named fields. Applying it to an element
//! runs every field, never stopping at the first failure: the result is
//! either a complete [`Record`] or an error map covering every field that
//! failed. There are no partial records.
//!
//! Schemas are fields themselves, so they nest: a nested schema resolves its
//! path like a scalar field (absent and ambiguous rules apply) and then
//! applies itself to the matched element. A [`ListSchema`] applies a schema
//! to every match of a path.
//!
//! ## Example
//!
//! ```rust
//! use xpath_schema::{Document, Field, FieldOptions, ListField, Schema};
//!
//! let xml = r#"<Товар>
//!     <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
//!     <Группы><Ид>ec50ae26-916a-11eb-972c-38607706b20d</Ид></Группы>
//! </Товар>"#;
//!
//! let schema = Schema::builder()
//!     .path("/Товар")
//!     .field("uuid", Field::uuid().with_path("Ид")?)
//!     .field("group_uuids", ListField::new(Field::uuid())?.with_path("Группы/Ид")?)
//!     .build()?;
//!
//! let doc = Document::parse(xml)?;
//! let record = schema.apply_document(&doc)?;
//! assert_eq!(record.keys().collect::<Vec<_>>(), vec!["uuid", "group_uuids"]);
//! # Ok::<(), xpath_schema::Error>(())
//! ```

use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::Arc;

use crate::documents::{Document, XmlNode};
use crate::error::{
    Error, ErrorDetail, ErrorKind, FieldError, FieldErrorMap, Result, NON_FIELD_ERRORS_KEY,
};
use crate::fields::list::validate_items;
use crate::fields::{Extracted, FieldOptions, FieldOutcome, FieldSpec, SchemaField};
use crate::namespaces::NamespaceMap;
use crate::validators::{MaxLength, MinLength, RecordValidator};
use crate::values::{Record, Value};
use crate::xpath::{ParsedXPath, PathResolver, StepResolver};

// =============================================================================
// Schema
// =============================================================================

/// Ordered collection of named fields
#[derive(Debug, Clone)]
pub struct Schema {
    spec: FieldSpec,
    fields: Vec<(String, Arc<dyn SchemaField>)>,
    validators: Vec<RecordValidator>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&dyn SchemaField> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field.as_ref())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check for a schema without fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shared options (path, namespaces, required...)
    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// Apply the schema to `node` with the built-in resolver
    ///
    /// The schema's own path is not used: `node` is the element the fields
    /// are resolved against.
    pub fn apply(&self, node: XmlNode<'_, '_>) -> std::result::Result<Record, ErrorDetail> {
        self.apply_with(node, &StepResolver)
    }

    /// Apply the schema to `node` with a custom resolver
    pub fn apply_with(
        &self,
        node: XmlNode<'_, '_>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Record, ErrorDetail> {
        if !node.is_container() {
            return Err(ErrorDetail::message(
                ErrorKind::InvalidInput,
                format!("Invalid data. Expected an element, but got {}.", node.kind()),
            ));
        }

        let mut record = Record::new();
        let mut errors = FieldErrorMap::new();
        for (name, field) in &self.fields {
            match field.run(node, resolver) {
                FieldOutcome::Value(value) => record.insert(name.as_str(), value),
                FieldOutcome::Error(detail) => {
                    errors.insert(name.clone(), detail);
                }
                FieldOutcome::Skip => tracing::trace!(field = %name, "field skipped"),
            }
        }

        if !errors.is_empty() {
            tracing::debug!(failed = errors.len(), fields = self.fields.len(), "schema validation failed");
            return Err(ErrorDetail::Fields(errors));
        }

        for validator in &self.validators {
            if let Err(error) = validator.validate(&record) {
                let mut errors = FieldErrorMap::new();
                errors.insert(NON_FIELD_ERRORS_KEY.to_string(), ErrorDetail::Error(error));
                return Err(ErrorDetail::Fields(errors));
            }
        }
        Ok(record)
    }

    /// Apply the schema to a parsed document
    ///
    /// With a path, the path is resolved from the document node and must
    /// match exactly one element; without one, the root element is used.
    pub fn apply_document(&self, document: &Document<'_>) -> std::result::Result<Record, ErrorDetail> {
        let resolver = StepResolver;
        let node = match self.spec.path {
            None => document.root_element(),
            Some(_) => match self.spec.extract_one(document.root(), &resolver)? {
                Extracted::One(node) => node,
                _ => return Err(self.spec.error(FieldError::new(ErrorKind::RequiredMissing))),
            },
        };
        self.apply_with(node, &resolver)
    }

    /// Parse `xml` and apply the schema to it
    pub fn apply_str(&self, xml: &str) -> Result<Record> {
        let document = Document::parse(xml)?;
        self.apply_document(&document).map_err(Error::Validation)
    }

    /// JSON representation of a record, in declaration order
    pub fn represent(&self, record: &Record) -> JsonValue {
        let mut map = serde_json::Map::with_capacity(record.len());
        for (name, field) in &self.fields {
            if let Some(value) = record.get(name) {
                let json = if value.is_null() {
                    JsonValue::Null
                } else {
                    field.to_representation(value)
                };
                map.insert(name.clone(), json);
            }
        }
        JsonValue::Object(map)
    }
}

impl SchemaField for Schema {
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

    fn validate(&self, extracted: Extracted<'_, '_>, resolver: &dyn PathResolver) -> FieldOutcome {
        match extracted {
            Extracted::Absent => self.spec.absent(),
            Extracted::Many(_) => {
                FieldOutcome::Error(self.spec.error(FieldError::new(ErrorKind::AmbiguousMatch)))
            }
            Extracted::One(node) => self.apply_with(node, resolver).map(Value::Record).into(),
        }
    }

    fn to_representation(&self, value: &Value) -> JsonValue {
        match value {
            Value::Record(record) => self.represent(record),
            other => other.to_json(),
        }
    }

    fn check_config(&self) -> Result<()> {
        self.spec.check()
    }
}

// =============================================================================
// SchemaBuilder
// =============================================================================

/// Builder for [`Schema`] and [`ListSchema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    path: Option<String>,
    spec: FieldSpec,
    fields: Vec<(String, Arc<dyn SchemaField>)>,
    validators: Vec<RecordValidator>,
}

impl SchemaBuilder {
    /// Path of the schema's element relative to its parent
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Namespace map for the schema's own path
    pub fn namespaces(mut self, namespaces: NamespaceMap) -> Self {
        self.spec.namespaces = namespaces;
        self
    }

    /// Set the required flag explicitly
    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = Some(required);
        self
    }

    /// Never read the schema from the document
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.spec.read_only = read_only;
        self
    }

    /// Add a named field; fields run in the order they are added
    pub fn field(mut self, name: impl Into<String>, field: impl SchemaField + 'static) -> Self {
        self.fields.push((name.into(), Arc::new(field)));
        self
    }

    /// Add a record-level check, run once every field validated
    pub fn validator(mut self, validator: RecordValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Build the schema, checking names and field options
    pub fn build(mut self) -> Result<Schema> {
        if let Some(path) = self.path.take() {
            self.spec.path = Some(ParsedXPath::parse(path)?);
        }
        self.spec.check()?;

        let mut seen = HashSet::new();
        for (name, field) in &self.fields {
            if name.is_empty() {
                return Err(Error::Config("field name must not be empty".to_string()));
            }
            if name == NON_FIELD_ERRORS_KEY {
                return Err(Error::Config(format!("'{}' is a reserved field name", name)));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("duplicate field name '{}'", name)));
            }
            field
                .check_config()
                .map_err(|e| Error::Config(format!("field '{}': {}", name, e)))?;
        }

        Ok(Schema {
            spec: self.spec,
            fields: self.fields,
            validators: self.validators,
        })
    }

    /// Build a [`ListSchema`] over every match of the builder's path
    pub fn build_many(mut self) -> Result<ListSchema> {
        let path = self.path.take().unwrap_or_default();
        let required = self.spec.required.take();
        let read_only = std::mem::take(&mut self.spec.read_only);
        let mut list = ListSchema::new(self.build()?, &path)?;
        list.spec.required = required;
        list.spec.read_only = read_only;
        list.spec.check_list()?;
        Ok(list)
    }
}

// =============================================================================
// ListSchema
// =============================================================================

/// Schema applied to every match of a path
#[derive(Debug, Clone)]
pub struct ListSchema {
    spec: FieldSpec,
    child: Schema,
    allow_empty: bool,
}

impl ListSchema {
    /// Wrap `schema`, applying it to every match of `path`
    ///
    /// The path is mandatory; the wrapped schema is applied to each matched
    /// element directly.
    pub fn new(schema: Schema, path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(Error::Config("a list schema requires a path".to_string()));
        }
        let spec = FieldSpec {
            path: Some(ParsedXPath::parse(path)?),
            namespaces: schema.spec.namespaces.clone(),
            ..FieldSpec::default()
        };
        Ok(Self {
            spec,
            child: schema,
            allow_empty: true,
        })
    }

    /// Accept zero matches (default `true`)
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Maximum number of records
    pub fn max_length(self, max: usize) -> Self {
        self.with_validator(MaxLength(max))
    }

    /// Minimum number of records
    pub fn min_length(self, min: usize) -> Self {
        self.with_validator(MinLength(min))
    }

    /// Wrapped schema
    pub fn schema(&self) -> &Schema {
        &self.child
    }

    /// Apply to every match of the path relative to `node`
    pub fn apply(&self, node: XmlNode<'_, '_>) -> std::result::Result<Vec<Record>, ErrorDetail> {
        self.apply_with(node, &StepResolver)
    }

    /// Apply with a custom resolver
    pub fn apply_with(
        &self,
        node: XmlNode<'_, '_>,
        resolver: &dyn PathResolver,
    ) -> std::result::Result<Vec<Record>, ErrorDetail> {
        match self.run(node, resolver) {
            FieldOutcome::Value(Value::List(values)) => Ok(values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Record(record) => Some(record),
                    _ => None,
                })
                .collect()),
            FieldOutcome::Error(detail) => Err(detail),
            _ => Ok(Vec::new()),
        }
    }

    /// Apply to a parsed document, resolving the path from the document node
    pub fn apply_document(&self, document: &Document<'_>) -> std::result::Result<Vec<Record>, ErrorDetail> {
        self.apply(document.root())
    }

    /// JSON representation of a list of records
    pub fn represent(&self, records: &[Record]) -> JsonValue {
        JsonValue::Array(records.iter().map(|r| self.child.represent(r)).collect())
    }
}

impl FieldOptions for ListSchema {
    fn spec_mut(&mut self) -> &mut FieldSpec {
        &mut self.spec
    }
}

impl SchemaField for ListSchema {
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
        match validate_items(&self.child, items, resolver) {
            Ok(values) => self.spec.run_validators(Value::List(values)),
            Err(detail) => FieldOutcome::Error(detail),
        }
    }

    fn to_representation(&self, value: &Value) -> JsonValue {
        match value {
            Value::List(items) => {
                JsonValue::Array(items.iter().map(|item| self.child.to_representation(item)).collect())
            }
            other => other.to_json(),
        }
    }

    fn check_config(&self) -> Result<()> {
        self.spec.check_list()?;
        self.child.check_config()
    }
}
