//! Schema definitions
//!
//! Schemas can be described in JSON instead of code. A [`SchemaDefinition`]
//! deserializes from a document like:
//!
//! ```json
//! {
//!   "path": "/Товар",
//!   "fields": {
//!     "uuid": { "type": "uuid", "path": "Ид" },
//!     "name": { "type": "text", "path": "Наименование", "max_length": 100 },
//!     "groups": { "type": "list", "path": "Группы/Ид", "child": { "type": "uuid" } }
//!   }
//! }
//! ```
//!
//! and builds into a live [`Schema`] or, with `"many": true`, a
//! [`ListSchema`]. Fields keep the order they are written in.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::Arc;

use crate::coercion::{Coercer, UuidFormat};
use crate::documents::Document;
use crate::error::{Error, ErrorDetail, Result};
use crate::fields::{Field, FieldOptions, ListField, SchemaField};
use crate::limits::Limits;
use crate::namespaces::NamespaceMap;
use crate::schemas::{ListSchema, Schema};
use crate::values::{Record, Value};

fn default_true() -> bool {
    true
}

/// Options accepted by every field type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonOptions {
    /// Path expression
    #[serde(default)]
    pub path: Option<String>,
    /// Prefixes usable in `path`
    #[serde(default)]
    pub namespaces: NamespaceMap,
    /// Explicit required flag
    #[serde(default)]
    pub required: Option<bool>,
    /// Accept nodes without content as null
    #[serde(default)]
    pub allow_null: bool,
    /// Default value, coerced like document content
    #[serde(default)]
    pub default: Option<JsonValue>,
    /// Never read from the document
    #[serde(default)]
    pub read_only: bool,
}

/// One field of a schema definition, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDefinition {
    /// Boolean field
    Boolean {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
    },
    /// Text field
    Text {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Strip surrounding whitespace
        #[serde(default = "default_true")]
        trim_whitespace: bool,
        /// Accept empty text
        #[serde(default)]
        allow_blank: bool,
        /// Minimum length in characters
        #[serde(default)]
        min_length: Option<usize>,
        /// Maximum length in characters
        #[serde(default)]
        max_length: Option<usize>,
    },
    /// Integer field
    Integer {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Inclusive lower bound
        #[serde(default)]
        min_value: Option<Decimal>,
        /// Inclusive upper bound
        #[serde(default)]
        max_value: Option<Decimal>,
    },
    /// Floating point field
    Float {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Inclusive lower bound
        #[serde(default)]
        min_value: Option<Decimal>,
        /// Inclusive upper bound
        #[serde(default)]
        max_value: Option<Decimal>,
    },
    /// Decimal field
    Decimal {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Maximum number of digits
        #[serde(default)]
        max_digits: Option<u32>,
        /// Maximum number of decimal places
        #[serde(default)]
        decimal_places: Option<u32>,
        /// Represent as string
        #[serde(default = "default_true")]
        coerce_to_string: bool,
        /// Inclusive lower bound
        #[serde(default)]
        min_value: Option<Decimal>,
        /// Inclusive upper bound
        #[serde(default)]
        max_value: Option<Decimal>,
    },
    /// Unique identifier field
    Uuid {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Representation format
        #[serde(default)]
        format: UuidFormat,
    },
    /// Unvalidated passthrough field
    Raw {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
    },
    /// List of values
    List {
        /// Shared options
        #[serde(flatten)]
        common: CommonOptions,
        /// Item field; raw when omitted
        #[serde(default)]
        child: Option<Box<FieldDefinition>>,
        /// Accept zero matches
        #[serde(default = "default_true")]
        allow_empty: bool,
        /// Minimum number of items
        #[serde(default)]
        min_length: Option<usize>,
        /// Maximum number of items
        #[serde(default)]
        max_length: Option<usize>,
    },
    /// Nested schema
    Schema(SchemaDefinition),
}

/// Schema described as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Path of the schema's element (required with `many`)
    #[serde(default)]
    pub path: Option<String>,
    /// Prefixes usable in `path`
    #[serde(default)]
    pub namespaces: NamespaceMap,
    /// Explicit required flag when nested
    #[serde(default)]
    pub required: Option<bool>,
    /// Apply to every match of `path`
    #[serde(default)]
    pub many: bool,
    /// With `many`: accept zero matches
    #[serde(default = "default_true")]
    pub allow_empty: bool,
    /// With `many`: minimum number of records
    #[serde(default)]
    pub min_length: Option<usize>,
    /// With `many`: maximum number of records
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Document parsing limits (top level only)
    #[serde(default)]
    pub limits: Option<Limits>,
    /// Fields in declaration order
    pub fields: IndexMap<String, FieldDefinition>,
}

/// Schema built from a definition
#[derive(Debug, Clone)]
pub enum LoadedSchema {
    /// Single record
    One(Schema),
    /// Record per match
    Many(ListSchema),
}

impl LoadedSchema {
    /// Apply to a document and return the JSON representation
    pub fn apply_document(&self, document: &Document<'_>) -> std::result::Result<JsonValue, ErrorDetail> {
        match self {
            LoadedSchema::One(schema) => {
                let record = schema.apply_document(document)?;
                Ok(schema.represent(&record))
            }
            LoadedSchema::Many(list) => {
                let records: Vec<Record> = list.apply_document(document)?;
                Ok(list.represent(&records))
            }
        }
    }
}

impl SchemaDefinition {
    /// Parse a definition from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a definition from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading schema definition");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Limits to parse documents with
    pub fn limits(&self) -> Limits {
        self.limits.clone().unwrap_or_default()
    }

    /// Build the described schema
    pub fn build(&self) -> Result<LoadedSchema> {
        if self.many {
            Ok(LoadedSchema::Many(self.build_many()?))
        } else {
            Ok(LoadedSchema::One(self.build_one()?))
        }
    }

    fn builder(&self) -> Result<crate::schemas::SchemaBuilder> {
        let mut builder = Schema::builder().namespaces(self.namespaces.clone());
        if let Some(ref path) = self.path {
            builder = builder.path(path.as_str());
        }
        if let Some(required) = self.required {
            builder = builder.required(required);
        }
        for (name, definition) in &self.fields {
            let field = definition
                .build()
                .map_err(|e| Error::Config(format!("field '{}': {}", name, e)))?;
            builder = builder.field(name.as_str(), field);
        }
        Ok(builder)
    }

    /// Build as a single-record schema, ignoring `many`
    pub fn build_one(&self) -> Result<Schema> {
        self.builder()?.build()
    }

    /// Build as a list schema, ignoring `many`
    pub fn build_many(&self) -> Result<ListSchema> {
        let mut list = self.builder()?.build_many()?.allow_empty(self.allow_empty);
        if let Some(min) = self.min_length {
            list = list.min_length(min);
        }
        if let Some(max) = self.max_length {
            list = list.max_length(max);
        }
        Ok(list)
    }
}

/// Apply the shared options to a field
fn apply_common<F: FieldOptions>(mut field: F, common: &CommonOptions) -> Result<F> {
    if let Some(ref path) = common.path {
        field = field.with_path(path)?;
    }
    field = field
        .with_namespaces(common.namespaces.clone())
        .read_only(common.read_only);
    if common.allow_null {
        field = field.allow_null(true);
    }
    if let Some(required) = common.required {
        field = field.required(required);
    }
    Ok(field)
}

/// Turn a JSON default into a value by coercing it like document content
fn coerce_default<C: Coercer>(coercer: &C, default: &JsonValue) -> Result<Value> {
    let raw = match default {
        JsonValue::Null => return Ok(Value::Null),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(_) | JsonValue::Number(_) => default.to_string(),
        other => {
            return Err(Error::Config(format!(
                "unsupported default value: {}",
                other
            )))
        }
    };
    coercer
        .coerce(&raw)
        .map_err(|e| Error::Config(format!("invalid default '{}': {}", raw, e.message)))
}

fn scalar<C: Coercer + 'static>(field: Field<C>, common: &CommonOptions) -> Result<Field<C>> {
    let mut field = apply_common(field, common)?;
    if let Some(ref default) = common.default {
        let value = coerce_default(field.coercer(), default)?;
        field = field.with_default(value);
    }
    Ok(field)
}

fn bounded<C: crate::fields::NumericCoercer + 'static>(
    mut field: Field<C>,
    min_value: Option<Decimal>,
    max_value: Option<Decimal>,
) -> Field<C> {
    if let Some(min) = min_value {
        field = field.min_value(min);
    }
    if let Some(max) = max_value {
        field = field.max_value(max);
    }
    field
}

fn no_default(common: &CommonOptions, kind: &str) -> Result<()> {
    match common.default {
        Some(_) => Err(Error::Config(format!("{} fields do not accept a default", kind))),
        None => Ok(()),
    }
}

impl FieldDefinition {
    /// Build the described field
    pub fn build(&self) -> Result<Arc<dyn SchemaField>> {
        let field: Arc<dyn SchemaField> = match self {
            FieldDefinition::Boolean { common } => Arc::new(scalar(Field::boolean(), common)?),
            FieldDefinition::Text {
                common,
                trim_whitespace,
                allow_blank,
                min_length,
                max_length,
            } => {
                let mut field = Field::text()
                    .trim_whitespace(*trim_whitespace)
                    .allow_blank(*allow_blank);
                if let Some(min) = min_length {
                    field = field.min_length(*min);
                }
                if let Some(max) = max_length {
                    field = field.max_length(*max);
                }
                Arc::new(scalar(field, common)?)
            }
            FieldDefinition::Integer {
                common,
                min_value,
                max_value,
            } => Arc::new(scalar(bounded(Field::integer(), *min_value, *max_value), common)?),
            FieldDefinition::Float {
                common,
                min_value,
                max_value,
            } => Arc::new(scalar(bounded(Field::float(), *min_value, *max_value), common)?),
            FieldDefinition::Decimal {
                common,
                max_digits,
                decimal_places,
                coerce_to_string,
                min_value,
                max_value,
            } => {
                let field = Field::decimal(*max_digits, *decimal_places)
                    .coerce_to_string(*coerce_to_string);
                Arc::new(scalar(bounded(field, *min_value, *max_value), common)?)
            }
            FieldDefinition::Uuid { common, format } => {
                Arc::new(scalar(Field::uuid().format(*format), common)?)
            }
            FieldDefinition::Raw { common } => Arc::new(scalar(Field::raw(), common)?),
            FieldDefinition::List {
                common,
                child,
                allow_empty,
                min_length,
                max_length,
            } => {
                no_default(common, "list")?;
                let list = match child {
                    Some(child) => ListField::new(child.build()?)?,
                    None => ListField::raw(),
                };
                let mut list = apply_common(list, common)?.allow_empty(*allow_empty);
                if let Some(min) = min_length {
                    list = list.min_length(*min);
                }
                if let Some(max) = max_length {
                    list = list.max_length(*max);
                }
                Arc::new(list)
            }
            FieldDefinition::Schema(definition) => {
                if definition.many {
                    Arc::new(definition.build_many()?)
                } else {
                    Arc::new(definition.build_one()?)
                }
            }
        };
        field.check_config()?;
        Ok(field)
    }
}
