//! # xpath-schema
//!
//! Declarative schemas that bind XML trees to typed, validated records.
//!
//! A schema is an ordered set of named fields. Each field carries a path
//! expression that locates its value relative to the element the schema is
//! applied to, a coercion rule (boolean, text, integer, float, decimal,
//! unique identifier or raw) and a list of validators. Applying a schema
//! produces either a complete [`Record`] or an error map covering every
//! field that failed.
//!
//! ## Features
//!
//! - Scalar fields with required/default/null handling
//! - List fields and list schemas with per-position error reporting
//! - Nested schemas
//! - Namespace-qualified paths
//! - Pluggable path resolution through [`PathResolver`]
//! - JSON schema definitions ([`config`])
//!
//! ## Example
//!
//! ```rust
//! use xpath_schema::{Document, Field, FieldOptions, Schema};
//!
//! let xml = r#"<КоммерческаяИнформация>
//!     <Предложение>
//!         <Цены>
//!             <Цена><ЦенаЗаЕдиницу>100</ЦенаЗаЕдиницу></Цена>
//!             <Цена><ЦенаЗаЕдиницу>120</ЦенаЗаЕдиницу></Цена>
//!         </Цены>
//!     </Предложение>
//! </КоммерческаяИнформация>"#;
//!
//! let price = Schema::builder()
//!     .path("/КоммерческаяИнформация/Предложение/Цены/Цена")
//!     .field("value", Field::integer().with_path("ЦенаЗаЕдиницу")?)
//!     .build_many()?;
//! let root = Schema::builder().field("prices", price).build()?;
//!
//! let record = root.apply_str(xml)?;
//! assert_eq!(
//!     record.to_json(),
//!     serde_json::json!({"prices": [{"value": 100}, {"value": 120}]})
//! );
//! # Ok::<(), xpath_schema::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Tree access
pub mod documents;
pub mod namespaces;
pub mod xpath;

// Values and validation
pub mod coercion;
pub mod validators;
pub mod values;

// Fields and schemas
pub mod fields;
pub mod schemas;

// Schema definitions
pub mod config;

// Re-exports for convenience
pub use coercion::{Coercer, UuidFormat};
pub use config::{FieldDefinition, LoadedSchema, SchemaDefinition};
pub use documents::{Document, NodeKind, XmlNode};
pub use error::{Error, ErrorDetail, ErrorKind, FieldError, Result, NON_FIELD_ERRORS_KEY};
pub use fields::{
    BooleanField, DecimalField, Extracted, Field, FieldOptions, FieldOutcome, FieldSpec,
    FloatField, IntegerField, ListField, RawField, SchemaField, TextField, UuidField,
};
pub use limits::Limits;
pub use namespaces::NamespaceMap;
pub use schemas::{ListSchema, Schema, SchemaBuilder};
pub use validators::{FnValidator, RecordValidator, Validator};
pub use values::{Record, Value};
pub use xpath::{ParsedXPath, PathResolver, StepResolver};

/// Version of the xpath-schema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
