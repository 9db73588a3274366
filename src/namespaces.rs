//! XML namespace handling
//!
//! Path expressions reference namespaced elements through prefixes
//! (`p:Товар`). A [`NamespaceMap`] binds those prefixes to namespace URIs for
//! one field or schema. Maps are never inherited from an enclosing schema:
//! every field states the prefixes its own path uses.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Check whether a node name (namespace + local name) is this QName
    pub fn matches(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.local_name == local_name && self.namespace.as_deref() == namespace
    }

    /// Clark notation (`{uri}local`)
    pub fn clark(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.local_name),
            None => self.local_name.clone(),
        }
    }
}

/// Mapping from namespace prefix to namespace URI
///
/// Insertion order is kept so the map serializes back the way it was
/// declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceMap {
    prefixes: IndexMap<Prefix, NamespaceUri>,
}

impl NamespaceMap {
    /// Create a new empty namespace map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Builder-style variant of [`NamespaceMap::add_prefix`]
    pub fn with_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.add_prefix(prefix, namespace);
        self
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Number of declared prefixes
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// Iterate over (prefix, uri) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Resolve a prefix to its URI
    pub fn resolve_prefix(&self, prefix: &str) -> Result<&str> {
        self.get_namespace(prefix)
            .ok_or_else(|| Error::Namespace(format!("Undefined namespace prefix: {}", prefix)))
    }

    /// Resolve a possibly prefixed name to a QName
    ///
    /// Unprefixed names are in no namespace: there is no default namespace in
    /// path expressions.
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            let namespace = self.resolve_prefix(prefix)?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::local(prefixed_name))
        }
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceMap {
    fn from_iter<I: IntoIterator<Item = (P, U)>>(iter: I) -> Self {
        let mut map = NamespaceMap::new();
        for (prefix, uri) in iter {
            map.add_prefix(prefix, uri);
        }
        map
    }
}
