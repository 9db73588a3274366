//! Limits for document parsing
//!
//! Documents are parsed fully into memory before any schema touches them,
//! so these limits bound the work a hostile or runaway input can cause.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Document parsing limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_xml_depth: usize,

    /// Maximum XML text size in bytes
    pub max_xml_size: usize,

    /// Maximum number of tree nodes (elements, text, comments, ...)
    pub max_nodes: u32,

    /// Whether a DTD is tolerated in the document prolog
    pub allow_dtd: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_nodes: u32::MAX,
            allow_dtd: false,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_nodes: 1_000_000,
            allow_dtd: false,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_nodes: u32::MAX,
            allow_dtd: true,
        }
    }

    /// Check the element nesting depth of a parsed document
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        exceeds("element depth", depth, self.max_xml_depth)
    }

    /// Check the byte size of a document before parsing it
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        exceeds("document size in bytes", size, self.max_xml_size)
    }

    /// Parsing options for roxmltree derived from these limits
    pub(crate) fn parsing_options(&self) -> roxmltree::ParsingOptions {
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = self.allow_dtd;
        options.nodes_limit = self.max_nodes;
        options
    }
}

fn exceeds(what: &str, actual: usize, max: usize) -> Result<()> {
    if actual <= max {
        return Ok(());
    }
    Err(Error::LimitExceeded(format!("{} is {}, limit is {}", what, actual, max)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 1000);
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(limits.check_xml_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(150).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_xml_depth > Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(5000).is_ok());
        assert!(limits.allow_dtd);
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let limits: Limits = serde_json::from_str(r#"{"max_xml_depth": 5}"#).unwrap();
        assert_eq!(limits.max_xml_depth, 5);
        assert_eq!(limits.max_xml_size, Limits::default().max_xml_size);
    }
}
