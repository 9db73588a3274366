//! XML document handling
//!
//! This module wraps a parsed `roxmltree` document and exposes [`XmlNode`],
//! the node handle every field and schema operates on. Nodes borrow the
//! document: schemas never own or mutate the tree they read.

use crate::error::Result;
use crate::limits::Limits;
use std::fmt;

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document node (parent of the root element)
    Document,
    /// Element node
    Element,
    /// Attribute node
    Attribute,
    /// Text node
    Text,
    /// Comment node
    Comment,
    /// Processing instruction
    ProcessingInstruction,
}

impl NodeKind {
    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to one position in a parsed document
///
/// Attributes are not tree nodes in `roxmltree`, so they are addressed
/// through their owning element and their index in its attribute list.
#[derive(Clone, Copy)]
pub enum XmlNode<'a, 'input: 'a> {
    /// Document, element, text, comment or processing-instruction node
    Tree(roxmltree::Node<'a, 'input>),
    /// Attribute of an element
    Attribute {
        /// Element carrying the attribute
        owner: roxmltree::Node<'a, 'input>,
        /// Position of the attribute on the owner
        index: usize,
    },
}

impl<'a, 'input: 'a> XmlNode<'a, 'input> {
    /// Wrap a roxmltree node
    pub fn new(node: roxmltree::Node<'a, 'input>) -> Self {
        XmlNode::Tree(node)
    }

    /// Get the node kind
    pub fn kind(&self) -> NodeKind {
        match self {
            XmlNode::Attribute { .. } => NodeKind::Attribute,
            XmlNode::Tree(node) => match node.node_type() {
                roxmltree::NodeType::Root => NodeKind::Document,
                roxmltree::NodeType::Element => NodeKind::Element,
                roxmltree::NodeType::Text => NodeKind::Text,
                roxmltree::NodeType::Comment => NodeKind::Comment,
                roxmltree::NodeType::PI => NodeKind::ProcessingInstruction,
            },
        }
    }

    /// Check if this is an element
    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Check if this node can hold child elements (element or document)
    pub fn is_container(&self) -> bool {
        matches!(self.kind(), NodeKind::Element | NodeKind::Document)
    }

    /// Get the underlying tree node (the owner element for attributes)
    pub fn tree_node(&self) -> roxmltree::Node<'a, 'input> {
        match self {
            XmlNode::Tree(node) => *node,
            XmlNode::Attribute { owner, .. } => *owner,
        }
    }

    /// Get the attribute this handle points to
    fn attribute(&self) -> Option<roxmltree::Attribute<'a, 'input>> {
        match self {
            XmlNode::Attribute { owner, index } => owner.attributes().nth(*index),
            XmlNode::Tree(_) => None,
        }
    }

    /// Local name of an element or attribute
    pub fn local_name(&self) -> Option<&'a str> {
        match self {
            XmlNode::Tree(node) if node.is_element() => Some(node.tag_name().name()),
            XmlNode::Tree(_) => None,
            XmlNode::Attribute { .. } => self.attribute().map(|a| a.name()),
        }
    }

    /// Namespace URI of an element or attribute
    pub fn namespace(&self) -> Option<&'a str> {
        match self {
            XmlNode::Tree(node) if node.is_element() => node.tag_name().namespace(),
            XmlNode::Tree(_) => None,
            XmlNode::Attribute { .. } => self.attribute().and_then(|a| a.namespace()),
        }
    }

    /// Primitive text content of the node
    ///
    /// For elements this is the text before the first child element, which is
    /// `None` for an empty element (`<a/>` or `<a></a>`). Attributes yield
    /// their value and text nodes their text.
    pub fn text(&self) -> Option<String> {
        match self {
            XmlNode::Attribute { .. } => self.attribute().map(|a| a.value().to_string()),
            XmlNode::Tree(node) => match node.node_type() {
                roxmltree::NodeType::Element | roxmltree::NodeType::Text => {
                    node.text().map(str::to_string)
                }
                roxmltree::NodeType::Comment => node.text().map(str::to_string),
                _ => None,
            },
        }
    }

    /// Key ordering nodes in document order; attributes follow their owner
    pub(crate) fn document_order(&self) -> (usize, usize) {
        match self {
            XmlNode::Tree(node) => (node.id().get_usize(), 0),
            XmlNode::Attribute { owner, index } => (owner.id().get_usize(), index + 1),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.document_order() == other.document_order()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl fmt::Debug for XmlNode<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.namespace(), self.local_name()) {
            (Some(ns), Some(name)) => write!(f, "{}({{{}}}{})", self.kind(), ns, name),
            (None, Some(name)) => write!(f, "{}({})", self.kind(), name),
            _ => write!(f, "{}", self.kind()),
        }
    }
}

impl<'a, 'input: 'a> From<roxmltree::Node<'a, 'input>> for XmlNode<'a, 'input> {
    fn from(node: roxmltree::Node<'a, 'input>) -> Self {
        XmlNode::Tree(node)
    }
}

/// Parsed XML document
pub struct Document<'input> {
    inner: roxmltree::Document<'input>,
}

impl<'input> Document<'input> {
    /// Parse an XML document with default limits
    pub fn parse(xml: &'input str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document enforcing the given limits
    pub fn parse_with_limits(xml: &'input str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;
        let inner = roxmltree::Document::parse_with_options(xml, limits.parsing_options())?;

        let depth = inner
            .descendants()
            .filter(|n| n.is_element())
            .map(|n| n.ancestors().filter(|a| a.is_element()).count())
            .max()
            .unwrap_or(0);
        limits.check_xml_depth(depth)?;

        tracing::trace!(bytes = xml.len(), depth, "parsed XML document");
        Ok(Self { inner })
    }

    /// Document node (the parent of the root element)
    pub fn root(&self) -> XmlNode<'_, 'input> {
        XmlNode::Tree(self.inner.root())
    }

    /// Root element of the document
    pub fn root_element(&self) -> XmlNode<'_, 'input> {
        XmlNode::Tree(self.inner.root_element())
    }

    /// Access the underlying roxmltree document
    pub fn as_roxmltree(&self) -> &roxmltree::Document<'input> {
        &self.inner
    }
}

impl fmt::Debug for Document<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root_element", &self.root_element())
            .finish()
    }
}
