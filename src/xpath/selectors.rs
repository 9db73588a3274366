//! Step selection over the document tree
//!
//! Given a context node, [`select_step`] walks one axis, applies the node
//! test and then the step's predicates. Name tests follow XPath 1.0: an
//! unprefixed name only matches nodes in *no* namespace, so elements under a
//! default namespace must be addressed through a prefix.

use crate::documents::{NodeKind, XmlNode};
use crate::error::Result;
use crate::namespaces::{NamespaceMap, QName};

use super::parsers::{NodeTest, ParsedStep, XPathAxis, XPathPredicate};

/// Nodes reachable from `node` along `axis`, in axis order
///
/// Reverse axes yield the nearest node first so positional predicates count
/// the way XPath defines them.
pub fn axis_nodes<'a, 'input>(node: XmlNode<'a, 'input>, axis: XPathAxis) -> Vec<XmlNode<'a, 'input>> {
    let tree = match node {
        XmlNode::Tree(tree) => tree,
        XmlNode::Attribute { owner, .. } => {
            // Attributes have no children or siblings; only self/parent/ancestors
            return match axis {
                XPathAxis::Self_ => vec![node],
                XPathAxis::Parent => vec![XmlNode::Tree(owner)],
                XPathAxis::Ancestor => owner.ancestors().map(XmlNode::Tree).collect(),
                XPathAxis::AncestorOrSelf => std::iter::once(node)
                    .chain(owner.ancestors().map(XmlNode::Tree))
                    .collect(),
                _ => Vec::new(),
            };
        }
    };

    match axis {
        XPathAxis::Child => tree.children().map(XmlNode::Tree).collect(),
        XPathAxis::Descendant => tree.descendants().skip(1).map(XmlNode::Tree).collect(),
        XPathAxis::DescendantOrSelf => tree.descendants().map(XmlNode::Tree).collect(),
        XPathAxis::Self_ => vec![node],
        XPathAxis::Parent => tree.parent().map(XmlNode::Tree).into_iter().collect(),
        XPathAxis::Ancestor => tree.ancestors().skip(1).map(XmlNode::Tree).collect(),
        XPathAxis::AncestorOrSelf => tree.ancestors().map(XmlNode::Tree).collect(),
        XPathAxis::FollowingSibling => tree.next_siblings().skip(1).map(XmlNode::Tree).collect(),
        XPathAxis::PrecedingSibling => tree.prev_siblings().skip(1).map(XmlNode::Tree).collect(),
        XPathAxis::Attribute => {
            if tree.is_element() {
                (0..tree.attributes().count())
                    .map(|index| XmlNode::Attribute { owner: tree, index })
                    .collect()
            } else {
                Vec::new()
            }
        }
    }
}

/// Principal node kind of an axis: attributes for `attribute::`, elements otherwise
fn principal_kind(axis: XPathAxis) -> NodeKind {
    if axis == XPathAxis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    }
}

/// Check a node against a node test
pub fn matches_test(
    node: &XmlNode<'_, '_>,
    test: &NodeTest,
    axis: XPathAxis,
    namespaces: &NamespaceMap,
) -> Result<bool> {
    let kind = node.kind();
    Ok(match test {
        NodeTest::Node => true,
        NodeTest::Text => kind == NodeKind::Text,
        NodeTest::Wildcard => kind == principal_kind(axis),
        NodeTest::NamespaceWildcard(prefix) => {
            let uri = namespaces.resolve_prefix(prefix)?;
            kind == principal_kind(axis) && node.namespace() == Some(uri)
        }
        NodeTest::Name { prefix, local } => {
            if kind != principal_kind(axis) {
                return Ok(false);
            }
            let qname = match prefix {
                Some(prefix) => QName::namespaced(namespaces.resolve_prefix(prefix)?, local.as_str()),
                None => QName::local(local.as_str()),
            };
            match node.local_name() {
                Some(name) => qname.matches(node.namespace(), name),
                None => false,
            }
        }
    })
}

fn find_attribute<'a, 'input>(
    node: &XmlNode<'a, 'input>,
    name: &str,
    namespaces: &NamespaceMap,
) -> Result<Option<XmlNode<'a, 'input>>> {
    let qname = namespaces.resolve(name)?;
    for candidate in axis_nodes(*node, XPathAxis::Attribute) {
        if let Some(local) = candidate.local_name() {
            if qname.matches(candidate.namespace(), local) {
                return Ok(Some(candidate));
            }
        }
    }
    Ok(None)
}

fn find_children<'a, 'input>(
    node: &XmlNode<'a, 'input>,
    name: &str,
    namespaces: &NamespaceMap,
) -> Result<Vec<XmlNode<'a, 'input>>> {
    let qname = namespaces.resolve(name)?;
    Ok(axis_nodes(*node, XPathAxis::Child)
        .into_iter()
        .filter(|child| match child.local_name() {
            Some(local) => child.is_element() && qname.matches(child.namespace(), local),
            None => false,
        })
        .collect())
}

/// Apply one predicate to a candidate list (in axis order)
fn apply_predicate<'a, 'input>(
    candidates: Vec<XmlNode<'a, 'input>>,
    predicate: &XPathPredicate,
    namespaces: &NamespaceMap,
) -> Result<Vec<XmlNode<'a, 'input>>> {
    match predicate {
        XPathPredicate::Position(position) => {
            Ok(candidates.into_iter().nth(position - 1).into_iter().collect())
        }
        XPathPredicate::Last => Ok(candidates.into_iter().last().into_iter().collect()),
        _ => {
            let mut kept = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let keep = match predicate {
                    XPathPredicate::HasAttribute(name) => {
                        find_attribute(&candidate, name, namespaces)?.is_some()
                    }
                    XPathPredicate::AttributeEquals(name, value) => {
                        find_attribute(&candidate, name, namespaces)?
                            .and_then(|attr| attr.text())
                            .map(|text| &text == value)
                            .unwrap_or(false)
                    }
                    XPathPredicate::HasChild(name) => {
                        !find_children(&candidate, name, namespaces)?.is_empty()
                    }
                    XPathPredicate::ChildEquals(name, value) => find_children(&candidate, name, namespaces)?
                        .iter()
                        .any(|child| child.text().as_deref().map(str::trim) == Some(value.as_str())),
                    XPathPredicate::Position(_) | XPathPredicate::Last => true,
                };
                if keep {
                    kept.push(candidate);
                }
            }
            Ok(kept)
        }
    }
}

/// Evaluate one location step from a single context node
pub fn select_step<'a, 'input>(
    node: XmlNode<'a, 'input>,
    step: &ParsedStep,
    namespaces: &NamespaceMap,
) -> Result<Vec<XmlNode<'a, 'input>>> {
    let mut candidates = Vec::new();
    for candidate in axis_nodes(node, step.axis) {
        if matches_test(&candidate, &step.node_test, step.axis, namespaces)? {
            candidates.push(candidate);
        }
    }
    for predicate in &step.predicates {
        candidates = apply_predicate(candidates, predicate, namespaces)?;
    }
    Ok(candidates)
}

/// Check if a string is a valid NCName (non-colonized name)
///
/// NCName is defined in XML Namespaces as a Name that does not contain colons.
pub fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();

    // First character must be a letter or underscore
    match chars.next() {
        Some(c) if is_ncname_start_char(c) => {}
        _ => return false,
    }

    chars.all(is_ncname_char)
}

/// Check if a character is valid as the start of an NCName
fn is_ncname_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Check if a character is valid in an NCName (not at start)
pub fn is_ncname_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
