//! XPath path resolution
//!
//! Fields and schemas never walk the tree themselves: they hand a parsed
//! path, a namespace map and a context node to a [`PathResolver`] and work
//! with the ordered node list it returns. [`StepResolver`] is the built-in
//! resolver for the location-path subset understood by [`ParsedXPath`];
//! callers with a full XPath engine can plug their own in.
//!
//! ## Limitations
//!
//! Only location paths are supported: no functions beyond `text()`,
//! `node()` and `last()`, no arithmetic, no unions.

mod parsers;
mod selectors;

pub use parsers::{NodeTest, ParsedStep, ParsedXPath, XPathAxis, XPathParseError, XPathPredicate};
pub use selectors::{axis_nodes, is_ncname, is_ncname_char, matches_test, select_step};

use crate::documents::XmlNode;
use crate::error::Result;
use crate::namespaces::NamespaceMap;

/// Evaluates a path expression against a context node
///
/// Implementations must return matches in document order without
/// duplicates. Any failure to evaluate (such as an undefined namespace
/// prefix) is an error, never an empty result.
pub trait PathResolver: Send + Sync {
    /// Resolve `path` relative to `node`
    fn resolve<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        path: &ParsedXPath,
        namespaces: &NamespaceMap,
    ) -> Result<Vec<XmlNode<'a, 'input>>>;
}

/// Step-by-step resolver over the document tree
#[derive(Debug, Clone, Copy, Default)]
pub struct StepResolver;

impl StepResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }
}

impl PathResolver for StepResolver {
    fn resolve<'a, 'input>(
        &self,
        node: XmlNode<'a, 'input>,
        path: &ParsedXPath,
        namespaces: &NamespaceMap,
    ) -> Result<Vec<XmlNode<'a, 'input>>> {
        let start = if path.is_absolute {
            XmlNode::Tree(node.tree_node().document().root())
        } else {
            node
        };

        let mut context = vec![start];
        for step in &path.steps {
            let mut next = Vec::new();
            for node in &context {
                next.extend(select_step(*node, step, namespaces)?);
            }
            next.sort_by_key(|n| n.document_order());
            next.dedup();
            context = next;
            if context.is_empty() {
                break;
            }
        }

        tracing::trace!(path = %path, matches = context.len(), "resolved path");
        Ok(context)
    }
}

/// Resolve a path with the built-in [`StepResolver`]
pub fn select<'a, 'input>(
    node: XmlNode<'a, 'input>,
    path: &ParsedXPath,
    namespaces: &NamespaceMap,
) -> Result<Vec<XmlNode<'a, 'input>>> {
    StepResolver.resolve(node, path, namespaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::Document;
    use crate::error::Error;

    const PRODUCT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
    <Товар>
        <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
        <Группы>
            <Ид>ec50ae26-916a-11eb-972c-38607706b20d</Ид>
        </Группы>
        <СтавкиНалогов>
            <СтавкаНалога><Наименование>НДС</Наименование></СтавкаНалога>
            <СтавкаНалога><Наименование>НДС</Наименование></СтавкаНалога>
        </СтавкиНалогов>
    </Товар>"#;

    const NAMESPACED: &str = r#"<Товар xmlns="urn:1C.ru:commerceml_2"><Ид>x</Ид></Товар>"#;

    fn count(doc: &Document, expr: &str, ns: &NamespaceMap) -> usize {
        let path = ParsedXPath::parse(expr).unwrap();
        select(doc.root_element(), &path, ns).unwrap().len()
    }

    #[test]
    fn test_absolute_and_relative() {
        let doc = Document::parse(PRODUCT).unwrap();
        let ns = NamespaceMap::new();
        assert_eq!(count(&doc, "/Товар", &ns), 1);
        assert_eq!(count(&doc, "/НеТовар", &ns), 0);
        assert_eq!(count(&doc, "Ид", &ns), 1);
        assert_eq!(count(&doc, "Группы/Ид", &ns), 1);
        assert_eq!(count(&doc, "/Товар/СтавкиНалогов/СтавкаНалога", &ns), 2);
    }

    #[test]
    fn test_descendant_search_deduplicates() {
        let doc = Document::parse(PRODUCT).unwrap();
        let ns = NamespaceMap::new();
        assert_eq!(count(&doc, "//Ид", &ns), 2);
        assert_eq!(count(&doc, "//Наименование", &ns), 2);
        assert_eq!(count(&doc, ".//СтавкаНалога/..", &ns), 1);
    }

    #[test]
    fn test_document_order() {
        let doc = Document::parse(PRODUCT).unwrap();
        let path = ParsedXPath::parse("//Ид").unwrap();
        let found = select(doc.root_element(), &path, &NamespaceMap::new()).unwrap();
        assert_eq!(
            found[0].text().as_deref(),
            Some("a9104793-9174-11eb-972c-38607706b20d")
        );
    }

    #[test]
    fn test_merged_steps_sorted_by_document_order() {
        let doc = Document::parse(r#"<a><b n="x"><c>2</c></b><c>1</c></a>"#).unwrap();
        let path = ParsedXPath::parse(".//c").unwrap();
        let found = select(doc.root_element(), &path, &NamespaceMap::new()).unwrap();
        let texts: Vec<_> = found.iter().map(|n| n.text()).collect();
        assert_eq!(texts, vec![Some("2".to_string()), Some("1".to_string())]);

        let ns = NamespaceMap::new();
        let attribute = select(doc.root_element(), &ParsedXPath::parse("b/@n").unwrap(), &ns).unwrap();
        let owner = select(doc.root_element(), &ParsedXPath::parse("b").unwrap(), &ns).unwrap();
        assert!(owner[0].document_order() < attribute[0].document_order());
    }

    #[test]
    fn test_text_and_root_steps() {
        let doc = Document::parse(PRODUCT).unwrap();
        let path = ParsedXPath::parse("Ид/text()").unwrap();
        let found = select(doc.root_element(), &path, &NamespaceMap::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].text().as_deref(),
            Some("a9104793-9174-11eb-972c-38607706b20d")
        );

        let root = ParsedXPath::parse("/").unwrap();
        let found = select(doc.root_element(), &root, &NamespaceMap::new()).unwrap();
        assert_eq!(found, vec![doc.root()]);
    }

    #[test]
    fn test_namespace_resolution() {
        let doc = Document::parse(NAMESPACED).unwrap();
        let empty = NamespaceMap::new();
        assert_eq!(count(&doc, "/Товар", &empty), 0);

        let ns = NamespaceMap::new().with_prefix("p", "urn:1C.ru:commerceml_2");
        assert_eq!(count(&doc, "/p:Товар", &ns), 1);
        assert_eq!(count(&doc, "/p:Товар/p:Ид", &ns), 1);
    }

    #[test]
    fn test_undefined_prefix() {
        let doc = Document::parse(NAMESPACED).unwrap();
        let path = ParsedXPath::parse("/p:Товар").unwrap();
        let result = select(doc.root_element(), &path, &NamespaceMap::new());
        assert!(matches!(result, Err(Error::Namespace(_))));
    }

    #[test]
    fn test_attribute_step() {
        let doc = Document::parse(r#"<Каталог СодержитТолькоИзменения="true"/>"#).unwrap();
        let path = ParsedXPath::parse("@СодержитТолькоИзменения").unwrap();
        let found = select(doc.root_element(), &path, &NamespaceMap::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text().as_deref(), Some("true"));
    }
}
