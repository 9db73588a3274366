//! XPath location-path parser
//!
//! Fields bind location paths such as `/Товар/Ид`, `p:Группы/p:Ид`,
//! `Цены/Цена[2]` or `@ВерсияСхемы`. This parser understands the XPath 1.0
//! location-path subset:
//!
//! - absolute (`/a`) and relative (`a`) paths, `//` abbreviation
//! - the `child`, `descendant`, `descendant-or-self`, `self`, `parent`,
//!   `ancestor`, `ancestor-or-self`, `following-sibling`,
//!   `preceding-sibling` and `attribute` axes, plus `.`, `..` and `@`
//! - name tests (optionally prefixed), `*`, `prefix:*`, `node()`, `text()`
//! - predicates: `[n]`, `[last()]`, `[@attr]`, `[@attr='v']`, `[child]`,
//!   `[child='v']`

use std::fmt;
use thiserror::Error;

use super::selectors::is_ncname;

/// XPath axis types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathAxis {
    /// child:: axis (default)
    Child,
    /// descendant:: axis
    Descendant,
    /// descendant-or-self:: axis
    DescendantOrSelf,
    /// self:: axis
    Self_,
    /// parent:: axis
    Parent,
    /// ancestor:: axis
    Ancestor,
    /// ancestor-or-self:: axis
    AncestorOrSelf,
    /// following-sibling:: axis
    FollowingSibling,
    /// preceding-sibling:: axis
    PrecedingSibling,
    /// attribute:: axis
    Attribute,
}

impl XPathAxis {
    /// Parse axis from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Self::Child),
            "descendant" => Some(Self::Descendant),
            "descendant-or-self" => Some(Self::DescendantOrSelf),
            "self" => Some(Self::Self_),
            "parent" => Some(Self::Parent),
            "ancestor" => Some(Self::Ancestor),
            "ancestor-or-self" => Some(Self::AncestorOrSelf),
            "following-sibling" => Some(Self::FollowingSibling),
            "preceding-sibling" => Some(Self::PrecedingSibling),
            "attribute" => Some(Self::Attribute),
            _ => None,
        }
    }

    /// Check if this axis is reverse (positions count backwards from the context)
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Self::Parent | Self::Ancestor | Self::AncestorOrSelf | Self::PrecedingSibling
        )
    }
}

impl fmt::Display for XPathAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Self_ => "self",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::FollowingSibling => "following-sibling",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Attribute => "attribute",
        };
        write!(f, "{}", s)
    }
}

/// XPath predicate
#[derive(Debug, Clone, PartialEq)]
pub enum XPathPredicate {
    /// `[n]`: 1-based position within the step's candidates
    Position(usize),
    /// `[last()]`
    Last,
    /// `[@name]`
    HasAttribute(String),
    /// `[@name='value']`
    AttributeEquals(String, String),
    /// `[name]`
    HasChild(String),
    /// `[name='value']`
    ChildEquals(String, String),
}

impl XPathPredicate {
    /// Parse the text between `[` and `]`
    pub fn parse(expr: &str) -> Result<Self, XPathParseError> {
        let trimmed = expr.trim();

        if let Ok(position) = trimmed.parse::<usize>() {
            if position == 0 {
                return Err(XPathParseError::InvalidSyntax(
                    "positions start at 1".to_string(),
                ));
            }
            return Ok(Self::Position(position));
        }

        if trimmed == "last()" {
            return Ok(Self::Last);
        }

        let (target, literal) = match trimmed.split_once('=') {
            Some((lhs, rhs)) => (lhs.trim(), Some(parse_literal(rhs.trim())?)),
            None => (trimmed, None),
        };

        let (is_attribute, name) = match target.strip_prefix('@') {
            Some(name) => (true, name),
            None => (false, target),
        };
        check_qname(name)?;

        Ok(match (is_attribute, literal) {
            (true, None) => Self::HasAttribute(name.to_string()),
            (true, Some(value)) => Self::AttributeEquals(name.to_string(), value),
            (false, None) => Self::HasChild(name.to_string()),
            (false, Some(value)) => Self::ChildEquals(name.to_string(), value),
        })
    }
}

impl fmt::Display for XPathPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(n) => write!(f, "[{}]", n),
            Self::Last => write!(f, "[last()]"),
            Self::HasAttribute(name) => write!(f, "[@{}]", name),
            Self::AttributeEquals(name, value) => write!(f, "[@{}='{}']", name, value),
            Self::HasChild(name) => write!(f, "[{}]", name),
            Self::ChildEquals(name, value) => write!(f, "[{}='{}']", name, value),
        }
    }
}

fn parse_literal(s: &str) -> Result<String, XPathParseError> {
    let quoted = (s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"'));
    if s.len() < 2 || !quoted {
        return Err(XPathParseError::InvalidSyntax(format!(
            "expected a quoted string literal, got {}",
            s
        )));
    }
    Ok(s[1..s.len() - 1].to_string())
}

fn check_qname(name: &str) -> Result<(), XPathParseError> {
    let valid = match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    };
    if valid {
        Ok(())
    } else {
        Err(XPathParseError::InvalidName(name.to_string()))
    }
}

/// Node test in an XPath step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Name test (element or attribute name)
    Name {
        /// Namespace prefix
        prefix: Option<String>,
        /// Local name
        local: String,
    },
    /// Wildcard test (*)
    Wildcard,
    /// Namespace wildcard (prefix:*)
    NamespaceWildcard(String),
    /// node() test
    Node,
    /// text() test
    Text,
}

impl NodeTest {
    /// Parse a node test from a string
    pub fn parse(s: &str) -> Result<Self, XPathParseError> {
        let s = s.trim();

        match s {
            "" => return Err(XPathParseError::UnexpectedEnd),
            "*" => return Ok(Self::Wildcard),
            "node()" => return Ok(Self::Node),
            "text()" => return Ok(Self::Text),
            _ => {}
        }

        if let Some(prefix) = s.strip_suffix(":*") {
            check_qname(prefix)?;
            return Ok(Self::NamespaceWildcard(prefix.to_string()));
        }

        check_qname(s)?;
        let (prefix, local) = match s.split_once(':') {
            Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
            None => (None, s.to_string()),
        };

        Ok(Self::Name { prefix, local })
    }
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name {
                prefix: Some(prefix),
                local,
            } => write!(f, "{}:{}", prefix, local),
            Self::Name { prefix: None, local } => write!(f, "{}", local),
            Self::Wildcard => write!(f, "*"),
            Self::NamespaceWildcard(prefix) => write!(f, "{}:*", prefix),
            Self::Node => write!(f, "node()"),
            Self::Text => write!(f, "text()"),
        }
    }
}

/// A parsed step in an XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStep {
    /// The axis
    pub axis: XPathAxis,
    /// The node test
    pub node_test: NodeTest,
    /// Predicates
    pub predicates: Vec<XPathPredicate>,
}

impl ParsedStep {
    fn descendant_or_self() -> Self {
        Self {
            axis: XPathAxis::DescendantOrSelf,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }

    /// Parse a step from a string
    pub fn parse(step: &str) -> Result<Self, XPathParseError> {
        let step = step.trim();

        // Handle abbreviations
        if step == "." {
            return Ok(Self {
                axis: XPathAxis::Self_,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        if step == ".." {
            return Ok(Self {
                axis: XPathAxis::Parent,
                node_test: NodeTest::Node,
                predicates: Vec::new(),
            });
        }

        let (name_part, predicates) = Self::extract_predicates(step)?;

        let (axis, node_test_str) = if let Some(rest) = name_part.strip_prefix('@') {
            (XPathAxis::Attribute, rest)
        } else if let Some(pos) = name_part.find("::") {
            let axis_str = &name_part[..pos];
            let axis = XPathAxis::parse(axis_str)
                .ok_or_else(|| XPathParseError::UnknownAxis(axis_str.to_string()))?;
            (axis, &name_part[pos + 2..])
        } else {
            (XPathAxis::Child, name_part)
        };

        let node_test = NodeTest::parse(node_test_str)?;

        Ok(Self {
            axis,
            node_test,
            predicates,
        })
    }

    fn extract_predicates(step: &str) -> Result<(&str, Vec<XPathPredicate>), XPathParseError> {
        let Some(first_bracket) = step.find('[') else {
            return Ok((step, Vec::new()));
        };

        let mut predicates = Vec::new();
        let mut current_pred = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        for c in step[first_bracket..].chars() {
            if let Some(q) = quote {
                current_pred.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' if depth > 0 => {
                    quote = Some(c);
                    current_pred.push(c);
                }
                '[' => {
                    if depth > 0 {
                        current_pred.push(c);
                    }
                    depth += 1;
                }
                ']' => {
                    if depth == 0 {
                        return Err(XPathParseError::InvalidSyntax(format!(
                            "unbalanced ']' in {}",
                            step
                        )));
                    }
                    depth -= 1;
                    if depth == 0 {
                        predicates.push(XPathPredicate::parse(&current_pred)?);
                        current_pred.clear();
                    } else {
                        current_pred.push(c);
                    }
                }
                _ if depth > 0 => current_pred.push(c),
                c if c.is_whitespace() => {}
                _ => {
                    return Err(XPathParseError::InvalidSyntax(format!(
                        "unexpected '{}' after predicate in {}",
                        c, step
                    )))
                }
            }
        }

        if depth != 0 || quote.is_some() {
            return Err(XPathParseError::UnexpectedEnd);
        }

        Ok((&step[..first_bracket], predicates))
    }
}

impl fmt::Display for ParsedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.axis, self.node_test)?;
        for predicate in &self.predicates {
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

/// Parsed XPath expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedXPath {
    /// Original expression
    pub expression: String,
    /// Parsed steps
    pub steps: Vec<ParsedStep>,
    /// Whether this is an absolute path
    pub is_absolute: bool,
}

impl ParsedXPath {
    /// Parse an expression string
    pub fn parse(expression: impl Into<String>) -> Result<Self, XPathParseError> {
        let expression = expression.into();
        let trimmed = expression.trim();

        if trimmed.is_empty() {
            return Err(XPathParseError::Empty);
        }

        let (is_absolute, mut steps) = if let Some(rest) = trimmed.strip_prefix("//") {
            (true, {
                let mut steps = vec![ParsedStep::descendant_or_self()];
                steps.extend(Self::parse_steps(rest)?);
                steps
            })
        } else if let Some(rest) = trimmed.strip_prefix('/') {
            (true, Self::parse_steps(rest)?)
        } else {
            (false, Self::parse_steps(trimmed)?)
        };

        if !is_absolute && steps.is_empty() {
            return Err(XPathParseError::Empty);
        }
        if steps
            .last()
            .map(|s| s.axis == XPathAxis::DescendantOrSelf && s.node_test == NodeTest::Node)
            .unwrap_or(false)
            && trimmed.ends_with('/')
        {
            return Err(XPathParseError::UnexpectedEnd);
        }
        steps.shrink_to_fit();

        Ok(Self {
            expression,
            steps,
            is_absolute,
        })
    }

    fn parse_steps(path: &str) -> Result<Vec<ParsedStep>, XPathParseError> {
        if path.is_empty() {
            return Ok(Vec::new());
        }

        let mut steps = Vec::new();
        let mut current = String::new();
        let mut bracket_depth = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = path.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                current.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' if bracket_depth > 0 => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' => {
                    bracket_depth += 1;
                    current.push(c);
                }
                ']' => {
                    bracket_depth = bracket_depth.saturating_sub(1);
                    current.push(c);
                }
                '/' if bracket_depth == 0 => {
                    if current.trim().is_empty() {
                        return Err(XPathParseError::InvalidSyntax(format!(
                            "empty step in {}",
                            path
                        )));
                    }
                    steps.push(ParsedStep::parse(&current)?);
                    current.clear();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        steps.push(ParsedStep::descendant_or_self());
                    }
                    if chars.peek().is_none() {
                        return Err(XPathParseError::UnexpectedEnd);
                    }
                }
                _ => current.push(c),
            }
        }

        if !current.trim().is_empty() {
            steps.push(ParsedStep::parse(&current)?);
        }

        Ok(steps)
    }

    /// Get the number of steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get the original expression
    pub fn as_str(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for ParsedXPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

impl std::str::FromStr for ParsedXPath {
    type Err = XPathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// XPath parse error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathParseError {
    /// Empty expression
    #[error("Empty XPath expression")]
    Empty,
    /// Unknown axis name
    #[error("Unknown XPath axis: {0}")]
    UnknownAxis(String),
    /// Invalid element or attribute name
    #[error("Invalid name in XPath: {0}")]
    InvalidName(String),
    /// Invalid syntax
    #[error("Invalid XPath syntax: {0}")]
    InvalidSyntax(String),
    /// Unexpected end of expression
    #[error("Unexpected end of XPath expression")]
    UnexpectedEnd,
}
