//! Query string generation for validated criteria.

use std::borrow::Cow;
use std::fmt;

use super::CriteriaNode;
use crate::constants::{DEMOGRAPHIC_DATA_PROP, PERSONAL_DEMOGRAPHIC_RT};

/// Full search query: the demographic resource type AND-ed with the clause.
pub fn demographic_query(node: &CriteriaNode) -> String {
    format!("resourceType:{PERSONAL_DEMOGRAPHIC_RT} AND {node}")
}

impl CriteriaNode {
    /// The demographic clause alone, without the resource type prefix.
    pub fn to_query_clause(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CriteriaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriteriaNode::Leaf(path) => {
                write!(f, "{DEMOGRAPHIC_DATA_PROP}:\"{}\"", escape_phrase(path))
            }
            CriteriaNode::Conjunction(children) => write_group(f, children, "AND"),
            CriteriaNode::Disjunction(children) => write_group(f, children, "OR"),
            CriteriaNode::Gated { inner, filter } => write!(f, "({inner} AND {filter})"),
        }
    }
}

/// A lone child is written bare; two or more are parenthesized.
fn write_group(f: &mut fmt::Formatter<'_>, children: &[CriteriaNode], connector: &str) -> fmt::Result {
    if let [only] = children {
        return write!(f, "{only}");
    }

    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {connector} ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

/// Escape characters that would end or corrupt a quoted phrase.
fn escape_phrase(path: &str) -> Cow<'_, str> {
    if !path.contains(['"', '\\']) {
        return Cow::Borrowed(path);
    }
    let mut escaped = String::with_capacity(path.len() + 2);
    for c in path.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
