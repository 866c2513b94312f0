//! Dynamic list criteria: parsing, validation and query compilation.
//!
//! # Syntax
//!
//! ```text
//! expr          = leaf / group
//! leaf          = quoted-path
//! group         = "{" combinator ":" operand ["," "FILTER" ":" filterOperand] "}"
//! combinator    = "AND" / "ALL" / "OR" / "ANY"
//! operand       = leaf / group / "[" expr *("," expr) "]"
//! filterOperand = leaf / group            ; no FILTER inside
//! ```
//!
//! Keys may be bare or quoted and may appear in either order. A whole
//! criteria string that is not a group or a quoted string is read as a
//! single bare path.
//!
//! # Examples
//!
//! ```text
//! /colleges/CED/standings/grad
//! {ALL: "/colleges/ENV DSGN/departments/ARCH"}
//! {ANY: ["/colleges/CED/standings/grad", {AND: ["/a", "/b"]}]}
//! {ANY: ["/a", "/b"], FILTER: {ANY: ["/standings/senior", "/standings/junior"]}}
//! ```

mod parser;
mod query;

use crate::context::AccessContext;
use crate::error::AccessControlViolation;

pub use query::demographic_query;

/// A validated criteria expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaNode {
    /// A single demographic path.
    Leaf(String),
    /// All children must match (`AND` / `ALL`).
    Conjunction(Vec<CriteriaNode>),
    /// Any child may match (`OR` / `ANY`).
    Disjunction(Vec<CriteriaNode>),
    /// `inner` narrowed by a filter expression.
    Gated {
        inner: Box<CriteriaNode>,
        filter: Box<CriteriaNode>,
    },
}

/// Parse `criteria` and check every path against `context`.
///
/// Fails on the first path the context does not allow, and on any
/// structural defect.
pub fn parse_criteria(
    context: &AccessContext,
    criteria: &str,
) -> Result<CriteriaNode, AccessControlViolation> {
    parser::parse(context, criteria)
}

/// Compile `criteria` into a search query for users' demographic records.
///
/// ```
/// use myberkeley_dynamiclist::{AccessContext, compile};
///
/// let ctx = AccessContext::with_criteria("ctx", ["/a", "/b"]).unwrap();
/// assert_eq!(
///     compile(&ctx, r#"{ANY: ["/a", "/b"]}"#).unwrap(),
///     r#"resourceType:myberkeley/personalDemographic AND (myb-demographics:"/a" OR myb-demographics:"/b")"#
/// );
/// ```
pub fn compile(context: &AccessContext, criteria: &str) -> Result<String, AccessControlViolation> {
    let node = parse_criteria(context, criteria)?;
    Ok(demographic_query(&node))
}
