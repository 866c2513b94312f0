//! # myberkeley-dynamiclist
//!
//! Dynamic list support for the myBerkeley portal.
//!
//! A dynamic list is a stored search over users' demographic tags. Who may
//! search on which tags is governed by an [`AccessContext`]: a named pair of
//! allow-lists, one for criteria and one for filters. Criteria arrive as a
//! small boolean expression language:
//!
//! ```text
//! {ANY: ["/colleges/CED/standings/grad", "/colleges/CED/standings/undergrad"],
//!  FILTER: "/standings/senior"}
//! ```
//!
//! which is validated leaf by leaf against the context and compiled to a
//! search engine query:
//!
//! ```text
//! resourceType:myberkeley/personalDemographic AND
//!   ((myb-demographics:"/colleges/CED/standings/grad" OR
//!     myb-demographics:"/colleges/CED/standings/undergrad") AND
//!    myb-demographics:"/standings/senior")
//! ```
//!
//! ## Example
//!
//! ```
//! use myberkeley_dynamiclist::{AccessContext, compile};
//!
//! let context = AccessContext::with_criteria(
//!     "ced",
//!     ["/colleges/CED/standings/grad", "/colleges/CED/departments/*"],
//! )
//! .unwrap();
//!
//! let query = compile(&context, "/colleges/CED/standings/grad").unwrap();
//! assert_eq!(
//!     query,
//!     "resourceType:myberkeley/personalDemographic AND \
//!      myb-demographics:\"/colleges/CED/standings/grad\""
//! );
//! assert!(compile(&context, "{ANY: [\"NOT-ALLOWED\"]}").is_err());
//! ```
//!
//! Searching and storage are left to the host through the traits in
//! [`service`].

pub mod constants;
pub mod context;
pub mod criteria;
pub mod error;
pub mod service;

pub use context::{AccessContext, ContextDefinition, ContextRegistry};
pub use criteria::{CriteriaNode, compile, parse_criteria};
pub use error::{AccessControlViolation, DynamicListError, Result};
pub use service::{
    ContextStore, DemographicStore, DynamicList, DynamicListService, SearchBackend, SearchHits,
};
