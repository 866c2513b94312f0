//! Access contexts: named allow-lists of criteria and filter paths.
//!
//! Each allow-list entry is either a literal path or, when it ends with `*`,
//! a prefix. A whole list is compiled once into a single anchored
//! alternation so that lookups never rebuild patterns:
//!
//! ```text
//! ["/colleges/CED/standings/grad", "/colleges/ENV DSGN/departments/*"]
//!   => (?s)^(?:/colleges/CED/standings/grad|/colleges/ENV DSGN/departments/.*)$
//! ```
//!
//! Entries are escaped before compilation, so regex metacharacters in a path
//! only ever match themselves.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::CONTEXT_WILDCARD;
use crate::error::{DynamicListError, Result};
use crate::service::ContextStore;

// =============================================================================
// Allow List
// =============================================================================

/// A set of allowed paths and its compiled matcher.
#[derive(Debug, Clone)]
struct AllowList {
    entries: BTreeSet<String>,
    /// `None` when the list is empty; nothing is allowed then.
    matcher: Option<Regex>,
}

impl AllowList {
    fn compile(entries: BTreeSet<String>) -> std::result::Result<Self, regex::Error> {
        if entries.is_empty() {
            return Ok(Self {
                entries,
                matcher: None,
            });
        }

        let alternatives: Vec<String> = entries.iter().map(|e| entry_pattern(e)).collect();
        let matcher = Regex::new(&format!("(?s)^(?:{})$", alternatives.join("|")))?;

        Ok(Self {
            entries,
            matcher: Some(matcher),
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.matcher.as_ref().is_some_and(|re| re.is_match(path))
    }
}

/// Regex alternative for one allow-list entry.
fn entry_pattern(entry: &str) -> String {
    match entry.strip_suffix(CONTEXT_WILDCARD) {
        Some(prefix) => format!("{}.*", regex::escape(prefix)),
        None => regex::escape(entry),
    }
}

// =============================================================================
// Access Context
// =============================================================================

/// An immutable authorization policy for dynamic list criteria.
///
/// Criteria leaves are checked with [`is_clause_allowed`](Self::is_clause_allowed),
/// filter leaves with [`is_filter_allowed`](Self::is_filter_allowed). The two
/// lists are separate contracts: a path present only in the filter list may
/// not be used as a criterion, and vice versa.
///
/// Contexts are cheap to share behind an `Arc` and safe to query from many
/// threads at once.
#[derive(Debug, Clone)]
pub struct AccessContext {
    context_id: String,
    criteria: AllowList,
    filters: AllowList,
}

impl AccessContext {
    /// Build a context, compiling both allow-lists.
    pub fn new<C, F, S, T>(
        context_id: impl Into<String>,
        allowed_criteria: C,
        allowed_filters: F,
    ) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        F: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let context_id = context_id.into();
        let criteria = AllowList::compile(allowed_criteria.into_iter().map(Into::into).collect())
            .map_err(|e| DynamicListError::invalid_context(&context_id, e.to_string()))?;
        let filters = AllowList::compile(allowed_filters.into_iter().map(Into::into).collect())
            .map_err(|e| DynamicListError::invalid_context(&context_id, e.to_string()))?;

        tracing::debug!(
            context_id = %context_id,
            criteria = criteria.entries.len(),
            filters = filters.entries.len(),
            "Compiled access context"
        );

        Ok(Self {
            context_id,
            criteria,
            filters,
        })
    }

    /// Build a context that permits no filters.
    pub fn with_criteria<C, S>(context_id: impl Into<String>, allowed_criteria: C) -> Result<Self>
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(context_id, allowed_criteria, std::iter::empty::<String>())
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn allowed_criteria(&self) -> &BTreeSet<String> {
        &self.criteria.entries
    }

    pub fn allowed_filters(&self) -> &BTreeSet<String> {
        &self.filters.entries
    }

    /// May `path` be referenced as a criterion?
    #[must_use]
    pub fn is_clause_allowed(&self, path: &str) -> bool {
        self.criteria.matches(path)
    }

    /// May `path` be referenced as a filter?
    #[must_use]
    pub fn is_filter_allowed(&self, path: &str) -> bool {
        self.filters.matches(path)
    }
}

// =============================================================================
// Context Definition
// =============================================================================

/// The stored form of an access context.
///
/// Field names follow the repository node properties (`myb-context`,
/// `myb-clauses`, `myb-filters`); the short aliases are accepted in
/// configuration files. Single-valued properties are read as one-element
/// lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDefinition {
    #[serde(rename = "myb-context", alias = "id")]
    pub context_id: String,

    #[serde(
        rename = "myb-clauses",
        alias = "clauses",
        default,
        deserialize_with = "one_or_many"
    )]
    pub clauses: Vec<String>,

    #[serde(
        rename = "myb-filters",
        alias = "filters",
        default,
        deserialize_with = "one_or_many"
    )]
    pub filters: Vec<String>,
}

impl ContextDefinition {
    /// Read a definition from a JSON rendering of a context node.
    pub fn from_node(node: serde_json::Value) -> Result<Self> {
        let context_id = node
            .get(crate::constants::CONTEXT_PROP)
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>")
            .to_string();
        serde_json::from_value(node)
            .map_err(|e| DynamicListError::invalid_context(context_id, e.to_string()))
    }
}

impl TryFrom<ContextDefinition> for AccessContext {
    type Error = DynamicListError;

    fn try_from(def: ContextDefinition) -> Result<Self> {
        AccessContext::new(def.context_id, def.clauses, def.filters)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

// =============================================================================
// Context Registry
// =============================================================================

/// In-memory [`ContextStore`] keyed by context id.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    contexts: HashMap<String, Arc<AccessContext>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every definition. Duplicate ids are rejected.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ContextDefinition>) -> Result<Self> {
        let mut registry = Self::new();
        for def in definitions {
            registry.insert(AccessContext::try_from(def)?)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, context: AccessContext) -> Result<()> {
        match self.contexts.entry(context.context_id().to_string()) {
            Entry::Occupied(e) => Err(DynamicListError::invalid_context(
                e.key().clone(),
                "duplicate context id",
            )),
            Entry::Vacant(e) => {
                e.insert(Arc::new(context));
                Ok(())
            }
        }
    }

    pub fn get(&self, context_id: &str) -> Option<Arc<AccessContext>> {
        self.contexts.get(context_id).cloned()
    }

    /// Contexts sorted by id.
    pub fn contexts(&self) -> Vec<Arc<AccessContext>> {
        let mut all: Vec<_> = self.contexts.values().cloned().collect();
        all.sort_by(|a, b| a.context_id().cmp(b.context_id()));
        all
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[async_trait]
impl ContextStore for ContextRegistry {
    async fn context(&self, name: &str) -> Result<Option<Arc<AccessContext>>> {
        Ok(self.get(name))
    }
}

// =============================================================================
// Tests
// =============================================================================
