//! Error types for dynamic list operations.

/// A criteria expression was rejected.
///
/// This is a security boundary: every variant means the caller asked for
/// something the access context does not permit, or asked in a form that
/// cannot be checked. Callers must surface it, never treat it as an empty
/// match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessControlViolation {
    /// A criteria leaf is not in the context's allowed criteria.
    #[error("Allowed criteria for {context_id} do not include {path}")]
    CriterionNotAllowed {
        /// Context the criteria were checked against.
        context_id: String,
        /// The rejected path.
        path: String,
    },

    /// A filter leaf is not in the context's allowed filters.
    #[error("Allowed filters for {context_id} do not include {path}")]
    FilterNotAllowed {
        /// Context the filter was checked against.
        context_id: String,
        /// The rejected path.
        path: String,
    },

    /// A `FILTER` key appeared without a criteria combinator beside it.
    #[error("Standalone filter specified in clause at offset {position}")]
    StandaloneFilter {
        /// Byte offset of the offending group.
        position: usize,
    },

    /// A `FILTER` key appeared inside a filter subtree.
    #[error("Filter clauses do not have filters (offset {position})")]
    NestedFilter {
        /// Byte offset of the nested `FILTER` key.
        position: usize,
    },

    /// The expression is structurally invalid.
    #[error("Malformed criteria at offset {position}: {message}")]
    Malformed {
        /// What was wrong.
        message: String,
        /// Byte offset where parsing stopped.
        position: usize,
    },

    /// No criteria were given.
    #[error("No criteria specified")]
    Empty,
}

impl AccessControlViolation {
    pub(crate) fn malformed(message: impl Into<String>, position: usize) -> Self {
        Self::Malformed {
            message: message.into(),
            position,
        }
    }

    /// The rejected path, for violations caused by an allow-list miss.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::CriterionNotAllowed { path, .. } | Self::FilterNotAllowed { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}

/// Errors from the dynamic list service and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum DynamicListError {
    #[error(transparent)]
    AccessControl(#[from] AccessControlViolation),

    #[error("Invalid access context {context_id}: {message}")]
    InvalidContext { context_id: String, message: String },

    #[error("Dynamic list context not found: {0}")]
    ContextNotFound(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Demographic store error: {0}")]
    Store(String),
}

impl DynamicListError {
    pub fn invalid_context(context_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidContext {
            context_id: context_id.into(),
            message: message.into(),
        }
    }

    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error was raised by criteria validation.
    #[must_use]
    pub fn is_access_violation(&self) -> bool {
        matches!(self, Self::AccessControl(_))
    }
}

/// Result type for dynamic list operations.
pub type Result<T> = std::result::Result<T, DynamicListError>;
