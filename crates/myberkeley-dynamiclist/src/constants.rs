//! Resource types and property names shared with the content repository.

/// Resource type of a stored dynamic list.
pub const DYNAMIC_LIST_RT: &str = "myberkeley/dynamiclist";
/// Resource type of the node holding a user's demographic tags.
pub const PERSONAL_DEMOGRAPHIC_RT: &str = "myberkeley/personalDemographic";
/// Resource type of an access context node.
pub const DYNAMIC_LIST_CONTEXT_RT: &str = "myberkeley/dynamicListContext";

/// Access context id property.
pub const CONTEXT_PROP: &str = "myb-context";
/// Allowed criteria property of an access context.
pub const CONTEXT_CLAUSES_PROP: &str = "myb-clauses";
/// Allowed filters property of an access context.
pub const CONTEXT_FILTERS_PROP: &str = "myb-filters";
/// Indexed field holding a user's demographic tags.
pub const DEMOGRAPHIC_DATA_PROP: &str = "myb-demographics";

/// Context name property of a stored dynamic list.
pub const STORE_CONTEXT_PROP: &str = "context";
/// Criteria property of a stored dynamic list.
pub const STORE_CRITERIA_PROP: &str = "criteria";

/// Trailing marker turning an allow-list entry into a prefix match.
pub const CONTEXT_WILDCARD: char = '*';

/// Node name of the demographic store under a user's home.
pub const PERSONAL_DEMOGRAPHIC_STORE_NAME: &str = "_myberkeley-demographic";

/// Rows requested per search. Sized for the whole campus population.
pub const DEFAULT_SEARCH_PAGE_SIZE: usize = 20_000;
