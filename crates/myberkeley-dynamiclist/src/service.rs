//! Dynamic list service: runs compiled criteria against the search index
//! and maintains users' demographic records.
//!
//! The search engine and the content repository are external. The service
//! reaches them through [`SearchBackend`], [`ContextStore`] and
//! [`DemographicStore`].
//!
//! Dynamic list searches bypass the caller's own read permissions, so every
//! criteria string must pass its access context first. Validation failures
//! are returned as errors, never as an empty match.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_SEARCH_PAGE_SIZE, PERSONAL_DEMOGRAPHIC_STORE_NAME, STORE_CONTEXT_PROP,
    STORE_CRITERIA_PROP,
};
use crate::context::AccessContext;
use crate::criteria::compile;
use crate::error::{DynamicListError, Result};

/// Prefix of authorizable home paths in the content store.
const HOME_PREFIX: &str = "a:";

// =============================================================================
// Collaborators
// =============================================================================

/// Hits returned by the search engine for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHits {
    /// Content paths of the matching demographic records.
    pub paths: Vec<String>,
    /// Time the engine spent on the query.
    pub elapsed: Duration,
}

/// Executes compiled queries.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `query`, returning at most `rows` hits.
    async fn query(&self, query: &str, rows: usize) -> Result<SearchHits>;
}

/// Resolves access contexts by name.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn context(&self, name: &str) -> Result<Option<Arc<AccessContext>>>;
}

/// Persists demographic tags and enumerates user homes.
#[async_trait]
pub trait DemographicStore: Send + Sync {
    /// Write `demographics` at `store_path`, or remove the property when
    /// `None`. A missing node is created readable by administrators only.
    async fn write_demographics(
        &self,
        store_path: &str,
        demographics: Option<&BTreeSet<String>>,
    ) -> Result<()>;

    /// Paths of every user home.
    async fn user_home_paths(&self) -> Result<Vec<String>>;
}

// =============================================================================
// Dynamic List
// =============================================================================

/// A stored dynamic list: the `context` and `criteria` properties of a
/// `myberkeley/dynamiclist` node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicList {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
}

impl DynamicList {
    pub fn new(
        path: impl Into<String>,
        context: impl Into<String>,
        criteria: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            context: Some(context.into()),
            criteria: Some(criteria.into()),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Dynamic list operations over pluggable search and storage backends.
pub struct DynamicListService {
    search: Arc<dyn SearchBackend>,
    contexts: Arc<dyn ContextStore>,
    demographics: Arc<dyn DemographicStore>,
    page_size: usize,
}

impl DynamicListService {
    pub fn new(
        search: Arc<dyn SearchBackend>,
        contexts: Arc<dyn ContextStore>,
        demographics: Arc<dyn DemographicStore>,
    ) -> Self {
        Self {
            search,
            contexts,
            demographics,
            page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }

    /// Override the number of rows requested per search.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Ids of the users matching `criteria` under `context`.
    pub async fn user_ids_for_criteria(
        &self,
        context: &AccessContext,
        criteria: &str,
    ) -> Result<Vec<String>> {
        let query = compile(context, criteria)?;
        info!(context_id = %context.context_id(), query = %query, "Performing dynamic list query");

        let hits = self.search.query(&query, self.page_size).await?;
        info!(
            hits = hits.paths.len(),
            elapsed_ms = hits.elapsed.as_millis() as u64,
            "Dynamic list query complete"
        );
        if hits.paths.len() >= self.page_size {
            warn!(page_size = self.page_size, "Dynamic list query at page size limit");
        }

        Ok(hits
            .paths
            .iter()
            .filter_map(|path| {
                let id = authorizable_id(path);
                if id.is_none() {
                    debug!(path = %path, "Ignoring hit outside user homes");
                }
                id
            })
            .collect())
    }

    /// Ids of the users matching a stored list.
    ///
    /// A list without a context or criteria matches nobody.
    pub async fn user_ids_for_list(&self, list: &DynamicList) -> Result<Vec<String>> {
        let (Some(context_name), Some(criteria)) = (&list.context, &list.criteria) else {
            warn!(
                path = %list.path,
                "Dynamic list has no {STORE_CONTEXT_PROP} or {STORE_CRITERIA_PROP}; cannot search"
            );
            return Ok(Vec::new());
        };

        let context = self
            .contexts
            .context(context_name)
            .await?
            .ok_or_else(|| DynamicListError::ContextNotFound(context_name.clone()))?;

        self.user_ids_for_criteria(&context, criteria).await
    }

    /// Replace a user's demographic tags, or remove them with `None`.
    pub async fn set_demographics(
        &self,
        user_id: &str,
        demographics: Option<BTreeSet<String>>,
    ) -> Result<()> {
        let store_path = demographic_store_path(user_id);
        self.demographics
            .write_demographics(&store_path, demographics.as_ref())
            .await?;
        info!(path = %store_path, demographics = ?demographics, "Set demographics");
        Ok(())
    }

    /// Ids of every user with a home.
    pub async fn all_user_ids(&self) -> Result<Vec<String>> {
        let homes = self.demographics.user_home_paths().await?;
        Ok(homes.iter().filter_map(|p| authorizable_id(p)).collect())
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Home path of an authorizable.
pub fn home_path(user_id: &str) -> String {
    format!("{HOME_PREFIX}{user_id}")
}

/// Path of the node holding a user's demographic tags.
pub fn demographic_store_path(user_id: &str) -> String {
    format!("{}/{PERSONAL_DEMOGRAPHIC_STORE_NAME}", home_path(user_id))
}

/// Authorizable id owning a content path, if the path is under a home.
pub fn authorizable_id(path: &str) -> Option<String> {
    let rest = path.strip_prefix(HOME_PREFIX)?;
    let id = rest.split('/').next().unwrap_or_default();
    (!id.is_empty()).then(|| id.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextRegistry;
    use crate::error::AccessControlViolation;
    use std::sync::Mutex;
    use tokio_test::block_on;

    #[derive(Default)]
    struct RecordingSearch {
        paths: Vec<String>,
        queries: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl SearchBackend for RecordingSearch {
        async fn query(&self, query: &str, rows: usize) -> Result<SearchHits> {
            self.queries.lock().unwrap().push((query.to_string(), rows));
            Ok(SearchHits {
                paths: self.paths.iter().take(rows).cloned().collect(),
                elapsed: Duration::from_millis(3),
            })
        }
    }

    #[derive(Default)]
    struct MemoryDemographics {
        writes: Mutex<Vec<(String, Option<BTreeSet<String>>)>>,
        homes: Vec<String>,
    }

    #[async_trait]
    impl DemographicStore for MemoryDemographics {
        async fn write_demographics(
            &self,
            store_path: &str,
            demographics: Option<&BTreeSet<String>>,
        ) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((store_path.to_string(), demographics.cloned()));
            Ok(())
        }

        async fn user_home_paths(&self) -> Result<Vec<String>> {
            Ok(self.homes.clone())
        }
    }

    fn registry() -> ContextRegistry {
        let mut registry = ContextRegistry::new();
        registry
            .insert(
                AccessContext::new("ced", ["/colleges/CED/*"], ["/standings/*"]).unwrap(),
            )
            .unwrap();
        registry
    }

    fn service(
        search: Arc<RecordingSearch>,
        demographics: Arc<MemoryDemographics>,
    ) -> DynamicListService {
        DynamicListService::new(search, Arc::new(registry()), demographics)
    }

    fn hits(paths: &[&str]) -> Arc<RecordingSearch> {
        Arc::new(RecordingSearch {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn path_helpers() {
        assert_eq!(home_path("joe"), "a:joe");
        assert_eq!(demographic_store_path("joe"), "a:joe/_myberkeley-demographic");
        assert_eq!(authorizable_id("a:joe/_myberkeley-demographic").as_deref(), Some("joe"));
        assert_eq!(authorizable_id("a:joe").as_deref(), Some("joe"));
        assert_eq!(authorizable_id("/var/other"), None);
        assert_eq!(authorizable_id("a:"), None);
    }

    #[test]
    fn criteria_are_compiled_and_hits_mapped_to_users() {
        let search = hits(&[
            "a:joe/_myberkeley-demographic",
            "a:ann/_myberkeley-demographic",
            "/stray/path",
        ]);
        let svc = service(search.clone(), Arc::default());
        let ctx = registry().get("ced").unwrap();

        let ids = block_on(svc.user_ids_for_criteria(&ctx, "/colleges/CED/standings/grad")).unwrap();
        assert_eq!(ids, vec!["joe", "ann"]);

        let queries = search.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            &[(
                r#"resourceType:myberkeley/personalDemographic AND myb-demographics:"/colleges/CED/standings/grad""#
                    .to_string(),
                DEFAULT_SEARCH_PAGE_SIZE
            )]
        );
    }

    #[test]
    fn violations_propagate_without_searching() {
        let search = hits(&["a:joe/_myberkeley-demographic"]);
        let svc = service(search.clone(), Arc::default());
        let ctx = registry().get("ced").unwrap();

        let err = block_on(svc.user_ids_for_criteria(&ctx, r#"{ANY: ["/colleges/CED/x", "NOT-ALLOWED"]}"#))
            .unwrap_err();
        assert!(matches!(
            err,
            DynamicListError::AccessControl(AccessControlViolation::CriterionNotAllowed { ref path, .. })
                if path == "NOT-ALLOWED"
        ));
        assert!(search.queries.lock().unwrap().is_empty());

        let err = block_on(svc.user_ids_for_criteria(&ctx, "")).unwrap_err();
        assert!(err.is_access_violation());
    }

    #[test]
    fn page_size_is_passed_to_the_backend() {
        let search = hits(&["a:1/x", "a:2/x", "a:3/x"]);
        let svc = service(search.clone(), Arc::default()).with_page_size(2);
        let ctx = registry().get("ced").unwrap();

        let ids = block_on(svc.user_ids_for_criteria(&ctx, "/colleges/CED/a")).unwrap();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(search.queries.lock().unwrap()[0].1, 2);
        assert_eq!(svc.page_size(), 2);
    }

    #[test]
    fn stored_list_resolves_its_context() {
        let search = hits(&["a:joe/_myberkeley-demographic"]);
        let svc = service(search.clone(), Arc::default());
        let list = DynamicList::new(
            "/lists/seniors",
            "ced",
            r#"{ANY: ["/colleges/CED/a", "/colleges/CED/b"], FILTER: "/standings/senior"}"#,
        );

        let ids = block_on(svc.user_ids_for_list(&list)).unwrap();
        assert_eq!(ids, vec!["joe"]);
        assert_eq!(
            search.queries.lock().unwrap()[0].0,
            r#"resourceType:myberkeley/personalDemographic AND ((myb-demographics:"/colleges/CED/a" OR myb-demographics:"/colleges/CED/b") AND myb-demographics:"/standings/senior")"#
        );
    }

    #[test]
    fn incomplete_list_matches_nobody() {
        let search = hits(&["a:joe/_myberkeley-demographic"]);
        let svc = service(search.clone(), Arc::default());
        let list = DynamicList {
            path: "/lists/broken".into(),
            context: Some("ced".into()),
            criteria: None,
        };

        assert!(block_on(svc.user_ids_for_list(&list)).unwrap().is_empty());
        assert!(search.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_context_is_an_error() {
        let svc = service(hits(&[]), Arc::default());
        let list = DynamicList::new("/lists/x", "nope", "/colleges/CED/a");
        assert!(matches!(
            block_on(svc.user_ids_for_list(&list)),
            Err(DynamicListError::ContextNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn stored_list_deserializes_from_node_properties() {
        let list: DynamicList = serde_json::from_value(serde_json::json!({
            "path": "/lists/a",
            "context": "ced",
            "criteria": "/colleges/CED/a",
        }))
        .unwrap();
        assert_eq!(list, DynamicList::new("/lists/a", "ced", "/colleges/CED/a"));
    }

    #[test]
    fn demographics_are_written_under_the_home() {
        let store = Arc::new(MemoryDemographics::default());
        let svc = service(hits(&[]), store.clone());
        let tags: BTreeSet<String> = ["/colleges/CED/a".to_string()].into();

        block_on(svc.set_demographics("joe", Some(tags.clone()))).unwrap();
        block_on(svc.set_demographics("joe", None)).unwrap();

        let writes = store.writes.lock().unwrap();
        assert_eq!(
            writes.as_slice(),
            &[
                ("a:joe/_myberkeley-demographic".to_string(), Some(tags)),
                ("a:joe/_myberkeley-demographic".to_string(), None),
            ]
        );
    }

    #[test]
    fn all_user_ids_come_from_homes() {
        let store = Arc::new(MemoryDemographics {
            homes: vec!["a:joe".into(), "a:ann".into(), "/not/a/home".into()],
            ..Default::default()
        });
        let svc = service(hits(&[]), store);
        assert_eq!(block_on(svc.all_user_ids()).unwrap(), vec!["joe", "ann"]);
    }
}
