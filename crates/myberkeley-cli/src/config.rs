use myberkeley_dynamiclist::constants::DEFAULT_SEARCH_PAGE_SIZE;
use myberkeley_dynamiclist::{ContextDefinition, ContextRegistry, DynamicListError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub contexts: Vec<ContextDefinition>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.search.page_size == 0 {
            return Err("search.page_size must be > 0".into());
        }

        let mut seen = std::collections::HashSet::new();
        for ctx in &self.contexts {
            if ctx.context_id.trim().is_empty() {
                return Err("contexts[].id must not be empty".into());
            }
            if !seen.insert(ctx.context_id.as_str()) {
                return Err(format!("duplicate context id '{}'", ctx.context_id));
            }
            if ctx.clauses.is_empty() {
                return Err(format!(
                    "context '{}' must allow at least one clause",
                    ctx.context_id
                ));
            }
        }
        Ok(())
    }

    /// Compile every configured context.
    pub fn registry(&self) -> Result<ContextRegistry, DynamicListError> {
        ContextRegistry::from_definitions(self.contexts.iter().cloned())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}
fn default_page_size() -> usize {
    DEFAULT_SEARCH_PAGE_SIZE
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::Path;

    /// Load `path` (if it exists) with `MYBERKELEY__` environment overrides,
    /// e.g. `MYBERKELEY__SEARCH__PAGE_SIZE=500`.
    pub fn load_config(path: &Path) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        if path.exists() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        }
        builder = builder.add_source(
            Environment::with_prefix("MYBERKELEY")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
