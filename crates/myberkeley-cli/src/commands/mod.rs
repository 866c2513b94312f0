pub mod check;
pub mod compile;
pub mod contexts;

use std::sync::Arc;

use anyhow::Result;
use myberkeley_dynamiclist::{AccessContext, ContextRegistry, DynamicListError};

fn lookup(registry: &ContextRegistry, context_id: &str) -> Result<Arc<AccessContext>> {
    registry
        .get(context_id)
        .ok_or_else(|| DynamicListError::ContextNotFound(context_id.to_string()).into())
}
