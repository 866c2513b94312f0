use anyhow::Result;
use myberkeley_dynamiclist::ContextRegistry;

use crate::output::print_contexts;

pub fn run(registry: &ContextRegistry) -> Result<()> {
    print_contexts(&registry.contexts());
    Ok(())
}
