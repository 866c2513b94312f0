use anyhow::{Context, Result};
use myberkeley_dynamiclist::{ContextRegistry, compile};

use crate::cli::CompileArgs;

pub fn run(registry: &ContextRegistry, args: &CompileArgs) -> Result<()> {
    let ctx = super::lookup(registry, &args.context)?;
    let query = render(&ctx, &args.criteria)?;
    println!("{query}");
    Ok(())
}

fn render(ctx: &myberkeley_dynamiclist::AccessContext, criteria: &str) -> Result<String> {
    compile(ctx, criteria).with_context(|| format!("Invalid criteria for {}", ctx.context_id()))
}
