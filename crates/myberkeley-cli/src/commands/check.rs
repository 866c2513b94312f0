use anyhow::{Result, bail};
use myberkeley_dynamiclist::{AccessContext, ContextRegistry};

use crate::cli::CheckArgs;
use crate::output::{print_denied, print_success};

pub fn run(registry: &ContextRegistry, args: &CheckArgs) -> Result<()> {
    let ctx = super::lookup(registry, &args.context)?;
    let kind = if args.filter { "filter" } else { "criterion" };

    let denied = denied_paths(&ctx, args.filter, &args.paths);
    for path in &args.paths {
        if denied.contains(&path.as_str()) {
            print_denied(&format!("{path} is not an allowed {kind}"));
        } else {
            print_success(&format!("{path} is an allowed {kind}"));
        }
    }

    if !denied.is_empty() {
        bail!(
            "{} of {} paths are not allowed by {}",
            denied.len(),
            args.paths.len(),
            ctx.context_id()
        );
    }
    Ok(())
}

fn denied_paths<'a>(ctx: &AccessContext, as_filter: bool, paths: &'a [String]) -> Vec<&'a str> {
    paths
        .iter()
        .map(String::as_str)
        .filter(|p| {
            if as_filter {
                !ctx.is_filter_allowed(p)
            } else {
                !ctx.is_clause_allowed(p)
            }
        })
        .collect()
}
