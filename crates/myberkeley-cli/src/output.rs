use colored::Colorize;
use myberkeley_dynamiclist::AccessContext;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_denied(msg: &str) {
    println!("{} {}", "✗".red(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_contexts(contexts: &[std::sync::Arc<AccessContext>]) {
    if contexts.is_empty() {
        println!("No contexts configured.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Context", "Criteria", "Filters"]);
    for ctx in contexts {
        builder.push_record([
            ctx.context_id().to_string(),
            ctx.allowed_criteria().len().to_string(),
            ctx.allowed_filters().len().to_string(),
        ]);
    }
    let table = builder.build().with(Style::rounded()).to_string();
    println!("{table}");
    println!("Total: {}", contexts.len());
}
