use crate::utils::{self, StackArgs};
use colored::Colorize;

pub fn handle(stack: &StackArgs) -> anyhow::Result<bool> {
    let config = stack.resolve()?;
    let groups = gateflow_cloud::build(&config)?;

    println!(
        "{}",
        format!(
            "Plan for project {} ({} resources in {} groups):",
            config.project_id.as_deref().unwrap_or_default(),
            groups.iter().map(Vec::len).sum::<usize>(),
            groups.len()
        )
        .blue()
    );
    utils::print_plan(&groups);
    Ok(true)
}
