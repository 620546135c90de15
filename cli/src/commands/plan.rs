use agentstack_core::api::{self, load_stack_spec};

use super::cli::PlanArgs;
use crate::error::CliError;

pub fn plan(args: &PlanArgs) -> Result<i32, CliError> {
    let spec = load_stack_spec(&args.spec)?;
    let dag = api::build(&spec)?;
    let plan = api::schedule(&dag)?;

    if args.json {
        let out = serde_json::to_string_pretty(&plan)
            .map_err(|e| CliError::Command(format!("serialize plan failed: {e}")))?;
        println!("{out}");
        return Ok(0);
    }

    println!("{} ({} agents)", spec.name, plan.total_agents());
    for (i, batch) in plan.batches.iter().enumerate() {
        println!("  batch {i}: {}", batch.join(", "));
    }
    Ok(0)
}
