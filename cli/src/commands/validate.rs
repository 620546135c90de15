use agentstack_core::api::{self, load_stack_spec};

use super::cli::ValidateArgs;
use crate::error::CliError;

pub fn validate(args: &ValidateArgs) -> Result<i32, CliError> {
    let spec = load_stack_spec(&args.spec)?;
    let dag = api::build(&spec)?;
    let plan = api::schedule(&dag)?;

    println!(
        "{}: ok ({} agents, {} batches)",
        spec.name,
        dag.len(),
        plan.len()
    );
    Ok(0)
}
