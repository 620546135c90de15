//! Declarative stack specification: the input to the engine.

mod load;
mod types;

pub use load::{load_stack_spec, parse_stack_spec, SpecError, SpecFormat};
pub use types::{AgentSpec, Payload, StackSpec};
