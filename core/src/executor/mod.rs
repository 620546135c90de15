//! Stack execution engine
//!
//! Turns a validated [`StackSpec`](crate::spec::StackSpec) into a dependency
//! graph, schedules it into batches and drives every agent to a terminal
//! status.
//!
//! # Architecture
//!
//! ```text
//! StackSpec
//!   ↓
//! StackDag::build() → duplicate ids, unknown dependencies, cycle detection
//!   ↓
//! schedule() → ExecutionPlan { batches }
//!   ↓
//! StackExecutor::execute() → batches in order, agents within a batch in parallel
//!   ↓
//! StackExecutionSummary
//! ```

mod adapter;
mod cancel;
mod engine;
mod graph;
mod scheduler;
pub mod traits;
pub mod types;

pub use adapter::{AgentContext, AgentRuntimeAdapter};
pub use cancel::CancelToken;
pub use engine::{StackExecutor, StackExecutorBuilder};
pub use graph::{DagNode, StackDag};
pub use scheduler::{execute_batch_parallel, schedule, Batch, ExecutionPlan};
pub use traits::RetryStrategyPlugin;
pub use types::{ExecutorConfig, FailurePolicy};
