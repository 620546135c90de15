//! Per-execution agent state.
//!
//! ## Design
//!
//! 1. **Thread safety**: one `RwLock` guards the whole execution record;
//!    readers share it, writers take it exclusively
//! 2. **No re-entrancy**: no method calls another locking method while the
//!    lock is held
//! 3. **Forward-only**: status changes are validated against the agent state
//!    machine before they are applied
//! 4. **Observable**: every applied change is broadcast as a [`StateEvent`]

pub mod manager;
pub mod transitions;
pub mod types;

pub use manager::StateManager;
pub use transitions::{StateError, StateTransition};
pub use types::{AgentState, ExecutionStatus, StackExecutionSummary, StateEvent};
