//! Namespaced context store carrying agent inputs and outputs across one
//! stack execution.

pub mod manager;
pub mod store;
pub mod r#trait;
pub mod types;

pub use manager::MemoryManager;
pub use r#trait::ContextStore;
pub use store::InMemoryContextStore;
pub use types::{ContextKey, Slot, StoreError};
