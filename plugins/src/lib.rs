pub mod adapter;
pub mod executor;
pub mod factory;
