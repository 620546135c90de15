pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod spec;
pub mod state;
