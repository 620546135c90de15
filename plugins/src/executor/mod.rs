pub mod strategies;

pub use strategies::{ExponentialBackoffPlugin, LinearRetryPlugin, NoRetryPlugin};
