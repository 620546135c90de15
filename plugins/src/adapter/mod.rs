pub mod echo;

pub use echo::EchoAdapter;
