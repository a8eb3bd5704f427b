pub mod error;
pub mod hash;
pub mod retention;

pub use error::HashError;
pub use hash::ContentHash;
pub use retention::{EnvRemovalPolicy, RemovalPolicy, SwitchRemovalPolicy};
