pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod models;
pub mod service;

pub use error::{RegistryError, RegistryResult};
pub use service::{FileRegistry, GlobalFiles};
