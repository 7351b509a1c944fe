//! Storage access key types and resolution

mod resolver;
mod types;

pub use resolver::CredentialResolver;
pub use types::*;
