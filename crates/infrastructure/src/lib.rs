//! Infrastructure adapters for the grant directory port.

#![forbid(unsafe_code)]

mod graph_grant_directory;
mod in_memory_grant_directory;
mod token_provider;

pub use graph_grant_directory::GraphGrantDirectory;
pub use in_memory_grant_directory::InMemoryGrantDirectory;
pub use token_provider::{
    AccessTokenProvider, ClientCredentialsTokenProvider, StaticTokenProvider,
};
