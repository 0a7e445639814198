//! Application services and ports for the grant lifecycle.

#![forbid(unsafe_code)]

mod grant_ports;
mod grant_service;

pub use grant_ports::PermissionGrantDirectory;
pub use grant_service::PermissionGrantService;
