//! Domain entities and invariants for OAuth2 permission grants.

#![forbid(unsafe_code)]

mod grant;
mod window;

pub use grant::{
    ClientId, ConsentType, GrantConfiguration, GrantConfigurationInput, GrantKey, PermissionGrant,
    ResourceId, Scope,
};
pub use window::{DEFAULT_VALIDITY_YEARS, ValidityWindow, plus_calendar_years};
