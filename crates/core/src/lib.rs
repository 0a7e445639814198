//! Shared primitives for all Rust crates in grantwell.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across grantwell crates.
pub type GrantResult<T> = Result<T, GrantError>;

/// Result type for raw calls against the remote grant directory.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> GrantResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(GrantError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Object identifier of the AD application that owns a grant collection.
///
/// Every remote operation is keyed by this identifier; it is the partition
/// key of the `oauth2PermissionGrants` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationObjectId(Uuid);

impl ApplicationObjectId {
    /// Creates a random application object identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an application object identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ApplicationObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ApplicationObjectId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for ApplicationObjectId {
    type Err = GrantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = Uuid::parse_str(value.trim()).map_err(|error| {
            GrantError::Validation(format!("invalid application object id '{value}': {error}"))
        })?;
        Ok(Self(parsed))
    }
}

/// Failure reported by the remote grant directory for a single call.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// An access token could not be acquired for the call.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The HTTP exchange could not be completed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The directory answered with a payload that could not be decoded.
    #[error("unreadable response: {0}")]
    Decode(String),

    /// The directory answered with a status other than the expected one.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code returned by the directory.
        status: u16,
        /// Error message carried in the response body, or the raw body.
        message: String,
    },
}

/// Failures surfaced by permission grant lifecycle operations.
#[derive(Debug, Error)]
pub enum GrantError {
    /// Invalid configuration or violated invariant, raised before any
    /// remote call.
    #[error("validation error: {0}")]
    Validation(String),

    /// No grant matching the requested identity exists in the collection.
    #[error("not found: {0}")]
    NotFound(String),

    /// Remote grant creation failed.
    #[error("failed to create permission grant for application {object_id}: {source}")]
    RemoteCreate {
        /// Application object owning the grant collection.
        object_id: ApplicationObjectId,
        /// Underlying directory failure.
        #[source]
        source: DirectoryError,
    },

    /// Remote grant listing failed.
    #[error("failed to read permission grants for application {object_id}: {source}")]
    RemoteRead {
        /// Application object owning the grant collection.
        object_id: ApplicationObjectId,
        /// Underlying directory failure.
        #[source]
        source: DirectoryError,
    },

    /// Remote grant deletion failed.
    #[error("failed to delete permission grants for application {object_id}: {source}")]
    RemoteDelete {
        /// Application object owning the grant collection.
        object_id: ApplicationObjectId,
        /// Underlying directory failure.
        #[source]
        source: DirectoryError,
    },

    /// A replace deleted the existing grants but could not confirm the
    /// replacement, leaving the application without its desired grant.
    #[error(
        "replace left application {object_id} without its grant: existing grants were deleted \
         but the replacement could not be confirmed: {source}"
    )]
    ReplaceIncomplete {
        /// Application object owning the grant collection.
        object_id: ApplicationObjectId,
        /// Failure raised by the create phase.
        #[source]
        source: Box<GrantError>,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
