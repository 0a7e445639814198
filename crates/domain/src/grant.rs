//! Permission grant entities and boundary validation.
//!
//! All schema validation happens once, in [`GrantConfiguration::new`]; no
//! remote call can be issued from a configuration that failed it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use grantwell_core::{ApplicationObjectId, GrantError, GrantResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the client principal being granted access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Creates a new random client identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a client identifier from an existing UUID value.
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

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = GrantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = Uuid::parse_str(value.trim()).map_err(|error| {
            GrantError::Validation(format!("invalid client id '{value}': {error}"))
        })?;
        Ok(Self(parsed))
    }
}

/// Identifier of the resource application the grant applies to.
///
/// The remote schema only requires a non-empty string here, not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(NonEmptyString);

impl ResourceId {
    /// Creates a validated resource identifier.
    pub fn new(value: impl Into<String>) -> GrantResult<Self> {
        let value = NonEmptyString::new(value)
            .map_err(|_| GrantError::Validation("resource id must not be empty".to_owned()))?;
        Ok(Self(value))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.as_str())
    }
}

impl FromStr for ResourceId {
    type Err = GrantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

/// Whether a grant covers every principal of the tenant or a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentType {
    /// The grant applies to all principals.
    AllPrincipal,
    /// The grant applies to a single principal.
    Principal,
}

impl ConsentType {
    /// Returns the wire string for this consent type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllPrincipal => "AllPrincipal",
            Self::Principal => "Principal",
        }
    }

    /// Parses a wire string into a consent type.
    pub fn parse(value: &str) -> GrantResult<Self> {
        match value {
            "AllPrincipal" => Ok(Self::AllPrincipal),
            "Principal" => Ok(Self::Principal),
            _ => Err(GrantError::Validation(format!(
                "consent type must be 'AllPrincipal' or 'Principal', got '{value}'"
            ))),
        }
    }
}

/// Space-delimited set of permission scope names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    /// Creates a validated scope string.
    pub fn new(value: impl Into<String>) -> GrantResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(GrantError::Validation(
                "scope must not be empty when present".to_owned(),
            ));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the full space-delimited scope string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Iterates the individual scope names.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }
}

/// Raw desired-state input, prior to schema validation.
///
/// Timestamps are RFC 3339 strings; identifiers are unparsed.
#[derive(Debug, Clone, Default)]
pub struct GrantConfigurationInput {
    /// Client principal UUID string.
    pub client_id: String,
    /// Owning application object UUID string.
    pub object_id: String,
    /// Resource application identifier.
    pub resource_id: String,
    /// Consent type wire string.
    pub consent_type: String,
    /// Optional space-delimited scope string.
    pub scope: Option<String>,
    /// Optional RFC 3339 start timestamp.
    pub start_time: Option<String>,
    /// Optional RFC 3339 expiry timestamp.
    pub expiry_time: Option<String>,
}

/// Validated desired state for one permission grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantConfiguration {
    /// Client principal being granted access.
    pub client_id: ClientId,
    /// Application object owning the grant collection.
    pub object_id: ApplicationObjectId,
    /// Resource application the grant applies to.
    pub resource_id: ResourceId,
    /// Consent type of the grant.
    pub consent_type: ConsentType,
    /// Optional permission scopes.
    pub scope: Option<Scope>,
    /// Optional explicit start of the validity window.
    pub start_time: Option<DateTime<Utc>>,
    /// Optional explicit end of the validity window.
    pub expiry_time: Option<DateTime<Utc>>,
}

impl GrantConfiguration {
    /// Validates raw input into a configuration.
    ///
    /// Rejects malformed UUIDs, unknown consent types, empty strings,
    /// unparseable timestamps, and a window that ends at or before its
    /// explicit start.
    pub fn new(input: GrantConfigurationInput) -> GrantResult<Self> {
        let client_id = ClientId::from_str(input.client_id.as_str())?;
        let object_id = ApplicationObjectId::from_str(input.object_id.as_str())?;
        let resource_id = ResourceId::new(input.resource_id)?;
        let consent_type = ConsentType::parse(input.consent_type.as_str())?;
        let scope = input.scope.map(Scope::new).transpose()?;
        let start_time = input
            .start_time
            .as_deref()
            .map(|value| parse_timestamp("start_time", value))
            .transpose()?;
        let expiry_time = input
            .expiry_time
            .as_deref()
            .map(|value| parse_timestamp("expiry_time", value))
            .transpose()?;

        if let (Some(start), Some(expiry)) = (start_time, expiry_time) {
            if expiry <= start {
                return Err(GrantError::Validation(format!(
                    "expiry_time {expiry} must be after start_time {start}"
                )));
            }
        }

        Ok(Self {
            client_id,
            object_id,
            resource_id,
            consent_type,
            scope,
            start_time,
            expiry_time,
        })
    }

    /// Projects the identity triple of the configured grant.
    #[must_use]
    pub fn key(&self) -> GrantKey {
        GrantKey {
            object_id: self.object_id,
            client_id: self.client_id,
            resource_id: self.resource_id.clone(),
        }
    }
}

/// Identity of one grant within an application's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantKey {
    /// Application object owning the grant collection.
    pub object_id: ApplicationObjectId,
    /// Client principal of the grant.
    pub client_id: ClientId,
    /// Resource application of the grant.
    pub resource_id: ResourceId,
}

/// A permission grant record: the create request and the remote state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Client principal being granted access.
    pub client_id: ClientId,
    /// Application object owning the grant collection.
    pub object_id: ApplicationObjectId,
    /// Resource application the grant applies to.
    pub resource_id: ResourceId,
    /// Consent type of the grant.
    pub consent_type: ConsentType,
    /// Optional permission scopes.
    pub scope: Option<Scope>,
    /// Start of the validity window.
    pub start_time: DateTime<Utc>,
    /// End of the validity window.
    pub expiry_time: DateTime<Utc>,
    /// When the remote system recorded the grant. Computed remotely,
    /// absent until a read refreshes it.
    pub grant_time: Option<DateTime<Utc>>,
}

impl PermissionGrant {
    /// Assembles the grant record a create operation sends.
    ///
    /// Required fields are copied verbatim; the validity window resolves an
    /// omitted start to `now` and an omitted expiry to two calendar years
    /// after the effective start.
    #[must_use]
    pub fn from_configuration(config: &GrantConfiguration, now: DateTime<Utc>) -> Self {
        let window = crate::ValidityWindow::resolve(config.start_time, config.expiry_time, now);
        Self {
            client_id: config.client_id,
            object_id: config.object_id,
            resource_id: config.resource_id.clone(),
            consent_type: config.consent_type,
            scope: config.scope.clone(),
            start_time: window.start,
            expiry_time: window.expiry,
            grant_time: None,
        }
    }

    /// Returns true when this grant carries the given identity.
    #[must_use]
    pub fn matches(&self, key: &GrantKey) -> bool {
        self.object_id == key.object_id
            && self.client_id == key.client_id
            && self.resource_id == key.resource_id
    }
}

fn parse_timestamp(field: &str, value: &str) -> GrantResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            GrantError::Validation(format!(
                "{field} must be an RFC 3339 timestamp, got '{value}': {error}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use grantwell_core::GrantError;

    use super::{
        ConsentType, GrantConfiguration, GrantConfigurationInput, PermissionGrant, ResourceId,
        Scope,
    };

    fn valid_input() -> GrantConfigurationInput {
        GrantConfigurationInput {
            client_id: "5e8e1a10-1b0e-4a6e-9c7f-0f0d5a3f8b21".to_owned(),
            object_id: "9b2f3c44-7d61-4f2e-8a55-6a1c9f0e2d33".to_owned(),
            resource_id: "00000002-0000-0000-c000-000000000000".to_owned(),
            consent_type: "Principal".to_owned(),
            scope: None,
            start_time: None,
            expiry_time: None,
        }
    }

    fn timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap_or_else(|error| panic!("bad test timestamp '{value}': {error}"))
            .with_timezone(&Utc)
    }

    #[test]
    fn valid_input_is_accepted() {
        let config = GrantConfiguration::new(valid_input());
        assert!(config.is_ok());
    }

    #[test]
    fn consent_type_outside_the_two_values_is_rejected() {
        for bad in ["User", "allprincipal", "PRINCIPAL", ""] {
            assert!(
                matches!(ConsentType::parse(bad), Err(GrantError::Validation(_))),
                "'{bad}' should be rejected"
            );
        }
        assert_eq!(ConsentType::parse("AllPrincipal").ok(), Some(ConsentType::AllPrincipal));
        assert_eq!(ConsentType::parse("Principal").ok(), Some(ConsentType::Principal));
    }

    #[test]
    fn malformed_client_id_is_rejected() {
        let mut input = valid_input();
        input.client_id = "not-a-uuid".to_owned();
        assert!(matches!(
            GrantConfiguration::new(input),
            Err(GrantError::Validation(_))
        ));
    }

    #[test]
    fn empty_resource_id_is_rejected() {
        let mut input = valid_input();
        input.resource_id = "   ".to_owned();
        assert!(matches!(
            GrantConfiguration::new(input),
            Err(GrantError::Validation(_))
        ));
    }

    #[test]
    fn empty_scope_is_rejected_when_present() {
        let mut input = valid_input();
        input.scope = Some(String::new());
        assert!(matches!(
            GrantConfiguration::new(input),
            Err(GrantError::Validation(_))
        ));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let mut input = valid_input();
        input.start_time = Some("yesterday".to_owned());
        assert!(matches!(
            GrantConfiguration::new(input),
            Err(GrantError::Validation(_))
        ));
    }

    #[test]
    fn window_ending_before_its_start_is_rejected() {
        let mut input = valid_input();
        input.start_time = Some("2025-06-01T00:00:00Z".to_owned());
        input.expiry_time = Some("2025-05-01T00:00:00Z".to_owned());
        assert!(matches!(
            GrantConfiguration::new(input),
            Err(GrantError::Validation(_))
        ));
    }

    #[test]
    fn scope_entries_split_on_whitespace() {
        let scope = Scope::new("User.Read Directory.Read.All")
            .unwrap_or_else(|error| panic!("scope should validate: {error}"));
        let entries: Vec<&str> = scope.entries().collect();
        assert_eq!(entries, vec!["User.Read", "Directory.Read.All"]);
    }

    #[test]
    fn grant_from_configuration_copies_fields_and_resolves_window() {
        let mut input = valid_input();
        input.scope = Some("User.Read".to_owned());
        let config = GrantConfiguration::new(input)
            .unwrap_or_else(|error| panic!("configuration should validate: {error}"));
        let now = timestamp("2025-01-15T09:00:00Z");

        let grant = PermissionGrant::from_configuration(&config, now);

        assert_eq!(grant.client_id, config.client_id);
        assert_eq!(grant.object_id, config.object_id);
        assert_eq!(grant.consent_type, ConsentType::Principal);
        assert_eq!(grant.scope.as_ref().map(Scope::as_str), Some("User.Read"));
        assert_eq!(grant.start_time, now);
        assert_eq!(grant.expiry_time, timestamp("2027-01-15T09:00:00Z"));
        assert_eq!(grant.grant_time, None);
        assert!(grant.matches(&config.key()));
    }

    #[test]
    fn grant_with_different_resource_does_not_match_the_key() {
        let config = GrantConfiguration::new(valid_input())
            .unwrap_or_else(|error| panic!("configuration should validate: {error}"));
        let now = timestamp("2025-01-15T09:00:00Z");
        let mut grant = PermissionGrant::from_configuration(&config, now);
        grant.resource_id = ResourceId::new("another-resource")
            .unwrap_or_else(|error| panic!("resource id should validate: {error}"));

        assert!(!grant.matches(&config.key()));
    }
}
