//! Azure AD Graph adapter for the permission grant directory.
//!
//! Wire contract: tenant-scoped `oauth2PermissionGrants` collection of the
//! AAD Graph API, `api-version=1.6`. Every operation expects exactly
//! HTTP 200; any other status, 2xx included, is surfaced as an unexpected
//! status. One attempt per call, no retries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use grantwell_application::PermissionGrantDirectory;
use grantwell_core::{ApplicationObjectId, DirectoryError, DirectoryResult, GrantError};
use grantwell_domain::{ClientId, ConsentType, PermissionGrant, ResourceId, Scope};

use crate::AccessTokenProvider;

const API_VERSION: &str = "1.6";

/// Grant directory backed by the Azure AD Graph API.
pub struct GraphGrantDirectory {
    http_client: reqwest::Client,
    base_url: String,
    tenant_id: String,
    token_provider: Arc<dyn AccessTokenProvider>,
}

impl GraphGrantDirectory {
    /// Creates a directory for the given tenant.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        tenant_id: impl Into<String>,
        token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            tenant_id: tenant_id.into(),
            token_provider,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}/oauth2PermissionGrants", self.base_url, self.tenant_id)
    }

    fn follow_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_owned();
        }
        let separator = if link.contains('?') { '&' } else { '?' };
        format!(
            "{}/{}/{link}{separator}api-version={API_VERSION}",
            self.base_url, self.tenant_id
        )
    }

    /// Sends the request and enforces the exact-200 success contract.
    async fn send(&self, builder: reqwest::RequestBuilder) -> DirectoryResult<reqwest::Response> {
        let token = self.token_provider.access_token().await?;
        let response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| DirectoryError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(DirectoryError::UnexpectedStatus {
                status,
                message: odata_error_message(&body),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl PermissionGrantDirectory for GraphGrantDirectory {
    async fn create_grant(&self, grant: &PermissionGrant) -> DirectoryResult<()> {
        debug!(object_id = %grant.object_id, "creating permission grant");
        let request = self
            .http_client
            .post(self.collection_url())
            .query(&[("api-version", API_VERSION)])
            .json(&OAuth2PermissionGrantDto::from_domain(grant));

        self.send(request).await?;
        Ok(())
    }

    async fn list_grants(
        &self,
        object_id: ApplicationObjectId,
    ) -> DirectoryResult<Vec<PermissionGrant>> {
        debug!(object_id = %object_id, "listing permission grants");
        let filter = format!("objectId eq '{object_id}'");
        let mut request = self
            .http_client
            .get(self.collection_url())
            .query(&[("api-version", API_VERSION), ("$filter", filter.as_str())]);

        let mut grants = Vec::new();
        loop {
            let response = self.send(request).await?;
            let page: GrantCollectionDto = response
                .json()
                .await
                .map_err(|error| DirectoryError::Decode(error.to_string()))?;

            for dto in page.value {
                grants.push(dto.try_into_domain()?);
            }

            match page.next_link {
                Some(link) => {
                    debug!(object_id = %object_id, "following grant collection page link");
                    request = self.http_client.get(self.follow_url(link.as_str()));
                }
                None => break,
            }
        }

        Ok(grants)
    }

    async fn delete_grants(&self, object_id: ApplicationObjectId) -> DirectoryResult<()> {
        debug!(object_id = %object_id, "deleting permission grants");
        let request = self
            .http_client
            .delete(format!("{}/{object_id}", self.collection_url()))
            .query(&[("api-version", API_VERSION)]);

        self.send(request).await?;
        Ok(())
    }
}

/// Wire shape of one grant in the AAD Graph collection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OAuth2PermissionGrantDto {
    client_id: Uuid,
    object_id: Uuid,
    resource_id: String,
    consent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    start_time: DateTime<Utc>,
    expiry_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grant_time: Option<DateTime<Utc>>,
}

impl OAuth2PermissionGrantDto {
    fn from_domain(grant: &PermissionGrant) -> Self {
        Self {
            client_id: grant.client_id.as_uuid(),
            object_id: grant.object_id.as_uuid(),
            resource_id: grant.resource_id.as_str().to_owned(),
            consent_type: grant.consent_type.as_str().to_owned(),
            scope: grant.scope.as_ref().map(|scope| scope.as_str().to_owned()),
            start_time: grant.start_time,
            expiry_time: grant.expiry_time,
            grant_time: grant.grant_time,
        }
    }

    fn try_into_domain(self) -> DirectoryResult<PermissionGrant> {
        Ok(PermissionGrant {
            client_id: ClientId::from_uuid(self.client_id),
            object_id: ApplicationObjectId::from_uuid(self.object_id),
            resource_id: ResourceId::new(self.resource_id).map_err(decode)?,
            consent_type: ConsentType::parse(self.consent_type.as_str()).map_err(decode)?,
            scope: self.scope.map(Scope::new).transpose().map_err(decode)?,
            start_time: self.start_time,
            expiry_time: self.expiry_time,
            grant_time: self.grant_time,
        })
    }
}

fn decode(error: GrantError) -> DirectoryError {
    DirectoryError::Decode(error.to_string())
}

/// OData collection envelope of the AAD Graph API.
#[derive(Debug, Deserialize)]
struct GrantCollectionDto {
    #[serde(default)]
    value: Vec<OAuth2PermissionGrantDto>,
    #[serde(rename = "odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ODataErrorEnvelope {
    #[serde(rename = "odata.error")]
    error: ODataErrorDto,
}

#[derive(Debug, Deserialize)]
struct ODataErrorDto {
    code: String,
    message: ODataErrorMessageDto,
}

#[derive(Debug, Deserialize)]
struct ODataErrorMessageDto {
    value: String,
}

/// Extracts the OData error message from a failure body, falling back to
/// the raw body.
fn odata_error_message(body: &str) -> String {
    match serde_json::from_str::<ODataErrorEnvelope>(body) {
        Ok(envelope) => format!("{}: {}", envelope.error.code, envelope.error.message.value),
        Err(_) if body.trim().is_empty() => "<empty response body>".to_owned(),
        Err(_) => body.to_owned(),
    }
}
