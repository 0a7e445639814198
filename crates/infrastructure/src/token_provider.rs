//! Bearer-token acquisition for the Graph adapter.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use grantwell_core::{DirectoryError, DirectoryResult};

/// Supplies bearer tokens for calls against the grant directory.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a token valid for the next call.
    async fn access_token(&self) -> DirectoryResult<String>;
}

/// Provider returning one fixed, pre-acquired token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider around the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> DirectoryResult<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// True when the token is expired or expires within the grace period.
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Provider running the OAuth2 client-credentials flow against Azure AD.
///
/// Tokens are cached and refreshed once they fall inside a five-minute
/// expiry grace window. Caching is not a retry: each directory call still
/// performs at most one token request.
pub struct ClientCredentialsTokenProvider {
    http_client: reqwest::Client,
    login_url: String,
    graph_url: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cached_token: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

impl ClientCredentialsTokenProvider {
    /// Creates a provider for the given tenant and client credentials.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        login_url: impl Into<String>,
        graph_url: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            login_url: trim_url(login_url.into()),
            graph_url: trim_url(graph_url.into()),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached_token: RwLock::new(None),
            grace_period: Duration::minutes(5),
        }
    }

    async fn acquire_token(&self) -> DirectoryResult<CachedToken> {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url, self.tenant_id
        );
        let scope = format!("{}/.default", self.graph_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|error| DirectoryError::Auth(format!("token request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Auth(format!(
                "token request returned status {}: {body}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|error| {
            DirectoryError::Auth(format!("failed to parse token response: {error}"))
        })?;

        let expires_at = Utc::now() + Duration::seconds(token_response.expires_in);
        debug!(tenant_id = %self.tenant_id, expires_at = %expires_at, "acquired access token");

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ClientCredentialsTokenProvider {
    async fn access_token(&self) -> DirectoryResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(token) = cache.as_ref() {
                if !token.is_expired(self.grace_period) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let new_token = self.acquire_token().await?;
        let access_token = new_token.access_token.clone();
        *self.cached_token.write().await = Some(new_token);
        Ok(access_token)
    }
}

fn trim_url(value: String) -> String {
    value.trim_end_matches('/').to_owned()
}
