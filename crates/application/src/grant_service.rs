//! Lifecycle operations over an application's permission grants.
//!
//! The remote directory is the sole source of truth; the service holds no
//! cache and performs no retries. Every operation is a single sequence of
//! awaited calls on the caller's task.

use std::sync::Arc;

use chrono::Utc;

use grantwell_core::{ApplicationObjectId, GrantError, GrantResult};
use grantwell_domain::{GrantConfiguration, GrantKey, PermissionGrant};

use crate::PermissionGrantDirectory;

/// Application service reconciling desired grant state with the remote
/// directory.
#[derive(Clone)]
pub struct PermissionGrantService {
    directory: Arc<dyn PermissionGrantDirectory>,
}

impl PermissionGrantService {
    /// Creates a new grant service over the given directory.
    #[must_use]
    pub fn new(directory: Arc<dyn PermissionGrantDirectory>) -> Self {
        Self { directory }
    }

    /// Creates the configured grant, then reads it back.
    ///
    /// The start of the validity window defaults to the clock reading taken
    /// here, at the moment of the call. The follow-up read verifies the
    /// grant is actually present and refreshes its computed fields.
    pub async fn create(&self, config: &GrantConfiguration) -> GrantResult<PermissionGrant> {
        let grant = PermissionGrant::from_configuration(config, Utc::now());

        self.directory
            .create_grant(&grant)
            .await
            .map_err(|source| GrantError::RemoteCreate {
                object_id: config.object_id,
                source,
            })?;

        self.read(&config.key()).await
    }

    /// Reads the one grant identified by the key.
    ///
    /// Fetches the application's collection and correlates by client and
    /// resource; no matching grant is a [`GrantError::NotFound`].
    pub async fn read(&self, key: &GrantKey) -> GrantResult<PermissionGrant> {
        let grants = self.list(key.object_id).await?;

        grants
            .into_iter()
            .find(|grant| grant.matches(key))
            .ok_or_else(|| {
                GrantError::NotFound(format!(
                    "no grant for client {} on resource {} under application {}",
                    key.client_id, key.resource_id, key.object_id
                ))
            })
    }

    /// Fetches every grant recorded under the application object.
    pub async fn list(
        &self,
        object_id: ApplicationObjectId,
    ) -> GrantResult<Vec<PermissionGrant>> {
        self.directory
            .list_grants(object_id)
            .await
            .map_err(|source| GrantError::RemoteRead { object_id, source })
    }

    /// Replaces the application's grants with the configured one.
    ///
    /// This is an explicit two-phase operation, not an in-place update:
    /// phase one deletes the existing grants, phase two recreates from the
    /// new configuration. A phase-two failure leaves the application
    /// without its grant and surfaces as
    /// [`GrantError::ReplaceIncomplete`]; nothing is rolled back.
    pub async fn replace(&self, config: &GrantConfiguration) -> GrantResult<PermissionGrant> {
        self.delete(config.object_id).await?;

        self.create(config)
            .await
            .map_err(|source| GrantError::ReplaceIncomplete {
                object_id: config.object_id,
                source: Box::new(source),
            })
    }

    /// Deletes the grants recorded under the application object.
    pub async fn delete(&self, object_id: ApplicationObjectId) -> GrantResult<()> {
        self.directory
            .delete_grants(object_id)
            .await
            .map_err(|source| GrantError::RemoteDelete { object_id, source })
    }
}
