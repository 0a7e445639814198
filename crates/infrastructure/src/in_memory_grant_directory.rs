//! In-memory grant directory for rehearsals and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use grantwell_application::PermissionGrantDirectory;
use grantwell_core::{ApplicationObjectId, DirectoryError, DirectoryResult};
use grantwell_domain::PermissionGrant;

/// Grant directory held in process memory.
///
/// Mirrors the Graph contract closely enough for lifecycle rehearsals:
/// creation stamps the computed `grant_time`, deletion removes the whole
/// collection of the application object and reports 404 when nothing is
/// recorded.
#[derive(Debug, Default)]
pub struct InMemoryGrantDirectory {
    grants: RwLock<HashMap<ApplicationObjectId, Vec<PermissionGrant>>>,
}

impl InMemoryGrantDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grants: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PermissionGrantDirectory for InMemoryGrantDirectory {
    async fn create_grant(&self, grant: &PermissionGrant) -> DirectoryResult<()> {
        let mut recorded = grant.clone();
        recorded.grant_time = Some(Utc::now());

        self.grants
            .write()
            .await
            .entry(grant.object_id)
            .or_default()
            .push(recorded);
        Ok(())
    }

    async fn list_grants(
        &self,
        object_id: ApplicationObjectId,
    ) -> DirectoryResult<Vec<PermissionGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .get(&object_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_grants(&self, object_id: ApplicationObjectId) -> DirectoryResult<()> {
        if self.grants.write().await.remove(&object_id).is_none() {
            return Err(DirectoryError::UnexpectedStatus {
                status: 404,
                message: format!("no grants recorded for application {object_id}"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use grantwell_application::PermissionGrantDirectory;
    use grantwell_core::DirectoryError;
    use grantwell_domain::{GrantConfiguration, GrantConfigurationInput, PermissionGrant};

    use super::InMemoryGrantDirectory;

    fn sample_grant() -> PermissionGrant {
        let config = GrantConfiguration::new(GrantConfigurationInput {
            client_id: "5e8e1a10-1b0e-4a6e-9c7f-0f0d5a3f8b21".to_owned(),
            object_id: "9b2f3c44-7d61-4f2e-8a55-6a1c9f0e2d33".to_owned(),
            resource_id: "00000002-0000-0000-c000-000000000000".to_owned(),
            consent_type: "AllPrincipal".to_owned(),
            scope: Some("User.Read".to_owned()),
            start_time: None,
            expiry_time: None,
        })
        .unwrap_or_else(|error| panic!("test configuration should validate: {error}"));

        PermissionGrant::from_configuration(&config, chrono::Utc::now())
    }

    #[tokio::test]
    async fn create_stamps_grant_time_and_list_returns_it() {
        let directory = InMemoryGrantDirectory::new();
        let grant = sample_grant();

        directory
            .create_grant(&grant)
            .await
            .unwrap_or_else(|error| panic!("create should succeed: {error}"));

        let listed = directory
            .list_grants(grant.object_id)
            .await
            .unwrap_or_else(|error| panic!("list should succeed: {error}"));

        assert_eq!(listed.len(), 1);
        assert!(listed[0].grant_time.is_some());
        assert_eq!(listed[0].client_id, grant.client_id);
    }

    #[tokio::test]
    async fn delete_removes_the_whole_collection() {
        let directory = InMemoryGrantDirectory::new();
        let grant = sample_grant();

        directory
            .create_grant(&grant)
            .await
            .unwrap_or_else(|error| panic!("create should succeed: {error}"));
        directory
            .create_grant(&grant)
            .await
            .unwrap_or_else(|error| panic!("create should succeed: {error}"));

        directory
            .delete_grants(grant.object_id)
            .await
            .unwrap_or_else(|error| panic!("delete should succeed: {error}"));

        let listed = directory
            .list_grants(grant.object_id)
            .await
            .unwrap_or_else(|error| panic!("list should succeed: {error}"));
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn delete_of_an_empty_collection_reports_404() {
        let directory = InMemoryGrantDirectory::new();
        let grant = sample_grant();

        let result = directory.delete_grants(grant.object_id).await;

        assert!(matches!(
            result,
            Err(DirectoryError::UnexpectedStatus { status: 404, .. })
        ));
    }
}
