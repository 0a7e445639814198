//! Port to the remote permission grant directory.

use async_trait::async_trait;
use grantwell_core::{ApplicationObjectId, DirectoryResult};
use grantwell_domain::PermissionGrant;

/// Remote collection of OAuth2 permission grants, keyed by the owning
/// application object.
///
/// Infrastructure provides the Azure AD Graph implementation and an
/// in-memory one for rehearsals and tests.
#[async_trait]
pub trait PermissionGrantDirectory: Send + Sync {
    /// Records a new grant in the application's collection.
    async fn create_grant(&self, grant: &PermissionGrant) -> DirectoryResult<()>;

    /// Fetches every grant recorded under the application object.
    async fn list_grants(
        &self,
        object_id: ApplicationObjectId,
    ) -> DirectoryResult<Vec<PermissionGrant>>;

    /// Removes the grants recorded under the application object.
    ///
    /// The remote contract keys deletion solely on the object ID: every
    /// grant the application object owns is removed, not a single one.
    async fn delete_grants(&self, object_id: ApplicationObjectId) -> DirectoryResult<()>;
}
