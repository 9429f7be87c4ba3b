//! Direct content authorization and version-bump migration.

use std::sync::Arc;

use tracing::info;

use folio_cache::{LockCoordinator, keys};
use folio_core::error::{AppError, ErrorCode};
use folio_core::result::AppResult;
use folio_core::traits::directory::OrganizationDirectory;
use folio_core::types::{ContentId, FolderId, OrgId};
use folio_database::{ChangeSet, ShareStore, Store, UnitOfWork};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord};

use super::propagation::{AuthorizationPropagator, grants};
use crate::context::Operator;

/// Grants contents to organizations outside of any folder share.
///
/// Direct grants are attributed to [`FolderId::ROOT`], so folder share
/// changes never touch them.
#[derive(Debug, Clone)]
pub struct AuthedContentService {
    store: Arc<dyn Store>,
    locks: LockCoordinator,
    directory: Arc<dyn OrganizationDirectory>,
    propagator: Arc<AuthorizationPropagator>,
}

impl AuthedContentService {
    /// Creates a new authorization service.
    pub fn new(
        store: Arc<dyn Store>,
        locks: LockCoordinator,
        directory: Arc<dyn OrganizationDirectory>,
        propagator: Arc<AuthorizationPropagator>,
    ) -> Self {
        Self {
            store,
            locks,
            directory,
            propagator,
        }
    }

    /// Authorize `org` on `content_ids` and, for plans, their sub-contents.
    ///
    /// Returns the number of contents the organization is authorized on
    /// after expansion.
    pub async fn add(
        &self,
        operator: &Operator,
        org: OrgId,
        content_ids: &[ContentId],
    ) -> AppResult<usize> {
        if !org.is_all() {
            let exist = self.directory.organizations_exist(&[org]).await?;
            if !exist.get(&org).copied().unwrap_or(false) {
                return Err(AppError::coded(
                    ErrorCode::OrgNotFound,
                    format!("Organization {org} not found"),
                ));
            }
        }

        self.locks
            .with_lock(keys::org_lock(org), async {
                let latest = self.propagator.resolver().resolve_latest(content_ids).await?;
                if let Some(missing) = latest.missing().first() {
                    return Err(AppError::coded(
                        ErrorCode::ContentNotFound,
                        format!("Content {missing} not found"),
                    ));
                }

                let contents = self.propagator.content_set(content_ids).await?;
                let mut changes = ChangeSet::new();
                changes.grant_authed =
                    grants([&org], &contents, FolderId::ROOT, operator.user_id);
                self.store.commit(changes).await?;

                info!(
                    operator = %operator.user_id,
                    org_id = %org,
                    contents = contents.len(),
                    "Contents authorized"
                );
                Ok(contents.len())
            })
            .await
    }

    /// Withdraw direct grants of `content_ids` (plans expanded) from `org`.
    ///
    /// Grants that come from folder shares stay in place.
    pub async fn remove(&self, org: OrgId, content_ids: &[ContentId]) -> AppResult<usize> {
        self.locks
            .with_lock(keys::org_lock(org), async {
                let contents = self.propagator.content_set(content_ids).await?;
                if contents.is_empty() {
                    return Ok(0);
                }

                let mut changes = ChangeSet::new();
                changes.revoke_authed.push(AuthedContentCondition {
                    org_ids: vec![org],
                    content_ids: contents.iter().copied().collect(),
                    from_folder_ids: vec![FolderId::ROOT],
                });
                self.store.commit(changes).await?;

                info!(org_id = %org, contents = contents.len(), "Content authorization removed");
                Ok(contents.len())
            })
            .await
    }

    /// Grants matching `condition`.
    ///
    /// Content ids in the condition are resolved to their latest version
    /// first, since grants are only ever stored against latest ids.
    pub async fn list(&self, condition: &AuthedContentCondition) -> AppResult<Vec<AuthedContentRecord>> {
        let mut condition = condition.clone();
        if !condition.content_ids.is_empty() {
            let latest = self
                .propagator
                .resolver()
                .resolve_latest(&condition.content_ids)
                .await?;
            if latest.is_empty() {
                return Ok(Vec::new());
            }
            condition.content_ids = latest.latest_ids();
        }
        self.store.authed_records(&condition).await
    }

    /// Move every grant on `from` to `to` after a version bump.
    ///
    /// Grants already present on `to` under the same organization and folder
    /// absorb the old ones. Returns the number of grants that were on `from`.
    pub async fn migrate_version(&self, from: ContentId, to: ContentId) -> AppResult<usize> {
        if from == to {
            return Ok(0);
        }
        let known = self.propagator.resolver().resolve_latest(&[from, to]).await?;
        if let Some(missing) = known.missing().first() {
            return Err(AppError::coded(
                ErrorCode::ContentNotFound,
                format!("Content {missing} not found"),
            ));
        }

        let existing = self
            .store
            .authed_records(&AuthedContentCondition {
                content_ids: vec![from],
                ..Default::default()
            })
            .await?;
        if existing.is_empty() {
            return Ok(0);
        }

        let mut changes = ChangeSet::new();
        changes.retarget_authed.push((from, to));
        self.store.commit(changes).await?;

        info!(%from, %to, grants = existing.len(), "Grants migrated to new version");
        Ok(existing.len())
    }
}
