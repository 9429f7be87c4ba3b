//! Folder sharing between organizations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use folio_cache::{LockCoordinator, keys};
use folio_core::error::{AppError, ErrorCode};
use folio_core::result::AppResult;
use folio_core::traits::directory::OrganizationDirectory;
use folio_core::types::{FolderId, OrgId};
use folio_database::{ChangeSet, FolderStore, ShareStore, Store};
use folio_entity::share::{AuthedContentCondition, SharedFolderRecord};

use super::propagation::{AuthorizationPropagator, grants, group_shares};
use crate::context::Operator;

/// Shares folders with organizations and keeps content grants in step.
#[derive(Debug, Clone)]
pub struct ShareService {
    store: Arc<dyn Store>,
    locks: LockCoordinator,
    directory: Arc<dyn OrganizationDirectory>,
    propagator: Arc<AuthorizationPropagator>,
}

/// Request to set the organizations a set of folders is shared with.
///
/// The org list is the complete target state: organizations not listed
/// lose the share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareFoldersRequest {
    /// Folders to share.
    pub folder_ids: Vec<FolderId>,
    /// Organizations every folder should end up shared with.
    pub org_ids: Vec<OrgId>,
}

/// What changed for one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderShareChange {
    /// The folder.
    pub folder_id: FolderId,
    /// Organizations that gained the share.
    pub added_orgs: Vec<OrgId>,
    /// Organizations that lost the share.
    pub removed_orgs: Vec<OrgId>,
    /// Grants written for the added organizations.
    pub granted: usize,
}

impl ShareService {
    /// Creates a new share service.
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

    /// Make `org_ids` the exact share set of every folder in `folder_ids`.
    pub async fn share_folders(
        &self,
        operator: &Operator,
        req: ShareFoldersRequest,
    ) -> AppResult<Vec<FolderShareChange>> {
        let folder_ids: Vec<FolderId> = dedup(req.folder_ids);
        let requested: BTreeSet<OrgId> = req.org_ids.into_iter().collect();
        if folder_ids.is_empty() {
            return Err(AppError::validation("At least one folder is required"));
        }

        self.check_targets(operator, &requested).await?;

        let lock_keys: Vec<String> = folder_ids.iter().map(keys::folder_lock).collect();
        self.locks
            .with_locks(lock_keys, self.apply_shares(operator, &folder_ids, &requested))
            .await
    }

    /// Organizations each folder is shared with.
    pub async fn list_folder_shares(
        &self,
        folder_ids: &[FolderId],
    ) -> AppResult<HashMap<FolderId, Vec<OrgId>>> {
        let mut shares: HashMap<FolderId, Vec<OrgId>> =
            folder_ids.iter().map(|id| (*id, Vec::new())).collect();
        for (folder_id, orgs) in group_shares(self.store.shared_records(folder_ids).await?) {
            shares.insert(folder_id, orgs.into_iter().collect());
        }
        Ok(shares)
    }

    async fn check_targets(&self, operator: &Operator, requested: &BTreeSet<OrgId>) -> AppResult<()> {
        let scope = self
            .directory
            .headquarters(operator.org_id)
            .await?
            .ok_or_else(|| {
                AppError::coded(
                    ErrorCode::NotHeadquarters,
                    format!("Organization {} may not share folders", operator.org_id),
                )
            })?;

        if let Some(outsider) = requested.iter().find(|org| !scope.allows(**org)) {
            return Err(AppError::coded(
                ErrorCode::UnsupportedRegion,
                format!(
                    "Organization {outsider} is outside the region of {}",
                    operator.org_id
                ),
            ));
        }

        let concrete: Vec<OrgId> = requested.iter().filter(|org| !org.is_all()).copied().collect();
        let exist = self.directory.organizations_exist(&concrete).await?;
        if let Some(unknown) = concrete
            .iter()
            .find(|org| !exist.get(*org).copied().unwrap_or(false))
        {
            return Err(AppError::coded(
                ErrorCode::OrgNotFound,
                format!("Organization {unknown} not found"),
            ));
        }
        Ok(())
    }

    async fn apply_shares(
        &self,
        operator: &Operator,
        folder_ids: &[FolderId],
        requested: &BTreeSet<OrgId>,
    ) -> AppResult<Vec<FolderShareChange>> {
        let folders = self.store.get_items(folder_ids).await?;
        for id in folder_ids {
            match folders.iter().find(|f| f.id == *id) {
                None => return Err(AppError::folder_not_found(id)),
                Some(f) if !f.is_folder() => {
                    return Err(AppError::coded(
                        ErrorCode::NotAFolder,
                        format!("Item {id} is not a folder"),
                    ));
                }
                Some(_) => {}
            }
        }

        let mut current: BTreeMap<FolderId, BTreeSet<OrgId>> =
            group_shares(self.store.shared_records(folder_ids).await?);

        let mut changes = ChangeSet::new();
        let mut report = Vec::with_capacity(folders.len());
        for folder in &folders {
            let existing = current.remove(&folder.id).unwrap_or_default();
            let added: Vec<OrgId> = requested.difference(&existing).copied().collect();
            let removed: Vec<OrgId> = existing.difference(requested).copied().collect();

            if !removed.is_empty() {
                changes
                    .delete_shares
                    .extend(removed.iter().map(|org| (folder.id, *org)));
                changes.revoke_authed.push(AuthedContentCondition {
                    org_ids: removed.clone(),
                    from_folder_ids: vec![folder.id],
                    ..Default::default()
                });
            }

            let mut granted = 0;
            if !added.is_empty() {
                changes.insert_shares.extend(
                    added
                        .iter()
                        .map(|org| SharedFolderRecord::new(folder.id, *org, operator.user_id)),
                );
                let contents = self.propagator.folder_content_set(folder).await?;
                let new_grants = grants(&added, &contents, folder.id, operator.user_id);
                granted = new_grants.len();
                changes.grant_authed.extend(new_grants);
            }

            report.push(FolderShareChange {
                folder_id: folder.id,
                added_orgs: added,
                removed_orgs: removed,
                granted,
            });
        }

        self.store.commit(changes).await?;

        info!(
            operator = %operator.user_id,
            org_id = %operator.org_id,
            folders = report.len(),
            added = report.iter().map(|r| r.added_orgs.len()).sum::<usize>(),
            removed = report.iter().map(|r| r.removed_orgs.len()).sum::<usize>(),
            granted = report.iter().map(|r| r.granted).sum::<usize>(),
            "Folder shares updated"
        );
        Ok(report)
    }
}

fn dedup<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values.dedup();
    values
}
