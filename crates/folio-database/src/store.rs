//! Store traits the engine reads through.
//!
//! Reads go through [`FolderStore`], [`ShareStore`] and [`ContentStore`];
//! every write of one logical operation is collected into a [`ChangeSet`]
//! and applied by [`UnitOfWork::commit`] in a single transaction.

use std::collections::HashMap;

use async_trait::async_trait;

use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, PageRequest, PageResponse};
use folio_entity::content::ContentInfo;
use folio_entity::folder::{FolderCondition, FolderItem};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

use crate::changes::ChangeSet;

/// Live child statistics of a folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildStats {
    /// Number of direct children (folders and links).
    pub items_count: i32,
    /// Whether a file link exists anywhere below the folder.
    pub has_descendant: bool,
}

/// Read access to folder items.
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch live items by id; missing ids are skipped.
    async fn get_items(&self, ids: &[FolderId]) -> AppResult<Vec<FolderItem>>;

    /// All live items matching a condition, folders first, then by name.
    async fn find_items(&self, condition: &FolderCondition) -> AppResult<Vec<FolderItem>>;

    /// One page of live items matching a condition.
    async fn find_items_page(
        &self,
        condition: &FolderCondition,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>>;

    /// Authoritative child statistics for each of `folders`.
    async fn child_stats(&self, folders: &[FolderItem]) -> AppResult<HashMap<FolderId, ChildStats>>;

    /// Fetch a single live item.
    async fn get_item(&self, id: FolderId) -> AppResult<Option<FolderItem>> {
        Ok(self.get_items(&[id]).await?.into_iter().next())
    }
}

/// Read access to share and authorization records.
#[async_trait]
pub trait ShareStore: Send + Sync + std::fmt::Debug + 'static {
    /// Share records of the given folders.
    async fn shared_records(&self, folder_ids: &[FolderId]) -> AppResult<Vec<SharedFolderRecord>>;

    /// Grants matching a condition.
    async fn authed_records(
        &self,
        condition: &AuthedContentCondition,
    ) -> AppResult<Vec<AuthedContentRecord>>;
}

/// Read access to the content directory.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch contents by id; missing ids are skipped.
    async fn get_contents(&self, ids: &[ContentId]) -> AppResult<Vec<ContentInfo>>;

    /// Latest version id of each known content.
    async fn latest_ids(&self, ids: &[ContentId]) -> AppResult<HashMap<ContentId, ContentId>> {
        Ok(self
            .get_contents(ids)
            .await?
            .into_iter()
            .map(|content| (content.id, content.latest_id))
            .collect())
    }
}

/// Atomic application of a change set.
#[async_trait]
pub trait UnitOfWork: Send + Sync + std::fmt::Debug + 'static {
    /// Apply every change or none of them.
    async fn commit(&self, changes: ChangeSet) -> AppResult<()>;
}

/// Everything the engine needs from persistence.
pub trait Store: FolderStore + ShareStore + ContentStore + UnitOfWork {}

impl<T> Store for T where T: FolderStore + ShareStore + ContentStore + UnitOfWork {}
