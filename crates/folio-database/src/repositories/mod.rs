//! PostgreSQL repositories and the transactional store built on them.

pub mod content;
pub mod folder;
pub mod share;

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, PageRequest, PageResponse};
use folio_entity::content::ContentInfo;
use folio_entity::folder::{FolderCondition, FolderItem};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

use crate::changes::ChangeSet;
use crate::store::{ChildStats, ContentStore, FolderStore, ShareStore, UnitOfWork};

pub use content::ContentRepository;
pub use folder::FolderRepository;
pub use share::ShareRepository;

/// Store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    folders: FolderRepository,
    shares: ShareRepository,
    contents: ContentRepository,
}

impl PgStore {
    /// Create a store over a pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            folders: FolderRepository::new(pool.clone()),
            shares: ShareRepository::new(pool.clone()),
            contents: ContentRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl FolderStore for PgStore {
    async fn get_items(&self, ids: &[FolderId]) -> AppResult<Vec<FolderItem>> {
        self.folders.find_by_ids(ids).await
    }

    async fn find_items(&self, condition: &FolderCondition) -> AppResult<Vec<FolderItem>> {
        self.folders.search(condition).await
    }

    async fn find_items_page(
        &self,
        condition: &FolderCondition,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>> {
        self.folders.search_page(condition, page).await
    }

    async fn child_stats(&self, folders: &[FolderItem]) -> AppResult<HashMap<FolderId, ChildStats>> {
        self.folders.child_stats(folders).await
    }
}

#[async_trait]
impl ShareStore for PgStore {
    async fn shared_records(&self, folder_ids: &[FolderId]) -> AppResult<Vec<SharedFolderRecord>> {
        self.shares.find_by_folders(folder_ids).await
    }

    async fn authed_records(
        &self,
        condition: &AuthedContentCondition,
    ) -> AppResult<Vec<AuthedContentRecord>> {
        self.shares.find_authed(condition).await
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn get_contents(&self, ids: &[ContentId]) -> AppResult<Vec<ContentInfo>> {
        self.contents.find_by_ids(ids).await
    }
}

#[async_trait]
impl UnitOfWork for PgStore {
    async fn commit(&self, changes: ChangeSet) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        FolderRepository::insert(&mut tx, &changes.insert_items).await?;
        FolderRepository::update(&mut tx, &changes.update_items).await?;
        let mut rewritten = 0;
        for rewrite in &changes.path_rewrites {
            rewritten += FolderRepository::rewrite_paths(&mut tx, rewrite).await?;
        }
        ContentRepository::update_paths(&mut tx, &changes.content_paths).await?;
        FolderRepository::update_counts(&mut tx, &changes.item_counts).await?;
        FolderRepository::soft_delete(&mut tx, &changes.delete_items).await?;
        ShareRepository::delete_shares(&mut tx, &changes.delete_shares).await?;
        ShareRepository::insert_shares(&mut tx, &changes.insert_shares).await?;
        for condition in &changes.revoke_authed {
            ShareRepository::revoke(&mut tx, condition).await?;
        }
        ShareRepository::grant(&mut tx, &changes.grant_authed).await?;
        for (from, to) in &changes.retarget_authed {
            ShareRepository::retarget(&mut tx, *from, *to).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        debug!(
            inserted = changes.insert_items.len(),
            updated = changes.update_items.len(),
            rewritten,
            granted = changes.grant_authed.len(),
            "Change set committed"
        );
        Ok(())
    }
}
