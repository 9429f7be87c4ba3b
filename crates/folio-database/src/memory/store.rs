//! In-memory implementation of the store traits.
//!
//! Commits copy the tables, apply the change set to the copy and swap it in
//! only when every section applied cleanly, which gives the same
//! all-or-nothing behaviour as a database transaction.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, PageRequest, PageResponse};
use folio_entity::content::ContentInfo;
use folio_entity::folder::{FolderCondition, FolderItem, ItemType};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

use crate::changes::ChangeSet;
use crate::store::{ChildStats, ContentStore, FolderStore, ShareStore, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    items: HashMap<FolderId, FolderItem>,
    shares: Vec<SharedFolderRecord>,
    authed: Vec<AuthedContentRecord>,
    contents: HashMap<ContentId, ContentInfo>,
}

impl Tables {
    fn apply(&mut self, changes: ChangeSet) -> AppResult<()> {
        for item in changes.insert_items {
            if self.items.contains_key(&item.id) {
                return Err(AppError::database(format!(
                    "Duplicate folder item id {}",
                    item.id
                )));
            }
            self.items.insert(item.id, item);
        }

        for item in changes.update_items {
            match self.items.get_mut(&item.id) {
                Some(existing) if existing.delete_at.is_none() => update_columns(existing, item),
                _ => {
                    return Err(AppError::database(format!(
                        "Cannot update missing folder item {}",
                        item.id
                    )));
                }
            }
        }

        for rewrite in changes.path_rewrites {
            for item in self.items.values_mut() {
                if let Some(path) = item.dir_path.rebase(&rewrite.from, &rewrite.to) {
                    item.dir_path = path;
                    item.update_at = Utc::now();
                }
            }
        }

        for (content_id, path) in changes.content_paths {
            if let Some(content) = self.contents.get_mut(&content_id) {
                content.dir_path = path;
            }
        }

        for fix in changes.item_counts {
            if let Some(item) = self.items.get_mut(&fix.id) {
                item.items_count = fix.items_count;
                item.has_descendant = fix.has_descendant;
            }
        }

        let now = Utc::now();
        for id in changes.delete_items {
            if let Some(item) = self.items.get_mut(&id) {
                item.delete_at = Some(now);
            }
        }

        for (folder_id, org_id) in changes.delete_shares {
            self.shares
                .retain(|r| !(r.folder_id == folder_id && r.org_id == org_id));
        }

        for record in changes.insert_shares {
            let exists = self
                .shares
                .iter()
                .any(|r| r.folder_id == record.folder_id && r.org_id == record.org_id);
            if !exists {
                self.shares.push(record);
            }
        }

        for condition in changes.revoke_authed {
            if condition.is_unrestricted() {
                return Err(AppError::database(
                    "Refusing to revoke grants with an unrestricted condition",
                ));
            }
            self.authed.retain(|r| !condition.matches(r));
        }

        for record in changes.grant_authed {
            let key = record.key();
            if !self.authed.iter().any(|r| r.key() == key) {
                self.authed.push(record);
            }
        }

        for (from, to) in changes.retarget_authed {
            let mut moved = Vec::new();
            self.authed.retain(|r| {
                if r.content_id == from {
                    moved.push(r.clone());
                    false
                } else {
                    true
                }
            });
            for mut record in moved {
                record.content_id = to;
                let key = record.key();
                if !self.authed.iter().any(|r| r.key() == key) {
                    self.authed.push(record);
                }
            }
        }

        Ok(())
    }

    fn live_items<'a>(
        &'a self,
        condition: &'a FolderCondition,
    ) -> impl Iterator<Item = &'a FolderItem> + 'a {
        self.items.values().filter(move |item| condition.matches(item))
    }
}

/// Store keeping every table in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a content row.
    pub async fn put_content(&self, content: ContentInfo) {
        self.tables
            .write()
            .await
            .contents
            .insert(content.id, content);
    }

    /// Make the next commit fail after it has been applied to the working copy.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Every stored grant, in insertion order.
    pub async fn all_authed(&self) -> Vec<AuthedContentRecord> {
        self.tables.read().await.authed.clone()
    }

    /// Every stored share record, in insertion order.
    pub async fn all_shares(&self) -> Vec<SharedFolderRecord> {
        self.tables.read().await.shares.clone()
    }
}

fn sort_items(items: &mut [FolderItem]) {
    items.sort_by(|a, b| {
        let rank = |item: &FolderItem| match item.item_type {
            ItemType::Folder => 0,
            ItemType::File => 1,
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Copies the columns `FolderRepository::update` writes; counts, identity
/// and creation data stay as stored.
fn update_columns(existing: &mut FolderItem, item: FolderItem) {
    existing.parent_id = item.parent_id;
    existing.dir_path = item.dir_path;
    existing.name = item.name;
    existing.description = item.description;
    existing.keywords = item.keywords;
    existing.thumbnail = item.thumbnail;
    existing.editor = item.editor;
    existing.update_at = item.update_at;
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn get_items(&self, ids: &[FolderId]) -> AppResult<Vec<FolderItem>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.items.get(id))
            .filter(|item| item.delete_at.is_none())
            .cloned()
            .collect())
    }

    async fn find_items(&self, condition: &FolderCondition) -> AppResult<Vec<FolderItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<FolderItem> = tables.live_items(condition).cloned().collect();
        sort_items(&mut items);
        Ok(items)
    }

    async fn find_items_page(
        &self,
        condition: &FolderCondition,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>> {
        let items = self.find_items(condition).await?;
        Ok(PageResponse::slice(items, page))
    }

    async fn child_stats(&self, folders: &[FolderItem]) -> AppResult<HashMap<FolderId, ChildStats>> {
        let tables = self.tables.read().await;
        let mut stats = HashMap::with_capacity(folders.len());
        for folder in folders {
            let children_path = folder.children_path();
            let mut entry = ChildStats::default();
            for item in tables.items.values().filter(|i| i.delete_at.is_none()) {
                if item.parent_id == folder.id {
                    entry.items_count += 1;
                }
                if item.item_type == ItemType::File && children_path.contains(&item.dir_path) {
                    entry.has_descendant = true;
                }
            }
            stats.insert(folder.id, entry);
        }
        Ok(stats)
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn shared_records(&self, folder_ids: &[FolderId]) -> AppResult<Vec<SharedFolderRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shares
            .iter()
            .filter(|r| folder_ids.contains(&r.folder_id))
            .cloned()
            .collect())
    }

    async fn authed_records(
        &self,
        condition: &AuthedContentCondition,
    ) -> AppResult<Vec<AuthedContentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .authed
            .iter()
            .filter(|r| condition.matches(r))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_contents(&self, ids: &[ContentId]) -> AppResult<Vec<ContentInfo>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.contents.get(id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn commit(&self, changes: ChangeSet) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;
        let mut working = tables.clone();
        working.apply(changes)?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::database("Injected commit failure"));
        }
        *tables = working;
        debug!(items = tables.items.len(), grants = tables.authed.len(), "Committed change set");
        Ok(())
    }
}
