//! Change sets: all writes of one logical operation.
//!
//! Stores apply the sections in field order inside one transaction, so a
//! moved folder's own row is updated before its descendants are rebased and
//! revocations run before grants.

use serde::Serialize;

use folio_core::types::{ContentId, FolderId, OrgId};
use folio_entity::folder::{FolderItem, FolderPath};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

/// Rebase every item at or below `from` onto `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRewrite {
    /// Old prefix.
    pub from: FolderPath,
    /// New prefix.
    pub to: FolderPath,
}

/// Corrected cache columns for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemCountFix {
    /// Folder to fix.
    pub id: FolderId,
    /// Live number of direct children.
    pub items_count: i32,
    /// Whether a file link exists below.
    pub has_descendant: bool,
}

/// Writes collected by one engine operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    /// New rows.
    pub insert_items: Vec<FolderItem>,
    /// Full-row updates of existing items.
    pub update_items: Vec<FolderItem>,
    /// Batch prefix rewrites of `dir_path`.
    pub path_rewrites: Vec<PathRewrite>,
    /// New `dir_path` of content rows.
    pub content_paths: Vec<(ContentId, FolderPath)>,
    /// Item count repairs.
    pub item_counts: Vec<ItemCountFix>,
    /// Items to soft-delete.
    pub delete_items: Vec<FolderId>,
    /// Share records to remove.
    pub delete_shares: Vec<(FolderId, OrgId)>,
    /// Share records to add.
    pub insert_shares: Vec<SharedFolderRecord>,
    /// Grants to remove.
    pub revoke_authed: Vec<AuthedContentCondition>,
    /// Grants to add; existing natural keys are kept.
    pub grant_authed: Vec<AuthedContentRecord>,
    /// Grants to move from an old content version to a new one.
    pub retarget_authed: Vec<(ContentId, ContentId)>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.insert_items.is_empty()
            && self.update_items.is_empty()
            && self.path_rewrites.is_empty()
            && self.content_paths.is_empty()
            && self.item_counts.is_empty()
            && self.delete_items.is_empty()
            && self.delete_shares.is_empty()
            && self.insert_shares.is_empty()
            && self.revoke_authed.is_empty()
            && self.grant_authed.is_empty()
            && self.retarget_authed.is_empty()
    }

    /// Append every section of `other`.
    pub fn merge(&mut self, other: ChangeSet) {
        self.insert_items.extend(other.insert_items);
        self.update_items.extend(other.update_items);
        self.path_rewrites.extend(other.path_rewrites);
        self.content_paths.extend(other.content_paths);
        self.item_counts.extend(other.item_counts);
        self.delete_items.extend(other.delete_items);
        self.delete_shares.extend(other.delete_shares);
        self.insert_shares.extend(other.insert_shares);
        self.revoke_authed.extend(other.revoke_authed);
        self.grant_authed.extend(other.grant_authed);
        self.retarget_authed.extend(other.retarget_authed);
    }
}
