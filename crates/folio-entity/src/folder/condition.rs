//! Search condition over folder items.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use folio_core::types::{ContentId, FolderId};

use super::model::{FolderItem, ItemType, OwnerType, Partition};
use super::path::FolderPath;

/// Filter for folder item queries. Unset fields do not restrict the result;
/// soft-deleted rows never match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderCondition {
    /// Restrict to these ids.
    pub ids: Vec<FolderId>,
    /// Direct parent.
    pub parent_id: Option<FolderId>,
    /// Exact, case-sensitive name.
    pub name: Option<String>,
    /// Substring of the name.
    pub name_like: Option<String>,
    /// Owner kind.
    pub owner_type: Option<OwnerType>,
    /// Owner.
    pub owner: Option<Uuid>,
    /// Partition.
    pub partition: Option<Partition>,
    /// Folder or file links only.
    pub item_type: Option<ItemType>,
    /// Exact `dir_path`.
    pub dir_path: Option<FolderPath>,
    /// Everything at or below this path.
    pub under_path: Option<FolderPath>,
    /// File links pointing at these contents.
    pub links: Vec<ContentId>,
}

impl FolderCondition {
    /// Children of `parent`.
    pub fn children_of(parent: FolderId) -> Self {
        Self {
            parent_id: Some(parent),
            ..Self::default()
        }
    }

    /// Every item at or below `path`.
    pub fn under(path: FolderPath) -> Self {
        Self {
            under_path: Some(path),
            ..Self::default()
        }
    }

    /// In-process evaluation, mirroring the SQL filter of the Postgres store.
    pub fn matches(&self, item: &FolderItem) -> bool {
        if item.delete_at.is_some() {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&item.id) {
            return false;
        }
        if self.parent_id.is_some_and(|parent| parent != item.parent_id) {
            return false;
        }
        if self.name.as_ref().is_some_and(|name| *name != item.name) {
            return false;
        }
        if self
            .name_like
            .as_ref()
            .is_some_and(|fragment| !item.name.contains(fragment.as_str()))
        {
            return false;
        }
        if self.owner_type.is_some_and(|t| t != item.owner_type) {
            return false;
        }
        if self.owner.is_some_and(|owner| owner != item.owner) {
            return false;
        }
        if self.partition.is_some_and(|p| p != item.partition) {
            return false;
        }
        if self.item_type.is_some_and(|t| t != item.item_type) {
            return false;
        }
        if self.dir_path.as_ref().is_some_and(|p| *p != item.dir_path) {
            return false;
        }
        if self
            .under_path
            .as_ref()
            .is_some_and(|p| !p.contains(&item.dir_path))
        {
            return false;
        }
        if !self.links.is_empty() && !item.link.is_some_and(|link| self.links.contains(&link)) {
            return false;
        }
        true
    }
}
