//! Folder item entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use folio_core::error::{AppError, ErrorCode};
use folio_core::types::{ContentId, FolderId, UserId};

use super::path::FolderPath;

/// Kind of a folder item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "folder_item_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A folder that can hold other items.
    Folder,
    /// A leaf linking to a content item.
    File,
}

/// Who owns a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "folder_owner_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    /// Tree owned by an organization.
    Organization,
    /// Tree owned by a single user.
    Private,
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization => write!(f, "organization"),
            Self::Private => write!(f, "private"),
        }
    }
}

impl FromStr for OwnerType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" | "org" | "1" => Ok(Self::Organization),
            "private" | "user" | "2" => Ok(Self::Private),
            other => Err(AppError::coded(
                ErrorCode::InvalidOwnerType,
                format!("Unknown owner type '{other}'"),
            )),
        }
    }
}

/// Namespace that separate trees never cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "folder_partition", rename_all = "snake_case")]
pub enum Partition {
    /// Lesson plans and teaching materials.
    #[serde(rename = "plans and materials")]
    PlansAndMaterials,
    /// Uploaded media assets.
    #[serde(rename = "assets")]
    Assets,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlansAndMaterials => write!(f, "plans and materials"),
            Self::Assets => write!(f, "assets"),
        }
    }
}

impl FromStr for Partition {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plans and materials" | "plans_and_materials" => Ok(Self::PlansAndMaterials),
            "assets" => Ok(Self::Assets),
            other => Err(AppError::coded(
                ErrorCode::InvalidPartition,
                format!("Unknown partition '{other}'"),
            )),
        }
    }
}

/// Identity of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeScope {
    /// Owner kind.
    pub owner_type: OwnerType,
    /// Owning organization or user.
    pub owner: Uuid,
    /// Partition of the tree.
    pub partition: Partition,
}

/// A node in a folder tree: a folder or a link to a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FolderItem {
    /// Unique item identifier.
    pub id: FolderId,
    /// Folder or file link.
    pub item_type: ItemType,
    /// Owner kind of the tree.
    pub owner_type: OwnerType,
    /// Owning organization or user.
    pub owner: Uuid,
    /// Partition of the tree.
    pub partition: Partition,
    /// Direct parent, [`FolderId::ROOT`] at tree-top.
    pub parent_id: FolderId,
    /// Linked content for file items.
    pub link: Option<ContentId>,
    /// Materialized ancestor path.
    pub dir_path: FolderPath,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Search keywords.
    pub keywords: Vec<String>,
    /// Thumbnail resource id.
    pub thumbnail: String,
    /// Cached number of direct children.
    pub items_count: i32,
    /// Whether any file link lies somewhere below this folder.
    pub has_descendant: bool,
    /// Creating user.
    pub creator: UserId,
    /// Last editing user.
    pub editor: Option<UserId>,
    /// Creation time.
    pub create_at: DateTime<Utc>,
    /// Last update time.
    pub update_at: DateTime<Utc>,
    /// Soft-delete tombstone.
    pub delete_at: Option<DateTime<Utc>>,
}

impl FolderItem {
    /// Build a new, not yet persisted, item.
    pub fn new(
        item_type: ItemType,
        scope: TreeScope,
        dir_path: FolderPath,
        name: impl Into<String>,
        creator: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FolderId::new(),
            item_type,
            owner_type: scope.owner_type,
            owner: scope.owner,
            partition: scope.partition,
            parent_id: dir_path.parent_id(),
            link: None,
            dir_path,
            name: name.into(),
            description: String::new(),
            keywords: Vec::new(),
            thumbnail: String::new(),
            items_count: 0,
            has_descendant: false,
            creator,
            editor: None,
            create_at: now,
            update_at: now,
            delete_at: None,
        }
    }

    /// Path of the items inside this one.
    pub fn children_path(&self) -> FolderPath {
        self.dir_path.child(self.id)
    }

    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    /// The tree this item belongs to.
    pub fn scope(&self) -> TreeScope {
        TreeScope {
            owner_type: self.owner_type,
            owner: self.owner,
            partition: self.partition,
        }
    }

    /// Ids of this item's ancestors, root-most first.
    pub fn ancestor_ids(&self) -> Vec<FolderId> {
        self.dir_path.ancestor_ids()
    }

    /// Place the item under a new parent path.
    pub fn relocate(&mut self, dir_path: FolderPath) {
        self.parent_id = dir_path.parent_id();
        self.dir_path = dir_path;
        self.update_at = Utc::now();
    }
}
