//! Folder tree structures for hierarchical display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use folio_core::types::FolderId;

use super::model::FolderItem;
use super::path::FolderPath;

/// A node in a folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID.
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Materialized path of the folder.
    pub dir_path: FolderPath,
    /// Cached number of direct children (folders and links).
    pub items_count: i32,
    /// Child folder nodes, sorted by name.
    pub children: Vec<FolderNode>,
}

/// A complete folder tree of one scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderTree {
    /// Top-level folders.
    pub roots: Vec<FolderNode>,
    /// Total number of folders in the tree.
    pub total_folders: u64,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty() -> Self {
        Self {
            roots: Vec::new(),
            total_folders: 0,
        }
    }

    /// Assemble a tree from a flat list of folders of a single scope.
    ///
    /// Folders whose parent is missing from the list are attached at the top.
    pub fn build(folders: Vec<FolderItem>) -> Self {
        let total_folders = folders.len() as u64;
        let known: Vec<FolderId> = folders.iter().map(|f| f.id).collect();
        let mut by_parent: HashMap<FolderId, Vec<FolderItem>> = HashMap::new();
        for folder in folders {
            let parent = if known.contains(&folder.parent_id) {
                folder.parent_id
            } else {
                FolderId::ROOT
            };
            by_parent.entry(parent).or_default().push(folder);
        }
        let roots = Self::assemble(FolderId::ROOT, &mut by_parent);
        Self {
            roots,
            total_folders,
        }
    }

    fn assemble(
        parent: FolderId,
        by_parent: &mut HashMap<FolderId, Vec<FolderItem>>,
    ) -> Vec<FolderNode> {
        let mut children = by_parent.remove(&parent).unwrap_or_default();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
            .into_iter()
            .map(|folder| FolderNode {
                id: folder.id,
                children: Self::assemble(folder.id, by_parent),
                name: folder.name,
                dir_path: folder.dir_path,
                items_count: folder.items_count,
            })
            .collect()
    }
}
