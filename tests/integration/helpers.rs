//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use folio_cache::memory::MemoryCacheProvider;
use folio_core::config::LockConfig;
use folio_core::config::cache::MemoryCacheConfig;
use folio_core::traits::directory::RegionScope;
use folio_core::types::{ContentId, FolderId, OrgId, UserId};
use folio_database::MemoryStore;
use folio_entity::content::{ContentInfo, ContentType};
use folio_entity::folder::{FolderItem, FolderPath, ItemType, OwnerType, Partition, TreeScope};
use folio_service::{
    AddItemsRequest, BulkMoveRequest, CreateFolderRequest, FolioEngine, MoveTarget, Operator,
    StaticOrganizationDirectory,
};

pub const PARTITION: &str = "plans and materials";
pub const OWNER_TYPE: &str = "organization";

/// Test engine context
pub struct TestApp {
    /// The in-memory store behind the engine
    pub store: MemoryStore,
    /// The engine under test
    pub engine: FolioEngine,
    /// Operator acting for a headquarters organization
    pub operator: Operator,
    /// Owner of the tree every helper writes into
    pub owner: Uuid,
}

impl TestApp {
    /// Engine whose operator is a global headquarters and whose directory
    /// knows `orgs`.
    pub fn new(orgs: &[OrgId]) -> Self {
        Self::with_scope(RegionScope::Global, orgs)
    }

    /// Engine whose operator shares under `scope`.
    pub fn with_scope(scope: RegionScope, orgs: &[OrgId]) -> Self {
        let operator = Operator::new(UserId::new(), OrgId::new());
        let directory = orgs.iter().fold(
            StaticOrganizationDirectory::default().with_headquarters(operator.org_id, scope),
            |directory, org| directory.with_organization(*org),
        );

        let store = MemoryStore::new();
        let cache = MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 10_000 });
        let engine = FolioEngine::new(
            Arc::new(store.clone()),
            Arc::new(cache),
            Arc::new(directory),
            LockConfig {
                wait_timeout_ms: 5_000,
                retry_interval_ms: 2,
                lease_seconds: 30,
            },
        );

        Self {
            store,
            engine,
            operator,
            owner: Uuid::new_v4(),
        }
    }

    pub fn scope(&self) -> TreeScope {
        TreeScope {
            owner_type: OwnerType::Organization,
            owner: self.owner,
            partition: Partition::PlansAndMaterials,
        }
    }

    /// Create a folder, panicking on failure.
    pub async fn folder(&self, parent: Option<&FolderItem>, name: &str) -> FolderItem {
        self.engine
            .folders
            .create_folder(&self.operator, self.create_request(parent, name))
            .await
            .expect("Failed to create folder")
    }

    pub fn create_request(&self, parent: Option<&FolderItem>, name: &str) -> CreateFolderRequest {
        CreateFolderRequest {
            owner_type: OWNER_TYPE.into(),
            owner: self.owner,
            partition: PARTITION.into(),
            parent_id: parent.map(|p| p.id),
            name: name.into(),
            description: String::new(),
            keywords: Vec::new(),
            thumbnail: String::new(),
        }
    }

    /// Register a content row and return its id.
    pub async fn content(&self, content_type: ContentType, subs: Vec<ContentId>) -> ContentId {
        let id = ContentId::new();
        self.store
            .put_content(ContentInfo {
                id,
                name: format!("content-{id}"),
                org: self.operator.org_id,
                content_type,
                sub_content_ids: subs,
                source_id: None,
                latest_id: id,
                dir_path: FolderPath::root(),
            })
            .await;
        id
    }

    /// Link a content into a folder (or the tree root).
    pub async fn link(&self, parent: Option<&FolderItem>, content: ContentId) -> FolderItem {
        self.engine
            .folders
            .add_items(
                &self.operator,
                AddItemsRequest {
                    folder_id: parent.map(|p| p.id),
                    owner_type: OWNER_TYPE.into(),
                    owner: self.owner,
                    partition: PARTITION.into(),
                    content_ids: vec![content],
                },
            )
            .await
            .expect("Failed to add item")
            .remove(0)
    }

    pub fn move_request(&self, items: &[&FolderItem], dest: FolderId) -> BulkMoveRequest {
        BulkMoveRequest {
            items: items
                .iter()
                .map(|item| MoveTarget {
                    item_id: item.id,
                    item_kind: if item.is_folder() { ItemType::Folder } else { ItemType::File },
                })
                .collect(),
            dest_folder_id: dest,
            partition: PARTITION.into(),
            owner_type: OWNER_TYPE.into(),
        }
    }

    pub async fn reload(&self, id: FolderId) -> FolderItem {
        self.engine
            .folders
            .get_folder(id)
            .await
            .expect("Failed to reload item")
    }

    /// Grant keys as `(org, content, from_folder)`, sorted.
    pub async fn grants(&self) -> Vec<(OrgId, ContentId, FolderId)> {
        let mut keys: Vec<_> = self
            .store
            .all_authed()
            .await
            .iter()
            .map(|r| r.key())
            .collect();
        keys.sort();
        keys
    }

    /// Organizations authorized on `content`, sorted and de-duplicated.
    pub async fn orgs_on(&self, content: ContentId) -> Vec<OrgId> {
        let mut orgs: Vec<OrgId> = self
            .grants()
            .await
            .into_iter()
            .filter(|(_, c, _)| *c == content)
            .map(|(o, _, _)| o)
            .collect();
        orgs.dedup();
        orgs
    }
}
