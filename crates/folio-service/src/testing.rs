//! Engine fixture for unit tests: in-memory store, in-memory locks.

use std::sync::Arc;

use uuid::Uuid;

use folio_cache::memory::MemoryCacheProvider;
use folio_core::config::LockConfig;
use folio_core::config::cache::MemoryCacheConfig;
use folio_core::traits::directory::RegionScope;
use folio_core::types::{ContentId, FolderId, OrgId, UserId};
use folio_database::MemoryStore;
use folio_entity::content::{ContentInfo, ContentType};
use folio_entity::folder::{FolderItem, FolderPath};

use crate::context::Operator;
use crate::directory::StaticOrganizationDirectory;
use crate::engine::FolioEngine;
use crate::folder::{AddItemsRequest, CreateFolderRequest};

pub(crate) struct Harness {
    pub store: MemoryStore,
    pub engine: FolioEngine,
    pub operator: Operator,
    pub owner: Uuid,
}

impl Harness {
    /// Operator acts for a global headquarters.
    pub fn new() -> Self {
        Self::with_scope(RegionScope::Global)
    }

    pub fn with_scope(scope: RegionScope) -> Self {
        let operator = Operator::new(UserId::new(), OrgId::new());
        Self::build(operator, StaticOrganizationDirectory::default().with_headquarters(operator.org_id, scope))
    }

    /// Global headquarters operator plus known receiving organizations.
    pub fn with_orgs(orgs: &[OrgId]) -> Self {
        let operator = Operator::new(UserId::new(), OrgId::new());
        let directory = orgs.iter().fold(
            StaticOrganizationDirectory::default().with_headquarters(operator.org_id, RegionScope::Global),
            |directory, org| directory.with_organization(*org),
        );
        Self::build(operator, directory)
    }

    pub fn build(operator: Operator, directory: StaticOrganizationDirectory) -> Self {
        let store = MemoryStore::new();
        let cache = MemoryCacheProvider::new(&MemoryCacheConfig { max_capacity: 10_000 });
        let engine = FolioEngine::new(
            Arc::new(store.clone()),
            Arc::new(cache),
            Arc::new(directory),
            LockConfig {
                wait_timeout_ms: 2_000,
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

    pub async fn folder(&self, parent: Option<&FolderItem>, name: &str) -> FolderItem {
        self.engine
            .folders
            .create_folder(
                &self.operator,
                CreateFolderRequest {
                    owner_type: "organization".into(),
                    owner: self.owner,
                    partition: "plans and materials".into(),
                    parent_id: parent.map(|p| p.id),
                    name: name.into(),
                    description: String::new(),
                    keywords: Vec::new(),
                    thumbnail: String::new(),
                },
            )
            .await
            .unwrap()
    }

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

    pub async fn link(&self, parent: Option<&FolderItem>, content: ContentId) -> FolderItem {
        self.engine
            .folders
            .add_items(
                &self.operator,
                AddItemsRequest {
                    folder_id: parent.map(|p| p.id),
                    owner_type: "organization".into(),
                    owner: self.owner,
                    partition: "plans and materials".into(),
                    content_ids: vec![content],
                },
            )
            .await
            .unwrap()
            .remove(0)
    }

    pub async fn reload(&self, id: FolderId) -> FolderItem {
        self.engine.folders.get_folder(id).await.unwrap()
    }

    /// Grant keys as `(org, content, from_folder)`.
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
}
