//! Folder CRUD, content links and item-count repair.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use folio_cache::{LockCoordinator, keys};
use folio_core::error::{AppError, ErrorCode, ErrorKind};
use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, PageRequest, PageResponse};
use folio_database::{ChangeSet, ContentStore, FolderStore, ItemCountFix, ShareStore, Store, UnitOfWork};
use folio_entity::folder::{
    FolderCondition, FolderItem, FolderPath, FolderTree, ItemType, OwnerType, Partition, TreeScope,
};
use folio_entity::share::AuthedContentCondition;

use crate::context::{Operator, validate_request};
use crate::share::AuthorizationPropagator;

/// Manages folder items of every tree.
#[derive(Debug, Clone)]
pub struct FolderService {
    store: Arc<dyn Store>,
    locks: LockCoordinator,
    propagator: Arc<AuthorizationPropagator>,
}

/// Request to create a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// `organization` or `private`.
    pub owner_type: String,
    /// Owning organization or user.
    pub owner: Uuid,
    /// Partition name.
    pub partition: String,
    /// Parent folder; `None` or [`FolderId::ROOT`] for tree-top.
    pub parent_id: Option<FolderId>,
    /// Folder name.
    #[validate(length(min = 1, max = 128, message = "Folder name must be 1-128 characters"))]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Search keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Thumbnail resource id.
    #[serde(default)]
    pub thumbnail: String,
}

/// Request to link contents into a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddItemsRequest {
    /// Target folder; `None` or [`FolderId::ROOT`] for tree-top.
    pub folder_id: Option<FolderId>,
    /// `organization` or `private`.
    pub owner_type: String,
    /// Owning organization or user.
    pub owner: Uuid,
    /// Partition name.
    pub partition: String,
    /// Contents to link.
    #[validate(length(min = 1, message = "At least one content is required"))]
    pub content_ids: Vec<ContentId>,
}

/// Metadata update; unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFolderRequest {
    /// New name.
    #[validate(length(min = 1, max = 128, message = "Folder name must be 1-128 characters"))]
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New keywords.
    pub keywords: Option<Vec<String>>,
    /// New thumbnail.
    pub thumbnail: Option<String>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        store: Arc<dyn Store>,
        locks: LockCoordinator,
        propagator: Arc<AuthorizationPropagator>,
    ) -> Self {
        Self {
            store,
            locks,
            propagator,
        }
    }

    /// Gets a live item by id.
    pub async fn get_folder(&self, id: FolderId) -> AppResult<FolderItem> {
        self.store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::folder_not_found(id))
    }

    /// Gets live items by id; unknown ids are skipped.
    pub async fn get_folders(&self, ids: &[FolderId]) -> AppResult<Vec<FolderItem>> {
        self.store.get_items(ids).await
    }

    /// Lists the direct children of `parent` inside one tree.
    pub async fn list_children(
        &self,
        scope: TreeScope,
        parent: FolderId,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>> {
        let condition = FolderCondition {
            owner_type: Some(scope.owner_type),
            owner: Some(scope.owner),
            partition: Some(scope.partition),
            ..FolderCondition::children_of(parent)
        };
        self.store.find_items_page(&condition, page).await
    }

    /// Searches items with an arbitrary condition.
    pub async fn search_folders(
        &self,
        condition: &FolderCondition,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FolderItem>> {
        self.store.find_items_page(condition, page).await
    }

    /// Creates a folder.
    pub async fn create_folder(
        &self,
        operator: &Operator,
        req: CreateFolderRequest,
    ) -> AppResult<FolderItem> {
        validate_request(&req)?;
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Folder name cannot be empty"));
        }

        let scope = parse_scope(&req.owner_type, req.owner, &req.partition)?;
        let parent_id = req.parent_id.unwrap_or(FolderId::ROOT);
        let lock_keys = [name_lock(&scope, &name), container_lock(&scope, parent_id)];
        let CreateFolderRequest {
            description,
            keywords,
            thumbnail,
            ..
        } = req;

        let folder = self
            .locks
            .with_locks(lock_keys, async {
                let parent = self.resolve_parent(&scope, Some(parent_id)).await?;
                let dir_path = parent
                    .as_ref()
                    .map(FolderItem::children_path)
                    .unwrap_or_else(FolderPath::root);

                let mut folder =
                    FolderItem::new(ItemType::Folder, scope, dir_path, &name, operator.user_id);
                folder.description = description;
                folder.keywords = keywords;
                folder.thumbnail = thumbnail;

                self.ensure_unique_name(&scope, &folder.dir_path, &folder.name, None)
                    .await?;
                let mut changes = ChangeSet::new();
                changes.insert_items.push(folder.clone());
                self.store.commit(changes).await?;
                Ok(folder)
            })
            .await?;

        self.repair_items_count(&folder.ancestor_ids()).await?;

        info!(
            user_id = %operator.user_id,
            folder_id = %folder.id,
            dir_path = %folder.dir_path,
            name = %folder.name,
            "Folder created"
        );
        Ok(folder)
    }

    /// Links contents into a folder, skipping contents already linked there.
    ///
    /// New links inherit the shares of every folder above them.
    pub async fn add_items(
        &self,
        operator: &Operator,
        req: AddItemsRequest,
    ) -> AppResult<Vec<FolderItem>> {
        validate_request(&req)?;
        let scope = parse_scope(&req.owner_type, req.owner, &req.partition)?;
        let mut content_ids = req.content_ids;
        content_ids.sort();
        content_ids.dedup();

        for _ in 0..LOCK_PLAN_ATTEMPTS {
            let planned = self.resolve_parent(&scope, req.folder_id).await?;
            let lock_keys = chain_locks(&scope, &chain_through(planned.as_ref()));
            let outcome = self
                .locks
                .with_locks(
                    lock_keys.clone(),
                    self.link_contents(operator, &scope, req.folder_id, &content_ids, &lock_keys),
                )
                .await?;
            let Some((parent, created)) = outcome else {
                continue;
            };

            if !created.is_empty() {
                self.repair_items_count(&chain_through(parent.as_ref())).await?;
                info!(
                    user_id = %operator.user_id,
                    folder_id = %parent.as_ref().map_or(FolderId::ROOT, |p| p.id),
                    linked = created.len(),
                    "Contents linked into folder"
                );
            }
            return Ok(created);
        }
        Err(stale_lock_plan())
    }

    /// Writes the links of [`add_items`](Self::add_items) once its locks are
    /// held. `None` means the parent moved after the locks were planned.
    async fn link_contents(
        &self,
        operator: &Operator,
        scope: &TreeScope,
        folder_id: Option<FolderId>,
        content_ids: &[ContentId],
        held: &[String],
    ) -> AppResult<Option<(Option<FolderItem>, Vec<FolderItem>)>> {
        let parent = self.resolve_parent(scope, folder_id).await?;
        let chain = chain_through(parent.as_ref());
        if !covers(held, &chain_locks(scope, &chain)) {
            return Ok(None);
        }
        let dir_path = parent
            .as_ref()
            .map(FolderItem::children_path)
            .unwrap_or_else(FolderPath::root);

        let contents = self.store.get_contents(content_ids).await?;
        if let Some(missing) = content_ids
            .iter()
            .find(|id| !contents.iter().any(|c| c.id == **id))
        {
            return Err(AppError::coded(
                ErrorCode::ContentNotFound,
                format!("Content {missing} not found"),
            ));
        }

        let linked: HashSet<ContentId> = self
            .store
            .find_items(&FolderCondition {
                item_type: Some(ItemType::File),
                dir_path: Some(dir_path.clone()),
                owner_type: Some(scope.owner_type),
                owner: Some(scope.owner),
                partition: Some(scope.partition),
                links: content_ids.to_vec(),
                ..Default::default()
            })
            .await?
            .into_iter()
            .filter_map(|item| item.link)
            .collect();

        let mut changes = ChangeSet::new();
        let mut new_links = Vec::new();
        for content in contents.iter().filter(|c| !linked.contains(&c.id)) {
            let mut item = FolderItem::new(
                ItemType::File,
                *scope,
                dir_path.clone(),
                content.name.clone(),
                operator.user_id,
            );
            item.link = Some(content.id);
            changes.content_paths.push((content.id, dir_path.clone()));
            changes.insert_items.push(item);
            new_links.push(content.id);
        }
        if new_links.is_empty() {
            return Ok(Some((parent, Vec::new())));
        }

        changes.merge(
            self.propagator
                .reconcile_move(&new_links, &[], &[], &chain, operator)
                .await?,
        );

        let created = changes.insert_items.clone();
        self.store.commit(changes).await?;
        Ok(Some((parent, created)))
    }

    /// Updates folder metadata. A rename re-checks sibling uniqueness.
    pub async fn update_folder(
        &self,
        operator: &Operator,
        id: FolderId,
        req: UpdateFolderRequest,
    ) -> AppResult<FolderItem> {
        validate_request(&req)?;
        let new_name = match req.name.as_deref().map(str::trim) {
            Some("") => return Err(AppError::validation("Folder name cannot be empty")),
            other => other.map(str::to_string),
        };

        let current = self.get_folder(id).await?;
        let mut lock_keys = vec![keys::folder_lock(id)];
        if let Some(name) = new_name.as_deref().filter(|_| current.is_folder()) {
            lock_keys.push(name_lock(&current.scope(), name));
        }

        let updated = self
            .locks
            .with_locks(lock_keys, async {
                let mut folder = self.get_folder(id).await?;
                if let Some(name) = new_name {
                    if folder.is_folder() && name != folder.name {
                        self.ensure_unique_name(&folder.scope(), &folder.dir_path, &name, Some(id))
                            .await?;
                    }
                    folder.name = name;
                }
                if let Some(description) = req.description {
                    folder.description = description;
                }
                if let Some(keywords) = req.keywords {
                    folder.keywords = keywords;
                }
                if let Some(thumbnail) = req.thumbnail {
                    folder.thumbnail = thumbnail;
                }
                folder.editor = Some(operator.user_id);
                folder.update_at = Utc::now();

                let mut changes = ChangeSet::new();
                changes.update_items.push(folder.clone());
                self.store.commit(changes).await?;
                Ok(folder)
            })
            .await?;

        info!(user_id = %operator.user_id, folder_id = %id, "Folder updated");
        Ok(updated)
    }

    /// Deletes an empty folder or a content link.
    ///
    /// Deleting a folder drops its shares together with the grants they
    /// caused. Deleting a link revokes the grants it was the last reason
    /// for.
    pub async fn delete_folder(&self, operator: &Operator, id: FolderId) -> AppResult<()> {
        for _ in 0..LOCK_PLAN_ATTEMPTS {
            let planned = self.get_folder(id).await?;
            let lock_keys = delete_locks(&planned);
            let outcome = self
                .locks
                .with_locks(lock_keys.clone(), self.remove_item(operator, id, &lock_keys))
                .await?;
            let Some(item) = outcome else {
                continue;
            };

            self.repair_items_count(&item.ancestor_ids()).await?;
            info!(
                user_id = %operator.user_id,
                item_id = %id,
                item_type = ?item.item_type,
                "Folder item deleted"
            );
            return Ok(());
        }
        Err(stale_lock_plan())
    }

    async fn remove_item(
        &self,
        operator: &Operator,
        id: FolderId,
        held: &[String],
    ) -> AppResult<Option<FolderItem>> {
        let item = self.get_folder(id).await?;
        if !covers(held, &delete_locks(&item)) {
            return Ok(None);
        }
        let mut changes = ChangeSet::new();

        if item.is_folder() {
            let stats = self.store.child_stats(std::slice::from_ref(&item)).await?;
            let live = stats.get(&id).copied().unwrap_or_default();
            if live.items_count > 0 {
                return Err(AppError::coded(
                    ErrorCode::FolderNotEmpty,
                    format!("Folder {id} still holds {} items", live.items_count),
                ));
            }
            let shares = self.store.shared_records(&[id]).await?;
            if !shares.is_empty() {
                changes
                    .delete_shares
                    .extend(shares.iter().map(|r| (r.folder_id, r.org_id)));
                changes.revoke_authed.push(AuthedContentCondition {
                    from_folder_ids: vec![id],
                    ..Default::default()
                });
            }
        } else if let Some(content) = item.link {
            changes.merge(
                self.propagator
                    .reconcile_move(
                        &[content],
                        std::slice::from_ref(&item),
                        &item.ancestor_ids(),
                        &[],
                        operator,
                    )
                    .await?,
            );
        }

        changes.delete_items.push(id);
        self.store.commit(changes).await?;
        Ok(Some(item))
    }

    /// Recomputes `items_count` and `has_descendant` of the given folders.
    ///
    /// Only rows whose cached values differ are written. Returns the number
    /// of rows fixed.
    pub async fn repair_items_count(&self, ids: &[FolderId]) -> AppResult<usize> {
        let ids: Vec<FolderId> = ids
            .iter()
            .filter(|id| !id.is_root())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let folders: Vec<FolderItem> = self
            .store
            .get_items(&ids)
            .await?
            .into_iter()
            .filter(FolderItem::is_folder)
            .collect();
        self.repair_folders(&folders).await
    }

    /// Recomputes the cached counts of every folder in a tree.
    pub async fn repair_tree(&self, scope: TreeScope) -> AppResult<usize> {
        let folders = self.store.find_items(&tree_folders(scope)).await?;
        self.repair_folders(&folders).await
    }

    /// Nested view of every folder in a tree.
    pub async fn folder_tree(&self, scope: TreeScope) -> AppResult<FolderTree> {
        let folders = self.store.find_items(&tree_folders(scope)).await?;
        Ok(FolderTree::build(folders))
    }

    async fn repair_folders(&self, folders: &[FolderItem]) -> AppResult<usize> {
        if folders.is_empty() {
            return Ok(0);
        }
        let stats = self.store.child_stats(folders).await?;

        let mut changes = ChangeSet::new();
        for folder in folders {
            let live = stats.get(&folder.id).copied().unwrap_or_default();
            if live.items_count != folder.items_count || live.has_descendant != folder.has_descendant {
                changes.item_counts.push(ItemCountFix {
                    id: folder.id,
                    items_count: live.items_count,
                    has_descendant: live.has_descendant,
                });
            }
        }

        let fixed = changes.item_counts.len();
        if fixed > 0 {
            self.store.commit(changes).await?;
            debug!(checked = folders.len(), fixed, "Repaired folder item counts");
        }
        Ok(fixed)
    }

    /// The parent folder for a new item, `None` at tree-top.
    async fn resolve_parent(
        &self,
        scope: &TreeScope,
        parent_id: Option<FolderId>,
    ) -> AppResult<Option<FolderItem>> {
        let Some(parent_id) = parent_id.filter(|id| !id.is_root()) else {
            return Ok(None);
        };
        let parent = self.get_folder(parent_id).await?;
        if !parent.is_folder() {
            return Err(AppError::coded(
                ErrorCode::NotAFolder,
                format!("Item {parent_id} is not a folder"),
            ));
        }
        if parent.partition != scope.partition {
            return Err(AppError::coded(
                ErrorCode::CrossPartitionMove,
                format!(
                    "Folder {parent_id} belongs to partition '{}', not '{}'",
                    parent.partition, scope.partition
                ),
            ));
        }
        if parent.owner_type != scope.owner_type || parent.owner != scope.owner {
            return Err(AppError::validation(format!(
                "Folder {parent_id} belongs to another tree"
            )));
        }
        Ok(Some(parent))
    }

    pub(crate) async fn ensure_unique_name(
        &self,
        scope: &TreeScope,
        dir_path: &FolderPath,
        name: &str,
        except: Option<FolderId>,
    ) -> AppResult<()> {
        let condition = FolderCondition {
            name: Some(name.to_string()),
            item_type: Some(ItemType::Folder),
            owner_type: Some(scope.owner_type),
            owner: Some(scope.owner),
            partition: match scope.owner_type {
                OwnerType::Organization => Some(scope.partition),
                OwnerType::Private => None,
            },
            dir_path: Some(dir_path.clone()),
            ..Default::default()
        };
        let clash = self
            .store
            .find_items(&condition)
            .await?
            .into_iter()
            .any(|item| Some(item.id) != except);
        if clash {
            return Err(AppError::coded(
                ErrorCode::DuplicateName,
                format!("A folder named '{name}' already exists here"),
            ));
        }
        Ok(())
    }
}

/// Parse the wire names of a tree.
pub(crate) fn parse_scope(owner_type: &str, owner: Uuid, partition: &str) -> AppResult<TreeScope> {
    Ok(TreeScope {
        owner_type: owner_type.parse::<OwnerType>()?,
        owner,
        partition: partition.parse::<Partition>()?,
    })
}

/// Ancestors of `folder` followed by `folder` itself; empty at tree-top.
pub(crate) fn chain_through(folder: Option<&FolderItem>) -> Vec<FolderId> {
    match folder {
        Some(folder) => {
            let mut chain = folder.ancestor_ids();
            chain.push(folder.id);
            chain
        }
        None => Vec::new(),
    }
}

/// Lock guarding the direct children of one folder, or of one tree's top.
pub(crate) fn container_lock(scope: &TreeScope, folder: FolderId) -> String {
    if folder.is_root() {
        keys::folder_lock(format!(
            "root:{}:{}:{}",
            scope.owner_type, scope.owner, scope.partition
        ))
    } else {
        keys::folder_lock(folder)
    }
}

/// Locks on every folder of `chain`; the tree-top container when it is empty.
pub(crate) fn chain_locks(scope: &TreeScope, chain: &[FolderId]) -> Vec<String> {
    if chain.is_empty() {
        vec![container_lock(scope, FolderId::ROOT)]
    } else {
        chain.iter().map(keys::folder_lock).collect()
    }
}

/// A folder is locked on its own; a link also locks the folders whose
/// shares reach it.
fn delete_locks(item: &FolderItem) -> Vec<String> {
    let mut lock_keys = vec![keys::folder_lock(item.id)];
    if !item.is_folder() {
        lock_keys.extend(item.ancestor_ids().iter().map(keys::folder_lock));
    }
    lock_keys
}

/// Whether every key in `needed` is among the `held` ones.
pub(crate) fn covers(held: &[String], needed: &[String]) -> bool {
    needed.iter().all(|key| held.contains(key))
}

/// Lock keys are planned from rows read before locking; an operation
/// re-plans at most this many times when those rows moved meanwhile.
pub(crate) const LOCK_PLAN_ATTEMPTS: usize = 3;

pub(crate) fn stale_lock_plan() -> AppError {
    AppError::new(
        ErrorKind::Conflict,
        "Items moved while their locks were taken; retry the request",
    )
}

/// Private trees keep names unique across partitions, so their name lock
/// spans every partition.
pub(crate) fn name_lock(scope: &TreeScope, name: &str) -> String {
    match scope.owner_type {
        OwnerType::Organization => {
            keys::folder_name_lock(scope.owner_type, scope.owner, scope.partition, name)
        }
        OwnerType::Private => keys::folder_name_lock(scope.owner_type, scope.owner, "any", name),
    }
}

fn tree_folders(scope: TreeScope) -> FolderCondition {
    FolderCondition {
        owner_type: Some(scope.owner_type),
        owner: Some(scope.owner),
        partition: Some(scope.partition),
        item_type: Some(ItemType::Folder),
        ..Default::default()
    }
}
