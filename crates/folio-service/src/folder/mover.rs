//! Single and bulk moves of folders and content links.
//!
//! Every precondition of every item is checked before anything is written;
//! the whole batch then commits as one change set. Moving a folder rewrites
//! the `dir_path` prefix of its whole subtree in one batch and refiles the
//! contents linked below it.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use folio_cache::{LockCoordinator, keys};
use folio_core::error::{AppError, ErrorCode};
use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId};
use folio_database::{ChangeSet, FolderStore, PathRewrite, Store, UnitOfWork};
use folio_entity::folder::{
    FolderCondition, FolderItem, FolderPath, ItemType, OwnerType, Partition, TreeScope,
};

use super::service::{
    FolderService, LOCK_PLAN_ATTEMPTS, chain_locks, chain_through, covers, name_lock, stale_lock_plan,
};
use crate::context::{Operator, validate_request};
use crate::share::AuthorizationPropagator;

/// Moves items between folders of one tree.
#[derive(Debug, Clone)]
pub struct MoveService {
    store: Arc<dyn Store>,
    locks: LockCoordinator,
    propagator: Arc<AuthorizationPropagator>,
    folders: FolderService,
}

/// Request to move one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveItemRequest {
    /// Item to move.
    pub item_id: FolderId,
    /// Declared kind of the item.
    pub item_kind: ItemType,
    /// Destination folder, [`FolderId::ROOT`] for tree-top.
    pub dest_folder_id: FolderId,
    /// Partition the move happens in.
    pub partition: String,
    /// Owner type of the tree.
    pub owner_type: String,
}

/// One item of a bulk move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTarget {
    /// Item to move.
    pub item_id: FolderId,
    /// Declared kind of the item.
    pub item_kind: ItemType,
}

/// Request to move several items into one folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkMoveRequest {
    /// Items to move.
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<MoveTarget>,
    /// Destination folder, [`FolderId::ROOT`] for tree-top.
    pub dest_folder_id: FolderId,
    /// Partition the move happens in.
    pub partition: String,
    /// Owner type of the tree.
    pub owner_type: String,
}

struct Destination {
    id: FolderId,
    children_path: FolderPath,
    owner: Option<Uuid>,
}

impl MoveService {
    /// Creates a new move service.
    pub fn new(
        store: Arc<dyn Store>,
        locks: LockCoordinator,
        propagator: Arc<AuthorizationPropagator>,
        folders: FolderService,
    ) -> Self {
        Self {
            store,
            locks,
            propagator,
            folders,
        }
    }

    /// Move one item. Returns the item as stored after the move.
    pub async fn move_item(&self, operator: &Operator, req: MoveItemRequest) -> AppResult<FolderItem> {
        let item_id = req.item_id;
        let moved = self
            .move_item_bulk(
                operator,
                BulkMoveRequest {
                    items: vec![MoveTarget {
                        item_id,
                        item_kind: req.item_kind,
                    }],
                    dest_folder_id: req.dest_folder_id,
                    partition: req.partition,
                    owner_type: req.owner_type,
                },
            )
            .await?;
        moved
            .into_iter()
            .next()
            .ok_or_else(|| AppError::folder_not_found(item_id))
    }

    /// Move several items into one folder in a single transaction.
    ///
    /// Returns the moved items in request order.
    pub async fn move_item_bulk(
        &self,
        operator: &Operator,
        req: BulkMoveRequest,
    ) -> AppResult<Vec<FolderItem>> {
        validate_request(&req)?;
        let partition: Partition = req.partition.parse()?;
        let owner_type: OwnerType = req.owner_type.parse()?;

        let mut targets: Vec<MoveTarget> = Vec::with_capacity(req.items.len());
        for target in req.items {
            if !targets.iter().any(|t| t.item_id == target.item_id) {
                targets.push(target);
            }
        }

        for _ in 0..LOCK_PLAN_ATTEMPTS {
            let lock_keys = self.plan_locks(&targets, req.dest_folder_id, partition).await?;
            let outcome = self
                .locks
                .with_locks(
                    lock_keys.clone(),
                    self.apply_moves(
                        operator,
                        &targets,
                        req.dest_folder_id,
                        partition,
                        owner_type,
                        &lock_keys,
                    ),
                )
                .await?;
            let Some((moved, touched)) = outcome else {
                continue;
            };

            self.folders
                .repair_items_count(&touched.into_iter().collect::<Vec<_>>())
                .await?;

            info!(
                user_id = %operator.user_id,
                dest_folder_id = %req.dest_folder_id,
                items = moved.len(),
                "Folder items moved"
            );
            return Ok(moved);
        }
        Err(stale_lock_plan())
    }

    /// Lock keys for a batch, read from the rows as they are before locking.
    ///
    /// Unknown ids only lock themselves; validation under the locks rejects
    /// them.
    async fn plan_locks(
        &self,
        targets: &[MoveTarget],
        dest_folder_id: FolderId,
        partition: Partition,
    ) -> AppResult<Vec<String>> {
        let ids: Vec<FolderId> = targets.iter().map(|t| t.item_id).collect();
        let items = self.store.get_items(&ids).await?;
        let dest_path = if dest_folder_id.is_root() {
            Some(FolderPath::root())
        } else {
            self.store
                .get_item(dest_folder_id)
                .await?
                .map(|folder| folder.children_path())
        };

        let mut lock_keys: Vec<String> = ids.iter().map(keys::folder_lock).collect();
        match dest_path {
            Some(path) => lock_keys.extend(move_locks(&items, &path, partition)),
            None => lock_keys.push(keys::folder_lock(dest_folder_id)),
        }
        Ok(lock_keys)
    }

    /// Validates and commits a batch once its locks are held. `None` means
    /// the rows moved after the locks were planned.
    async fn apply_moves(
        &self,
        operator: &Operator,
        targets: &[MoveTarget],
        dest_folder_id: FolderId,
        partition: Partition,
        owner_type: OwnerType,
        held: &[String],
    ) -> AppResult<Option<(Vec<FolderItem>, BTreeSet<FolderId>)>> {
        let dest = self.destination(dest_folder_id, partition, owner_type).await?;
        let items = self.load_items(targets, &dest, partition, owner_type).await?;
        if !covers(held, &move_locks(&items, &dest.children_path, partition)) {
            return Ok(None);
        }
        self.ensure_unique_names(&items, &dest).await?;

        let mut changes = ChangeSet::new();
        let mut touched: BTreeSet<FolderId> = dest.children_path.ancestor_ids().into_iter().collect();
        let mut moved_items = Vec::with_capacity(items.len());

        for item in &items {
            let mut moved = item.clone();
            moved.relocate(dest.children_path.clone());
            moved.editor = Some(operator.user_id);
            changes.update_items.push(moved.clone());
            touched.extend(item.ancestor_ids());

            let mut contents: Vec<ContentId> = Vec::new();
            let (from_chain, to_chain) = if item.is_folder() {
                let old_root = item.children_path();
                let new_root = moved.children_path();
                changes.path_rewrites.push(PathRewrite {
                    from: old_root.clone(),
                    to: new_root.clone(),
                });

                let links = self
                    .store
                    .find_items(&FolderCondition {
                        item_type: Some(ItemType::File),
                        ..FolderCondition::under(old_root.clone())
                    })
                    .await?;
                for link in links {
                    if let (Some(content), Some(path)) =
                        (link.link, link.dir_path.rebase(&old_root, &new_root))
                    {
                        changes.content_paths.push((content, path));
                        contents.push(content);
                    }
                }
                (chain_through(Some(item)), chain_through(Some(&moved)))
            } else {
                if let Some(content) = item.link {
                    changes
                        .content_paths
                        .push((content, dest.children_path.clone()));
                    contents.push(content);
                }
                (item.ancestor_ids(), moved.ancestor_ids())
            };

            changes.merge(
                self.propagator
                    .reconcile_move(&contents, &items, &from_chain, &to_chain, operator)
                    .await?,
            );
            moved_items.push(moved);
        }

        self.store.commit(changes).await?;
        Ok(Some((moved_items, touched)))
    }

    /// Moved folders must not clash by name with the destination's folders
    /// or with each other.
    async fn ensure_unique_names(&self, items: &[FolderItem], dest: &Destination) -> AppResult<()> {
        let mut names: HashSet<&str> = HashSet::new();
        for folder in items.iter().filter(|item| item.is_folder()) {
            if !names.insert(folder.name.as_str()) {
                return Err(AppError::coded(
                    ErrorCode::DuplicateName,
                    format!("Two folders named '{}' cannot move into one folder", folder.name),
                ));
            }
            self.folders
                .ensure_unique_name(
                    &folder.scope(),
                    &dest.children_path,
                    &folder.name,
                    Some(folder.id),
                )
                .await?;
        }
        Ok(())
    }

    async fn destination(
        &self,
        id: FolderId,
        partition: Partition,
        owner_type: OwnerType,
    ) -> AppResult<Destination> {
        if id.is_root() {
            return Ok(Destination {
                id,
                children_path: FolderPath::root(),
                owner: None,
            });
        }
        let folder = self
            .store
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::folder_not_found(id))?;
        if !folder.is_folder() {
            return Err(AppError::coded(
                ErrorCode::NotAFolder,
                format!("Destination {id} is not a folder"),
            ));
        }
        if folder.partition != partition {
            return Err(cross_partition(id, folder.partition, partition));
        }
        if folder.owner_type != owner_type {
            return Err(AppError::validation(format!(
                "Destination {id} belongs to another tree"
            )));
        }
        Ok(Destination {
            id,
            children_path: folder.children_path(),
            owner: Some(folder.owner),
        })
    }

    /// Loads and validates every item of the batch against the destination.
    async fn load_items(
        &self,
        targets: &[MoveTarget],
        dest: &Destination,
        partition: Partition,
        owner_type: OwnerType,
    ) -> AppResult<Vec<FolderItem>> {
        let ids: Vec<FolderId> = targets.iter().map(|t| t.item_id).collect();
        let rows = self.store.get_items(&ids).await?;

        let mut items = Vec::with_capacity(targets.len());
        for target in targets {
            let item = rows
                .iter()
                .find(|row| row.id == target.item_id)
                .cloned()
                .ok_or_else(|| AppError::folder_not_found(target.item_id))?;

            if item.item_type != target.item_kind {
                return Err(AppError::coded(
                    ErrorCode::ItemKindMismatch,
                    format!(
                        "Item {} is a {:?}, not a {:?}",
                        item.id, item.item_type, target.item_kind
                    ),
                ));
            }
            if item.partition != partition {
                return Err(cross_partition(item.id, item.partition, partition));
            }
            if item.owner_type != owner_type
                || dest.owner.is_some_and(|owner| owner != item.owner)
                || items.first().is_some_and(|first: &FolderItem| first.owner != item.owner)
            {
                return Err(AppError::validation(format!(
                    "Item {} belongs to another tree",
                    item.id
                )));
            }
            if item.id == dest.id {
                return Err(AppError::coded(
                    ErrorCode::MoveToSelf,
                    format!("Item {} cannot be moved into itself", item.id),
                ));
            }
            if item.is_folder() && item.children_path().contains(&dest.children_path) {
                return Err(AppError::coded(
                    ErrorCode::MoveIntoOwnDescendant,
                    format!("Folder {} cannot be moved below itself", item.id),
                ));
            }
            if item.parent_id == dest.id {
                return Err(AppError::coded(
                    ErrorCode::MoveToSameFolder,
                    format!("Item {} already sits in {}", item.id, dest.id),
                ));
            }
            items.push(item);
        }

        for folder in items.iter().filter(|item| item.is_folder()) {
            let subtree = folder.children_path();
            if let Some(nested) = items
                .iter()
                .find(|other| other.id != folder.id && subtree.contains(&other.dir_path))
            {
                return Err(AppError::coded(
                    ErrorCode::NestedBulkItems,
                    format!("Item {} lies inside folder {} of the same batch", nested.id, folder.id),
                ));
            }
        }
        Ok(items)
    }
}

/// Everything a batch moving `items` below `dest_path` must hold besides the
/// items themselves.
///
/// Both chains are locked because shares on any folder above an item reach
/// its contents. Moved folders also take the name lock of the destination.
fn move_locks(items: &[FolderItem], dest_path: &FolderPath, partition: Partition) -> Vec<String> {
    let dest_chain = dest_path.ancestor_ids();
    let mut lock_keys = Vec::new();
    for item in items {
        let scope = TreeScope {
            partition,
            ..item.scope()
        };
        lock_keys.push(keys::folder_lock(item.id));
        lock_keys.extend(item.ancestor_ids().iter().map(keys::folder_lock));
        lock_keys.extend(chain_locks(&scope, &dest_chain));
        if item.is_folder() {
            lock_keys.push(name_lock(&scope, &item.name));
        }
    }
    lock_keys
}

fn cross_partition(id: FolderId, found: Partition, expected: Partition) -> AppError {
    AppError::coded(
        ErrorCode::CrossPartitionMove,
        format!("Item {id} lives in partition '{found}', not '{expected}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::service::container_lock;
    use crate::share::ShareFoldersRequest;
    use crate::testing::Harness;
    use folio_core::types::{OrgId, UserId};
    use folio_database::ContentStore;
    use folio_entity::content::ContentType;

    fn bulk(items: &[&FolderItem], dest: FolderId) -> BulkMoveRequest {
        BulkMoveRequest {
            items: items
                .iter()
                .map(|item| MoveTarget {
                    item_id: item.id,
                    item_kind: item.item_type,
                })
                .collect(),
            dest_folder_id: dest,
            partition: "plans and materials".into(),
            owner_type: "organization".into(),
        }
    }

    #[tokio::test]
    async fn test_move_folder_to_root_rewrites_subtree() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(Some(&a), "B").await;
        let c = h.folder(Some(&b), "C").await;
        let content = h.content(ContentType::Material, vec![]).await;
        let link = h.link(Some(&c), content).await;

        let moved = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&b], FolderId::ROOT))
            .await
            .unwrap();
        assert!(moved[0].dir_path.is_root());

        let a = h.reload(a.id).await;
        assert_eq!(a.items_count, 0);
        assert!(!a.has_descendant);

        let b = h.reload(b.id).await;
        let c = h.reload(c.id).await;
        let link = h.reload(link.id).await;
        assert_eq!(c.dir_path, b.children_path());
        assert_eq!(link.dir_path, c.children_path());
        assert_eq!(link.dir_path.ancestor_ids(), vec![b.id, c.id]);

        let rows = h.store.get_contents(&[content]).await.unwrap();
        assert_eq!(rows[0].dir_path, c.children_path());
    }

    #[tokio::test]
    async fn test_folder_cannot_move_below_itself() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(Some(&a), "B").await;
        let c = h.folder(Some(&b), "C").await;

        for dest in [b.id, c.id] {
            let err = h
                .engine
                .mover
                .move_item_bulk(&h.operator, bulk(&[&a], dest))
                .await
                .unwrap_err();
            assert!(err.is(ErrorCode::MoveIntoOwnDescendant));
        }
        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&a], a.id))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::MoveToSelf));
        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&b], a.id))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::MoveToSameFolder));
    }

    #[tokio::test]
    async fn test_move_checks_kind_and_partition() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(None, "B").await;

        let err = h
            .engine
            .mover
            .move_item(
                &h.operator,
                MoveItemRequest {
                    item_id: a.id,
                    item_kind: ItemType::File,
                    dest_folder_id: b.id,
                    partition: "plans and materials".into(),
                    owner_type: "organization".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::ItemKindMismatch));

        let err = h
            .engine
            .mover
            .move_item(
                &h.operator,
                MoveItemRequest {
                    item_id: a.id,
                    item_kind: ItemType::Folder,
                    dest_folder_id: b.id,
                    partition: "assets".into(),
                    owner_type: "organization".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::CrossPartitionMove));

        let content = h.content(ContentType::Material, vec![]).await;
        let link = h.link(Some(&a), content).await;
        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&b], link.id))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::NotAFolder));
    }

    #[tokio::test]
    async fn test_bulk_move_repairs_every_parent() {
        let h = Harness::new();
        let src1 = h.folder(None, "src1").await;
        let src2 = h.folder(None, "src2").await;
        let dest = h.folder(None, "dest").await;
        let f1 = h.folder(Some(&src1), "f1").await;
        let f2 = h.folder(Some(&src2), "f2").await;
        let content = h.content(ContentType::Material, vec![]).await;
        let l1 = h.link(Some(&src1), content).await;

        let moved = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&f1, &f2, &l1], dest.id))
            .await
            .unwrap();
        assert_eq!(moved.len(), 3);

        assert_eq!(h.reload(src1.id).await.items_count, 0);
        assert_eq!(h.reload(src2.id).await.items_count, 0);
        let dest = h.reload(dest.id).await;
        assert_eq!(dest.items_count, 3);
        assert!(dest.has_descendant);
        for item in [f1.id, f2.id, l1.id] {
            assert_eq!(h.reload(item).await.dir_path, dest.children_path());
        }
    }

    #[tokio::test]
    async fn test_nested_bulk_is_rejected_without_writes() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(Some(&a), "B").await;
        let dest = h.folder(None, "dest").await;

        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&a, &b], dest.id))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::NestedBulkItems));
        assert_eq!(h.reload(b.id).await.dir_path, a.children_path());
        assert_eq!(h.reload(dest.id).await.items_count, 0);
    }

    #[tokio::test]
    async fn test_grants_follow_moved_link() {
        let org = OrgId::new();
        let h = Harness::with_orgs(&[org]);
        let shared = h.folder(None, "shared").await;
        let other = h.folder(None, "other").await;
        h.engine
            .shares
            .share_folders(
                &h.operator,
                ShareFoldersRequest {
                    folder_ids: vec![shared.id],
                    org_ids: vec![org],
                },
            )
            .await
            .unwrap();

        let content = h.content(ContentType::Material, vec![]).await;
        let link = h.link(Some(&other), content).await;
        assert!(h.grants().await.is_empty());

        h.engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&link], shared.id))
            .await
            .unwrap();
        assert_eq!(h.grants().await, vec![(org, content, shared.id)]);

        h.engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&link], FolderId::ROOT))
            .await
            .unwrap();
        assert!(h.grants().await.is_empty());
    }

    #[tokio::test]
    async fn test_move_rejects_name_taken_at_destination() {
        let h = Harness::new();
        h.folder(None, "X").await;
        let a = h.folder(None, "A").await;
        let inner = h.folder(Some(&a), "X").await;

        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&inner], FolderId::ROOT))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::DuplicateName));

        let top = h
            .store
            .find_items(&FolderCondition {
                name: Some("X".into()),
                dir_path: Some(FolderPath::root()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(h.reload(inner.id).await.dir_path, a.children_path());
    }

    #[tokio::test]
    async fn test_bulk_move_rejects_same_named_folders() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(None, "B").await;
        let dest = h.folder(None, "dest").await;
        let x1 = h.folder(Some(&a), "X").await;
        let x2 = h.folder(Some(&b), "X").await;

        let err = h
            .engine
            .mover
            .move_item_bulk(&h.operator, bulk(&[&x1, &x2], dest.id))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::DuplicateName));
        assert_eq!(h.reload(dest.id).await.items_count, 0);
    }

    #[test]
    fn test_move_locks_cover_both_chains() {
        let scope = TreeScope {
            owner_type: OwnerType::Organization,
            owner: Uuid::new_v4(),
            partition: Partition::PlansAndMaterials,
        };
        let creator = UserId::new();
        let a = FolderItem::new(ItemType::Folder, scope, FolderPath::root(), "A", creator);
        let b = FolderItem::new(ItemType::Folder, scope, a.children_path(), "B", creator);
        let moved = FolderItem::new(ItemType::Folder, scope, b.children_path(), "M", creator);
        let c = FolderItem::new(ItemType::Folder, scope, FolderPath::root(), "C", creator);
        let d = FolderItem::new(ItemType::Folder, scope, c.children_path(), "D", creator);

        let lock_keys = move_locks(&[moved.clone()], &d.children_path(), scope.partition);
        for id in [moved.id, a.id, b.id, c.id, d.id] {
            assert!(lock_keys.contains(&keys::folder_lock(id)), "missing lock on {id}");
        }
        assert!(lock_keys.contains(&name_lock(&scope, "M")));

        let to_top = move_locks(&[moved], &FolderPath::root(), scope.partition);
        assert!(to_top.contains(&container_lock(&scope, FolderId::ROOT)));
    }

    #[tokio::test]
    async fn test_move_waits_for_share_lock_above_destination() {
        let h = Harness::new();
        let a = h.folder(None, "A").await;
        let b = h.folder(Some(&a), "B").await;
        let content = h.content(ContentType::Material, vec![]).await;
        let link = h.link(None, content).await;

        let guard = h.engine.locks.acquire(keys::folder_lock(a.id)).await.unwrap();
        let holder = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            assert!(h.reload(link.id).await.dir_path.is_root());
            guard.release().await;
        };
        let (moved, ()) = tokio::join!(
            h.engine.mover.move_item_bulk(&h.operator, bulk(&[&link], b.id)),
            holder
        );

        assert_eq!(moved.unwrap()[0].dir_path, b.children_path());
    }
}
