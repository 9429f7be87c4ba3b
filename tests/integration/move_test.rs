//! Integration tests for single and bulk moves.

mod helpers;

use folio_core::error::ErrorCode;
use folio_core::types::{FolderId, OrgId, PageRequest};
use folio_database::ContentStore;
use folio_entity::content::ContentType;
use folio_entity::folder::{FolderPath, ItemType};
use folio_service::{MoveItemRequest, ShareFoldersRequest};

fn move_folder(item: FolderId, dest: FolderId) -> MoveItemRequest {
    MoveItemRequest {
        item_id: item,
        item_kind: ItemType::Folder,
        dest_folder_id: dest,
        partition: helpers::PARTITION.into(),
        owner_type: helpers::OWNER_TYPE.into(),
    }
}

#[tokio::test]
async fn test_move_to_root_rewrites_subtree() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;
    let c = app.folder(Some(&b), "C").await;
    let material = app.content(ContentType::Material, vec![]).await;
    let link = app.link(Some(&c), material).await;

    let moved = app
        .engine
        .mover
        .move_item(&app.operator, move_folder(b.id, FolderId::ROOT))
        .await
        .unwrap();
    assert_eq!(moved.dir_path, FolderPath::root());

    assert_eq!(app.reload(a.id).await.items_count, 0);
    assert!(!app.reload(a.id).await.has_descendant);

    let roots = app
        .engine
        .folders
        .list_children(app.scope(), FolderId::ROOT, &PageRequest::new(1, 50))
        .await
        .unwrap();
    assert!(roots.items.iter().any(|item| item.id == b.id));

    let c = app.reload(c.id).await;
    assert_eq!(c.dir_path, moved.children_path());
    let link = app.reload(link.id).await;
    assert_eq!(link.dir_path, c.children_path());
    assert!(link.dir_path.as_str().starts_with(&format!("/{}", b.id)));

    let stored = app.store.get_contents(&[material]).await.unwrap();
    assert_eq!(stored[0].dir_path, c.children_path());
}

#[tokio::test]
async fn test_folder_never_moves_into_own_subtree() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;
    let c = app.folder(Some(&b), "C").await;
    let d = app.folder(Some(&c), "D").await;

    for dest in [b.id, c.id, d.id] {
        let err = app
            .engine
            .mover
            .move_item(&app.operator, move_folder(a.id, dest))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::MoveIntoOwnDescendant), "moving into {dest}");
    }

    let err = app
        .engine
        .mover
        .move_item(&app.operator, move_folder(a.id, a.id))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::MoveToSelf));

    let err = app
        .engine
        .mover
        .move_item(&app.operator, move_folder(c.id, b.id))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::MoveToSameFolder));

    assert_eq!(app.reload(d.id).await.dir_path, c.children_path());
}

#[tokio::test]
async fn test_bulk_move_repairs_every_touched_parent() {
    let app = helpers::TestApp::new(&[]);
    let left = app.folder(None, "Left").await;
    let right = app.folder(None, "Right").await;
    let dest = app.folder(None, "Dest").await;

    let folder = app.folder(Some(&left), "Unit 1").await;
    app.folder(Some(&left), "Unit 2").await;
    let m1 = app.content(ContentType::Material, vec![]).await;
    let m2 = app.content(ContentType::Material, vec![]).await;
    let link1 = app.link(Some(&right), m1).await;
    let link2 = app.link(Some(&right), m2).await;

    let moved = app
        .engine
        .mover
        .move_item_bulk(&app.operator, app.move_request(&[&folder, &link1, &link2], dest.id))
        .await
        .unwrap();
    assert_eq!(moved.len(), 3);

    let page = PageRequest::new(1, 100);
    for parent in [left.id, right.id, dest.id] {
        let stored = app.reload(parent).await;
        let live = app
            .engine
            .folders
            .list_children(app.scope(), parent, &page)
            .await
            .unwrap();
        assert_eq!(stored.items_count as u64, live.total_items);
    }
    assert_eq!(app.reload(left.id).await.items_count, 1);
    assert_eq!(app.reload(right.id).await.items_count, 0);
    assert!(!app.reload(right.id).await.has_descendant);
    assert_eq!(app.reload(dest.id).await.items_count, 3);
    assert!(app.reload(dest.id).await.has_descendant);
}

#[tokio::test]
async fn test_bulk_move_rejects_nested_items_without_writes() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;
    let dest = app.folder(None, "Dest").await;

    let err = app
        .engine
        .mover
        .move_item_bulk(&app.operator, app.move_request(&[&a, &b], dest.id))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::NestedBulkItems));
    assert_eq!(app.reload(a.id).await.dir_path, FolderPath::root());
    assert_eq!(app.reload(b.id).await.dir_path, a.children_path());
    assert_eq!(app.reload(dest.id).await.items_count, 0);
}

#[tokio::test]
async fn test_moving_links_follows_folder_shares() {
    let org = OrgId::new();
    let app = helpers::TestApp::new(&[org]);
    let shared = app.folder(None, "Shared").await;
    let inner = app.folder(Some(&shared), "Inner").await;
    let private = app.folder(None, "Private").await;
    app.engine
        .shares
        .share_folders(
            &app.operator,
            ShareFoldersRequest {
                folder_ids: vec![shared.id],
                org_ids: vec![org],
            },
        )
        .await
        .unwrap();

    let material = app.content(ContentType::Material, vec![]).await;
    let link = app.link(Some(&private), material).await;
    assert!(app.grants().await.is_empty());

    app.engine
        .mover
        .move_item_bulk(&app.operator, app.move_request(&[&link], inner.id))
        .await
        .unwrap();
    assert_eq!(app.grants().await, vec![(org, material, shared.id)]);

    // Moving the whole subtree out of the shared folder revokes the grant.
    app.engine
        .mover
        .move_item(&app.operator, move_folder(inner.id, private.id))
        .await
        .unwrap();
    assert!(app.grants().await.is_empty());
}

#[tokio::test]
async fn test_move_rejects_other_partition() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let dest = app.folder(None, "Dest").await;

    let err = app
        .engine
        .mover
        .move_item(
            &app.operator,
            MoveItemRequest {
                partition: "assets".into(),
                ..move_folder(a.id, dest.id)
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::CrossPartitionMove));
}

#[tokio::test]
async fn test_move_rejects_name_taken_at_destination() {
    let app = helpers::TestApp::new(&[]);
    app.folder(None, "X").await;
    let a = app.folder(None, "A").await;
    let inner = app.folder(Some(&a), "X").await;

    let err = app
        .engine
        .mover
        .move_item(&app.operator, move_folder(inner.id, FolderId::ROOT))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::DuplicateName));

    let top = app
        .engine
        .folders
        .list_children(app.scope(), FolderId::ROOT, &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(top.items.iter().filter(|item| item.name == "X").count(), 1);
    assert_eq!(app.reload(a.id).await.items_count, 1);
}

#[tokio::test]
async fn test_failed_move_commit_changes_nothing() {
    let org = OrgId::new();
    let app = helpers::TestApp::new(&[org]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;
    let c = app.folder(Some(&b), "C").await;
    let material = app.content(ContentType::Material, vec![]).await;
    let link = app.link(Some(&c), material).await;
    app.engine
        .shares
        .share_folders(
            &app.operator,
            ShareFoldersRequest {
                folder_ids: vec![a.id],
                org_ids: vec![org],
            },
        )
        .await
        .unwrap();
    let grants = app.grants().await;

    app.store.fail_next_commit();
    assert!(
        app.engine
            .mover
            .move_item(&app.operator, move_folder(b.id, FolderId::ROOT))
            .await
            .is_err()
    );

    assert_eq!(app.reload(b.id).await.dir_path, a.children_path());
    assert_eq!(app.reload(c.id).await.dir_path, b.children_path());
    assert_eq!(app.reload(link.id).await.dir_path, c.children_path());
    assert_eq!(app.reload(a.id).await.items_count, 1);
    let rows = app.store.get_contents(&[material]).await.unwrap();
    assert_eq!(rows[0].dir_path, c.children_path());
    assert_eq!(app.grants().await, grants);
    assert_eq!(grants, vec![(org, material, a.id)]);
}
