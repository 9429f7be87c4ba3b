//! Integration tests for folder creation, links, deletion and repair.

mod helpers;

use folio_core::error::ErrorCode;
use folio_core::types::{FolderId, PageRequest};
use folio_database::ContentStore;
use folio_entity::content::ContentType;
use folio_entity::folder::{FolderCondition, FolderPath, ItemType};
use folio_service::UpdateFolderRequest;

#[tokio::test]
async fn test_nested_folders_carry_parent_paths() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;
    let c = app.folder(Some(&b), "C").await;

    assert_eq!(a.dir_path, FolderPath::root());
    assert_eq!(b.dir_path, a.children_path());
    assert_eq!(c.dir_path, b.children_path());
    assert_eq!(c.ancestor_ids(), vec![a.id, b.id]);

    let a = app.reload(a.id).await;
    assert_eq!(a.items_count, 1);

    let roots = app
        .engine
        .folders
        .list_children(app.scope(), FolderId::ROOT, &PageRequest::new(1, 50))
        .await
        .unwrap();
    assert_eq!(roots.total_items, 1);
    assert_eq!(roots.items[0].id, a.id);

    let tree = app.engine.folders.folder_tree(app.scope()).await.unwrap();
    assert_eq!(tree.total_folders, 3);
    assert_eq!(tree.roots[0].children[0].children[0].id, c.id);
}

#[tokio::test]
async fn test_sibling_names_are_unique() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    app.folder(Some(&a), "Notes").await;

    let err = app
        .engine
        .folders
        .create_folder(&app.operator, app.create_request(Some(&a), "Notes"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::DuplicateName));

    // The same name is fine under another parent.
    let b = app.folder(None, "B").await;
    app.folder(Some(&b), "Notes").await;
}

#[tokio::test]
async fn test_links_store_content_paths() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let material = app.content(ContentType::Material, vec![]).await;
    let link = app.link(Some(&a), material).await;

    assert_eq!(link.link, Some(material));
    assert_eq!(link.dir_path, a.children_path());
    let stored = app.store.get_contents(&[material]).await.unwrap();
    assert_eq!(stored[0].dir_path, a.children_path());

    let a = app.reload(a.id).await;
    assert_eq!(a.items_count, 1);
    assert!(a.has_descendant);
}

#[tokio::test]
async fn test_delete_requires_empty_folder() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let material = app.content(ContentType::Material, vec![]).await;
    let link = app.link(Some(&a), material).await;

    let err = app
        .engine
        .folders
        .delete_folder(&app.operator, a.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::FolderNotEmpty));

    app.engine.folders.delete_folder(&app.operator, link.id).await.unwrap();
    assert_eq!(app.reload(a.id).await.items_count, 0);

    app.engine.folders.delete_folder(&app.operator, a.id).await.unwrap();
    let err = app.engine.folders.get_folder(a.id).await.unwrap_err();
    assert!(err.is(ErrorCode::FolderNotFound));
}

#[tokio::test]
async fn test_rename_keeps_position() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    let b = app.folder(Some(&a), "B").await;

    let renamed = app
        .engine
        .folders
        .update_folder(
            &app.operator,
            b.id,
            UpdateFolderRequest {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.dir_path, b.dir_path);
    assert_eq!(renamed.editor, Some(app.operator.user_id));
}

#[tokio::test]
async fn test_repair_on_consistent_tree_changes_nothing() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "A").await;
    app.folder(Some(&a), "B").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&a), material).await;

    let fixed = app.engine.folders.repair_tree(app.scope()).await.unwrap();
    assert_eq!(fixed, 0);
    assert_eq!(app.reload(a.id).await.items_count, 2);
}

#[tokio::test]
async fn test_search_by_name_and_subtree() {
    let app = helpers::TestApp::new(&[]);
    let a = app.folder(None, "Algebra").await;
    let b = app.folder(Some(&a), "Linear algebra").await;
    let other = app.folder(None, "Biology").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&b), material).await;

    let page = PageRequest::new(1, 50);
    let by_name = app
        .engine
        .folders
        .search_folders(
            &FolderCondition {
                name_like: Some("lgebra".into()),
                ..Default::default()
            },
            &page,
        )
        .await
        .unwrap();
    assert_eq!(by_name.total_items, 2);

    let folders_below = app
        .engine
        .folders
        .search_folders(
            &FolderCondition {
                item_type: Some(ItemType::Folder),
                ..FolderCondition::under(a.children_path())
            },
            &page,
        )
        .await
        .unwrap();
    assert_eq!(folders_below.items.len(), 1);
    assert_eq!(folders_below.items[0].id, b.id);

    let found = app
        .engine
        .folders
        .get_folders(&[a.id, other.id, FolderId::new()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}
