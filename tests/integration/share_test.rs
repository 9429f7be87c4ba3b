//! Integration tests for folder sharing and content authorization.

mod helpers;

use std::sync::Arc;

use folio_core::error::ErrorCode;
use folio_core::traits::directory::RegionScope;
use folio_core::types::{ContentId, FolderId, OrgId};
use folio_entity::content::{ContentInfo, ContentType};
use folio_entity::folder::FolderPath;
use folio_service::ShareFoldersRequest;

fn share(folder: FolderId, orgs: &[OrgId]) -> ShareFoldersRequest {
    ShareFoldersRequest {
        folder_ids: vec![folder],
        org_ids: orgs.to_vec(),
    }
}

#[tokio::test]
async fn test_reshare_converges_to_requested_orgs() {
    let (o1, o2, o3) = (OrgId::new(), OrgId::new(), OrgId::new());
    let app = helpers::TestApp::new(&[o1, o2, o3]);
    let folder = app.folder(None, "Shared").await;
    let nested = app.folder(Some(&folder), "Nested").await;
    let m1 = app.content(ContentType::Material, vec![]).await;
    let m2 = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&folder), m1).await;
    app.link(Some(&nested), m2).await;

    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[o1, o2]))
        .await
        .unwrap();
    let changes = app
        .engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[o2, o3]))
        .await
        .unwrap();
    assert_eq!(changes[0].added_orgs, vec![o3]);
    assert_eq!(changes[0].removed_orgs, vec![o1]);

    let mut expected = vec![o2, o3];
    expected.sort();
    for content in [m1, m2] {
        assert_eq!(app.orgs_on(content).await, expected);
    }
    assert!(app.grants().await.iter().all(|(org, _, _)| *org != o1));

    let shares = app.engine.shares.list_folder_shares(&[folder.id]).await.unwrap();
    let mut listed = shares[&folder.id].clone();
    listed.sort();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_plans_expand_and_assets_are_skipped() {
    let org = OrgId::new();
    let app = helpers::TestApp::new(&[org]);
    let folder = app.folder(None, "Lessons").await;
    let m1 = app.content(ContentType::Material, vec![]).await;
    let m2 = app.content(ContentType::Material, vec![]).await;
    let plan = app.content(ContentType::Plan, vec![m1, m2]).await;
    let asset = app.content(ContentType::Assets, vec![]).await;
    app.link(Some(&folder), plan).await;
    app.link(Some(&folder), asset).await;

    let changes = app
        .engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[org]))
        .await
        .unwrap();
    assert_eq!(changes[0].granted, 3);
    for content in [plan, m1, m2] {
        assert_eq!(app.orgs_on(content).await, vec![org]);
    }
    assert!(app.orgs_on(asset).await.is_empty());

    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[]))
        .await
        .unwrap();
    assert!(app.grants().await.is_empty());
    assert!(app.store.all_shares().await.is_empty());
}

#[tokio::test]
async fn test_restricted_headquarters_stays_in_region() {
    let (member, outsider) = (OrgId::new(), OrgId::new());
    let app = helpers::TestApp::with_scope(RegionScope::Restricted(vec![member]), &[member, outsider]);
    let folder = app.folder(None, "Regional").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&folder), material).await;

    for orgs in [vec![member, outsider], vec![OrgId::ALL]] {
        let err = app
            .engine
            .shares
            .share_folders(&app.operator, share(folder.id, &orgs))
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::UnsupportedRegion));
    }
    assert!(app.store.all_shares().await.is_empty());
    assert!(app.grants().await.is_empty());

    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[member]))
        .await
        .unwrap();
    assert_eq!(app.grants().await, vec![(member, material, folder.id)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shares_serialize() {
    let (o1, o2) = (OrgId::new(), OrgId::new());
    let app = Arc::new(helpers::TestApp::new(&[o1, o2]));
    let folder = app.folder(None, "Contended").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&folder), material).await;

    let tasks: Vec<_> = [o1, o2]
        .into_iter()
        .map(|org| {
            let app = Arc::clone(&app);
            let folder_id = folder.id;
            tokio::spawn(async move {
                app.engine
                    .shares
                    .share_folders(&app.operator, share(folder_id, &[org]))
                    .await
            })
        })
        .collect();

    let mut removed = 0;
    for task in futures::future::join_all(tasks).await {
        let changes = task.expect("share task panicked").expect("share failed");
        removed += changes[0].removed_orgs.len();
    }

    // Whichever share ran second saw the first one and replaced it.
    assert_eq!(removed, 1);
    let shares = app.store.all_shares().await;
    assert_eq!(shares.len(), 1);
    assert_eq!(app.grants().await, vec![(shares[0].org_id, material, folder.id)]);
}

#[tokio::test]
async fn test_grants_follow_new_versions() {
    let org = OrgId::new();
    let app = helpers::TestApp::new(&[org]);
    let folder = app.folder(None, "Versioned").await;
    let v1 = app.content(ContentType::Material, vec![]).await;
    let v2 = ContentId::new();
    for (id, source) in [(v1, None), (v2, Some(v1))] {
        app.store
            .put_content(ContentInfo {
                id,
                name: "worksheet".into(),
                org: app.operator.org_id,
                content_type: ContentType::Material,
                sub_content_ids: Vec::new(),
                source_id: source,
                latest_id: v2,
                dir_path: FolderPath::root(),
            })
            .await;
    }

    // The link still names v1; sharing resolves it to the latest version.
    app.link(Some(&folder), v1).await;
    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[org]))
        .await
        .unwrap();
    assert_eq!(app.grants().await, vec![(org, v2, folder.id)]);
}

#[tokio::test]
async fn test_direct_grants_survive_unshare() {
    let org = OrgId::new();
    let app = helpers::TestApp::new(&[org]);
    let folder = app.folder(None, "Mixed").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&folder), material).await;

    app.engine.authed.add(&app.operator, org, &[material]).await.unwrap();
    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[org]))
        .await
        .unwrap();
    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[]))
        .await
        .unwrap();

    assert_eq!(app.grants().await, vec![(org, material, FolderId::ROOT)]);
}

#[tokio::test]
async fn test_failed_share_commit_leaves_no_state() {
    let (o1, o2) = (OrgId::new(), OrgId::new());
    let app = helpers::TestApp::new(&[o1, o2]);
    let folder = app.folder(None, "Shared").await;
    let material = app.content(ContentType::Material, vec![]).await;
    app.link(Some(&folder), material).await;

    app.store.fail_next_commit();
    assert!(
        app.engine
            .shares
            .share_folders(&app.operator, share(folder.id, &[o1]))
            .await
            .is_err()
    );
    assert!(app.store.all_shares().await.is_empty());
    assert!(app.grants().await.is_empty());

    app.engine
        .shares
        .share_folders(&app.operator, share(folder.id, &[o1]))
        .await
        .unwrap();
    app.store.fail_next_commit();
    assert!(
        app.engine
            .shares
            .share_folders(&app.operator, share(folder.id, &[o2]))
            .await
            .is_err()
    );
    let shares = app.store.all_shares().await;
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].org_id, o1);
    assert_eq!(app.grants().await, vec![(o1, material, folder.id)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_share_racing_link_move_keeps_grant() {
    let org = OrgId::new();
    let app = Arc::new(helpers::TestApp::new(&[org]));

    for round in 0..20 {
        let a = app.folder(None, &format!("A{round}")).await;
        let b = app.folder(Some(&a), "B").await;
        let material = app.content(ContentType::Material, vec![]).await;
        let link = app.link(None, material).await;

        let sharer = {
            let app = Arc::clone(&app);
            let request = share(a.id, &[org]);
            tokio::spawn(async move { app.engine.shares.share_folders(&app.operator, request).await })
        };
        let mover = {
            let app = Arc::clone(&app);
            let request = app.move_request(&[&link], b.id);
            tokio::spawn(async move { app.engine.mover.move_item_bulk(&app.operator, request).await })
        };
        sharer.await.expect("share task panicked").expect("share failed");
        mover.await.expect("move task panicked").expect("move failed");

        let grants: Vec<_> = app
            .grants()
            .await
            .into_iter()
            .filter(|(_, content, _)| *content == material)
            .collect();
        assert_eq!(grants, vec![(org, material, a.id)], "round {round}");
    }
}
