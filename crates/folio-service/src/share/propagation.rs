//! Propagation of folder shares to per-content grants.
//!
//! For every share `(folder F, org O)` each shareable content below F holds
//! a grant `(O, content, F)`, keyed by the content's latest version id. Plans
//! contribute their sub-contents as well. Share changes, moves, link creation
//! and link deletion all keep that relation by emitting grant and revoke
//! sections into the caller's [`ChangeSet`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use folio_core::result::AppResult;
use folio_core::types::{ContentId, FolderId, OrgId, UserId};
use folio_database::{ChangeSet, FolderStore, ShareStore, Store};
use folio_entity::content::SubContents;
use folio_entity::folder::{FolderCondition, FolderItem, ItemType};
use folio_entity::share::{AuthedContentCondition, AuthedContentRecord, SharedFolderRecord};

use crate::content::ContentVersionResolver;
use crate::context::Operator;

/// Computes grant changes caused by shares and structural changes.
#[derive(Debug, Clone)]
pub struct AuthorizationPropagator {
    store: Arc<dyn Store>,
    resolver: ContentVersionResolver,
}

impl AuthorizationPropagator {
    /// Creates a new propagator.
    pub fn new(store: Arc<dyn Store>, resolver: ContentVersionResolver) -> Self {
        Self { store, resolver }
    }

    /// The version resolver used for every lookup.
    pub fn resolver(&self) -> &ContentVersionResolver {
        &self.resolver
    }

    /// Latest ids of every shareable content reachable from `ids`.
    ///
    /// Plans are expanded into their sub-contents, transitively; assets and
    /// unknown ids drop out.
    pub async fn content_set(&self, ids: &[ContentId]) -> AppResult<BTreeSet<ContentId>> {
        let mut result = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending = ids.to_vec();

        while !pending.is_empty() {
            let rows = self.resolver.latest_contents(&pending).await?;
            pending.clear();
            for row in rows {
                if !visited.insert(row.id) || !row.shareable() {
                    continue;
                }
                result.insert(row.id);
                pending.extend(
                    row.sub_content_ids()
                        .iter()
                        .filter(|id| !visited.contains(*id))
                        .copied(),
                );
            }
        }
        Ok(result)
    }

    /// Content ids linked anywhere below `folder`.
    ///
    /// Links covered by `excluded` (the items themselves or, for folders,
    /// their subtrees) are left out.
    pub async fn linked_contents(
        &self,
        folder: &FolderItem,
        excluded: &[FolderItem],
    ) -> AppResult<Vec<ContentId>> {
        let condition = FolderCondition {
            item_type: Some(ItemType::File),
            ..FolderCondition::under(folder.children_path())
        };
        let links = self.store.find_items(&condition).await?;
        Ok(links
            .into_iter()
            .filter(|link| !excluded.iter().any(|item| covers(item, link)))
            .filter_map(|link| link.link)
            .collect())
    }

    /// Shareable content set of a folder's whole subtree.
    pub async fn folder_content_set(&self, folder: &FolderItem) -> AppResult<BTreeSet<ContentId>> {
        let links = self.linked_contents(folder, &[]).await?;
        self.content_set(&links).await
    }

    /// Grant changes for contents leaving `from_chain` and entering `to_chain`.
    ///
    /// Chains list folder ids, root-most first, and include the moved folder
    /// itself when a folder moves. Folders on both chains keep their grants.
    /// Each sharing folder only on the old chain loses the grants of the
    /// moved contents, except those still reachable through links that stay
    /// below it; `moved` names every item leaving, so a bulk move can pass
    /// the whole batch. Each sharing folder only on the new chain gains
    /// grants attributed to itself.
    pub async fn reconcile_move(
        &self,
        contents: &[ContentId],
        moved: &[FolderItem],
        from_chain: &[FolderId],
        to_chain: &[FolderId],
        operator: &Operator,
    ) -> AppResult<ChangeSet> {
        let from_only: Vec<FolderId> = only_in(from_chain, to_chain);
        let to_only: Vec<FolderId> = only_in(to_chain, from_chain);
        if contents.is_empty() || (from_only.is_empty() && to_only.is_empty()) {
            return Ok(ChangeSet::new());
        }

        let carriers: Vec<FolderId> = from_only.iter().chain(&to_only).copied().collect();
        let shares = group_shares(self.store.shared_records(&carriers).await?);
        if shares.is_empty() {
            return Ok(ChangeSet::new());
        }

        let moving = self.content_set(contents).await?;
        if moving.is_empty() {
            return Ok(ChangeSet::new());
        }

        let mut changes = ChangeSet::new();

        let revoking: Vec<FolderId> = from_only
            .iter()
            .filter(|id| shares.contains_key(*id))
            .copied()
            .collect();
        for folder in self.store.get_items(&revoking).await? {
            let Some(orgs) = shares.get(&folder.id) else {
                continue;
            };
            let staying = self.linked_contents(&folder, moved).await?;
            let retained = self.content_set(&staying).await?;
            let revoked: Vec<ContentId> = moving.difference(&retained).copied().collect();
            if revoked.is_empty() {
                continue;
            }
            changes.revoke_authed.push(AuthedContentCondition {
                org_ids: orgs.iter().copied().collect(),
                content_ids: revoked,
                from_folder_ids: vec![folder.id],
            });
        }

        for folder_id in &to_only {
            if let Some(orgs) = shares.get(folder_id) {
                changes
                    .grant_authed
                    .extend(grants(orgs, &moving, *folder_id, operator.user_id));
            }
        }

        debug!(
            contents = moving.len(),
            revoked_folders = changes.revoke_authed.len(),
            granted = changes.grant_authed.len(),
            "Reconciled grants for moved contents"
        );
        Ok(changes)
    }
}

/// Grants of every content in `contents` to every org in `orgs`, attributed
/// to `folder`.
pub(crate) fn grants<'a>(
    orgs: impl IntoIterator<Item = &'a OrgId>,
    contents: &BTreeSet<ContentId>,
    folder: FolderId,
    creator: UserId,
) -> Vec<AuthedContentRecord> {
    orgs.into_iter()
        .flat_map(|org| {
            contents
                .iter()
                .map(move |content| AuthedContentRecord::new(*org, *content, folder, creator))
        })
        .collect()
}

/// Share records grouped into the org set of each folder.
pub(crate) fn group_shares(records: Vec<SharedFolderRecord>) -> BTreeMap<FolderId, BTreeSet<OrgId>> {
    let mut grouped: BTreeMap<FolderId, BTreeSet<OrgId>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.folder_id).or_default().insert(record.org_id);
    }
    grouped
}

fn only_in(chain: &[FolderId], other: &[FolderId]) -> Vec<FolderId> {
    chain
        .iter()
        .filter(|id| !id.is_root() && !other.contains(id))
        .copied()
        .collect()
}

fn covers(item: &FolderItem, link: &FolderItem) -> bool {
    item.id == link.id || (item.is_folder() && item.children_path().contains(&link.dir_path))
}
