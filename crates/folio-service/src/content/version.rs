//! Resolution of content ids to the head of their version chain.
//!
//! Grants are always keyed by the latest id. Folder links keep whatever id
//! they were created with, so callers need the reverse direction too: from
//! a latest id back to the linked ids it stands for.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use folio_core::result::AppResult;
use folio_core::types::ContentId;
use folio_database::{ContentStore, Store};
use folio_entity::content::ContentInfo;

/// Forward and reverse mapping between requested and latest content ids.
#[derive(Debug, Clone, Default)]
pub struct LatestMap {
    forward: HashMap<ContentId, ContentId>,
    reverse: HashMap<ContentId, Vec<ContentId>>,
    missing: Vec<ContentId>,
}

impl LatestMap {
    fn insert(&mut self, requested: ContentId, latest: ContentId) {
        if self.forward.insert(requested, latest).is_none() {
            self.reverse.entry(latest).or_default().push(requested);
        }
    }

    /// Latest id of `id`, if `id` is known.
    pub fn latest(&self, id: ContentId) -> Option<ContentId> {
        self.forward.get(&id).copied()
    }

    /// Requested ids that resolve to `latest`.
    pub fn originals(&self, latest: ContentId) -> &[ContentId] {
        self.reverse.get(&latest).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct latest ids, sorted.
    pub fn latest_ids(&self) -> Vec<ContentId> {
        self.forward
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Requested ids the content directory does not know.
    pub fn missing(&self) -> &[ContentId] {
        &self.missing
    }

    /// Whether no requested id resolved.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Resolves content ids through the content directory.
#[derive(Debug, Clone)]
pub struct ContentVersionResolver {
    store: Arc<dyn Store>,
}

impl ContentVersionResolver {
    /// Creates a new resolver.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Map every id in `ids` to its latest version.
    pub async fn resolve_latest(&self, ids: &[ContentId]) -> AppResult<LatestMap> {
        let mut requested: Vec<ContentId> = ids.to_vec();
        requested.sort();
        requested.dedup();

        let latest = self.store.latest_ids(&requested).await?;
        let mut map = LatestMap::default();
        for id in requested {
            match latest.get(&id) {
                Some(head) => map.insert(id, *head),
                None => map.missing.push(id),
            }
        }
        Ok(map)
    }

    /// Rows of the latest versions of `ids`; unknown ids are skipped.
    pub async fn latest_contents(&self, ids: &[ContentId]) -> AppResult<Vec<ContentInfo>> {
        let map = self.resolve_latest(ids).await?;
        self.store.get_contents(&map.latest_ids()).await
    }
}
