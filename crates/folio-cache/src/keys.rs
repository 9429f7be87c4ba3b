//! Cache key builders for all Folio cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use std::fmt::Display;

use uuid::Uuid;

/// Prefix applied to all Folio cache keys.
const PREFIX: &str = "folio";

// ── Lock keys ──────────────────────────────────────────────

/// Lock serializing structural changes and shares of one folder item.
pub fn folder_lock(folder_id: impl Display) -> String {
    format!("{PREFIX}:lock:folder:{folder_id}")
}

/// Lock serializing creates and renames of one name inside one tree.
///
/// The name is used verbatim: uniqueness is case-sensitive.
pub fn folder_name_lock(
    owner_type: impl Display,
    owner: Uuid,
    partition: impl Display,
    name: &str,
) -> String {
    format!("{PREFIX}:lock:folder_name:{owner_type}:{owner}:{partition}:{name}")
}

/// Lock serializing direct content authorization for one organization.
pub fn org_lock(org_id: impl Display) -> String {
    format!("{PREFIX}:lock:org:{org_id}")
}

/// Whether `key` was built by one of the lock key builders above.
pub fn is_lock_key(key: &str) -> bool {
    key.strip_prefix(PREFIX)
        .is_some_and(|rest| rest.starts_with(":lock:"))
}
