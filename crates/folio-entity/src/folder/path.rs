//! Materialized folder paths.
//!
//! A [`FolderPath`] is the ordered list of ancestor ids of an item, joined by
//! `/`, ending just above the item itself. Top-level items carry the root
//! path `/`. The path of everything placed inside a folder is that folder's
//! [`FolderPath::child`] path, so the descendants of a folder are exactly the
//! rows whose `dir_path` is at or below `folder.children_path()`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use folio_core::error::AppError;
use folio_core::types::FolderId;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Materialized ancestor path of a folder item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct FolderPath(String);

impl FolderPath {
    /// The root path shared by every top-level item.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of ancestors encoded in the path.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Path of the items placed inside `id`, when `id` sits at this path.
    pub fn child(&self, id: FolderId) -> Self {
        if self.is_root() {
            Self(format!("{SEPARATOR}{id}"))
        } else {
            Self(format!("{}{SEPARATOR}{id}", self.0))
        }
    }

    /// Whether `other` is this path or lies below it.
    ///
    /// The test is separator aware: `/a` does not contain `/ab`.
    pub fn contains(&self, other: &FolderPath) -> bool {
        if self.is_root() {
            return true;
        }
        match other.0.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    /// Ancestor ids, root-most first.
    pub fn ancestor_ids(&self) -> Vec<FolderId> {
        self.segments()
            .filter_map(|segment| segment.parse().ok())
            .collect()
    }

    /// The direct parent id encoded by this path.
    pub fn parent_id(&self) -> FolderId {
        self.segments()
            .last()
            .and_then(|segment| segment.parse().ok())
            .unwrap_or(FolderId::ROOT)
    }

    /// Move this path from under `from` to under `to`.
    ///
    /// Returns `None` when the path does not lie at or below `from`. Either
    /// side may be the root path; the rewrite works on whole segments, never
    /// on raw substrings.
    pub fn rebase(&self, from: &FolderPath, to: &FolderPath) -> Option<Self> {
        if !from.contains(self) {
            return None;
        }
        let rest: Vec<&str> = self.segments().skip(from.depth()).collect();
        if rest.is_empty() {
            return Some(to.clone());
        }
        let joined = rest.join(&SEPARATOR.to_string());
        if to.is_root() {
            Some(Self(format!("{SEPARATOR}{joined}")))
        } else {
            Some(Self(format!("{}{SEPARATOR}{joined}", to.0)))
        }
    }

    /// SQL `LIKE` pattern matching every path strictly below this one.
    pub fn descendants_pattern(&self) -> String {
        if self.is_root() {
            format!("{SEPARATOR}%")
        } else {
            format!("{}{SEPARATOR}%", escape_like(&self.0))
        }
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|segment| !segment.is_empty())
    }
}

impl Default for FolderPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FolderPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with(SEPARATOR) {
            return Err(AppError::validation(format!(
                "Folder path '{s}' must start with '{SEPARATOR}'"
            )));
        }
        let mut path = Self::root();
        for segment in s.split(SEPARATOR).filter(|segment| !segment.is_empty()) {
            let id: FolderId = segment.parse().map_err(|_| {
                AppError::validation(format!("Invalid folder id '{segment}' in path '{s}'"))
            })?;
            path = path.child(id);
        }
        Ok(path)
    }
}

/// Escapes `LIKE` wildcards so `value` matches itself literally.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
