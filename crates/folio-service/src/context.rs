//! The acting user and organization of an engine call.

use serde::{Deserialize, Serialize};
use validator::Validate;

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::types::{OrgId, UserId};

/// Who performs an operation.
///
/// Built by the outer API layer from the authenticated session and passed
/// into every mutating service method, so records carry their creator and
/// share prechecks know the acting organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// The acting user.
    pub user_id: UserId,
    /// The organization the user acts for.
    pub org_id: OrgId,
}

impl Operator {
    /// Creates a new operator.
    pub fn new(user_id: UserId, org_id: OrgId) -> Self {
        Self { user_id, org_id }
    }
}

/// Run `validator` rules on a request DTO.
pub(crate) fn validate_request<T: Validate>(request: &T) -> AppResult<()> {
    request
        .validate()
        .map_err(|e| AppError::with_source(folio_core::ErrorKind::Validation, e.to_string(), e))
}
