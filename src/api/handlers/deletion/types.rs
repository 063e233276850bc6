//! Request/response types for the deletion routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which upstream function a deletion request is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionKind {
    /// Remove the user's data but keep the login.
    Data,
    /// Remove the account and all associated data.
    Account,
}

impl DeletionKind {
    /// Route segment under `/api/`.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Data => "delete-data",
            Self::Account => "delete-account",
        }
    }
}

/// Body sent to the upstream deletion function.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub user_id: String,
}

/// Success body returned to the caller.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeletionAccepted {
    pub ok: bool,
}

/// Failure body returned to the caller.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeletionFailure {
    pub error: String,
}
