//! Deletion proxy routes.
//!
//! Both routes share [`forward_deletion`]; they differ only in the upstream
//! function they target.

mod forward;
mod types;

pub use forward::{
    DEFAULT_DELETE_ACCOUNT_URL, DEFAULT_DELETE_DATA_URL, DeletionProxy, ForwardOutcome,
    ProxyConfig, forward_deletion,
};
pub use types::{DeletionAccepted, DeletionFailure, DeletionKind, DeletionRequest};

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse};
use std::sync::Arc;
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/api/delete-data",
    responses(
        (status = 200, description = "Data deletion accepted", body = DeletionAccepted, content_type = "application/json"),
        (status = 401, description = "Missing or unreadable bearer credential", body = DeletionFailure),
        (status = 502, description = "Upstream function returned non-JSON", body = DeletionFailure),
        (status = 500, description = "Upstream function unreachable", body = DeletionFailure),
    ),
    security(("bearer" = [])),
    tag = "deletion"
)]
#[instrument(skip(headers, proxy))]
pub async fn delete_data(
    headers: HeaderMap,
    proxy: Extension<Arc<DeletionProxy>>,
) -> impl IntoResponse {
    proxy.forward(DeletionKind::Data, &headers).await
}

#[utoipa::path(
    post,
    path = "/api/delete-account",
    responses(
        (status = 200, description = "Account deletion accepted", body = DeletionAccepted, content_type = "application/json"),
        (status = 401, description = "Missing or unreadable bearer credential", body = DeletionFailure),
        (status = 502, description = "Upstream function returned non-JSON", body = DeletionFailure),
        (status = 500, description = "Upstream function unreachable", body = DeletionFailure),
    ),
    security(("bearer" = [])),
    tag = "deletion"
)]
#[instrument(skip(headers, proxy))]
pub async fn delete_account(
    headers: HeaderMap,
    proxy: Extension<Arc<DeletionProxy>>,
) -> impl IntoResponse {
    proxy.forward(DeletionKind::Account, &headers).await
}
