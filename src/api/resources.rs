//! List and detail endpoints

use super::{request_context, AppState};
use crate::context::ViewContext;
use crate::error::PanelError;
use crate::query::parse_query;
use crate::resource::{list_records, show_record};
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

pub(super) async fn index(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, PanelError> {
    let resource = state.resource(&resource)?;
    let ctx = request_context(&headers, ViewContext::List, &resource.name);
    let query = parse_query(raw.as_deref().unwrap_or_default(), &resource.name, &state.limits);

    tracing::debug!(
        resource = %resource.name,
        request_id = %ctx.request_id,
        page = query.page,
        per_page = query.per_page,
        "list request"
    );

    list_records(&ctx, &resource, &query, state.store.as_ref())
        .await
        .map(Json)
}

pub(super) async fn show(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, PanelError> {
    let resource = state.resource(&resource)?;
    let ctx = request_context(&headers, ViewContext::Detail, &resource.name);
    let query = parse_query(raw.as_deref().unwrap_or_default(), &resource.name, &state.limits);

    tracing::debug!(
        resource = %resource.name,
        request_id = %ctx.request_id,
        id = %id,
        "detail request"
    );

    show_record(&ctx, &resource, &id, &query.with, state.store.as_ref())
        .await
        .map(Json)
}
