//! Card endpoints
//!
//! The list endpoint always answers 200; failed cards carry an `error`.

use super::{request_context, AppState};
use crate::card::{resolve_all, resolve_one, CardResult};
use crate::context::ViewContext;
use crate::error::PanelError;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

pub(super) async fn index(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, PanelError> {
    let resource = state.resource(&resource)?;
    let ctx = request_context(&headers, ViewContext::List, &resource.name);

    let results = resolve_all(
        &ctx,
        &resource.cards,
        Arc::clone(&state.store),
        &state.cards,
        state.sink.as_ref(),
    )
    .await;

    let data: Vec<Value> = results.into_iter().map(CardResult::into_value).collect();
    Ok(Json(json!({ "data": data })))
}

pub(super) async fn show(
    State(state): State<AppState>,
    Path((resource, index)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, PanelError> {
    let resource = state.resource(&resource)?;
    let ctx = request_context(&headers, ViewContext::Detail, &resource.name);

    let payload = resolve_one(
        &ctx,
        &resource.cards,
        &index,
        state.store.as_ref(),
        &state.cards,
        state.sink.as_ref(),
    )
    .await?;

    Ok(Json(json!({ "data": payload })))
}
