//! HTTP API
//!
//! Thin axum adapter over the resource and card engines. Authentication is
//! expected in front of this service; the caller identity arrives in the
//! `x-panel-user` / `x-panel-role` headers.

use crate::card::CardSettings;
use crate::context::{Principal, RequestContext, ViewContext};
use crate::error::PanelError;
use crate::notification::{FailureSink, NotificationLog, TracingSink};
use crate::query::PageLimits;
use crate::resource::{Registry, Resource};
use crate::store::DataProvider;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

mod cards;
mod resources;

pub const USER_HEADER: &str = "x-panel-user";
pub const ROLE_HEADER: &str = "x-panel-role";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub store: Arc<dyn DataProvider>,
    pub limits: PageLimits,
    pub cards: CardSettings,
    pub sink: Arc<dyn FailureSink>,
    /// Failure history served at `/api/notifications`, when kept
    pub notifications: Option<Arc<NotificationLog>>,
}

impl AppState {
    pub fn new(registry: Registry, store: Arc<dyn DataProvider>) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            limits: PageLimits::default(),
            cards: CardSettings::default(),
            sink: Arc::new(TracingSink),
            notifications: None,
        }
    }

    pub fn with_limits(mut self, limits: PageLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_card_settings(mut self, cards: CardSettings) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Record card failures in `log` and serve them
    pub fn with_notifications(mut self, log: Arc<NotificationLog>) -> Self {
        self.sink = log.clone();
        self.notifications = Some(log);
        self
    }

    fn resource(&self, name: &str) -> Result<Arc<Resource>, PanelError> {
        self.registry
            .get(name)
            .ok_or_else(|| PanelError::not_found("Resource"))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/notifications", get(list_notifications))
        .route("/api/resources", get(list_resources))
        .route("/api/resources/{resource}", get(resources::index))
        .route("/api/resources/{resource}/cards", get(cards::index))
        .route("/api/resources/{resource}/cards/{index}", get(cards::show))
        .route("/api/resources/{resource}/{id}", get(resources::show))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_resources(State(state): State<AppState>) -> Json<Value> {
    let data: Vec<Value> = state
        .registry
        .iter()
        .map(|r| json!({ "name": r.name, "title": r.title }))
        .collect();
    Json(json!({ "data": data }))
}

async fn list_notifications(State(state): State<AppState>) -> Json<Value> {
    let data = state
        .notifications
        .as_ref()
        .map(|log| log.recent())
        .unwrap_or_default();
    Json(json!({ "data": data }))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the request context from the identity headers
pub fn request_context(headers: &HeaderMap, view: ViewContext, resource: &str) -> RequestContext {
    let mut ctx = RequestContext::new(view, resource);

    if let Some(request_id) = header_str(headers, REQUEST_ID_HEADER).and_then(|v| Uuid::parse_str(v).ok()) {
        ctx.request_id = request_id;
    }

    if let Some(user) = header_str(headers, USER_HEADER) {
        ctx = ctx.with_principal(Principal {
            id: user.to_string(),
            role: header_str(headers, ROLE_HEADER).map(str::to_string),
        });
    }

    ctx
}
