//! Policy Gate
//!
//! Authorization capability consulted once per list and once per record.
//! A resource without a policy permits everything.

use crate::context::RequestContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Per-resource authorization rules
///
/// `record` is `None` for list-level checks of the per-record abilities.
pub trait ResourcePolicy: Send + Sync {
    fn view_any(&self, ctx: &RequestContext) -> bool;
    fn create(&self, ctx: &RequestContext) -> bool;
    fn view(&self, ctx: &RequestContext, record: Option<&Value>) -> bool;
    fn update(&self, ctx: &RequestContext, record: Option<&Value>) -> bool;
    fn delete(&self, ctx: &RequestContext, record: Option<&Value>) -> bool;
}

/// Decisions embedded into each resolved record under `policy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordPolicy {
    pub view: bool,
    pub update: bool,
    pub delete: bool,
}

/// Decisions embedded into list metadata under `meta.policy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListPolicy {
    pub create: bool,
    pub view_any: bool,
    pub update: bool,
    pub delete: bool,
}

/// Optional policy; every check passes when none is configured
#[derive(Clone, Default)]
pub struct PolicyGate {
    policy: Option<Arc<dyn ResourcePolicy>>,
}

impl fmt::Debug for PolicyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyGate")
            .field("configured", &self.policy.is_some())
            .finish()
    }
}

impl PolicyGate {
    pub fn new(policy: Arc<dyn ResourcePolicy>) -> Self {
        Self {
            policy: Some(policy),
        }
    }

    pub fn permit_all() -> Self {
        Self::default()
    }

    pub fn view_any(&self, ctx: &RequestContext) -> bool {
        self.policy.as_ref().map_or(true, |p| p.view_any(ctx))
    }

    pub fn create(&self, ctx: &RequestContext) -> bool {
        self.policy.as_ref().map_or(true, |p| p.create(ctx))
    }

    pub fn view(&self, ctx: &RequestContext, record: Option<&Value>) -> bool {
        self.policy.as_ref().map_or(true, |p| p.view(ctx, record))
    }

    pub fn update(&self, ctx: &RequestContext, record: Option<&Value>) -> bool {
        self.policy.as_ref().map_or(true, |p| p.update(ctx, record))
    }

    pub fn delete(&self, ctx: &RequestContext, record: Option<&Value>) -> bool {
        self.policy.as_ref().map_or(true, |p| p.delete(ctx, record))
    }

    pub fn record_decisions(&self, ctx: &RequestContext, record: &Value) -> RecordPolicy {
        RecordPolicy {
            view: self.view(ctx, Some(record)),
            update: self.update(ctx, Some(record)),
            delete: self.delete(ctx, Some(record)),
        }
    }

    pub fn list_decisions(&self, ctx: &RequestContext) -> ListPolicy {
        ListPolicy {
            create: self.create(ctx),
            view_any: self.view_any(ctx),
            update: self.update(ctx, None),
            delete: self.delete(ctx, None),
        }
    }
}

/// Role allow-lists per ability
///
/// An ability without a list is open to everyone. A listed ability requires
/// the caller to carry one of the listed roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RolePolicy {
    #[serde(default)]
    pub view_any: Option<Vec<String>>,
    #[serde(default)]
    pub create: Option<Vec<String>>,
    #[serde(default)]
    pub view: Option<Vec<String>>,
    #[serde(default)]
    pub update: Option<Vec<String>>,
    #[serde(default)]
    pub delete: Option<Vec<String>>,
}

impl RolePolicy {
    fn allows(roles: &Option<Vec<String>>, ctx: &RequestContext) -> bool {
        match roles {
            None => true,
            Some(roles) => ctx
                .role()
                .is_some_and(|role| roles.iter().any(|r| r == role)),
        }
    }
}

impl ResourcePolicy for RolePolicy {
    fn view_any(&self, ctx: &RequestContext) -> bool {
        Self::allows(&self.view_any, ctx)
    }

    fn create(&self, ctx: &RequestContext) -> bool {
        Self::allows(&self.create, ctx)
    }

    fn view(&self, ctx: &RequestContext, _record: Option<&Value>) -> bool {
        Self::allows(&self.view, ctx)
    }

    fn update(&self, ctx: &RequestContext, _record: Option<&Value>) -> bool {
        Self::allows(&self.update, ctx)
    }

    fn delete(&self, ctx: &RequestContext, _record: Option<&Value>) -> bool {
        Self::allows(&self.delete, ctx)
    }
}
