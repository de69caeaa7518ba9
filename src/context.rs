//! Request Context
//!
//! Per-request information consulted by field visibility, policies, and cards.

use serde::Serialize;
use uuid::Uuid;

/// Which view a request is rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewContext {
    List,
    Detail,
    Create,
    Update,
}

/// The caller, as identified by the authentication layer in front of us
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub view: ViewContext,
    pub resource: String,
    pub principal: Option<Principal>,
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new(view: ViewContext, resource: &str) -> Self {
        Self {
            view,
            resource: resource.to_string(),
            principal: None,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Same request, rendered for a different view
    pub fn for_view(&self, view: ViewContext) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.principal.as_ref().and_then(|p| p.role.as_deref())
    }
}
