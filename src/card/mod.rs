//! Dashboard Cards
//!
//! A card is an independent widget with its own resolution operation.
//!
//! - [`engine`] - Concurrent, order-preserving resolution of a card set
//! - [`builtin`] - Declarative card kinds usable from resource definitions

pub mod builtin;
pub mod engine;

pub use builtin::{build_card, StaticCard, TrendCard, ValueCard};
pub use engine::{parse_card_index, resolve_all, resolve_one, CardResult, CardSettings};

use crate::context::RequestContext;
use crate::store::DataProvider;
use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

/// Width used when a card does not say otherwise
pub const DEFAULT_WIDTH: &str = "1/3";

pub trait Card: Send + Sync {
    fn name(&self) -> &str;

    /// Frontend component rendering the payload
    fn component(&self) -> &str;

    fn width(&self) -> &str {
        DEFAULT_WIDTH
    }

    /// Compute the card payload
    fn resolve<'a>(
        &'a self,
        ctx: &'a RequestContext,
        store: &'a dyn DataProvider,
    ) -> BoxFuture<'a, Result<Value>>;

    /// Static metadata returned whether or not resolution succeeds
    fn metadata(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), json!(self.name()));
        map.insert("component".to_string(), json!(self.component()));
        map.insert("width".to_string(), json!(self.width()));
        map
    }
}
