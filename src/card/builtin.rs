//! Built-in Cards
//!
//! Card kinds that resource definitions can declare without code:
//!
//! - `value` - number of rows in a table, optionally filtered: `{"value": n}`
//! - `trend` - row counts grouped by a column: `{"labels": [...], "series": [...]}`
//! - `static` - a fixed payload

use super::{Card, DEFAULT_WIDTH};
use crate::context::RequestContext;
use crate::resource::{lookup_path, CardDef};
use crate::store::{loose_eq, DataProvider};
use anyhow::{bail, Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Presentation shared by every built-in kind
#[derive(Debug, Clone)]
struct CardMeta {
    name: String,
    component: String,
    width: String,
}

impl CardMeta {
    fn new(name: &str, component: &str) -> Self {
        Self {
            name: name.to_string(),
            component: component.to_string(),
            width: DEFAULT_WIDTH.to_string(),
        }
    }

    /// Optional `component`/`width` overrides from a definition
    fn apply(&mut self, def: &CardDef) {
        if let Some(ref component) = def.component {
            self.component = component.clone();
        }
        if let Some(ref width) = def.width {
            self.width = width.clone();
        }
    }
}

fn matches_conditions(row: &Value, conditions: &Map<String, Value>) -> bool {
    conditions
        .iter()
        .all(|(path, expected)| lookup_path(row, path).is_some_and(|v| loose_eq(v, expected)))
}

/// Counts rows of a table
#[derive(Debug, Clone)]
pub struct ValueCard {
    meta: CardMeta,
    table: String,
    conditions: Map<String, Value>,
}

impl ValueCard {
    pub fn new(name: &str, table: &str) -> Self {
        Self {
            meta: CardMeta::new(name, "value-metric"),
            table: table.to_string(),
            conditions: Map::new(),
        }
    }

    /// Only count rows whose `path` equals `value`
    pub fn condition(mut self, path: &str, value: Value) -> Self {
        self.conditions.insert(path.to_string(), value);
        self
    }

    pub fn with_width(mut self, width: &str) -> Self {
        self.meta.width = width.to_string();
        self
    }

    async fn count(&self, store: &dyn DataProvider) -> Result<Value> {
        let rows = store
            .related_rows(&self.table, None)
            .await
            .with_context(|| format!("Failed to count rows of '{}'", self.table))?;
        let count = rows
            .iter()
            .filter(|row| matches_conditions(row, &self.conditions))
            .count();
        Ok(json!({ "value": count }))
    }
}

impl Card for ValueCard {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn component(&self) -> &str {
        &self.meta.component
    }

    fn width(&self) -> &str {
        &self.meta.width
    }

    fn resolve<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        store: &'a dyn DataProvider,
    ) -> BoxFuture<'a, Result<Value>> {
        self.count(store).boxed()
    }
}

/// Counts rows of a table grouped by one column
#[derive(Debug, Clone)]
pub struct TrendCard {
    meta: CardMeta,
    table: String,
    column: String,
    conditions: Map<String, Value>,
}

impl TrendCard {
    pub fn new(name: &str, table: &str, column: &str) -> Self {
        Self {
            meta: CardMeta::new(name, "trend-metric"),
            table: table.to_string(),
            column: column.to_string(),
            conditions: Map::new(),
        }
    }

    pub fn condition(mut self, path: &str, value: Value) -> Self {
        self.conditions.insert(path.to_string(), value);
        self
    }

    pub fn with_width(mut self, width: &str) -> Self {
        self.meta.width = width.to_string();
        self
    }

    async fn group(&self, store: &dyn DataProvider) -> Result<Value> {
        let rows = store
            .related_rows(&self.table, None)
            .await
            .with_context(|| format!("Failed to load rows of '{}'", self.table))?;

        let mut groups: BTreeMap<String, u64> = BTreeMap::new();
        for row in rows.iter().filter(|row| matches_conditions(row, &self.conditions)) {
            let label = match lookup_path(row, &self.column) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            *groups.entry(label).or_default() += 1;
        }

        let (labels, series): (Vec<String>, Vec<u64>) = groups.into_iter().unzip();
        Ok(json!({ "labels": labels, "series": series }))
    }
}

impl Card for TrendCard {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn component(&self) -> &str {
        &self.meta.component
    }

    fn width(&self) -> &str {
        &self.meta.width
    }

    fn resolve<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        store: &'a dyn DataProvider,
    ) -> BoxFuture<'a, Result<Value>> {
        self.group(store).boxed()
    }
}

/// Always returns the same payload
#[derive(Debug, Clone)]
pub struct StaticCard {
    meta: CardMeta,
    payload: Value,
}

impl StaticCard {
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            meta: CardMeta::new(name, "static"),
            payload,
        }
    }

    pub fn with_component(mut self, component: &str) -> Self {
        self.meta.component = component.to_string();
        self
    }

    pub fn with_width(mut self, width: &str) -> Self {
        self.meta.width = width.to_string();
        self
    }
}

impl Card for StaticCard {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn component(&self) -> &str {
        &self.meta.component
    }

    fn width(&self) -> &str {
        &self.meta.width
    }

    fn resolve<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _store: &'a dyn DataProvider,
    ) -> BoxFuture<'a, Result<Value>> {
        future::ready(Ok(self.payload.clone())).boxed()
    }
}

/// Build a card from its declarative definition
pub fn build_card(def: &CardDef) -> Result<Arc<dyn Card>> {
    let card: Arc<dyn Card> = match def.kind.as_str() {
        "value" => {
            let table = def.table.as_deref().context("value card needs a table")?;
            let mut card = ValueCard::new(&def.name, table);
            card.conditions = def.conditions.clone();
            card.meta.apply(def);
            Arc::new(card)
        }
        "trend" => {
            let table = def.table.as_deref().context("trend card needs a table")?;
            let column = def.column.as_deref().context("trend card needs a column")?;
            let mut card = TrendCard::new(&def.name, table, column);
            card.conditions = def.conditions.clone();
            card.meta.apply(def);
            Arc::new(card)
        }
        "static" => {
            let mut card = StaticCard::new(&def.name, def.payload.clone());
            card.meta.apply(def);
            Arc::new(card)
        }
        other => bail!("unknown card kind '{}'", other),
    };
    Ok(card)
}
