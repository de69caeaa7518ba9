//! Data Providers
//!
//! The backing store behind every resource. The engine only ever sees
//! materialized JSON records; how they are fetched is up to the provider.
//!
//! - [`memory`] - In-process tables with declared relations
//! - [`http`] - A remote JSON backend reached over HTTP

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::query::QueryRequest;
use crate::resource::ModelShape;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One page of records plus the unpaged total
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub total: u64,
}

/// Restricts related rows to `foreign_key IS NULL OR foreign_key = parent_id`
#[derive(Debug, Clone, PartialEq)]
pub struct RowScope {
    pub foreign_key: String,
    pub parent_id: Value,
}

/// How a declared relation is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Foreign key lives on this record
    BelongsTo,
    /// Foreign key lives on the related row, at most one row
    HasOne,
    /// Foreign key lives on the related rows
    HasMany,
}

/// A relation declared on a model
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub foreign_key: String,
    #[serde(default = "default_owner_key")]
    pub owner_key: String,
}

fn default_owner_key() -> String {
    "id".to_string()
}

pub trait DataProvider: Send + Sync {
    /// Relations declared by the model behind `resource`
    fn model_shape(&self, resource: &str) -> ModelShape;

    fn fetch_page<'a>(
        &'a self,
        resource: &'a str,
        query: &'a QueryRequest,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Page>>;

    fn find<'a>(
        &'a self,
        resource: &'a str,
        id: &'a str,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Option<Value>>>;

    /// Rows of `table`, optionally scoped to a parent record
    fn related_rows<'a>(
        &'a self,
        table: &'a str,
        scope: Option<&'a RowScope>,
    ) -> BoxFuture<'a, Result<Vec<Value>>>;
}

/// Equality that tolerates `1` vs `"1"` between keys
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.trim() == n.to_string()
        }
        _ => false,
    }
}

/// Total order over JSON values: missing/null < bool < number < string < other
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 4 && rank(b) == 4 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!(1)));
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("7"), &json!(7)));
        assert!(!loose_eq(&json!(1), &json!(2)));
        assert!(!loose_eq(&json!(null), &json!(0)));
    }

    #[test]
    fn test_compare_values_ranks() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(Some(&json!(null)), None),
            Ordering::Equal
        );
    }

    #[test]
    fn test_relation_def_deserializes() {
        let rel: RelationDef = serde_json::from_value(json!({
            "name": "author",
            "table": "users",
            "type": "belongs_to",
            "foreign_key": "author_id"
        }))
        .unwrap();
        assert_eq!(rel.kind, RelationType::BelongsTo);
        assert_eq!(rel.owner_key, "id");
    }
}
