//! In-memory Store
//!
//! Tables of JSON records held in process. Used by the demo binary and by
//! tests; implements search, column filters, stable multi-column sort,
//! pagination and relation preloading.

use super::{compare_values, loose_eq, DataProvider, Page, RelationDef, RelationType, RowScope};
use crate::query::{FilterOp, FilterPredicate, QueryRequest, SortDirection, SortPair};
use crate::resource::{lookup_path, ModelShape, Registry};
use anyhow::{anyhow, Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
struct Table {
    records: Vec<Value>,
    relations: Vec<RelationDef>,
    id_field: Option<String>,
}

impl Table {
    fn id_field(&self) -> &str {
        self.id_field.as_deref().unwrap_or("id")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "<table>": [records...], ... }`
    pub fn from_json(seed: &Value) -> Result<Self> {
        let tables = seed
            .as_object()
            .context("seed data must be an object of tables")?;

        let mut store = Self::new();
        for (name, rows) in tables {
            let rows = rows
                .as_array()
                .with_context(|| format!("table '{}' must be an array of records", name))?;
            store = store.with_table(name, rows.clone());
        }
        Ok(store)
    }

    pub fn with_table(mut self, name: &str, records: Vec<Value>) -> Self {
        self.tables.entry(name.to_string()).or_default().records = records;
        self
    }

    pub fn with_id_field(mut self, table: &str, id_field: &str) -> Self {
        self.tables.entry(table.to_string()).or_default().id_field = Some(id_field.to_string());
        self
    }

    pub fn with_relations(mut self, table: &str, relations: Vec<RelationDef>) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .relations
            .extend(relations);
        self
    }

    /// Apply the relations and id fields declared by registered resources
    pub fn with_resources(mut self, registry: &Registry) -> Self {
        for resource in registry.iter() {
            self = self
                .with_relations(&resource.name, resource.relations.clone())
                .with_id_field(&resource.name, &resource.id_field);
        }
        self
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| anyhow!("unknown table '{}'", name))
    }

    fn page(&self, resource: &str, query: &QueryRequest, preloads: &BTreeSet<String>) -> Result<Page> {
        let table = self.table(resource)?;

        let mut rows: Vec<&Value> = table
            .records
            .iter()
            .filter(|r| query.search.as_deref().map_or(true, |term| matches_search(r, term)))
            .filter(|r| query.filters.iter().all(|f| matches_filter(r, f)))
            .collect();

        // stable, so equal keys keep insertion order across requests
        rows.sort_by(|a, b| compare_by(a, b, &query.sort));

        let total = rows.len() as u64;
        let records = rows
            .into_iter()
            .skip(query.offset())
            .take(query.per_page as usize)
            .map(|r| self.attach(table, r.clone(), preloads))
            .collect();

        Ok(Page { records, total })
    }

    fn lookup(&self, resource: &str, id: &str, preloads: &BTreeSet<String>) -> Result<Option<Value>> {
        let table = self.table(resource)?;
        let id = Value::String(id.to_string());
        Ok(table
            .records
            .iter()
            .find(|r| r.get(table.id_field()).is_some_and(|v| loose_eq(v, &id)))
            .map(|r| self.attach(table, r.clone(), preloads)))
    }

    fn rows(&self, table: &str, scope: Option<&RowScope>) -> Result<Vec<Value>> {
        let table = self.table(table)?;
        Ok(table
            .records
            .iter()
            .filter(|row| match scope {
                None => true,
                Some(scope) => match row.get(&scope.foreign_key) {
                    None | Some(Value::Null) => true,
                    Some(fk) => loose_eq(fk, &scope.parent_id),
                },
            })
            .cloned()
            .collect())
    }

    /// Load each requested relation onto the record under its name
    fn attach(&self, table: &Table, mut record: Value, preloads: &BTreeSet<String>) -> Value {
        for relation in table.relations.iter().filter(|r| preloads.contains(&r.name)) {
            let Some(related) = self.tables.get(&relation.table) else {
                tracing::warn!(relation = %relation.name, table = %relation.table, "related table missing");
                continue;
            };

            let loaded = match relation.kind {
                RelationType::BelongsTo => match record.get(&relation.foreign_key) {
                    Some(fk) if !fk.is_null() => related
                        .records
                        .iter()
                        .find(|r| r.get(&relation.owner_key).is_some_and(|v| loose_eq(v, fk)))
                        .cloned()
                        .unwrap_or(Value::Null),
                    _ => Value::Null,
                },
                RelationType::HasOne | RelationType::HasMany => {
                    let Some(owner) = record.get(&relation.owner_key).cloned() else {
                        continue;
                    };
                    let mut children = related
                        .records
                        .iter()
                        .filter(|r| r.get(&relation.foreign_key).is_some_and(|v| loose_eq(v, &owner)));
                    if relation.kind == RelationType::HasOne {
                        children.next().cloned().unwrap_or(Value::Null)
                    } else {
                        Value::Array(children.cloned().collect())
                    }
                }
            };

            if let Value::Object(ref mut map) = record {
                map.insert(relation.name.clone(), loaded);
            }
        }
        record
    }
}

impl DataProvider for MemoryStore {
    fn model_shape(&self, resource: &str) -> ModelShape {
        self.tables
            .get(resource)
            .map(|t| ModelShape::new(t.relations.iter().map(|r| r.name.clone())))
            .unwrap_or_default()
    }

    fn fetch_page<'a>(
        &'a self,
        resource: &'a str,
        query: &'a QueryRequest,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Page>> {
        future::ready(self.page(resource, query, preloads)).boxed()
    }

    fn find<'a>(
        &'a self,
        resource: &'a str,
        id: &'a str,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        future::ready(self.lookup(resource, id, preloads)).boxed()
    }

    fn related_rows<'a>(
        &'a self,
        table: &'a str,
        scope: Option<&'a RowScope>,
    ) -> BoxFuture<'a, Result<Vec<Value>>> {
        future::ready(self.rows(table, scope)).boxed()
    }
}

/// Case-insensitive substring match over top-level string columns
fn matches_search(record: &Value, term: &str) -> bool {
    let term = term.to_lowercase();
    record
        .as_object()
        .map(|obj: &Map<String, Value>| {
            obj.values().any(|v| {
                v.as_str()
                    .map(|s| s.to_lowercase().contains(&term))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

fn matches_filter(record: &Value, filter: &FilterPredicate) -> bool {
    let value = lookup_path(record, &filter.column);
    match filter.op {
        FilterOp::Eq => value.is_some_and(|v| eq_str(v, &filter.value)),
        FilterOp::Neq => !value.is_some_and(|v| eq_str(v, &filter.value)),
        FilterOp::Like => value
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&filter.value.to_lowercase())),
        FilterOp::In => value.is_some_and(|v| filter.value.split(',').any(|item| eq_str(v, item))),
        FilterOp::Gt => cmp_str(value, &filter.value) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(cmp_str(value, &filter.value), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => cmp_str(value, &filter.value) == Some(Ordering::Less),
        FilterOp::Lte => matches!(cmp_str(value, &filter.value), Some(Ordering::Less | Ordering::Equal)),
    }
}

fn eq_str(value: &Value, expected: &str) -> bool {
    let expected = expected.trim();
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => expected.parse::<f64>().ok() == n.as_f64(),
        Value::Bool(b) => expected.parse::<bool>().ok() == Some(*b),
        Value::Null => expected.eq_ignore_ascii_case("null"),
        _ => false,
    }
}

fn cmp_str(value: Option<&Value>, expected: &str) -> Option<Ordering> {
    match value? {
        Value::Number(n) => n.as_f64()?.partial_cmp(&expected.trim().parse::<f64>().ok()?),
        Value::String(s) => Some(s.as_str().cmp(expected)),
        _ => None,
    }
}

fn compare_by(a: &Value, b: &Value, sort: &[SortPair]) -> Ordering {
    for pair in sort {
        let ordering = compare_values(lookup_path(a, &pair.column), lookup_path(b, &pair.column));
        let ordering = match pair.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_query, PageLimits};
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::from_json(&json!({
            "posts": [
                {"id": 1, "title": "Rust ownership", "views": 120, "author_id": 1, "created_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "title": "Async in practice", "views": 40, "author_id": 2, "created_at": "2024-03-01T00:00:00Z"},
                {"id": 3, "title": "Rust traits", "views": 75, "author_id": null, "created_at": "2024-02-01T00:00:00Z"}
            ],
            "users": [
                {"id": 1, "name": "Ada"},
                {"id": 2, "name": "Linus"}
            ]
        }))
        .unwrap()
        .with_relations(
            "posts",
            vec![RelationDef {
                name: "author".to_string(),
                table: "users".to_string(),
                kind: RelationType::BelongsTo,
                foreign_key: "author_id".to_string(),
                owner_key: "id".to_string(),
            }],
        )
        .with_relations(
            "users",
            vec![RelationDef {
                name: "posts".to_string(),
                table: "posts".to_string(),
                kind: RelationType::HasMany,
                foreign_key: "author_id".to_string(),
                owner_key: "id".to_string(),
            }],
        )
    }

    fn query(raw: &str) -> QueryRequest {
        parse_query(raw, "posts", &PageLimits::default())
    }

    fn ids(page: &Page) -> Vec<i64> {
        page.records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let page = store().page("posts", &query(""), &BTreeSet::new()).unwrap();
        assert_eq!(ids(&page), vec![2, 3, 1]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_search_filter_sort_and_paging() {
        let s = store();
        let page = s.page("posts", &query("search=rust&sort_column=views"), &BTreeSet::new()).unwrap();
        assert_eq!(ids(&page), vec![3, 1]);

        let page = s.page("posts", &query("posts[filters][views][gte]=75"), &BTreeSet::new()).unwrap();
        assert_eq!(page.total, 2);

        let page = s
            .page("posts", &query("sort_column=id&per_page=2&page=2"), &BTreeSet::new())
            .unwrap();
        assert_eq!(ids(&page), vec![3]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_preloads_attach_relations() {
        let s = store();
        let preloads: BTreeSet<String> = ["author".to_string()].into();
        let page = s.page("posts", &query("sort_column=id"), &preloads).unwrap();
        assert_eq!(page.records[0]["author"]["name"], "Ada");
        assert_eq!(page.records[2]["author"], Value::Null);

        let preloads: BTreeSet<String> = ["posts".to_string()].into();
        let user = s.lookup("users", "1", &preloads).unwrap().unwrap();
        assert_eq!(user["posts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_scoped_rows_include_unassigned() {
        let scope = RowScope {
            foreign_key: "author_id".to_string(),
            parent_id: json!(2),
        };
        let rows = store().rows("posts", Some(&scope)).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_unknown_table_is_an_error() {
        assert!(store().page("nope", &query(""), &BTreeSet::new()).is_err());
        assert_eq!(store().model_shape("nope"), ModelShape::default());
    }
}
