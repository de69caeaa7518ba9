//! Resource Fetcher
//!
//! Fetches a page or a single record of a resource from the data provider
//! and assembles the list/detail responses: policy checks, preload
//! normalization, field resolution per record, and column headers.

use super::headers::build_headers;
use super::preload::normalize_preloads;
use super::registry::Resource;
use super::resolver::resolve_record;
use crate::context::RequestContext;
use crate::error::PanelError;
use crate::query::QueryRequest;
use crate::store::DataProvider;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Navigate a dot-notation path; numeric segments index into arrays
pub fn lookup_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = item;

    for part in path.split('.') {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            other => other.get(part)?,
        };
    }

    Some(current)
}

/// Extract a value from JSON using a dot-notation path, formatted for display
pub fn extract_json_value(item: &Value, path: &str) -> String {
    match lookup_path(item, path) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(arr)) => format!("[{} items]", arr.len()),
        Some(Value::Object(_)) => "[object]".to_string(),
    }
}

/// Build the paginated list response for a resource
pub async fn list_records(
    ctx: &RequestContext,
    resource: &Resource,
    query: &QueryRequest,
    store: &dyn DataProvider,
) -> Result<Value, PanelError> {
    if !resource.policy.view_any(ctx) {
        return Err(PanelError::Unauthorized);
    }
    if resource.fields.is_empty() {
        return Err(PanelError::NoFields);
    }

    let preloads = normalize_preloads(
        &store.model_shape(&resource.name),
        &query.with,
        &resource.fields,
    );

    let page = store
        .fetch_page(&resource.name, query, &preloads)
        .await
        .map_err(|err| PanelError::provider(&err))?;

    tracing::debug!(
        resource = %resource.name,
        request_id = %ctx.request_id,
        page = query.page,
        records = page.records.len(),
        total = page.total,
        "fetched page"
    );

    let mut data = Vec::with_capacity(page.records.len());
    for record in &page.records {
        let mut resolved = resolve_record(ctx, record, &resource.fields, &resource.id_field, store).await?;
        resolved.insert(
            "policy".to_string(),
            json!(resource.policy.record_decisions(ctx, record)),
        );
        data.push(Value::Object(resolved));
    }

    Ok(json!({
        "data": data,
        "meta": {
            "current_page": query.page,
            "per_page": query.per_page,
            "total": page.total,
            "dialog_type": resource.dialog_type,
            "title": resource.title,
            "headers": build_headers(ctx, &resource.fields),
            "policy": resource.policy.list_decisions(ctx),
        }
    }))
}

/// Build the detail response for one record
pub async fn show_record(
    ctx: &RequestContext,
    resource: &Resource,
    id: &str,
    with: &[String],
    store: &dyn DataProvider,
) -> Result<Value, PanelError> {
    if resource.fields.is_empty() {
        return Err(PanelError::NoFields);
    }

    let preloads: BTreeSet<String> = normalize_preloads(
        &store.model_shape(&resource.name),
        with,
        &resource.fields,
    );

    let record = store
        .find(&resource.name, id, &preloads)
        .await
        .map_err(|err| PanelError::provider(&err))?
        .ok_or_else(|| PanelError::not_found("Record"))?;

    let policy = resource.policy.record_decisions(ctx, &record);
    if !policy.view {
        return Err(PanelError::Unauthorized);
    }

    let mut resolved = resolve_record(ctx, &record, &resource.fields, &resource.id_field, store).await?;
    resolved.insert("policy".to_string(), json!(policy));

    Ok(json!({
        "data": resolved,
        "meta": {
            "title": resource.title,
            "dialog_type": resource.dialog_type,
            "headers": build_headers(ctx, &resource.fields),
            "policy": resource.policy.list_decisions(ctx),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Principal, ViewContext};
    use crate::policy::RolePolicy;
    use crate::query::{parse_query, PageLimits};
    use crate::resource::field::{FieldContext, FieldDescriptor, FieldView};
    use crate::store::{MemoryStore, RelationDef, RelationType};
    use std::sync::Arc;

    #[test]
    fn test_lookup_path() {
        let item = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(lookup_path(&item, "a.b.1.c"), Some(&json!(2)));
        assert_eq!(lookup_path(&item, "a.b.9.c"), None);
        assert_eq!(lookup_path(&item, "a.x"), None);
        assert_eq!(lookup_path(&item, "a.b.first"), None);
    }

    #[test]
    fn test_extract_json_value_formats() {
        let item = json!({"name": "web", "n": 3, "ok": true, "tags": [1, 2], "meta": {}, "none": null});
        assert_eq!(extract_json_value(&item, "name"), "web");
        assert_eq!(extract_json_value(&item, "n"), "3");
        assert_eq!(extract_json_value(&item, "ok"), "true");
        assert_eq!(extract_json_value(&item, "tags"), "[2 items]");
        assert_eq!(extract_json_value(&item, "meta"), "[object]");
        assert_eq!(extract_json_value(&item, "none"), "-");
        assert_eq!(extract_json_value(&item, "missing"), "-");
    }

    fn store() -> MemoryStore {
        MemoryStore::from_json(&json!({
            "posts": [
                {"id": 1, "title": "First", "author_id": 1, "created_at": "2024-01-01T00:00:00Z"},
                {"id": 2, "title": "Second", "author_id": null, "created_at": "2024-02-01T00:00:00Z"}
            ],
            "users": [{"id": 1, "name": "Ada"}]
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
    }

    fn posts() -> Resource {
        Resource::new("posts", "Posts")
            .field(FieldDescriptor::text("title", "Title").sortable())
            .field(FieldDescriptor::text("body", "Body").context(FieldContext::FormOnly))
            .field(FieldDescriptor::new("author", "Author", FieldView::BelongsTo).eager())
    }

    fn list_ctx() -> RequestContext {
        RequestContext::new(ViewContext::List, "posts")
    }

    fn query(raw: &str) -> QueryRequest {
        parse_query(raw, "posts", &PageLimits::default())
    }

    #[tokio::test]
    async fn test_list_response_shape() {
        let out = list_records(&list_ctx(), &posts(), &query(""), &store()).await.unwrap();

        let data = out["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        // newest first by default
        assert_eq!(data[0]["title"]["data"], "Second");
        assert_eq!(data[0]["author"]["data"], json!([]));
        assert_eq!(data[1]["author"]["data"]["name"], "Ada");
        assert_eq!(data[0]["policy"], json!({"view": true, "update": true, "delete": true}));
        assert!(data[0].get("body").is_none());

        let meta = &out["meta"];
        assert_eq!(meta["current_page"], 1);
        assert_eq!(meta["per_page"], 15);
        assert_eq!(meta["total"], 2);
        assert_eq!(meta["title"], "Posts");
        assert_eq!(meta["dialog_type"], "modal");
        assert_eq!(meta["headers"].as_array().unwrap().len(), 2);
        assert_eq!(
            meta["policy"],
            json!({"create": true, "view_any": true, "update": true, "delete": true})
        );
    }

    #[tokio::test]
    async fn test_list_errors() {
        let denied = posts().policy(Arc::new(RolePolicy {
            view_any: Some(vec!["admin".to_string()]),
            ..Default::default()
        }));
        let err = list_records(&list_ctx(), &denied, &query(""), &store()).await.unwrap_err();
        assert!(matches!(err, PanelError::Unauthorized));

        let empty = Resource::new("posts", "Posts");
        let err = list_records(&list_ctx(), &empty, &query(""), &store()).await.unwrap_err();
        assert_eq!(err.to_string(), "No fields defined for this resource");

        let missing = Resource::new("drafts", "Drafts").field(FieldDescriptor::text("title", "Title"));
        let err = list_records(&list_ctx(), &missing, &query(""), &store()).await.unwrap_err();
        assert!(matches!(err, PanelError::Provider(ref m) if m.contains("drafts")));
    }

    #[tokio::test]
    async fn test_show_record() {
        let detail = list_ctx().for_view(ViewContext::Detail);
        let out = show_record(&detail, &posts(), "1", &[], &store()).await.unwrap();
        assert_eq!(out["data"]["title"]["data"], "First");
        assert_eq!(out["data"]["author"]["data"]["name"], "Ada");
        assert_eq!(out["meta"]["title"], "Posts");

        let err = show_record(&detail, &posts(), "99", &[], &store()).await.unwrap_err();
        assert_eq!(err.to_string(), "Record not found");
    }

    #[tokio::test]
    async fn test_show_record_checks_view_policy() {
        let guarded = posts().policy(Arc::new(RolePolicy {
            view: Some(vec!["admin".to_string()]),
            ..Default::default()
        }));

        let anonymous = RequestContext::new(ViewContext::Detail, "posts");
        let err = show_record(&anonymous, &guarded, "1", &[], &store()).await.unwrap_err();
        assert!(matches!(err, PanelError::Unauthorized));

        let admin = anonymous.with_principal(Principal {
            id: "1".to_string(),
            role: Some("admin".to_string()),
        });
        assert!(show_record(&admin, &guarded, "1", &[], &store()).await.is_ok());
    }
}
