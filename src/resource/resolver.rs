//! Field Resolution Engine
//!
//! Turns one record plus an ordered list of field descriptors into the
//! serialized, per-request form of each visible field. Descriptors are only
//! read; every extracted value lives in the returned map.

use super::field::FieldDescriptor;
use super::options::resolve_options;
use crate::context::RequestContext;
use crate::error::PanelError;
use crate::store::DataProvider;
use serde_json::{Map, Value};

/// Identifier used to scope to-one option lookups, if the record exposes one
pub fn record_id<'a>(record: &'a Value, id_field: &str) -> Option<&'a Value> {
    record.get(id_field).filter(|v| !v.is_null())
}

/// Resolve a single field against a record
///
/// Returns `None` when the field is hidden for this request.
pub async fn resolve_field(
    ctx: &RequestContext,
    field: &FieldDescriptor,
    record: &Value,
    id: Option<&Value>,
    store: &dyn DataProvider,
) -> Result<Option<Value>, PanelError> {
    if !field.is_visible(ctx) {
        return Ok(None);
    }

    let raw = field.extract(record).unwrap_or(Value::Null);
    let mut resolved = field.metadata();

    if let Some(Value::Object(props)) = resolved.get_mut("props") {
        resolve_options(field, props, id, store).await;
    }

    let mut data = match field.display() {
        Some(transform) => transform(&raw, record)
            .map_err(|err| {
                tracing::error!(
                    resource = %ctx.resource,
                    field = %field.key,
                    request_id = %ctx.request_id,
                    "display transform failed: {:#}",
                    err
                );
                PanelError::Transform {
                    field: field.key.clone(),
                    message: format!("{:#}", err),
                }
            })?
            .into_data(),
        None => raw,
    };

    if field.view.is_relationship() && data.is_null() {
        data = Value::Array(Vec::new());
    }

    resolved.insert("data".to_string(), data);
    Ok(Some(Value::Object(resolved)))
}

/// Resolve every visible field of a record, keyed by field key, in
/// declaration order
pub async fn resolve_record(
    ctx: &RequestContext,
    record: &Value,
    fields: &[FieldDescriptor],
    id_field: &str,
    store: &dyn DataProvider,
) -> Result<Map<String, Value>, PanelError> {
    let id = record_id(record, id_field);
    let mut out = Map::new();

    for field in fields {
        if let Some(value) = resolve_field(ctx, field, record, id, store).await? {
            out.insert(field.key.clone(), value);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ViewContext;
    use crate::resource::component::{Badge, DisplayValue, Stack, StackDirection, Text};
    use crate::resource::field::{FieldContext, FieldView, OptionsConfig};
    use crate::store::MemoryStore;
    use anyhow::anyhow;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::from_json(&json!({
            "users": [{"id": 1, "name": "Ada"}, {"id": 2, "name": "Linus"}]
        }))
        .unwrap()
    }

    fn list() -> RequestContext {
        RequestContext::new(ViewContext::List, "posts")
    }

    #[tokio::test]
    async fn test_fields_resolve_in_declaration_order() {
        let fields = vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::new("views", "Views", FieldView::Number),
            FieldDescriptor::text("id", "ID"),
        ];
        let record = json!({"id": 7, "views": 3, "title": "Hello"});

        let out = resolve_record(&list(), &record, &fields, "id", &store())
            .await
            .unwrap();

        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["title", "views", "id"]);
        assert_eq!(out["title"]["data"], "Hello");
        assert_eq!(out["views"]["view"], "number");
        assert_eq!(out["id"]["key"], "id");
    }

    #[tokio::test]
    async fn test_hidden_fields_are_skipped() {
        let fields = vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::text("body", "Body").context(FieldContext::HideOnList),
            FieldDescriptor::text("secret", "Secret").visible_when(|_| false),
        ];
        let record = json!({"title": "t", "body": "b", "secret": "s"});

        let out = resolve_record(&list(), &record, &fields, "id", &store())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);

        let detail = list().for_view(ViewContext::Detail);
        let out = resolve_record(&detail, &record, &fields, "id", &store())
            .await
            .unwrap();
        assert!(out.contains_key("body"));
        assert!(!out.contains_key("secret"));
    }

    #[tokio::test]
    async fn test_missing_relationship_becomes_empty_collection() {
        let fields = vec![
            FieldDescriptor::new("tags", "Tags", FieldView::HasMany),
            FieldDescriptor::new("author", "Author", FieldView::BelongsTo),
        ];

        for record in [json!({"tags": null, "author": null}), json!({})] {
            let out = resolve_record(&list(), &record, &fields, "id", &store())
                .await
                .unwrap();
            assert_eq!(out["tags"]["data"], json!([]));
            assert_eq!(out["author"]["data"], json!([]));
        }
    }

    #[tokio::test]
    async fn test_display_transform_component_is_serialized() {
        let fields = vec![
            FieldDescriptor::new("status", "Status", FieldView::Badge)
                .display_with(|raw, _| Ok(Badge::new(raw.as_str().unwrap_or("-"), Some([0, 255, 0])).into())),
            FieldDescriptor::new("summary", "Summary", FieldView::Stack).display_with(|_, record| {
                let stack = Stack::new(StackDirection::Vertical)
                    .push(Text::new(record["title"].clone()))
                    .push(Text::new(record["status"].clone()));
                Ok(DisplayValue::from(stack))
            }),
        ];
        let record = json!({"title": "Hello", "status": "published"});

        let out = resolve_record(&list(), &record, &fields, "id", &store())
            .await
            .unwrap();
        assert_eq!(
            out["status"]["data"],
            json!({"component": "badge", "label": "published", "color": "#00ff00"})
        );
        assert_eq!(out["summary"]["data"]["component"], "stack");
        assert_eq!(out["summary"]["data"]["children"][0]["value"], "Hello");
    }

    #[tokio::test]
    async fn test_display_transform_failure_aborts_record() {
        let fields = vec![FieldDescriptor::text("title", "Title")
            .display_with(|_, _| Err(anyhow!("boom")))];

        let err = resolve_record(&list(), &json!({"title": "x"}), &fields, "id", &store())
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Transform { ref field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_dynamic_options_are_resolved_into_props() {
        let fields = vec![FieldDescriptor::new("author", "Author", FieldView::HasMany)
            .dynamic_options(OptionsConfig::new("users", "name"))];

        let out = resolve_record(&list(), &json!({"id": 1}), &fields, "id", &store())
            .await
            .unwrap();
        assert_eq!(out["author"]["props"]["options"], json!({"1": "Ada", "2": "Linus"}));
    }

    #[tokio::test]
    async fn test_descriptors_are_not_mutated_between_records() {
        let fields = vec![FieldDescriptor::text("title", "Title")];
        let s = store();
        let ctx = list();
        let (a, b) = (json!({"title": "a"}), json!({"title": "b"}));

        let first = resolve_record(&ctx, &a, &fields, "id", &s);
        let second = resolve_record(&ctx, &b, &fields, "id", &s);
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap()["title"]["data"], "a");
        assert_eq!(second.unwrap()["title"]["data"], "b");
        assert!(!fields[0].props.contains_key("options"));
    }
}
