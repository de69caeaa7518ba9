//! Option Resolver
//!
//! Fills the `options` prop of a serialized field. Options already present
//! win; otherwise a usable dynamic-options config triggers a backing-store
//! lookup; otherwise a deferred options callback is evaluated. Lookup
//! failures are logged and leave the slot empty.

use super::field::{FieldDescriptor, OptionsSource, RelationKind};
use crate::store::{DataProvider, RowScope};
use serde_json::{json, Map, Value};

/// True when a to-one dynamic-options lookup has no foreign key to scope it,
/// so every row of the related table is offered
pub fn is_unscoped_to_one(field: &FieldDescriptor) -> bool {
    field.dynamic_options.as_ref().is_some_and(|config| {
        config.is_usable()
            && config.foreign_key.is_none()
            && config.relation.or_else(|| field.view.relation_kind()) == Some(RelationKind::ToOne)
    })
}

/// Resolve options into `props` for one field of one record
pub async fn resolve_options(
    field: &FieldDescriptor,
    props: &mut Map<String, Value>,
    record_id: Option<&Value>,
    store: &dyn DataProvider,
) {
    if props.contains_key("options") {
        return;
    }

    if let Some(config) = field.dynamic_options.as_ref().filter(|c| c.is_usable()) {
        let kind = config.relation.or_else(|| field.view.relation_kind());

        // to-one: rows pointing at this record, or at nothing yet
        let scope = match (kind, config.foreign_key.as_ref()) {
            (Some(RelationKind::ToOne), Some(foreign_key)) => Some(RowScope {
                foreign_key: foreign_key.clone(),
                parent_id: record_id.cloned().unwrap_or_else(|| json!(0)),
            }),
            _ => None,
        };

        match store.related_rows(&config.related_table, scope.as_ref()).await {
            Ok(rows) => {
                let options: Map<String, Value> = rows
                    .iter()
                    .map(|row| {
                        (
                            option_string(row.get(&config.value_field)),
                            json!(option_string(row.get(&config.display_field))),
                        )
                    })
                    .collect();
                tracing::debug!(
                    field = %field.key,
                    table = %config.related_table,
                    count = options.len(),
                    scoped = scope.is_some(),
                    "resolved dynamic options"
                );
                props.insert("options".to_string(), Value::Object(options));
            }
            Err(err) => {
                tracing::warn!(
                    field = %field.key,
                    table = %config.related_table,
                    "option lookup failed: {:#}",
                    err
                );
            }
        }
        return;
    }

    match field.options {
        Some(OptionsSource::Strings(ref deferred)) => {
            let options: Map<String, Value> = deferred()
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            props.insert("options".to_string(), Value::Object(options));
        }
        Some(OptionsSource::Values(ref deferred)) => {
            props.insert("options".to_string(), Value::Object(deferred()));
        }
        Some(OptionsSource::Static(_)) | None => {}
    }
}

fn option_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
