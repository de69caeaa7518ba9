//! Column headers for tabular views

use super::field::FieldDescriptor;
use crate::context::RequestContext;
use serde_json::Value;

/// Metadata of every field that renders as a column, in declaration order
pub fn build_headers(ctx: &RequestContext, fields: &[FieldDescriptor]) -> Vec<Value> {
    fields
        .iter()
        .filter(|f| f.is_visible(ctx) && !f.context.excluded_from_headers())
        .map(|f| Value::Object(f.metadata()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ViewContext;
    use crate::resource::field::FieldContext;

    #[test]
    fn test_headers_skip_form_and_detail_only_fields() {
        let fields = vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::text("body", "Body").context(FieldContext::HideOnList),
            FieldDescriptor::text("password", "Password").context(FieldContext::FormOnly),
            FieldDescriptor::text("audit", "Audit").context(FieldContext::DetailOnly),
            FieldDescriptor::text("status", "Status"),
        ];

        // detail view: `audit` is visible but still never a column
        let ctx = RequestContext::new(ViewContext::Detail, "posts");
        let headers = build_headers(&ctx, &fields);
        let keys: Vec<&str> = headers.iter().filter_map(|h| h["key"].as_str()).collect();
        assert_eq!(keys, vec!["title", "status"]);
    }

    #[test]
    fn test_headers_respect_visibility_predicate() {
        let fields = vec![
            FieldDescriptor::text("title", "Title"),
            FieldDescriptor::text("internal", "Internal").visible_when(|ctx| ctx.role().is_some()),
        ];
        let ctx = RequestContext::new(ViewContext::List, "posts");
        assert_eq!(build_headers(&ctx, &fields).len(), 1);
    }
}
