//! Field Descriptors
//!
//! Declarative, shared definitions of one displayable attribute of a
//! resource. Descriptors are built once at registration and never written to
//! while serving requests; everything request-scoped is returned by value.

use super::component::DisplayValue;
use super::fetcher::lookup_path;
use crate::context::{RequestContext, ViewContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Display transform: `(raw value, whole record) -> data slot`
pub type DisplayFn = Arc<dyn Fn(&Value, &Value) -> anyhow::Result<DisplayValue> + Send + Sync>;

/// Visibility predicate evaluated per request
pub type VisibilityFn = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// View/type tag of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldView {
    #[default]
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    Select,
    Image,
    Badge,
    Stack,
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

/// Cardinality of a relationship field, as seen from the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ToOne,
    ToMany,
}

impl FieldView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Select => "select",
            Self::Image => "image",
            Self::Badge => "badge",
            Self::Stack => "stack",
            Self::BelongsTo => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::BelongsToMany => "belongs_to_many",
        }
    }

    /// Data type reported alongside the view tag
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::Text | Self::Textarea | Self::Select | Self::Image => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Badge | Self::Stack => "component",
            Self::BelongsTo | Self::HasOne | Self::HasMany | Self::BelongsToMany => "relationship",
        }
    }

    pub fn relation_kind(&self) -> Option<RelationKind> {
        match self {
            Self::BelongsTo | Self::HasOne => Some(RelationKind::ToOne),
            Self::HasMany | Self::BelongsToMany => Some(RelationKind::ToMany),
            _ => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        self.relation_kind().is_some()
    }
}

/// Where a field shows up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldContext {
    #[default]
    Always,
    HideOnList,
    CreateOnly,
    UpdateOnly,
    FormOnly,
    DetailOnly,
}

impl FieldContext {
    pub fn allows(&self, view: ViewContext) -> bool {
        match self {
            Self::Always => true,
            Self::HideOnList => view != ViewContext::List,
            Self::CreateOnly => view == ViewContext::Create,
            Self::UpdateOnly => view == ViewContext::Update,
            Self::FormOnly => matches!(view, ViewContext::Create | ViewContext::Update),
            Self::DetailOnly => view == ViewContext::Detail,
        }
    }

    /// Tags that never produce a table column
    pub fn excluded_from_headers(&self) -> bool {
        !matches!(self, Self::Always)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::HideOnList => "hide_on_list",
            Self::CreateOnly => "create_only",
            Self::UpdateOnly => "update_only",
            Self::FormOnly => "form_only",
            Self::DetailOnly => "detail_only",
        }
    }
}

/// Backing-store driven option lookup for relationship fields
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OptionsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Column shown to the user
    pub display_field: String,
    /// Table the options come from
    pub related_table: String,
    /// Column used as the option key
    #[serde(default = "default_value_field")]
    pub value_field: String,
    /// Column on the related table pointing back at the record
    #[serde(default)]
    pub foreign_key: Option<String>,
    /// Overrides the kind derived from the field's view
    #[serde(default)]
    pub relation: Option<RelationKind>,
}

fn default_true() -> bool {
    true
}

fn default_value_field() -> String {
    "id".to_string()
}

impl OptionsConfig {
    pub fn new(related_table: &str, display_field: &str) -> Self {
        Self {
            enabled: true,
            display_field: display_field.to_string(),
            related_table: related_table.to_string(),
            value_field: default_value_field(),
            foreign_key: None,
            relation: None,
        }
    }

    pub fn scoped_by(mut self, foreign_key: &str) -> Self {
        self.foreign_key = Some(foreign_key.to_string());
        self
    }

    /// Enabled and complete enough to issue a lookup
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.related_table.is_empty() && !self.display_field.is_empty()
    }
}

/// Statically supplied or deferred option sets
#[derive(Clone)]
pub enum OptionsSource {
    Static(Map<String, Value>),
    Strings(Arc<dyn Fn() -> BTreeMap<String, String> + Send + Sync>),
    Values(Arc<dyn Fn() -> Map<String, Value> + Send + Sync>),
}

impl fmt::Debug for OptionsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Self::Strings(_) => f.write_str("Strings(<deferred>)"),
            Self::Values(_) => f.write_str("Values(<deferred>)"),
        }
    }
}

#[derive(Clone)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    pub view: FieldView,
    /// Dot path into the record; defaults to the key
    pub accessor: Option<String>,
    pub width: Option<String>,
    pub context: FieldContext,
    pub sortable: bool,
    pub searchable: bool,
    /// Relation name for relationship fields; defaults to the key
    pub relation: Option<String>,
    /// Preload the relation for every listing
    pub eager: bool,
    pub props: Map<String, Value>,
    pub options: Option<OptionsSource>,
    pub dynamic_options: Option<OptionsConfig>,
    visible_when: Option<VisibilityFn>,
    display: Option<DisplayFn>,
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("view", &self.view)
            .field("context", &self.context)
            .field("accessor", &self.accessor)
            .field("relation", &self.relation)
            .field("dynamic_options", &self.dynamic_options)
            .field("has_display", &self.display.is_some())
            .finish()
    }
}

impl FieldDescriptor {
    pub fn new(key: &str, label: &str, view: FieldView) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            view,
            accessor: None,
            width: None,
            context: FieldContext::Always,
            sortable: false,
            searchable: false,
            relation: None,
            eager: false,
            props: Map::new(),
            options: None,
            dynamic_options: None,
            visible_when: None,
            display: None,
        }
    }

    pub fn text(key: &str, label: &str) -> Self {
        Self::new(key, label, FieldView::Text)
    }

    pub fn accessor(mut self, path: &str) -> Self {
        self.accessor = Some(path.to_string());
        self
    }

    pub fn width(mut self, width: &str) -> Self {
        self.width = Some(width.to_string());
        self
    }

    pub fn context(mut self, context: FieldContext) -> Self {
        self.context = context;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn relation(mut self, name: &str) -> Self {
        self.relation = Some(name.to_string());
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn prop(mut self, name: &str, value: Value) -> Self {
        self.props.insert(name.to_string(), value);
        self
    }

    pub fn options(mut self, source: OptionsSource) -> Self {
        self.options = Some(source);
        self
    }

    pub fn dynamic_options(mut self, config: OptionsConfig) -> Self {
        self.dynamic_options = Some(config);
        self
    }

    pub fn visible_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.visible_when = Some(Arc::new(predicate));
        self
    }

    pub fn display_with<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Value, &Value) -> anyhow::Result<DisplayValue> + Send + Sync + 'static,
    {
        self.display = Some(Arc::new(transform));
        self
    }

    pub fn display_fn(mut self, transform: DisplayFn) -> Self {
        self.display = Some(transform);
        self
    }

    pub fn display(&self) -> Option<&DisplayFn> {
        self.display.as_ref()
    }

    /// Context tag and custom predicate both have to agree
    pub fn is_visible(&self, ctx: &RequestContext) -> bool {
        self.context.allows(ctx.view) && self.visible_when.as_ref().map_or(true, |p| p(ctx))
    }

    pub fn accessor_path(&self) -> &str {
        self.accessor.as_deref().unwrap_or(&self.key)
    }

    pub fn relation_name(&self) -> &str {
        self.relation.as_deref().unwrap_or(&self.key)
    }

    /// Read this field's raw value out of a record
    pub fn extract(&self, record: &Value) -> Option<Value> {
        lookup_path(record, self.accessor_path()).cloned()
    }

    /// Static metadata shared by resolved values and column headers
    pub fn metadata(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("key".to_string(), json!(self.key));
        map.insert("label".to_string(), json!(self.label));
        map.insert("view".to_string(), json!(self.view.as_str()));
        map.insert("type".to_string(), json!(self.view.data_type()));
        map.insert("context".to_string(), json!(self.context.as_str()));
        map.insert("sortable".to_string(), json!(self.sortable));
        map.insert("searchable".to_string(), json!(self.searchable));
        if let Some(ref width) = self.width {
            map.insert("width".to_string(), json!(width));
        }
        if self.view.is_relationship() {
            map.insert("relation".to_string(), json!(self.relation_name()));
        }

        let mut props = self.props.clone();
        if let Some(OptionsSource::Static(ref options)) = self.options {
            props.insert("options".to_string(), Value::Object(options.clone()));
        }
        map.insert("props".to_string(), Value::Object(props));

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tags() {
        assert!(FieldContext::Always.allows(ViewContext::List));
        assert!(!FieldContext::HideOnList.allows(ViewContext::List));
        assert!(FieldContext::HideOnList.allows(ViewContext::Detail));
        assert!(FieldContext::FormOnly.allows(ViewContext::Create));
        assert!(FieldContext::FormOnly.allows(ViewContext::Update));
        assert!(!FieldContext::FormOnly.allows(ViewContext::Detail));
        assert!(FieldContext::DetailOnly.allows(ViewContext::Detail));
        assert!(!FieldContext::CreateOnly.allows(ViewContext::Update));
    }

    #[test]
    fn test_custom_visibility_predicate() {
        let field = FieldDescriptor::text("secret", "Secret")
            .visible_when(|ctx| ctx.role() == Some("admin"));

        let anonymous = RequestContext::new(ViewContext::List, "users");
        assert!(!field.is_visible(&anonymous));

        let admin = anonymous.clone().with_principal(crate::context::Principal {
            id: "1".to_string(),
            role: Some("admin".to_string()),
        });
        assert!(field.is_visible(&admin));
    }

    #[test]
    fn test_extract_uses_accessor_path() {
        let record = json!({"id": 1, "author": {"name": "Ada"}});
        let field = FieldDescriptor::text("author_name", "Author").accessor("author.name");
        assert_eq!(field.extract(&record), Some(json!("Ada")));
        assert_eq!(FieldDescriptor::text("missing", "M").extract(&record), None);
    }

    #[test]
    fn test_metadata_includes_static_options() {
        let mut options = Map::new();
        options.insert("draft".to_string(), json!("Draft"));
        let field = FieldDescriptor::new("status", "Status", FieldView::Select)
            .options(OptionsSource::Static(options));

        let meta = field.metadata();
        assert_eq!(meta["key"], "status");
        assert_eq!(meta["view"], "select");
        assert_eq!(meta["type"], "string");
        assert_eq!(meta["props"]["options"]["draft"], "Draft");
    }

    #[test]
    fn test_relation_kinds() {
        assert_eq!(FieldView::BelongsTo.relation_kind(), Some(RelationKind::ToOne));
        assert_eq!(FieldView::HasMany.relation_kind(), Some(RelationKind::ToMany));
        assert!(!FieldView::Text.is_relationship());
    }
}
