//! Resource Registry - Load resource definitions from JSON or YAML
//!
//! Resource definitions are declarative documents: color maps plus a map of
//! resources, each listing its fields, cards, relations and an optional role
//! policy. A demo definition is embedded in the binary and used when nothing
//! else is configured. Definitions are turned into runtime [`Resource`]s once
//! at startup and never change afterwards.

use super::field::{FieldContext, FieldDescriptor, FieldView, OptionsConfig, OptionsSource};
use super::options::is_unscoped_to_one;
use super::transform::{build_display, DisplayDef};
use crate::card::{build_card, Card};
use crate::policy::{PolicyGate, ResourcePolicy, RolePolicy};
use crate::store::RelationDef;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Embedded demo definitions (compiled into the binary)
const DEMO_DEFINITIONS: &str = include_str!("../resources/demo.json");

/// Embedded demo data for the in-memory store
pub const DEMO_DATA: &str = include_str!("../resources/demo_data.json");

/// Color definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ColorDef {
    pub value: String,
    pub color: [u8; 3],
}

/// Field definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub view: FieldView,
    #[serde(default)]
    pub accessor: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub context: FieldContext,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub eager: bool,
    #[serde(default)]
    pub props: Map<String, Value>,
    /// Static option set
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    #[serde(default)]
    pub dynamic_options: Option<OptionsConfig>,
    #[serde(default)]
    pub display: Option<DisplayDef>,
}

impl FieldDef {
    fn build(&self, color_maps: &HashMap<String, Vec<ColorDef>>) -> Result<FieldDescriptor> {
        let mut field = FieldDescriptor::new(&self.key, &self.label, self.view).context(self.context);
        field.accessor = self.accessor.clone();
        field.width = self.width.clone();
        field.sortable = self.sortable;
        field.searchable = self.searchable;
        field.relation = self.relation.clone();
        field.eager = self.eager;
        field.props = self.props.clone();
        field.options = self.options.clone().map(OptionsSource::Static);
        field.dynamic_options = self.dynamic_options.clone();

        if is_unscoped_to_one(&field) {
            tracing::warn!(
                field = %self.key,
                "to-one dynamic options without a foreign_key; every related row will be offered"
            );
        }

        if let Some(ref display) = self.display {
            let transform = build_display(display, color_maps)
                .with_context(|| format!("field '{}'", self.key))?;
            field = field.display_fn(transform);
        }
        Ok(field)
    }
}

/// Card definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct CardDef {
    /// `value`, `trend` or `static`
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    /// Grouping column for `trend`
    #[serde(default)]
    pub column: Option<String>,
    /// Equality conditions rows must satisfy
    #[serde(default, rename = "where")]
    pub conditions: Map<String, Value>,
    /// Payload of a `static` card
    #[serde(default)]
    pub payload: Value,
}

/// Resource definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDef {
    pub title: String,
    #[serde(default = "default_dialog_type")]
    pub dialog_type: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub cards: Vec<CardDef>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    #[serde(default)]
    pub policy: Option<RolePolicy>,
}

fn default_dialog_type() -> String {
    "modal".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

/// Root structure of a definitions file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub color_maps: HashMap<String, Vec<ColorDef>>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceDef>,
}

impl ResourceConfig {
    /// The demo definitions shipped with the binary
    pub fn embedded() -> Result<Self> {
        serde_json::from_str(DEMO_DEFINITIONS).context("Failed to parse embedded resource JSON")
    }

    /// Parse one definitions document; YAML when `path` says so, JSON otherwise
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(content)
                .with_context(|| format!("Failed to parse {}", path.display())),
            _ => serde_json::from_str(content)
                .with_context(|| format!("Failed to parse {}", path.display())),
        }
    }

    /// Load and merge definition files; later files win on collisions
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut final_config = Self::default();
        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            final_config.merge(Self::parse(&content, path)?);
        }
        Ok(final_config)
    }

    pub fn merge(&mut self, other: ResourceConfig) {
        self.color_maps.extend(other.color_maps);
        self.resources.extend(other.resources);
    }
}

/// A registered resource
#[derive(Clone)]
pub struct Resource {
    pub name: String,
    pub title: String,
    pub dialog_type: String,
    /// Record field identifying a record
    pub id_field: String,
    pub fields: Vec<FieldDescriptor>,
    pub cards: Vec<Arc<dyn Card>>,
    pub policy: PolicyGate,
    pub relations: Vec<RelationDef>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("id_field", &self.id_field)
            .field("fields", &self.fields.len())
            .field("cards", &self.cards.len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Resource {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            dialog_type: default_dialog_type(),
            id_field: default_id_field(),
            fields: Vec::new(),
            cards: Vec::new(),
            policy: PolicyGate::permit_all(),
            relations: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn card(mut self, card: Arc<dyn Card>) -> Self {
        self.cards.push(card);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn ResourcePolicy>) -> Self {
        self.policy = PolicyGate::new(policy);
        self
    }

    pub fn dialog_type(mut self, dialog_type: &str) -> Self {
        self.dialog_type = dialog_type.to_string();
        self
    }

    pub fn id_field(mut self, id_field: &str) -> Self {
        self.id_field = id_field.to_string();
        self
    }

    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Build a runtime resource from its definition
    pub fn from_def(
        name: &str,
        def: &ResourceDef,
        color_maps: &HashMap<String, Vec<ColorDef>>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut resource = Self::new(name, &def.title)
            .dialog_type(&def.dialog_type)
            .id_field(&def.id_field);

        for field_def in &def.fields {
            if !seen.insert(field_def.key.as_str()) {
                bail!("duplicate field key '{}'", field_def.key);
            }
            resource = resource.field(field_def.build(color_maps)?);
        }

        for (index, card_def) in def.cards.iter().enumerate() {
            let card = build_card(card_def).with_context(|| format!("card #{}", index))?;
            resource = resource.card(card);
        }

        if let Some(ref policy) = def.policy {
            resource = resource.policy(Arc::new(policy.clone()));
        }

        resource.relations = def.relations.clone();
        Ok(resource)
    }
}

/// All registered resources, by name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: BTreeMap<String, Arc<Resource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ResourceConfig) -> Result<Self> {
        let mut registry = Self::new();
        for (name, def) in &config.resources {
            let resource = Resource::from_def(name, def, &config.color_maps)
                .with_context(|| format!("Invalid resource '{}'", name))?;
            registry.insert(resource);
        }
        tracing::info!(count = registry.resources.len(), "registered resources");
        Ok(registry)
    }

    /// Register a resource, replacing any with the same name
    pub fn insert(&mut self, resource: Resource) {
        self.resources.insert(resource.name.clone(), Arc::new(resource));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Resource>> {
        self.resources.get(name).cloned()
    }

    /// Resource names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().map(|r| r.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RequestContext, ViewContext};
    use serde_json::json;

    #[test]
    fn test_embedded_registry_loads_successfully() {
        let config = ResourceConfig::embedded().unwrap();
        let registry = Registry::from_config(&config).unwrap();
        assert!(!registry.names().is_empty(), "Registry should have resources");
        assert!(registry.names().contains(&"posts"), "Should contain posts");
    }

    #[test]
    fn test_posts_resource_is_complete() {
        let registry = Registry::from_config(&ResourceConfig::embedded().unwrap()).unwrap();
        let posts = registry.get("posts").unwrap();
        assert_eq!(posts.title, "Posts");
        assert!(!posts.fields.is_empty());
        assert!(!posts.cards.is_empty());
        assert!(posts.fields.iter().any(|f| f.display().is_some()));
    }

    #[test]
    fn test_demo_category_options_are_unscoped() {
        let registry = Registry::from_config(&ResourceConfig::embedded().unwrap()).unwrap();
        let posts = registry.get("posts").unwrap();
        let unscoped: Vec<&str> = posts
            .fields
            .iter()
            .filter(|f| is_unscoped_to_one(f))
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(unscoped, vec!["category"]);
    }

    #[test]
    fn test_embedded_color_maps_exist() {
        let config = ResourceConfig::embedded().unwrap();
        assert!(config.color_maps.contains_key("post_status"), "post_status color map should exist");
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = ResourceConfig::parse(
            r#"{"resources": {"posts": {"title": "Posts"}, "users": {"title": "Users"}}}"#,
            Path::new("a.json"),
        )
        .unwrap();
        let overlay = ResourceConfig::parse(
            "resources:\n  posts:\n    title: Articles\n    dialog_type: drawer\n",
            Path::new("b.yaml"),
        )
        .unwrap();
        base.merge(overlay);

        assert_eq!(base.resources["posts"].title, "Articles");
        assert_eq!(base.resources["posts"].dialog_type, "drawer");
        assert_eq!(base.resources["users"].id_field, "id");
    }

    #[test]
    fn test_invalid_definitions_are_rejected() {
        let unknown_transform: ResourceConfig = serde_json::from_value(json!({
            "resources": {"posts": {"title": "Posts", "fields": [
                {"key": "status", "label": "Status", "display": {"kind": "sparkle"}}
            ]}}
        }))
        .unwrap();
        let err = Registry::from_config(&unknown_transform).unwrap_err();
        assert!(format!("{:#}", err).contains("sparkle"));

        let duplicate: ResourceConfig = serde_json::from_value(json!({
            "resources": {"posts": {"title": "Posts", "fields": [
                {"key": "title", "label": "Title"},
                {"key": "title", "label": "Again"}
            ]}}
        }))
        .unwrap();
        assert!(Registry::from_config(&duplicate).is_err());
    }

    #[test]
    fn test_role_policy_from_definition() {
        let config: ResourceConfig = serde_json::from_value(json!({
            "resources": {"users": {"title": "Users", "policy": {"view_any": ["admin"]}}}
        }))
        .unwrap();
        let registry = Registry::from_config(&config).unwrap();
        let users = registry.get("users").unwrap();

        let anonymous = RequestContext::new(ViewContext::List, "users");
        assert!(!users.policy.view_any(&anonymous));
        assert!(users.policy.create(&anonymous));
    }

    #[test]
    fn test_programmatic_registration() {
        let mut registry = Registry::new();
        registry.insert(
            Resource::new("notes", "Notes")
                .field(FieldDescriptor::text("body", "Body"))
                .id_field("uuid"),
        );
        let notes = registry.get("notes").unwrap();
        assert_eq!(notes.id_field, "uuid");
        assert_eq!(notes.dialog_type, "modal");
        assert_eq!(registry.iter().count(), 1);
        assert!(registry.get("missing").is_none());
    }
}
