//! Resource abstraction layer
//!
//! This module provides a data-driven approach to exposing records of a
//! backing store as admin-panel resources. Resource definitions are loaded
//! from JSON/YAML documents (or registered in code), and every list/detail
//! request runs the same pipeline over them.
//!
//! # Architecture
//!
//! - [`registry`] - Loads resource definitions and holds the runtime resources
//! - [`field`] - Field descriptors: what a resource displays and where
//! - [`resolver`] - Serializes one record through its field descriptors
//! - [`options`] - Fills selectable options of relationship fields
//! - [`preload`] - Maps requested relation names onto declared relations
//! - [`headers`] - Column headers for tabular views
//! - [`transform`] - Named display transforms usable from definitions
//! - [`component`] - Nested display components a transform may return
//! - [`fetcher`] - Assembles list and detail responses
//!
//! # Example
//!
//! ```ignore
//! use crudboard::context::{RequestContext, ViewContext};
//! use crudboard::query::{parse_query, PageLimits};
//! use crudboard::resource::{list_records, Registry, ResourceConfig};
//!
//! async fn list_posts(store: &dyn crudboard::store::DataProvider) -> anyhow::Result<serde_json::Value> {
//!     let registry = Registry::from_config(&ResourceConfig::embedded()?)?;
//!     let posts = registry.get("posts").unwrap();
//!     let ctx = RequestContext::new(ViewContext::List, "posts");
//!     let query = parse_query("posts[page]=2", "posts", &PageLimits::default());
//!     Ok(list_records(&ctx, &posts, &query, store).await?)
//! }
//! ```

pub mod component;
pub mod field;
mod fetcher;
mod headers;
mod options;
mod preload;
mod registry;
mod resolver;
pub mod transform;

pub use component::{Badge, Component, DisplayValue, Link, Stack, StackDirection, Text};
pub use fetcher::{extract_json_value, list_records, lookup_path, show_record};
pub use field::{FieldContext, FieldDescriptor, FieldView, OptionsConfig, OptionsSource, RelationKind};
pub use headers::build_headers;
pub use options::{is_unscoped_to_one, resolve_options};
pub use preload::{normalize_preloads, ModelShape};
pub use registry::*;
pub use resolver::{record_id, resolve_field, resolve_record};
