//! Relationship Preload Normalizer
//!
//! Maps requested and field-implied relation names onto the relations a
//! model actually declares. Names match case-insensitively and ignore
//! `_`/`-` separators, so `blog_posts`, `blogPosts` and `BlogPosts` are the
//! same relation. Anything that does not resolve is dropped.

use super::field::FieldDescriptor;
use std::collections::{BTreeSet, HashMap};

/// The relations a backing-store model declares, in its native casing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelShape {
    pub relations: Vec<String>,
}

impl ModelShape {
    pub fn new<I, S>(relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            relations: relations.into_iter().map(Into::into).collect(),
        }
    }
}

fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolve explicit and eager-field preloads against the model's relations
pub fn normalize_preloads(
    shape: &ModelShape,
    explicit: &[String],
    fields: &[FieldDescriptor],
) -> BTreeSet<String> {
    let declared: HashMap<String, &str> = shape
        .relations
        .iter()
        .map(|r| (fold_name(r), r.as_str()))
        .collect();

    let implied = fields
        .iter()
        .filter(|f| f.view.is_relationship() && f.eager)
        .map(|f| f.relation_name());

    let mut resolved = BTreeSet::new();
    for candidate in explicit.iter().map(String::as_str).chain(implied) {
        match declared.get(&fold_name(candidate.trim())) {
            Some(native) => {
                resolved.insert((*native).to_string());
            }
            None => {
                tracing::debug!(relation = candidate, "dropping unresolvable preload");
            }
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::field::FieldView;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_explicit_names_match_native_casing() {
        let shape = ModelShape::new(["Author", "BlogPosts"]);
        let out = normalize_preloads(
            &shape,
            &["author".to_string(), "blog_posts".to_string()],
            &[],
        );
        assert_eq!(names(&out), vec!["Author", "BlogPosts"]);
    }

    #[test]
    fn test_unresolvable_names_dropped() {
        let shape = ModelShape::new(["author"]);
        let out = normalize_preloads(&shape, &["autor".to_string(), "".to_string()], &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_eager_relationship_fields_are_implied() {
        let shape = ModelShape::new(["author", "comments", "tags"]);
        let fields = vec![
            FieldDescriptor::new("author", "Author", FieldView::BelongsTo).eager(),
            FieldDescriptor::new("comment_list", "Comments", FieldView::HasMany)
                .relation("comments")
                .eager(),
            FieldDescriptor::new("tags", "Tags", FieldView::BelongsToMany),
            FieldDescriptor::text("title", "Title").eager(),
        ];

        let out = normalize_preloads(&shape, &[], &fields);
        assert_eq!(names(&out), vec!["author", "comments"]);
    }

    #[test]
    fn test_union_deduplicates() {
        let shape = ModelShape::new(["author"]);
        let fields = vec![FieldDescriptor::new("author", "Author", FieldView::BelongsTo).eager()];
        let out = normalize_preloads(&shape, &["Author".to_string()], &fields);
        assert_eq!(out.len(), 1);
    }
}
