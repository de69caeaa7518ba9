//! Remote JSON Store
//!
//! A data provider backed by a REST service speaking plain JSON:
//!
//! - `GET {base}/{resource}?page&per_page&sort&search&filter[col][op]&with`
//!   returning `{"data": [...], "total": n}` (a bare array is accepted too)
//! - `GET {base}/{resource}/{id}` returning the record, or 404
//! - `GET {base}/{table}?scope_key&scope_id` for related rows

use super::{DataProvider, Page, RowScope};
use crate::query::QueryRequest;
use crate::resource::ModelShape;
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    shapes: HashMap<String, ModelShape>,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("crudboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            shapes: HashMap::new(),
        })
    }

    /// Declare the relations a remote resource supports
    pub fn with_shape(mut self, resource: &str, shape: ModelShape) -> Self {
        self.shapes.insert(resource.to_string(), shape);
        self
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// GET returning parsed JSON, or `None` on 404
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Option<Value>> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            tracing::error!("Store error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("Store request failed: {}", status));
        }

        serde_json::from_str(&body)
            .map(Some)
            .context("Failed to parse response JSON")
    }

    async fn page(&self, resource: &str, query: &QueryRequest, preloads: &BTreeSet<String>) -> Result<Page> {
        let url = self.url(&[resource]);
        let response = self
            .get(&url, &page_params(query, preloads))
            .await?
            .with_context(|| format!("Unknown resource: {}", resource))?;

        let records = extract_rows(&response);
        let total = response
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(records.len() as u64);

        Ok(Page { records, total })
    }

    async fn lookup(&self, resource: &str, id: &str, preloads: &BTreeSet<String>) -> Result<Option<Value>> {
        let url = self.url(&[resource, id]);
        let mut params = Vec::new();
        if !preloads.is_empty() {
            params.push(("with".to_string(), join(preloads.iter())));
        }

        Ok(self.get(&url, &params).await?.map(|body| match body {
            Value::Object(ref map) if map.len() == 1 && map.contains_key("data") => {
                map["data"].clone()
            }
            other => other,
        }))
    }

    async fn rows(&self, table: &str, scope: Option<&RowScope>) -> Result<Vec<Value>> {
        let url = self.url(&[table]);
        let mut params = Vec::new();
        if let Some(scope) = scope {
            params.push(("scope_key".to_string(), scope.foreign_key.clone()));
            params.push(("scope_id".to_string(), scalar_string(&scope.parent_id)));
        }

        let response = self
            .get(&url, &params)
            .await?
            .with_context(|| format!("Unknown table: {}", table))?;
        Ok(extract_rows(&response))
    }
}

impl DataProvider for HttpStore {
    fn model_shape(&self, resource: &str) -> ModelShape {
        self.shapes.get(resource).cloned().unwrap_or_default()
    }

    fn fetch_page<'a>(
        &'a self,
        resource: &'a str,
        query: &'a QueryRequest,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Page>> {
        self.page(resource, query, preloads).boxed()
    }

    fn find<'a>(
        &'a self,
        resource: &'a str,
        id: &'a str,
        preloads: &'a BTreeSet<String>,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        self.lookup(resource, id, preloads).boxed()
    }

    fn related_rows<'a>(
        &'a self,
        table: &'a str,
        scope: Option<&'a RowScope>,
    ) -> BoxFuture<'a, Result<Vec<Value>>> {
        self.rows(table, scope).boxed()
    }
}

/// Query parameters understood by the remote listing endpoint
fn page_params(query: &QueryRequest, preloads: &BTreeSet<String>) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), query.page.to_string()),
        ("per_page".to_string(), query.per_page.to_string()),
    ];

    if !query.sort.is_empty() {
        let sort = query
            .sort
            .iter()
            .map(|s| format!("{}:{}", s.column, s.direction.as_str()));
        params.push(("sort".to_string(), join(sort)));
    }

    if let Some(ref search) = query.search {
        params.push(("search".to_string(), search.clone()));
    }

    for filter in &query.filters {
        params.push((
            format!("filter[{}][{}]", filter.column, filter.op.as_str()),
            filter.value.clone(),
        ));
    }

    if !preloads.is_empty() {
        params.push(("with".to_string(), join(preloads.iter())));
    }

    params
}

fn join<I, S>(items: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    items
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn extract_rows(response: &Value) -> Vec<Value> {
    match response {
        Value::Array(rows) => rows.clone(),
        other => other
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
