//! Query Parser
//!
//! Turns a raw query string into a canonical [`QueryRequest`]. Two encodings
//! are accepted:
//!
//! - nested, scoped under the resource name:
//!   `posts[search]=x&posts[sort][title]=asc&posts[filters][views][gt]=10&posts[page]=2`
//! - legacy flat: `search=x&sort_column=title&sort_direction=asc&page=2&per_page=20`
//!
//! Nested values win when both are present. Unknown parameters are ignored.

use serde::Serialize;

/// Column used for the default sort when the request names none
pub const DEFAULT_SORT_COLUMN: &str = "created_at";

/// Page size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_per_page: 15,
            max_per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction; anything other than `desc` sorts ascending
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortPair {
    pub column: String,
    pub direction: SortDirection,
}

impl SortPair {
    pub fn new(column: &str, direction: SortDirection) -> Self {
        Self {
            column: column.to_string(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "neq" | "ne" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "like" | "contains" => Some(Self::Like),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPredicate {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

/// Canonical paging/sort/search/filter request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    /// 1-based
    pub page: u64,
    pub per_page: u64,
    pub sort: Vec<SortPair>,
    pub search: Option<String>,
    pub filters: Vec<FilterPredicate>,
    /// Explicitly requested relation preloads
    pub with: Vec<String>,
}

impl QueryRequest {
    pub fn new(limits: &PageLimits) -> Self {
        Self {
            page: 1,
            per_page: limits.default_per_page,
            sort: vec![SortPair::new(DEFAULT_SORT_COLUMN, SortDirection::Desc)],
            search: None,
            filters: Vec::new(),
            with: Vec::new(),
        }
    }

    /// Number of records skipped before this page
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1)).saturating_mul(self.per_page) as usize
    }
}

/// Parameters collected from one encoding before merging
#[derive(Debug, Default)]
struct RawParams {
    search: Option<String>,
    sort: Vec<SortPair>,
    filters: Vec<FilterPredicate>,
    page: Option<String>,
    per_page: Option<String>,
    with: Option<String>,
}

/// Parse a raw (still percent-encoded) query string for `resource`
pub fn parse_query(raw: &str, resource: &str, limits: &PageLimits) -> QueryRequest {
    let mut nested = RawParams::default();
    let mut legacy = RawParams::default();
    let mut legacy_sort_column: Option<String> = None;
    let mut legacy_sort_direction: Option<String> = None;

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let Some((base, segments)) = split_key(&key) else {
            continue;
        };

        if segments.is_empty() {
            match base {
                "search" => legacy.search = Some(value.into_owned()),
                "sort_column" => legacy_sort_column = Some(value.into_owned()),
                "sort_direction" => legacy_sort_direction = Some(value.into_owned()),
                "page" => legacy.page = Some(value.into_owned()),
                "per_page" => legacy.per_page = Some(value.into_owned()),
                "with" => legacy.with = Some(value.into_owned()),
                _ => {}
            }
            continue;
        }

        if base != resource {
            continue;
        }

        match segments.as_slice() {
            ["search"] => nested.search = Some(value.into_owned()),
            ["page"] => nested.page = Some(value.into_owned()),
            ["per_page"] => nested.per_page = Some(value.into_owned()),
            ["with"] => nested.with = Some(value.into_owned()),
            ["sort", column] if !column.is_empty() => {
                nested.sort.retain(|s| s.column != *column);
                nested
                    .sort
                    .push(SortPair::new(column, SortDirection::parse(&value)));
            }
            ["filters", column, op] if !column.is_empty() => {
                let Some(op) = FilterOp::parse(op) else {
                    continue;
                };
                nested
                    .filters
                    .retain(|f| !(f.column == *column && f.op == op));
                nested.filters.push(FilterPredicate {
                    column: column.to_string(),
                    op,
                    value: value.into_owned(),
                });
            }
            _ => {}
        }
    }

    if let Some(column) = legacy_sort_column.filter(|c| !c.trim().is_empty()) {
        let direction = legacy_sort_direction
            .as_deref()
            .map(SortDirection::parse)
            .unwrap_or(SortDirection::Asc);
        legacy.sort.push(SortPair::new(column.trim(), direction));
    }

    merge(nested, legacy, limits)
}

fn merge(nested: RawParams, legacy: RawParams, limits: &PageLimits) -> QueryRequest {
    let mut request = QueryRequest::new(limits);

    request.page = nested
        .page
        .or(legacy.page)
        .as_deref()
        .and_then(parse_positive)
        .unwrap_or(1);

    request.per_page = nested
        .per_page
        .or(legacy.per_page)
        .as_deref()
        .and_then(parse_positive)
        .unwrap_or(limits.default_per_page)
        .min(limits.max_per_page.max(1));

    request.search = nested
        .search
        .or(legacy.search)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let sort = if nested.sort.is_empty() {
        legacy.sort
    } else {
        nested.sort
    };
    if !sort.is_empty() {
        request.sort = sort;
    }

    request.filters = nested.filters;

    request.with = nested
        .with
        .or(legacy.with)
        .map(|w| {
            w.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    request
}

fn parse_positive(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// Split `base[a][b]` into `("base", ["a", "b"])`; `None` when malformed
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let Some(open) = key.find('[') else {
        return Some((key, Vec::new()));
    };

    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    Some((base, segments))
}
