//! Catalog query parameters.
//!
//! Turns the product list's filter state into the ordered parameter set the
//! `/producto` endpoint understands. Stock filters are mutually exclusive
//! with each other and with text/category filters; pagination and sorting
//! always pass through. A cache-buster is appended last on every build.

use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::atomic::{AtomicI64, Ordering};
use validator::Validate;

use super::stock::LOW_STOCK_THRESHOLD;

/// Fields the backend searches when a `regex` filter is present.
pub const REGEX_FIELDS: &str = "nombre,descripcion,marca";
pub const CATEGORY_ALL: &str = "all";
pub const CATEGORY_COMBOS: &str = "combos";
/// Key of the cache-busting parameter. It carries no filter state.
pub const CACHE_BUSTER: &str = "_";

static LAST_CACHE_BUSTER: AtomicI64 = AtomicI64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl TryFrom<i8> for SortDirection {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Ascending),
            -1 => Ok(Self::Descending),
            other => Err(format!("sort direction must be 1 or -1, got {other}")),
        }
    }
}

impl From<SortDirection> for i8 {
    fn from(dir: SortDirection) -> Self {
        match dir {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// Filter state of the product list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    #[validate(length(max = 200))]
    pub search_term: Option<String>,
    pub category: Option<String>,
    pub show_low_stock_only: bool,
    pub show_no_stock_only: bool,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDirection>,
}

impl FilterState {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn low_stock_only(mut self) -> Self {
        self.show_low_stock_only = true;
        self
    }

    pub fn no_stock_only(mut self) -> Self {
        self.show_no_stock_only = true;
        self
    }

    pub fn paginate(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, dir: SortDirection) -> Self {
        self.sort_by = Some(field.into());
        self.sort_dir = Some(dir);
        self
    }
}

/// Ordered request parameters. Serializes as a JSON object in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn push(&mut self, key: &str, value: impl ToString) {
        self.0.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn cache_buster(&self) -> Option<&str> {
        self.get(CACHE_BUSTER)
    }

    /// Everything except the cache-buster, for comparing two builds.
    pub fn filters(&self) -> Vec<(&str, &str)> {
        self.iter().filter(|(k, _)| *k != CACHE_BUSTER).collect()
    }

    /// `k=v&k=v` with keys and values percent-encoded.
    pub fn to_query_string(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Strictly increasing millisecond stamp, so two builds never collide.
fn next_cache_buster() -> i64 {
    let now = Utc::now().timestamp_millis();
    match LAST_CACHE_BUSTER.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1))) {
        Ok(last) | Err(last) => now.max(last + 1),
    }
}

/// Builds parameters using the default low-stock threshold.
pub fn build_query_params(filters: &FilterState) -> QueryParams {
    build_query_params_with_threshold(filters, LOW_STOCK_THRESHOLD)
}

pub fn build_query_params_with_threshold(filters: &FilterState, low_stock_threshold: u32) -> QueryParams {
    let mut params = QueryParams::default();

    if let Some(page) = filters.page {
        params.push("page", page);
    }
    if let Some(limit) = filters.limit {
        params.push("limit", limit);
    }
    if let Some(sort_by) = non_blank(filters.sort_by.as_deref()) {
        params.push("sortBy", sort_by);
    }
    if let Some(dir) = filters.sort_dir {
        params.push("sortDir", i8::from(dir));
    }

    if filters.show_no_stock_only {
        params.push("noStock", true);
    } else if filters.show_low_stock_only {
        params.push("lowStock", true);
        params.push("threshold", low_stock_threshold);
    } else {
        if let Some(term) = non_blank(filters.search_term.as_deref()) {
            params.push("regex", term);
            params.push("regexFields", REGEX_FIELDS);
            params.push("regexOptions", "i");
        }
        match non_blank(filters.category.as_deref()) {
            None | Some(CATEGORY_ALL) => {}
            Some(CATEGORY_COMBOS) => params.push("esCombo", true),
            Some(category) => params.push("category", category),
        }
    }

    params.push(CACHE_BUSTER, next_cache_buster());
    params
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
