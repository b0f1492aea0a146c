//! Pure pricing, stock and query logic shared by every call site.

pub mod pricing;
pub mod query;
pub mod stock;

pub use pricing::{compute_total, display_total};
pub use query::{
    build_query_params, build_query_params_with_threshold, FilterState, QueryParams, SortDirection,
};
pub use stock::{
    validate_stock, validate_stock_with_threshold, Catalog, StockIssue, ValidationResult,
    LOW_STOCK_THRESHOLD,
};
