//! Stock validation for combos and carts.
//!
//! Every requested line is resolved against a catalog snapshot and classified
//! as fine, advisory (low stock) or blocking (insufficient stock, unknown
//! product). Results keep the order of the requested lines.

use crate::{ComboLineItem, Product};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Default low-stock threshold when neither the product nor the
/// configuration sets one.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StockIssue {
    #[serde(rename_all = "camelCase")]
    NotFound { product_id: String },
    #[serde(rename_all = "camelCase")]
    Insufficient { product_id: String, name: String, requested: u32, available: u32 },
    #[serde(rename_all = "camelCase")]
    LowStock { product_id: String, name: String, requested: u32, available: u32 },
}

impl StockIssue {
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::LowStock { .. })
    }

    pub fn product_id(&self) -> &str {
        match self {
            Self::NotFound { product_id }
            | Self::Insufficient { product_id, .. }
            | Self::LowStock { product_id, .. } => product_id,
        }
    }
}

impl fmt::Display for StockIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { product_id } => {
                write!(f, "product not found for stock validation: {product_id}")
            }
            Self::Insufficient { name, requested, available, .. } => write!(
                f,
                "insufficient stock for \"{name}\": requested {requested}, available {available}"
            ),
            Self::LowStock { name, requested, available, .. } => write!(
                f,
                "low stock for \"{name}\": requested {requested}, available {available}"
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub issues: Vec<StockIssue>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<StockIssue>) -> Self {
        Self {
            is_valid: !issues.iter().any(StockIssue::is_blocking),
            warnings: issues.iter().map(ToString::to_string).collect(),
            issues,
        }
    }

    pub fn blocking(&self) -> impl Iterator<Item = &StockIssue> {
        self.issues.iter().filter(|i| i.is_blocking())
    }

    pub fn advisory(&self) -> impl Iterator<Item = &StockIssue> {
        self.issues.iter().filter(|i| !i.is_blocking())
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::from_issues(Vec::new())
    }
}

/// Catalog snapshot indexed by product id.
///
/// When the same id appears twice the first occurrence wins, matching a
/// front-to-back lookup over the original list.
#[derive(Clone, Debug)]
pub struct Catalog {
    products: HashMap<String, Product>,
    default_threshold: u32,
}

impl Default for Catalog {
    fn default() -> Self {
        Self { products: HashMap::new(), default_threshold: LOW_STOCK_THRESHOLD }
    }
}

impl Catalog {
    pub fn new(products: &[Product]) -> Self {
        Self::with_threshold(products, LOW_STOCK_THRESHOLD)
    }

    pub fn with_threshold(products: &[Product], default_threshold: u32) -> Self {
        Self::from_products(products.iter().cloned(), default_threshold)
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>, default_threshold: u32) -> Self {
        let mut index = HashMap::new();
        for product in products {
            index.entry(product.id.clone()).or_insert(product);
        }
        Self { products: index, default_threshold }
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn default_threshold(&self) -> u32 { self.default_threshold }
    pub fn len(&self) -> usize { self.products.len() }
    pub fn is_empty(&self) -> bool { self.products.is_empty() }

    pub fn validate(&self, items: &[ComboLineItem]) -> ValidationResult {
        check_lines(items, |id| self.products.get(id), self.default_threshold)
    }

    /// How many complete bundles of `items` the snapshot can supply.
    ///
    /// Zero when any line references an unknown product or when there are no
    /// lines with a positive quantity.
    pub fn bundle_capacity(&self, items: &[ComboLineItem]) -> u32 {
        items
            .iter()
            .filter(|item| item.quantity > 0)
            .map(|item| self.get(&item.product_id).map_or(0, |p| p.stock / item.quantity))
            .min()
            .unwrap_or(0)
    }
}

/// Validates `items` against `catalog` with the default low-stock threshold.
pub fn validate_stock(items: &[ComboLineItem], catalog: &[Product]) -> ValidationResult {
    validate_stock_with_threshold(items, catalog, LOW_STOCK_THRESHOLD)
}

pub fn validate_stock_with_threshold(
    items: &[ComboLineItem],
    catalog: &[Product],
    default_threshold: u32,
) -> ValidationResult {
    if items.is_empty() {
        return ValidationResult::default();
    }
    let mut index: HashMap<&str, &Product> = HashMap::with_capacity(catalog.len());
    for product in catalog {
        index.entry(product.id.as_str()).or_insert(product);
    }
    check_lines(items, |id| index.get(id).copied(), default_threshold)
}

fn check_lines<'a>(
    items: &[ComboLineItem],
    lookup: impl Fn(&str) -> Option<&'a Product>,
    default_threshold: u32,
) -> ValidationResult {
    let issues: Vec<StockIssue> = items
        .iter()
        .filter_map(|item| classify(item, lookup(item.product_id.as_str()), default_threshold))
        .collect();
    let result = ValidationResult::from_issues(issues);
    if !result.is_valid {
        tracing::debug!(
            lines = items.len(),
            blocking = result.blocking().count(),
            "stock validation blocked"
        );
    }
    result
}

fn classify(item: &ComboLineItem, product: Option<&Product>, default_threshold: u32) -> Option<StockIssue> {
    let Some(product) = product else {
        return Some(StockIssue::NotFound { product_id: item.product_id.clone() });
    };
    let threshold = product.low_stock_threshold.unwrap_or(default_threshold);
    let name = display_name(item, product);
    if product.stock < item.quantity {
        Some(StockIssue::Insufficient {
            product_id: product.id.clone(),
            name,
            requested: item.quantity,
            available: product.stock,
        })
    } else if product.stock > 0 && product.stock <= threshold {
        Some(StockIssue::LowStock {
            product_id: product.id.clone(),
            name,
            requested: item.quantity,
            available: product.stock,
        })
    } else {
        None
    }
}

fn display_name(item: &ComboLineItem, product: &Product) -> String {
    [Some(product.name.as_str()), item.name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|n| !n.is_empty())
        .unwrap_or(product.id.as_str())
        .to_string()
}
