//! Storefront Engine
//!
//! Shared pricing, stock and catalog-query logic for the storefront and its
//! administrative console.
//!
//! ## Features
//! - Line and order totals
//! - Combo and cart stock validation
//! - Catalog query parameter building
//! - Cart, combo editor and order approval workflow

pub mod api;
pub mod boundary;
pub mod config;
pub mod domain;
pub mod engine;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use boundary::resolve_product_id;
pub use engine::{
    build_query_params, compute_total, validate_stock, Catalog, FilterState, QueryParams,
    StockIssue, ValidationResult, LOW_STOCK_THRESHOLD,
};

// =============================================================================
// Core Types
// =============================================================================

/// A catalog product as the backend reports it.
///
/// Field aliases accept the backend's own document keys (`_id`, `nombre`,
/// `precio`, `esCombo`, `categoria`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, alias = "_id", deserialize_with = "crate::boundary::product_id")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "precio", deserialize_with = "crate::boundary::amount")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "crate::boundary::count")]
    pub stock: u32,
    /// Overrides the configured low-stock threshold for this product.
    #[serde(
        default,
        deserialize_with = "crate::boundary::optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub low_stock_threshold: Option<u32>,
    #[serde(default, alias = "esCombo")]
    pub is_combo: bool,
    #[serde(default, alias = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
            low_stock_threshold: None,
            is_combo: false,
            category: None,
        }
    }

    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = Some(threshold);
        self
    }

    pub fn combo(mut self) -> Self {
        self.is_combo = true;
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One constituent of a combo, or one cart line.
///
/// `product_id` accepts a plain id or a populated product document, and the
/// numeric fields tolerate missing or malformed input, which reads as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboLineItem {
    #[serde(
        default,
        alias = "productoId",
        alias = "producto",
        deserialize_with = "crate::boundary::product_id"
    )]
    pub product_id: String,
    #[serde(default, alias = "cantidad", deserialize_with = "crate::boundary::count")]
    pub quantity: u32,
    #[serde(default, alias = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        alias = "precio",
        deserialize_with = "crate::boundary::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit_price: Option<Decimal>,
}

impl ComboLineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self { product_id: product_id.into(), quantity, ..Self::default() }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// `unit_price * quantity` at full precision. A missing price counts as zero.
    pub fn line_total(&self) -> Decimal {
        self.unit_price
            .unwrap_or(Decimal::ZERO)
            .saturating_mul(Decimal::from(self.quantity))
    }
}

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error(transparent)]
    Cart(#[from] domain::aggregates::CartError),

    #[error(transparent)]
    Combo(#[from] domain::aggregates::ComboError),

    #[error(transparent)]
    Delivery(#[from] domain::aggregates::DeliveryError),

    #[error(transparent)]
    Order(#[from] domain::aggregates::OrderError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
