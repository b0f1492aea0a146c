//! Combo Aggregate
//!
//! Editor state for a bundle of existing products. The suggested price and
//! the stock validation are recomputed whenever the lines or the snapshot
//! change.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::value_objects::Money;
use crate::engine::{compute_total, Catalog, ValidationResult};
use crate::ComboLineItem;

#[derive(Clone, Debug)]
pub struct ComboDraft {
    lines: Vec<ComboLineItem>,
    snapshot: Catalog,
    suggested_price: Money,
    validation: ValidationResult,
}

/// A finished combo, ready to be sent to the catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboDefinition {
    pub name: String,
    pub price: Decimal,
    pub components: Vec<ComboLineItem>,
    /// Complete combos the current stock can supply.
    pub available_units: u32,
    pub warnings: Vec<String>,
}

impl ComboDraft {
    pub fn new(snapshot: Catalog) -> Self {
        Self::from_lines(snapshot, vec![])
    }

    /// Reopens an existing combo for editing.
    pub fn from_lines(snapshot: Catalog, lines: Vec<ComboLineItem>) -> Self {
        let mut draft = Self { lines, snapshot, suggested_price: Money::zero(), validation: ValidationResult::default() };
        draft.lines.retain(|l| l.quantity > 0);
        draft.recalculate();
        draft
    }

    pub fn lines(&self) -> &[ComboLineItem] { &self.lines }
    pub fn suggested_price(&self) -> &Money { &self.suggested_price }
    pub fn validation(&self) -> &ValidationResult { &self.validation }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn add_component(&mut self, product_id: &str, quantity: u32) -> Result<(), ComboError> {
        let product = self.snapshot.get(product_id).ok_or_else(|| ComboError::UnknownProduct(product_id.to_string()))?;
        if product.is_combo { return Err(ComboError::NestedCombo(product_id.to_string())); }
        let quantity = quantity.max(1);
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => {
                let line = ComboLineItem::new(product_id, quantity).named(&product.name).with_unit_price(product.price);
                self.lines.push(line);
            }
        }
        self.recalculate();
        Ok(())
    }

    /// Zero removes the component.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), ComboError> {
        let idx = self.position(product_id)?;
        if quantity == 0 { self.lines.remove(idx); } else { self.lines[idx].quantity = quantity; }
        self.recalculate();
        Ok(())
    }

    pub fn remove_component(&mut self, product_id: &str) -> Result<(), ComboError> {
        let idx = self.position(product_id)?;
        self.lines.remove(idx);
        self.recalculate();
        Ok(())
    }

    pub fn replace_snapshot(&mut self, snapshot: Catalog) {
        self.snapshot = snapshot;
        self.recalculate();
    }

    /// Closes the draft. `price` defaults to the suggested price.
    pub fn finish(self, name: impl Into<String>, price: Option<Decimal>) -> Result<ComboDefinition, ComboError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ComboError::MissingName); }
        if self.lines.is_empty() { return Err(ComboError::Empty); }
        if !self.validation.is_valid { return Err(ComboError::InsufficientStock(self.validation.warnings)); }
        tracing::info!(combo = %name, components = self.lines.len(), "combo definition finished");
        Ok(ComboDefinition {
            name,
            price: price.unwrap_or(self.suggested_price.amount()),
            available_units: self.snapshot.bundle_capacity(&self.lines),
            warnings: self.validation.warnings,
            components: self.lines,
        })
    }

    fn position(&self, product_id: &str) -> Result<usize, ComboError> {
        self.lines.iter().position(|l| l.product_id == product_id).ok_or_else(|| ComboError::ComponentNotFound(product_id.to_string()))
    }

    fn recalculate(&mut self) {
        self.suggested_price = Money::new(compute_total(&self.lines));
        self.validation = self.snapshot.validate(&self.lines);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("product not in catalog snapshot: {0}")]
    UnknownProduct(String),
    #[error("a combo cannot contain another combo: {0}")]
    NestedCombo(String),
    #[error("component not in combo: {0}")]
    ComponentNotFound(String),
    #[error("combo name is required")]
    MissingName,
    #[error("combo has no components")]
    Empty,
    #[error("combo blocked by stock: {}", .0.join("; "))]
    InsufficientStock(Vec<String>),
}
