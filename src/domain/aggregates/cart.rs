//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::delivery::DeliverySelection;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::Money;
use crate::engine::{Catalog, ValidationResult};
use crate::{ComboLineItem, Product};

/// Category whose items have no upper quantity bound in the cart.
pub const MAINTENANCE_CATEGORY: &str = "mantenimiento";

#[derive(Clone, Debug)]
pub struct Cart {
    id: String,
    items: Vec<CartItem>,
    snapshot: Catalog,
    subtotal: Money,
    validation: ValidationResult,
    delivery: DeliverySelection,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub is_combo: bool,
    pub category: Option<String>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(), name: product.name.clone(), quantity,
            unit_price: Money::new(product.price), is_combo: product.is_combo, category: product.category.clone(),
        }
    }

    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }

    pub fn is_unbounded(&self) -> bool {
        self.category.as_deref().is_some_and(|c| c.trim().eq_ignore_ascii_case(MAINTENANCE_CATEGORY))
    }

    pub fn as_line_item(&self) -> ComboLineItem {
        ComboLineItem::new(&self.product_id, self.quantity).named(&self.name).with_unit_price(self.unit_price.amount())
    }
}

/// What a quantity request ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityChange {
    Applied(u32),
    /// Combos stay at exactly one; the requested value was discarded.
    ComboClamped,
    CappedAtStock(u32),
    Removed,
}

impl Cart {
    pub fn new(snapshot: Catalog) -> Self {
        Self::with_delivery(snapshot, DeliverySelection::default())
    }

    pub fn with_delivery(snapshot: Catalog, delivery: DeliverySelection) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(), items: vec![], snapshot, subtotal: Money::zero(),
            validation: ValidationResult::default(), delivery, created_at: now, updated_at: now, events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn validation(&self) -> &ValidationResult { &self.validation }
    pub fn is_valid(&self) -> bool { self.validation.is_valid }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn snapshot(&self) -> &Catalog { &self.snapshot }
    pub fn delivery(&self) -> &DeliverySelection { &self.delivery }
    pub fn delivery_mut(&mut self) -> &mut DeliverySelection { &mut self.delivery }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn line_items(&self) -> Vec<ComboLineItem> {
        self.items.iter().map(CartItem::as_line_item).collect()
    }

    /// Adds `item`, merging with an existing line for the same product.
    pub fn add_item(&mut self, item: CartItem) -> QuantityChange {
        let (idx, requested) = match self.items.iter().position(|i| i.product_id == item.product_id) {
            Some(idx) => (idx, i64::from(self.items[idx].quantity) + i64::from(item.quantity)),
            None => {
                let requested = i64::from(item.quantity);
                self.items.push(item);
                (self.items.len() - 1, requested)
            }
        };
        let change = self.apply_quantity(idx, requested);
        self.recalculate();
        change
    }

    pub fn add_product(&mut self, product_id: &str, quantity: u32) -> Result<QuantityChange, CartError> {
        let product = self.snapshot.get(product_id).ok_or_else(|| CartError::ProductNotFound(product_id.to_string()))?;
        let item = CartItem::from_product(product, quantity);
        Ok(self.add_item(item))
    }

    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> Result<QuantityChange, CartError> {
        let idx = self.position(product_id)?;
        let change = self.apply_quantity(idx, quantity);
        self.recalculate();
        Ok(change)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let idx = self.position(product_id)?;
        self.items.remove(idx);
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { product_id: product_id.to_string() }));
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); self.recalculate(); }

    /// Swaps in a fresh stock snapshot, refreshing the listing data of lines
    /// whose product is still listed. Lines that became combos drop to 1.
    pub fn replace_snapshot(&mut self, snapshot: Catalog) {
        for item in &mut self.items {
            if let Some(product) = snapshot.get(&item.product_id) {
                item.unit_price = Money::new(product.price);
                item.name = product.name.clone();
                item.is_combo = product.is_combo;
                item.category = product.category.clone();
            }
        }
        self.snapshot = snapshot;
        let stale: Vec<(usize, u32)> = self.items.iter().enumerate()
            .filter(|(_, i)| i.is_combo && i.quantity != 1)
            .map(|(idx, i)| (idx, i.quantity))
            .collect();
        for (idx, quantity) in stale {
            self.apply_quantity(idx, i64::from(quantity));
        }
        self.recalculate();
    }

    /// The quantities `items` would ask of the snapshot once placed in a cart:
    /// repeated products merged, known combos counted once. No stock cap.
    pub fn requested_lines(snapshot: &Catalog, items: &[ComboLineItem]) -> Vec<ComboLineItem> {
        let mut merged: Vec<ComboLineItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => merged.push(item.clone()),
            }
        }
        for line in &mut merged {
            if snapshot.get(&line.product_id).is_some_and(|p| p.is_combo) {
                line.quantity = 1;
            }
        }
        merged
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn position(&self, product_id: &str) -> Result<usize, CartError> {
        self.items.iter().position(|i| i.product_id == product_id).ok_or_else(|| CartError::ItemNotFound(product_id.to_string()))
    }

    fn apply_quantity(&mut self, idx: usize, requested: i64) -> QuantityChange {
        let (product_id, is_combo, unbounded) = {
            let item = &self.items[idx];
            (item.product_id.clone(), item.is_combo, item.is_unbounded())
        };

        if is_combo {
            self.items[idx].quantity = 1;
            if requested == 1 { return QuantityChange::Applied(1); }
            tracing::debug!(%product_id, attempted = requested, "combo quantity kept at 1");
            self.raise_event(DomainEvent::Cart(CartEvent::ComboQuantityClamped { product_id, attempted: requested }));
            return QuantityChange::ComboClamped;
        }

        if requested <= 0 {
            self.items.remove(idx);
            self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { product_id }));
            return QuantityChange::Removed;
        }

        let wanted = u32::try_from(requested).unwrap_or(u32::MAX);
        let available = if unbounded { None } else { self.snapshot.get(&product_id).map(|p| p.stock).filter(|s| *s > 0) };
        match available {
            Some(stock) if wanted > stock => {
                self.items[idx].quantity = stock;
                self.raise_event(DomainEvent::Cart(CartEvent::QuantityCapped { product_id, requested, available: stock }));
                QuantityChange::CappedAtStock(stock)
            }
            _ => {
                self.items[idx].quantity = wanted;
                QuantityChange::Applied(wanted)
            }
        }
    }

    fn recalculate(&mut self) {
        self.subtotal = self.items.iter().map(CartItem::line_total).sum();
        self.validation = self.snapshot.validate(&self.line_items());
        self.updated_at = Utc::now();
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("item not in cart: {0}")]
    ItemNotFound(String),
    #[error("product not in catalog snapshot: {0}")]
    ProductNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn snapshot() -> Catalog {
        Catalog::new(&[
            Product::new("P1", "Escoba", Decimal::new(10, 0), 40),
            Product::new("P2", "Lavandina", Decimal::new(250, 2), 5),
            Product::new("K1", "Kit limpieza", Decimal::new(90, 0), 30).combo(),
            Product::new("M1", "Service caldera", Decimal::new(500, 0), 3).in_category("Mantenimiento"),
        ])
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new(snapshot());
        cart.add_product("P1", 2).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(20, 0));
        cart.add_product("P1", 1).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        assert_eq!(cart.add_product("X", 1), Err(CartError::ProductNotFound("X".into())));
    }

    #[test]
    fn test_combo_quantity_always_one() {
        let mut cart = Cart::new(snapshot());
        assert_eq!(cart.add_product("K1", 3).unwrap(), QuantityChange::ComboClamped);
        assert_eq!(cart.items()[0].quantity, 1);
        for attempt in [2, 0, -1, 2] {
            assert_eq!(cart.set_quantity("K1", attempt).unwrap(), QuantityChange::ComboClamped);
            assert_eq!(cart.items()[0].quantity, 1);
        }
        assert_eq!(cart.set_quantity("K1", 1).unwrap(), QuantityChange::Applied(1));
        assert_eq!(cart.add_product("K1", 1).unwrap(), QuantityChange::ComboClamped);
        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.subtotal().amount(), Decimal::new(90, 0));

        let clamps = cart.take_events().into_iter()
            .filter(|e| matches!(e, DomainEvent::Cart(CartEvent::ComboQuantityClamped { .. })))
            .count();
        assert_eq!(clamps, 6);
    }

    #[test]
    fn test_combo_removed_only_explicitly() {
        let mut cart = Cart::new(snapshot());
        cart.add_product("K1", 1).unwrap();
        cart.set_quantity("K1", 0).unwrap();
        assert_eq!(cart.item_count(), 1);
        cart.remove_item("K1").unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item("K1"), Err(CartError::ItemNotFound("K1".into())));
    }

    #[test]
    fn test_zero_or_negative_removes_regular_item() {
        let mut cart = Cart::new(snapshot());
        cart.add_product("P1", 2).unwrap();
        cart.add_product("P2", 1).unwrap();
        assert_eq!(cart.set_quantity("P1", 0).unwrap(), QuantityChange::Removed);
        assert_eq!(cart.set_quantity("P2", -3).unwrap(), QuantityChange::Removed);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_regular_item_capped_at_stock_and_maintenance_unbounded() {
        let mut cart = Cart::new(snapshot());
        cart.add_product("P2", 1).unwrap();
        assert_eq!(cart.set_quantity("P2", 9).unwrap(), QuantityChange::CappedAtStock(5));
        assert_eq!(cart.items()[0].quantity, 5);

        cart.add_product("M1", 1).unwrap();
        assert_eq!(cart.set_quantity("M1", 50).unwrap(), QuantityChange::Applied(50));
        // no cart bound, but stock validation still sees the shortfall
        assert!(!cart.is_valid());
    }

    #[test]
    fn test_validation_follows_every_mutation() {
        let mut cart = Cart::new(snapshot());
        assert!(cart.is_valid());
        cart.add_product("P2", 2).unwrap();
        assert!(cart.is_valid());
        assert_eq!(cart.validation().warnings.len(), 1); // 5 left, under threshold

        cart.replace_snapshot(Catalog::new(&[Product::new("P2", "Lavandina", Decimal::new(300, 2), 1)]));
        assert!(!cart.is_valid());
        assert_eq!(cart.subtotal().amount(), Decimal::new(6, 0));

        cart.set_quantity("P2", 1).unwrap();
        assert!(cart.is_valid());
        cart.clear();
        assert_eq!(cart.validation(), &ValidationResult::default());
    }

    #[test]
    fn test_replace_snapshot_refreshes_combo_and_category() {
        let mut cart = Cart::new(snapshot());
        cart.add_product("P1", 4).unwrap();
        cart.add_product("M1", 2).unwrap();
        cart.replace_snapshot(Catalog::new(&[
            Product::new("P1", "Escoba", Decimal::new(10, 0), 40).combo(),
            Product::new("M1", "Service caldera", Decimal::new(500, 0), 3),
        ]));
        assert!(cart.items()[0].is_combo);
        assert_eq!(cart.items()[0].quantity, 1);
        assert!(!cart.items()[1].is_unbounded());
        assert_eq!(cart.set_quantity("M1", 9).unwrap(), QuantityChange::CappedAtStock(3));
        assert_eq!(cart.set_quantity("P1", 5).unwrap(), QuantityChange::ComboClamped);
    }

    #[test]
    fn test_requested_lines_merge_and_count_combos_once() {
        let items = [
            ComboLineItem::new("P1", 30),
            ComboLineItem::new("K1", 3),
            ComboLineItem::new("P1", 30),
            ComboLineItem::new("X", 2),
        ];
        let lines = Cart::requested_lines(&snapshot(), &items);
        let quantities: Vec<(&str, u32)> = lines.iter().map(|l| (l.product_id.as_str(), l.quantity)).collect();
        assert_eq!(quantities, vec![("P1", 60), ("K1", 1), ("X", 2)]);
        assert!(!snapshot().validate(&lines).is_valid);
    }
}
