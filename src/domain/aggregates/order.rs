//! Order Aggregate
//!
//! Orders are placed from a cart and wait for a supervisor's decision before
//! they can be delivered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::aggregates::delivery::DeliveryTarget;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: String,
    order_number: String,
    requested_by: String,
    status: OrderStatus,
    items: Vec<LineItem>,
    total: Money,
    delivery: DeliveryTarget,
    reviewed_by: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem { pub product_id: String, pub name: String, pub quantity: u32, pub unit_price: Money, pub total: Money, pub is_combo: bool }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] PendingApproval, Approved, Rejected, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval", Self::Approved => "approved", Self::Rejected => "rejected",
            Self::Delivered => "delivered", Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Order {
    /// Places an order for the cart's current lines.
    ///
    /// The cart must hold at least one line and pass stock validation.
    pub fn place(cart: &Cart, delivery: DeliveryTarget, requested_by: impl Into<String>) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::NoItems); }
        if !cart.is_valid() { return Err(OrderError::StockBlocked(cart.validation().warnings.clone())); }

        let id = Uuid::now_v7();
        let simple = id.simple().to_string();
        let now = Utc::now();
        let items: Vec<LineItem> = cart.items().iter().map(|i| LineItem {
            product_id: i.product_id.clone(), name: i.name.clone(), quantity: i.quantity,
            unit_price: i.unit_price, total: i.line_total(), is_combo: i.is_combo,
        }).collect();
        let mut order = Self {
            id: id.to_string(), order_number: format!("ORD-{}", simple[simple.len() - 8..].to_uppercase()),
            requested_by: requested_by.into(), status: OrderStatus::PendingApproval,
            total: items.iter().map(|i| i.total).sum(), items, delivery,
            reviewed_by: None, rejection_reason: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id.clone(), requested_by: order.requested_by.clone(), total: order.total.amount(),
        }));
        tracing::info!(order = %order.order_number, total = %order.total, "order placed, awaiting approval");
        Ok(order)
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn requested_by(&self) -> &str { &self.requested_by }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total(&self) -> &Money { &self.total }
    pub fn total_amount(&self) -> Decimal { self.total.amount() }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn delivery(&self) -> &DeliveryTarget { &self.delivery }
    pub fn reviewed_by(&self) -> Option<&str> { self.reviewed_by.as_deref() }
    pub fn rejection_reason(&self) -> Option<&str> { self.rejection_reason.as_deref() }

    pub fn approve(&mut self, supervisor_id: impl Into<String>) -> Result<(), OrderError> {
        self.expect(OrderStatus::PendingApproval, "approve")?;
        let supervisor_id = supervisor_id.into();
        self.status = OrderStatus::Approved;
        self.reviewed_by = Some(supervisor_id.clone());
        self.touch();
        tracing::info!(order = %self.order_number, supervisor = %supervisor_id, "order approved");
        self.raise_event(DomainEvent::Order(OrderEvent::Approved { order_id: self.id.clone(), supervisor_id }));
        Ok(())
    }

    pub fn reject(&mut self, supervisor_id: impl Into<String>, reason: impl Into<String>) -> Result<(), OrderError> {
        let reason = reason.into().trim().to_string();
        if reason.is_empty() { return Err(OrderError::RejectionReasonRequired); }
        self.expect(OrderStatus::PendingApproval, "reject")?;
        let supervisor_id = supervisor_id.into();
        self.status = OrderStatus::Rejected;
        self.reviewed_by = Some(supervisor_id.clone());
        self.rejection_reason = Some(reason.clone());
        self.touch();
        tracing::info!(order = %self.order_number, supervisor = %supervisor_id, "order rejected");
        self.raise_event(DomainEvent::Order(OrderEvent::Rejected { order_id: self.id.clone(), supervisor_id, reason }));
        Ok(())
    }

    pub fn deliver(&mut self) -> Result<(), OrderError> {
        self.expect(OrderStatus::Approved, "deliver")?;
        self.status = OrderStatus::Delivered;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id.clone() }));
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !matches!(self.status, OrderStatus::PendingApproval | OrderStatus::Approved) {
            return Err(OrderError::InvalidTransition { from: self.status, action: "cancel" });
        }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id.clone() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn expect(&self, status: OrderStatus, action: &'static str) -> Result<(), OrderError> {
        if self.status == status { Ok(()) } else { Err(OrderError::InvalidTransition { from: self.status, action }) }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("order blocked by stock: {}", .0.join("; "))]
    StockBlocked(Vec<String>),
    #[error("cannot {action} an order that is {from}")]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error("a rejection reason is required")]
    RejectionReasonRequired,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::delivery::{Client, DeliverySelection};
    use crate::engine::Catalog;
    use crate::Product;

    fn target() -> DeliveryTarget {
        DeliveryTarget { client_id: "C1".into(), sub_service_id: None, sub_location_id: None }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new(Catalog::new(&[
            Product::new("P1", "Escoba", Decimal::new(10, 0), 40),
            Product::new("K1", "Kit", Decimal::new(90, 0), 30).combo(),
        ]));
        cart.add_product("P1", 2).unwrap();
        cart.add_product("K1", 1).unwrap();
        cart
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(&cart(), target(), "U7").unwrap();
        assert_eq!(order.status(), OrderStatus::PendingApproval);
        assert_eq!(order.total_amount(), Decimal::new(110, 0));
        assert_eq!(order.items().len(), 2);
        assert!(order.order_number().starts_with("ORD-"));
        order.approve("SUP1").unwrap();
        assert_eq!(order.reviewed_by(), Some("SUP1"));
        order.deliver().unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.take_events().len(), 3);
    }

    #[test]
    fn test_rejection_needs_reason_and_is_final() {
        let mut order = Order::place(&cart(), target(), "U7").unwrap();
        assert_eq!(order.reject("SUP1", " "), Err(OrderError::RejectionReasonRequired));
        order.reject("SUP1", "sin presupuesto").unwrap();
        assert_eq!(order.rejection_reason(), Some("sin presupuesto"));
        assert_eq!(
            order.approve("SUP1"),
            Err(OrderError::InvalidTransition { from: OrderStatus::Rejected, action: "approve" })
        );
        assert!(order.deliver().is_err());
        assert!(order.cancel().is_err());
    }

    #[test]
    fn test_cancel_only_before_delivery() {
        let mut order = Order::place(&cart(), target(), "U7").unwrap();
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        let mut order = Order::place(&cart(), target(), "U7").unwrap();
        order.approve("SUP1").unwrap();
        order.deliver().unwrap();
        assert_eq!(order.cancel().unwrap_err().to_string(), "cannot cancel an order that is delivered");
    }

    #[test]
    fn test_place_requires_items_and_valid_stock() {
        let empty = Cart::new(Catalog::default());
        assert_eq!(Order::place(&empty, target(), "U7").unwrap_err(), OrderError::NoItems);

        let mut short = cart();
        short.replace_snapshot(Catalog::new(&[Product::new("P1", "Escoba", Decimal::new(10, 0), 1)]));
        match Order::place(&short, target(), "U7") {
            Err(OrderError::StockBlocked(warnings)) => assert_eq!(warnings.len(), 2),
            other => panic!("expected stock block, got {other:?}"),
        }
    }

    #[test]
    fn test_place_from_cart_delivery_selection() {
        let mut cart = cart();
        *cart.delivery_mut() = DeliverySelection::new(vec![Client { id: "C1".into(), name: "Hospital".into(), sub_services: vec![] }]);
        cart.delivery_mut().select_client("C1").unwrap();
        let order = Order::place(&cart, cart.delivery().target().unwrap(), "U7").unwrap();
        assert_eq!(order.delivery(), &target());
    }
}
