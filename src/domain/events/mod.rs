//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CartEvent {
    /// A combo line was asked for a quantity other than 1 and kept at 1.
    #[serde(rename_all = "camelCase")]
    ComboQuantityClamped { product_id: String, attempted: i64 },
    #[serde(rename_all = "camelCase")]
    QuantityCapped { product_id: String, requested: i64, available: u32 },
    #[serde(rename_all = "camelCase")]
    ItemRemoved { product_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: String, requested_by: String, total: Decimal },
    Approved { order_id: String, supervisor_id: String },
    Rejected { order_id: String, supervisor_id: String, reason: String },
    Delivered { order_id: String },
    Cancelled { order_id: String },
}
