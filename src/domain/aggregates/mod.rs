//! Aggregates module
pub mod cart;
pub mod combo;
pub mod delivery;
pub mod order;

pub use cart::{Cart, CartError, CartItem, QuantityChange, MAINTENANCE_CATEGORY};
pub use combo::{ComboDefinition, ComboDraft, ComboError};
pub use delivery::{Client, DeliveryError, DeliverySelection, DeliveryTarget, SubLocation, SubService};
pub use order::{LineItem, Order, OrderError, OrderStatus};
