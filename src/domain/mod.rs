//! Storefront domain: value objects, events and aggregates.
pub mod aggregates;
pub mod events;
pub mod value_objects;
