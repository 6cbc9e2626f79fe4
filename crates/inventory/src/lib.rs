//! Inventory domain module.
//!
//! Product and stock-movement records as the analytics engine reads them:
//! plain typed snapshots with their invariants, no IO and no storage.

pub mod movement;
pub mod product;

pub use movement::{MovementKind, StockMovement};
pub use product::Product;
