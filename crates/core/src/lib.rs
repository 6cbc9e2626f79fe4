//! `stockwise-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod month;

pub use error::{DomainError, DomainResult};
pub use id::{MovementId, ProductId};
pub use month::MonthKey;
