//! Read-only record store boundary.
//!
//! The analytics engine consumes products and stock movements exclusively
//! through [`RecordStore`]. Implementations live in infrastructure crates
//! (in-memory for tests/dev, Postgres for production); this crate stays
//! storage-agnostic.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use stockwise_core::MonthKey;
use stockwise_inventory::{MovementKind, Product};

use crate::stats::CategoryBreakdown;

pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque store failure.
///
/// The engine does not classify underlying causes (connectivity, decoding,
/// poisoned locks): every failure is a failed query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("query failed in {operation}: {message}")]
pub struct StoreError {
    pub operation: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn query_failed(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Row predicate for product counts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProductPredicate {
    /// Every product.
    All,
    /// `quantity <= min_stock`.
    LowStock,
}

impl ProductPredicate {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            ProductPredicate::All => true,
            ProductPredicate::LowStock => product.is_low_stock(),
        }
    }
}

/// Product listing filter. Absent fields impose no constraint; present fields
/// are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Exact category label (case-sensitive).
    pub category: Option<String>,
    /// Inclusive lower bound on quantity.
    pub min_quantity: Option<i64>,
    /// Inclusive upper bound on quantity.
    pub max_quantity: Option<i64>,
}

impl ProductFilter {
    /// No constraints.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_min_quantity(mut self, min: i64) -> Self {
        self.min_quantity = Some(min);
        self
    }

    pub fn with_max_quantity(mut self, max: i64) -> Self {
        self.max_quantity = Some(max);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(name) = &self.name {
            if !product.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if product.category != *category {
                return false;
            }
        }
        if let Some(min) = self.min_quantity {
            if product.quantity < min {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if product.quantity > max {
                return false;
            }
        }
        true
    }
}

/// Raw listing parameters as they arrive from a caller (query string, CLI).
///
/// Conversion into [`ProductFilter`] is lenient: empty strings count as
/// absent and malformed numeric bounds are ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

impl From<&ProductQuery> for ProductFilter {
    fn from(query: &ProductQuery) -> Self {
        fn text(v: &Option<String>) -> Option<String> {
            v.as_deref().filter(|s| !s.is_empty()).map(str::to_string)
        }

        fn bound(v: &Option<String>) -> Option<i64> {
            v.as_deref().and_then(|s| s.trim().parse::<i64>().ok())
        }

        ProductFilter {
            name: text(&query.name),
            category: text(&query.category),
            min_quantity: bound(&query.min),
            max_quantity: bound(&query.max),
        }
    }
}

/// Narrow, read-only query surface over products and stock movements.
///
/// Implementations return typed rows and contain no business logic beyond
/// the filtering and grouping the queries describe.
pub trait RecordStore: Send + Sync {
    /// Products matching `filter`, in the store's default order.
    fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;

    /// Number of products satisfying `predicate`.
    fn count_products(&self, predicate: ProductPredicate) -> StoreResult<u64>;

    /// Up to `limit` low-stock products, in the store's default order.
    fn low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>>;

    /// Movements of `kind` whose creation timestamp falls within `month`.
    fn count_movements(&self, kind: MovementKind, month: MonthKey) -> StoreResult<u64>;

    /// Per-category product count and summed `price × quantity`.
    fn category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        (**self).list_products(filter)
    }

    fn count_products(&self, predicate: ProductPredicate) -> StoreResult<u64> {
        (**self).count_products(predicate)
    }

    fn low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>> {
        (**self).low_stock_products(limit)
    }

    fn count_movements(&self, kind: MovementKind, month: MonthKey) -> StoreResult<u64> {
        (**self).count_movements(kind, month)
    }

    fn category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>> {
        (**self).category_breakdown()
    }
}
