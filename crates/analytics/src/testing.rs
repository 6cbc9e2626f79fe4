//! In-crate store double for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use stockwise_core::{MonthKey, MovementId, ProductId};
use stockwise_inventory::{MovementKind, Product, StockMovement};

use crate::stats::CategoryBreakdown;
use crate::store::{ProductFilter, ProductPredicate, RecordStore, StoreError, StoreResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FailOn {
    ListProducts,
    CountProducts,
    LowStockProducts,
    CountMovements,
    CategoryBreakdown,
}

#[derive(Debug, Default)]
pub struct FakeStore {
    products: Vec<Product>,
    movements: Vec<StockMovement>,
    failing: HashSet<FailOn>,
    list_calls: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(
        mut self,
        id: i64,
        name: &str,
        category: &str,
        quantity: i64,
        min_stock: i64,
        price: Decimal,
    ) -> Self {
        let created = Utc::now();
        self.products.push(
            Product::new(ProductId::new(id), name, category, quantity, min_stock, price, created)
                .unwrap(),
        );
        self
    }

    pub fn with_movement(mut self, kind: MovementKind, at: DateTime<Utc>) -> Self {
        let id = MovementId::new(self.movements.len() as i64 + 1);
        self.movements
            .push(StockMovement::new(id, ProductId::new(1), kind, 1, "test", at).unwrap());
        self
    }

    pub fn failing(mut self, op: FailOn) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: FailOn, operation: &'static str) -> StoreResult<()> {
        if self.failing.contains(&op) {
            return Err(StoreError::query_failed(operation, "injected failure"));
        }
        Ok(())
    }
}

impl RecordStore for FakeStore {
    fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check(FailOn::ListProducts, "list_products")?;
        Ok(self.products.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    fn count_products(&self, predicate: ProductPredicate) -> StoreResult<u64> {
        self.check(FailOn::CountProducts, "count_products")?;
        Ok(self.products.iter().filter(|p| predicate.matches(p)).count() as u64)
    }

    fn low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>> {
        self.check(FailOn::LowStockProducts, "low_stock_products")?;
        Ok(self
            .products
            .iter()
            .filter(|p| p.is_low_stock())
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_movements(&self, kind: MovementKind, month: MonthKey) -> StoreResult<u64> {
        self.check(FailOn::CountMovements, "count_movements")?;
        Ok(self
            .movements
            .iter()
            .filter(|m| m.kind == kind && month.contains(&m.created_at))
            .count() as u64)
    }

    fn category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>> {
        self.check(FailOn::CategoryBreakdown, "category_breakdown")?;
        CategoryBreakdown::tally(&self.products)
            .ok_or_else(|| StoreError::query_failed("category_breakdown", "category value overflows"))
    }
}
