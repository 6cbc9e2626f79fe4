use std::collections::BTreeMap;
use std::sync::RwLock;

use stockwise_analytics::{
    CategoryBreakdown, ProductFilter, ProductPredicate, RecordStore, StoreError, StoreResult,
};
use stockwise_core::{MonthKey, ProductId};
use stockwise_inventory::{MovementKind, Product, StockMovement};

/// In-memory record store.
///
/// Products are kept ordered by id, which is the default listing order.
/// Inserting a product whose id already exists replaces it.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    movements: RwLock<Vec<StockMovement>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut products = self
            .products
            .write()
            .map_err(|_| poisoned("insert_product"))?;
        products.insert(product.id, product);
        Ok(())
    }

    pub fn insert_movement(&self, movement: StockMovement) -> StoreResult<()> {
        let mut movements = self
            .movements
            .write()
            .map_err(|_| poisoned("insert_movement"))?;
        movements.push(movement);
        Ok(())
    }

    fn read_products<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&BTreeMap<ProductId, Product>) -> T,
    ) -> StoreResult<T> {
        let products = self.products.read().map_err(|_| poisoned(operation))?;
        Ok(f(&products))
    }
}

fn poisoned(operation: &'static str) -> StoreError {
    StoreError::query_failed(operation, "lock poisoned")
}

impl RecordStore for InMemoryRecordStore {
    fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.read_products("list_products", |products| {
            products
                .values()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect()
        })
    }

    fn count_products(&self, predicate: ProductPredicate) -> StoreResult<u64> {
        self.read_products("count_products", |products| {
            products.values().filter(|p| predicate.matches(p)).count() as u64
        })
    }

    fn low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>> {
        self.read_products("low_stock_products", |products| {
            products
                .values()
                .filter(|p| p.is_low_stock())
                .take(limit)
                .cloned()
                .collect()
        })
    }

    fn count_movements(&self, kind: MovementKind, month: MonthKey) -> StoreResult<u64> {
        let movements = self
            .movements
            .read()
            .map_err(|_| poisoned("count_movements"))?;
        Ok(movements
            .iter()
            .filter(|m| m.kind == kind && month.contains(&m.created_at))
            .count() as u64)
    }

    fn category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>> {
        self.read_products("category_breakdown", |products| {
            CategoryBreakdown::tally(products.values())
        })?
        .ok_or_else(|| StoreError::query_failed("category_breakdown", "category value overflows"))
    }
}
