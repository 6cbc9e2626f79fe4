//! Postgres-backed record store.
//!
//! Queries are read-only and fully parameterised. Month windows are bound as
//! typed timestamps over the half-open range `[start, end)` rather than by
//! comparing formatted strings, so every movement lands in exactly one month.
//!
//! ## Error Mapping
//!
//! Every `sqlx` failure collapses into [`StoreError`] carrying the operation
//! name; callers do not branch on the cause.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::{instrument, Span};

use stockwise_analytics::{
    CategoryBreakdown, ProductFilter, ProductPredicate, RecordStore, StoreError, StoreResult,
};
use stockwise_core::{MonthKey, ProductId};
use stockwise_inventory::{MovementKind, Product};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category    TEXT NOT NULL,
    quantity    BIGINT NOT NULL DEFAULT 0,
    min_stock   BIGINT NOT NULL DEFAULT 10,
    price       NUMERIC(10, 2) NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS stock_movements (
    id          BIGSERIAL PRIMARY KEY,
    product_id  BIGINT NOT NULL REFERENCES products (id),
    type        TEXT NOT NULL CHECK (type IN ('entrada', 'saida')),
    quantity    BIGINT NOT NULL CHECK (quantity > 0),
    reason      TEXT NOT NULL DEFAULT '',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS stock_movements_type_created_at
    ON stock_movements (type, created_at);
"#;

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, quantity, min_stock, price, created_at, updated_at";

/// Record store over a Postgres connection pool.
///
/// The pool is injected; the store holds no other state and is cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `products` and `stock_movements` tables if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(operation = "list_products", row_count = tracing::field::Empty),
        err
    )]
    pub async fn fetch_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let name_pattern = filter
            .name
            .as_deref()
            .map(|name| format!("%{}%", escape_like(name)));

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::text IS NULL OR name ILIKE $1) \
               AND ($2::text IS NULL OR category = $2) \
               AND ($3::bigint IS NULL OR quantity >= $3) \
               AND ($4::bigint IS NULL OR quantity <= $4) \
             ORDER BY id"
        );

        let rows = sqlx::query(&sql)
            .bind(name_pattern)
            .bind(filter.category.as_deref())
            .bind(filter.min_quantity)
            .bind(filter.max_quantity)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = products_from_rows("list_products", &rows)?;

        Span::current().record("row_count", products.len());
        Ok(products)
    }

    #[instrument(skip(self), fields(operation = "count_products"), err)]
    pub async fn fetch_product_count(&self, predicate: ProductPredicate) -> StoreResult<u64> {
        let sql = match predicate {
            ProductPredicate::All => "SELECT COUNT(*) FROM products",
            ProductPredicate::LowStock => {
                "SELECT COUNT(*) FROM products WHERE quantity <= min_stock"
            }
        };

        let count: i64 = sqlx::query_scalar(sql)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self), fields(operation = "low_stock_products"), err)]
    pub async fn fetch_low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE quantity <= min_stock \
             ORDER BY id \
             LIMIT $1"
        );

        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("low_stock_products", e))?;

        products_from_rows("low_stock_products", &rows)
    }

    #[instrument(
        skip(self, kind, month),
        fields(operation = "count_movements", kind = %kind, month = %month),
        err
    )]
    pub async fn fetch_movement_count(
        &self,
        kind: MovementKind,
        month: MonthKey,
    ) -> StoreResult<u64> {
        let start: DateTime<Utc> = month.start();
        let end: Option<DateTime<Utc>> = month.end();

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM stock_movements
            WHERE type = $1
              AND created_at >= $2
              AND ($3::timestamptz IS NULL OR created_at < $3)
            "#,
        )
        .bind(kind.as_str())
        .bind(start)
        .bind(end)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_movements", e))?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self), fields(operation = "category_breakdown"), err)]
    pub async fn fetch_category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>> {
        let rows = sqlx::query(
            r#"
            SELECT
                category,
                COUNT(*) AS count,
                COALESCE(SUM(price * quantity), 0) AS value
            FROM products
            GROUP BY category
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("category_breakdown", e))?;

        rows.iter()
            .map(|row| {
                let count: i64 = row.try_get("count")?;
                Ok(CategoryBreakdown {
                    category: row.try_get("category")?,
                    count: count.max(0) as u64,
                    value: row.try_get::<Decimal, _>("value")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("category_breakdown", e))
    }
}

/// Decode product rows, rejecting any that break a [`Product`] invariant.
fn products_from_rows(
    operation: &'static str,
    rows: &[sqlx::postgres::PgRow],
) -> StoreResult<Vec<Product>> {
    rows.iter()
        .map(|row| {
            let product = product_from_row(row).map_err(|e| map_sqlx_error(operation, e))?;
            checked_product(operation, product)
        })
        .collect()
}

fn checked_product(operation: &'static str, product: Product) -> StoreResult<Product> {
    product
        .validate()
        .map_err(|e| StoreError::query_failed(operation, format!("invalid row: {e}")))?;
    Ok(product)
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    Ok(Product {
        id: ProductId::new(id),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        quantity: row.try_get("quantity")?,
        min_stock: row.try_get("min_stock")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escape `ILIKE` wildcards so a name filter is a literal substring match.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::query_failed(
            operation,
            format!("database error: {}", db_err.message()),
        ),
        sqlx::Error::PoolClosed => StoreError::query_failed(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => {
            StoreError::query_failed(operation, "timed out acquiring a connection")
        }
        other => StoreError::query_failed(operation, format!("sqlx error: {other}")),
    }
}

/// Drive an async query to completion from the synchronous [`RecordStore`]
/// surface. Requires an ambient multi-threaded Tokio runtime.
fn run_blocking<T>(
    operation: &'static str,
    fut: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::query_failed(
            operation,
            "PostgresRecordStore requires a tokio runtime; call from within a runtime context",
        )
    })?;
    tokio::task::block_in_place(|| handle.block_on(fut))
}

impl RecordStore for PostgresRecordStore {
    fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        run_blocking("list_products", self.fetch_products(filter))
    }

    fn count_products(&self, predicate: ProductPredicate) -> StoreResult<u64> {
        run_blocking("count_products", self.fetch_product_count(predicate))
    }

    fn low_stock_products(&self, limit: usize) -> StoreResult<Vec<Product>> {
        run_blocking("low_stock_products", self.fetch_low_stock_products(limit))
    }

    fn count_movements(&self, kind: MovementKind, month: MonthKey) -> StoreResult<u64> {
        run_blocking("count_movements", self.fetch_movement_count(kind, month))
    }

    fn category_breakdown(&self) -> StoreResult<Vec<CategoryBreakdown>> {
        run_blocking("category_breakdown", self.fetch_category_breakdown())
    }
}
