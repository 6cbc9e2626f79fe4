use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, ProductId};

/// A product as stored: stock level, restock threshold and unit price.
///
/// The line value (`price × quantity`) is derived on demand and never stored,
/// so it always reflects the current quantity and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub quantity: i64,
    pub min_stock: i64,
    /// Unit price. Serialized as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a validated product snapshot with both timestamps set to `at`.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: i64,
        min_stock: i64,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let product = Self {
            id,
            name: name.into(),
            description: String::new(),
            category: category.into(),
            quantity,
            min_stock,
            price,
            created_at: at,
            updated_at: at,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the record invariants: non-negative stock figures and price, and a
    /// line value that fits the decimal range.
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity < 0 {
            return Err(DomainError::invariant(format!(
                "product {}: quantity cannot be negative",
                self.id
            )));
        }
        if self.min_stock < 0 {
            return Err(DomainError::invariant(format!(
                "product {}: min_stock cannot be negative",
                self.id
            )));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(DomainError::invariant(format!(
                "product {}: price cannot be negative",
                self.id
            )));
        }
        if self.line_value().is_none() {
            return Err(DomainError::invariant(format!(
                "product {}: price × quantity is out of range",
                self.id
            )));
        }
        Ok(())
    }

    /// `price × quantity`, exact (no rounding). `None` if the product
    /// overflows the decimal range.
    pub fn line_value(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }

    /// Stock is at or below the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}
