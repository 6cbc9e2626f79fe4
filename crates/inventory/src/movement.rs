use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, MovementId, ProductId};

/// Direction of a stock movement.
///
/// Persisted with the store's labels: `entrada` (inbound) and `saida` (outbound).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "entrada")]
    Inbound,
    #[serde(rename = "saida")]
    Outbound,
}

impl MovementKind {
    pub const ALL: [MovementKind; 2] = [MovementKind::Inbound, MovementKind::Outbound];

    /// Storage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "entrada",
            MovementKind::Outbound => "saida",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entrada" => Ok(MovementKind::Inbound),
            "saida" => Ok(MovementKind::Outbound),
            other => Err(DomainError::validation(format!(
                "unknown movement kind '{other}' (expected entrada or saida)"
            ))),
        }
    }
}

/// An immutable record of stock entering or leaving a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub quantity: i64,
    #[serde(default)]
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        id: MovementId,
        product_id: ProductId,
        kind: MovementKind,
        quantity: i64,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "movement {id}: quantity must be positive"
            )));
        }
        Ok(Self {
            id,
            product_id,
            kind,
            quantity,
            reason: reason.into(),
            created_at,
        })
    }
}
