use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub min_quantity: i64,
    pub unit_price: Decimal,
    pub location: Option<String>,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::of(self.quantity, self.min_quantity)
    }

    /// `quantity <= min_quantity`, always derived from the current row
    pub fn is_low_stock(&self) -> bool {
        self.stock_level() != StockLevel::Healthy
    }
}

/// Replenishment band of an item, derived from quantity and minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Healthy,
    Low,
    Depleted,
}

impl StockLevel {
    pub fn of(quantity: i64, min_quantity: i64) -> Self {
        if quantity <= 0 {
            StockLevel::Depleted
        } else if quantity <= min_quantity {
            StockLevel::Low
        } else {
            StockLevel::Healthy
        }
    }
}

/// Result of a conditional stock decrement
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    Consumed(InventoryItem),
    Insufficient { available: i64 },
    NotFound,
}
