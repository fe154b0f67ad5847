use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLogger};
use crate::auth::Principal;
use crate::models::{ConsumeOutcome, InventoryItem, StockLevel};
use crate::services::{bounded, ServiceError, StateConflict};
use crate::store::RecordStore;
use crate::types::Permission;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub inventory_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResult {
    pub item: InventoryItem,
    pub low_stock: bool,
}

pub struct InventoryService {
    records: Arc<dyn RecordStore>,
    audit: AuditLogger,
    call_timeout: Duration,
}

impl InventoryService {
    pub fn new(records: Arc<dyn RecordStore>, audit: AuditLogger, call_timeout: Duration) -> Self {
        Self {
            records,
            audit,
            call_timeout,
        }
    }

    /// Take `quantity` units out of stock, all or nothing.
    ///
    /// The low-stock audit entry is level-triggered: it is written on every
    /// consumption that leaves the item at or below its minimum.
    pub async fn consume(
        &self,
        actor: &Principal,
        request: ConsumeRequest,
    ) -> Result<ConsumeResult, ServiceError> {
        actor.require(Permission::ManageInventory)?;

        if request.quantity <= 0 {
            return Err(ServiceError::invalid_field(
                "quantity",
                "Quantity must be a positive integer",
            ));
        }

        let outcome = bounded(
            "consume inventory",
            self.call_timeout,
            self.records
                .consume_inventory(request.inventory_id, request.quantity),
        )
        .await?;

        let item = match outcome {
            ConsumeOutcome::Consumed(item) => item,
            ConsumeOutcome::NotFound => {
                return Err(ServiceError::NotFound("Inventory item not found".into()))
            }
            ConsumeOutcome::Insufficient { available } => {
                tracing::debug!(
                    "Refused to consume {} of item {} with {} available",
                    request.quantity,
                    request.inventory_id,
                    available
                );
                return Err(StateConflict::InsufficientStock {
                    available,
                    requested: request.quantity,
                }
                .into());
            }
        };

        self.audit
            .record(
                Some(actor.id),
                AuditAction::ConsumedInventory,
                Some(item.id),
                json!({
                    "sku": item.sku,
                    "quantity": request.quantity,
                    "previousQuantity": item.quantity + request.quantity,
                    "newQuantity": item.quantity,
                }),
            )
            .await;

        let level = item.stock_level();
        let alert = match level {
            StockLevel::Depleted => Some(AuditAction::StockDepleted),
            StockLevel::Low => Some(AuditAction::LowStockWarning),
            StockLevel::Healthy => None,
        };

        if let Some(action) = alert {
            tracing::info!(
                "{}: {} ({}) at {} with minimum {}",
                action,
                item.name,
                item.sku,
                item.quantity,
                item.min_quantity
            );
            self.audit
                .record(
                    None,
                    action,
                    Some(item.id),
                    json!({
                        "name": item.name,
                        "quantity": item.quantity,
                        "minQuantity": item.min_quantity,
                    }),
                )
                .await;
        }

        Ok(ConsumeResult {
            low_stock: item.is_low_stock(),
            item,
        })
    }
}
