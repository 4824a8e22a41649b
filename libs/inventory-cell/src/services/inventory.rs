use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_api::ApiClient;
use shared_models::ApiError;
use shared_utils::sanitize_optional;

use crate::models::{
    Adjustment, AdjustmentOutcome, InventoryError, InventoryItem, NewInventoryItem,
};

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemListPayload {
    Items { items: Vec<InventoryItem> },
    Inventory { inventory: Vec<InventoryItem> },
    Bare(Vec<InventoryItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemPayload {
    Wrapped {
        #[serde(alias = "inventory")]
        item: InventoryItem,
    },
    Bare(InventoryItem),
}

impl ItemPayload {
    fn into_inner(self) -> InventoryItem {
        match self {
            ItemPayload::Wrapped { item } | ItemPayload::Bare(item) => item,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AdjustmentPayload {
    #[serde(rename_all = "camelCase")]
    Wrapped {
        #[serde(alias = "inventory")]
        item: InventoryItem,
        #[serde(default)]
        low_stock_alert: bool,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(InventoryItem),
}

pub struct InventoryService {
    api: Arc<ApiClient>,
}

impl InventoryService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<InventoryItem>, ApiError> {
        let payload: ItemListPayload = self.api.get("/inventory").await?;
        let items = match payload {
            ItemListPayload::Items { items } => items,
            ItemListPayload::Inventory { inventory } => inventory,
            ItemListPayload::Bare(items) => items,
        };
        debug!("Fetched {} inventory items", items.len());
        Ok(items)
    }

    pub async fn get(&self, item_id: &str) -> Result<InventoryItem, ApiError> {
        let payload: ItemPayload = self.api.get(&format!("/inventory/{}", item_id)).await?;
        Ok(payload.into_inner())
    }

    pub async fn create(&self, item: NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        let name = sanitize_optional(&item.name)
            .ok_or_else(|| InventoryError::InvalidItem("name is required".to_string()))?;
        let item = NewInventoryItem {
            name,
            category: item.category.as_deref().and_then(sanitize_optional),
            unit: item.unit.as_deref().and_then(sanitize_optional),
            ..item
        };

        let payload: ItemPayload = self
            .api
            .post("/inventory", serde_json::to_value(&item).map_err(ApiError::from)?)
            .await?;
        let created = payload.into_inner();
        info!("Created inventory item {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Validates against `item` first; an invalid adjustment sends nothing.
    pub async fn adjust(
        &self,
        item: &InventoryItem,
        adjustment: Adjustment,
    ) -> Result<AdjustmentOutcome, InventoryError> {
        adjustment.validate(item)?;

        let payload: AdjustmentPayload = self
            .api
            .post(
                &format!("/inventory/{}/{}", item.id, adjustment.endpoint()),
                json!({ "quantity": adjustment.quantity() }),
            )
            .await?;

        let outcome = match payload {
            AdjustmentPayload::Wrapped {
                item,
                low_stock_alert,
                message,
            } => AdjustmentOutcome {
                item,
                low_stock_alert,
                message,
            },
            AdjustmentPayload::Bare(item) => AdjustmentOutcome {
                item,
                low_stock_alert: false,
                message: None,
            },
        };

        if outcome.low_stock_alert {
            warn!(
                "{} is low on stock ({} left)",
                outcome.item.name, outcome.item.quantity
            );
        }
        info!("Applied {} to {}", adjustment, item.id);
        Ok(outcome)
    }

    pub async fn add(&self, item: &InventoryItem, quantity: u32) -> Result<AdjustmentOutcome, InventoryError> {
        self.adjust(item, Adjustment::Add(quantity)).await
    }

    pub async fn dispense(
        &self,
        item: &InventoryItem,
        quantity: u32,
    ) -> Result<AdjustmentOutcome, InventoryError> {
        self.adjust(item, Adjustment::Dispense(quantity)).await
    }
}
