use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::ApiError;

/// Window used for the "expiring soon" card.
pub const EXPIRY_WARNING_DAYS: u64 = 30;

fn default_low_stock_threshold() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, alias = "expirationDate")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default = "default_low_stock_threshold", alias = "threshold")]
    pub low_stock_threshold: u32,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Not yet expired, but will be within `days`.
    pub fn expires_within(&self, today: NaiveDate, days: u64) -> bool {
        let Some(expiry) = self.expiry_date else {
            return false;
        };
        let horizon = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        expiry >= today && expiry <= horizon
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub low_stock_threshold: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Add(u32),
    Dispense(u32),
}

impl Adjustment {
    pub fn quantity(&self) -> u32 {
        match self {
            Adjustment::Add(quantity) | Adjustment::Dispense(quantity) => *quantity,
        }
    }

    pub(crate) fn endpoint(&self) -> &'static str {
        match self {
            Adjustment::Add(_) => "add",
            Adjustment::Dispense(_) => "dispense",
        }
    }

    /// Client-side pre-check against the quantity we last saw. The server
    /// checks again.
    pub fn validate(&self, item: &InventoryItem) -> Result<(), InventoryError> {
        let requested = self.quantity();
        if requested == 0 {
            return Err(InventoryError::InvalidQuantity);
        }
        if let Adjustment::Dispense(_) = self {
            if requested > item.quantity {
                return Err(InventoryError::InsufficientStock {
                    requested,
                    available: item.quantity,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Add(quantity) => write!(f, "add {}", quantity),
            Adjustment::Dispense(quantity) => write!(f, "dispense {}", quantity),
        }
    }
}

/// Result of an add or dispense. `low_stock_alert` is informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOutcome {
    pub item: InventoryItem,
    pub low_stock_alert: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum InventoryError {
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Insufficient stock: requested {requested}, only {available} available")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(quantity: u32, expiry: Option<&str>) -> InventoryItem {
        InventoryItem {
            id: "i1".to_string(),
            name: "Amoxicillin".to_string(),
            category: None,
            quantity,
            unit: None,
            expiry_date: expiry.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            low_stock_threshold: 10,
        }
    }

    #[test]
    fn test_dispense_more_than_stock_rejected() {
        let err = Adjustment::Dispense(5).validate(&item(3, None)).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock { requested: 5, available: 3 }
        ));
        assert!(Adjustment::Dispense(3).validate(&item(3, None)).is_ok());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(matches!(
            Adjustment::Add(0).validate(&item(3, None)),
            Err(InventoryError::InvalidQuantity)
        ));
    }

    #[test]
    fn test_expiry_helpers() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert!(item(5, Some("2026-10-18")).is_expired(today));
        assert!(!item(5, Some("2026-10-18")).expires_within(today, EXPIRY_WARNING_DAYS));
        assert!(item(5, Some("2026-11-18")).expires_within(today, EXPIRY_WARNING_DAYS));
        assert!(!item(5, Some("2026-11-19")).expires_within(today, EXPIRY_WARNING_DAYS));
        assert!(!item(5, None).is_expired(today));
    }

    #[test]
    fn test_item_decodes_with_default_threshold() {
        let decoded: InventoryItem = serde_json::from_value(json!({
            "_id": "i2",
            "name": "Gauze",
            "quantity": 4
        }))
        .unwrap();

        assert_eq!(decoded.low_stock_threshold, 10);
        assert!(decoded.is_low_stock());
    }
}
