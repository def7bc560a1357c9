use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Models
// ============================================================================

/// A customer purchase as the delivery core sees it.
///
/// Orders are created and assigned elsewhere in the storefront; this core
/// only moves them along the ASSIGNED -> IN_TRANSIT -> DELIVERED edges and
/// never deletes rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    /// Unset until dispatch assigns a driver.
    pub driver_id: Option<Uuid>,
    pub customer_id: Uuid,
    /// Human-facing number issued at checkout; legacy rows predate it.
    pub order_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_assigned_to(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }

    /// Label used in customer-facing messages: the order number when one
    /// was issued, otherwise a short suffix of the id.
    pub fn display_label(&self) -> String {
        match &self.order_number {
            Some(number) => number.clone(),
            None => {
                let hex = self.id.simple().to_string();
                format!("#{}", &hex[hex.len() - 6..])
            }
        }
    }
}

/// Transit tracking record. One exists per order that is out for delivery;
/// the trip tracker files it when the driver leaves and the guard removes
/// it when the order is marked delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInWay {
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub started_at: DateTime<Utc>,
}

// ============================================================================
// Unit Tests
// ============================================================================
