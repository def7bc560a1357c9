use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::order::Order;

// ============================================================================
// Storage Seams
// ============================================================================
//
// The guard talks to storage through these traits only. Production wires in
// the Postgres implementations from postgres.rs; tests plug in in-memory
// stand-ins. The invariant-critical part of the contract sits on
// mark_in_transit and must hold for any backend.
//
// ============================================================================

/// Keyed access to orders plus the two guarded status writes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_id(&self, order_id: Uuid) -> Result<Option<Order>>;

    /// The driver's current IN_TRANSIT order, if any, ignoring
    /// `exclude_order`.
    async fn find_active_trip(&self, driver_id: Uuid, exclude_order: Uuid)
        -> Result<Option<Order>>;

    /// Set IN_TRANSIT if and only if the order is still assigned to this
    /// driver with status ASSIGNED and the driver has no other IN_TRANSIT
    /// order. The whole condition must be evaluated atomically with the
    /// write. Returns the updated order, or None when no row matched.
    async fn mark_in_transit(&self, order_id: Uuid, driver_id: Uuid) -> Result<Option<Order>>;

    /// Set DELIVERED unconditionally. Errors when the row does not exist.
    async fn mark_delivered(&self, order_id: Uuid) -> Result<Order>;
}

/// Lifecycle of the transit tracking record.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Remove the tracking record. Ok(false) when there was none.
    async fn delete(&self, order_id: Uuid) -> Result<bool>;
}
