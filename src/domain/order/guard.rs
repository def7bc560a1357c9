use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::notify::{CustomerNotice, NotificationSender};
use crate::store::{OrderStore, TrackingStore};

use super::errors::TransitError;
use super::model::Order;
use super::value_objects::OrderStatus;

// ============================================================================
// Delivery Transition Guard
// ============================================================================
//
// Owns the two delivery transitions:
//
// - begin_transit checks, in order: the order exists, it belongs to the
//   calling driver, it is ASSIGNED, and the driver has no other IN_TRANSIT
//   order. The write itself re-asserts all of that atomically in storage,
//   so two concurrent calls cannot both pass the reads and win.
// - complete_delivery marks the order DELIVERED, removes the transit
//   tracking record, and notifies the customer. Only a failure of the
//   status write fails the call; everything after it is best-effort.
//
// ============================================================================

pub struct DeliveryGuard {
    orders: Arc<dyn OrderStore>,
    tracking: Arc<dyn TrackingStore>,
    notifier: Arc<dyn NotificationSender>,
    metrics: Arc<Metrics>,
}

impl DeliveryGuard {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        tracking: Arc<dyn TrackingStore>,
        notifier: Arc<dyn NotificationSender>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders,
            tracking,
            notifier,
            metrics,
        }
    }

    /// Move an ASSIGNED order into IN_TRANSIT on behalf of a driver.
    ///
    /// Checks run in order and stop at the first violation, so the caller
    /// always learns the most fundamental broken rule. At most one order
    /// per driver is IN_TRANSIT at any moment.
    pub async fn begin_transit(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Order, TransitError> {
        let started = Instant::now();
        let result = self.try_begin_transit(order_id, driver_id).await;
        self.metrics
            .observe_operation("begin_transit", started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                self.metrics.record_transition(OrderStatus::InTransit.as_str());
                tracing::info!(
                    order_id = %order.id,
                    driver_id = %driver_id,
                    "🚚 Order is now in transit"
                );
            }
            Err(err) => {
                self.metrics.record_transit_rejection(err.code());
                tracing::warn!(
                    order_id = %order_id,
                    driver_id = %driver_id,
                    reason = err.code(),
                    "Transit refused"
                );
            }
        }

        result
    }

    async fn try_begin_transit(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Order, TransitError> {
        let order = match self.orders.find_by_id(order_id).await? {
            Some(order) => order,
            None => return Err(TransitError::NotFound),
        };

        if !order.is_assigned_to(driver_id) {
            return Err(TransitError::NotAssignedToDriver);
        }

        if order.status != OrderStatus::Assigned {
            return Err(TransitError::InvalidState(order.status));
        }

        if let Some(active) = self.orders.find_active_trip(driver_id, order_id).await? {
            return Err(TransitError::ActiveTripExists {
                active_order_id: active.id,
            });
        }

        // The guarded write re-checks every precondition in one statement.
        // None means a competing call changed the picture after our reads,
        // so classify the refusal against fresh state.
        match self.orders.mark_in_transit(order_id, driver_id).await? {
            Some(updated) => Ok(updated),
            None => Err(self.classify_refused_write(order_id, driver_id).await),
        }
    }

    /// Re-derive the right error after the IN_TRANSIT write matched no row.
    async fn classify_refused_write(&self, order_id: Uuid, driver_id: Uuid) -> TransitError {
        let order = match self.orders.find_by_id(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return TransitError::NotFound,
            Err(err) => return TransitError::Store(err),
        };

        if !order.is_assigned_to(driver_id) {
            return TransitError::NotAssignedToDriver;
        }

        if order.status != OrderStatus::Assigned {
            return TransitError::InvalidState(order.status);
        }

        match self.orders.find_active_trip(driver_id, order_id).await {
            Ok(Some(active)) => TransitError::ActiveTripExists {
                active_order_id: active.id,
            },
            Ok(None) => TransitError::Store(anyhow::anyhow!(
                "in-transit write for order {order_id} was refused but no violated rule is visible"
            )),
            Err(err) => TransitError::Store(err),
        }
    }

    /// Mark an order DELIVERED and fan out the completion side effects.
    ///
    /// The status write is the primary effect and the only one that can
    /// fail the call. The tracking-record removal and the customer
    /// notifications are not atomic with it: their failures are logged and
    /// counted, and a DELIVERED status is never rolled back (see DESIGN.md
    /// on the inherited non-atomicity here).
    pub async fn complete_delivery(&self, order_id: Uuid) -> Result<(), TransitError> {
        let started = Instant::now();
        let result = self.try_complete_delivery(order_id).await;
        self.metrics
            .observe_operation("complete_delivery", started.elapsed().as_secs_f64());
        result
    }

    async fn try_complete_delivery(&self, order_id: Uuid) -> Result<(), TransitError> {
        let order = match self.orders.mark_delivered(order_id).await {
            Ok(order) => order,
            Err(err) => {
                self.metrics.record_transit_rejection("StorageFailure");
                tracing::error!(
                    order_id = %order_id,
                    error = %err,
                    "Delivery completion could not update the order"
                );
                return Err(TransitError::Store(err));
            }
        };

        self.metrics.record_transition(OrderStatus::Delivered.as_str());
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            "📦 Order delivered"
        );

        match self.tracking.delete(order_id).await {
            Ok(true) => {
                tracing::debug!(order_id = %order_id, "Transit tracking record removed");
            }
            Ok(false) => {
                self.metrics.record_tracking_missing();
                tracing::warn!(
                    order_id = %order_id,
                    reason = "TrackingRecordMissing",
                    "No transit tracking record to remove; delivered status stands"
                );
            }
            Err(err) => {
                self.metrics.record_tracking_missing();
                tracing::warn!(
                    order_id = %order_id,
                    error = %err,
                    "Transit tracking record removal failed; delivered status stands"
                );
            }
        }

        let notice = CustomerNotice::order_delivered(&order);
        if let Err(err) = self.notifier.notify_customer(&notice).await {
            tracing::warn!(
                order_id = %order_id,
                customer_id = %order.customer_id,
                error = %err,
                "Delivered notification failed; delivery result unaffected"
            );
        }

        Ok(())
    }
}

// ============================================================================
// Reply Envelope
// ============================================================================

/// Discriminated reply handed to the HTTP action layer: a success flag plus
/// either the updated order or the violated rule.
#[derive(Debug, Serialize)]
pub struct TransitReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl From<Result<Order, TransitError>> for TransitReply {
    fn from(result: Result<Order, TransitError>) -> Self {
        match result {
            Ok(order) => Self {
                success: true,
                error: None,
                message: None,
                order: Some(order),
            },
            Err(err) => Self {
                success: false,
                error: Some(err.code()),
                message: Some(err.user_message()),
                order: None,
            },
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
