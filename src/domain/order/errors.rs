use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Delivery Transition Errors
// ============================================================================
//
// Refusals are values, never panics, so the action layer can branch on the
// exact violated rule and show the driver a precise message.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Order not found")]
    NotFound,

    #[error("Order is assigned to a different driver")]
    NotAssignedToDriver,

    #[error("Order cannot begin transit from status {0}")]
    InvalidState(OrderStatus),

    #[error("Driver already has order {active_order_id} in transit")]
    ActiveTripExists { active_order_id: Uuid },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl TransitError {
    /// Stable machine-readable code carried in the reply envelope.
    pub fn code(&self) -> &'static str {
        match self {
            TransitError::NotFound => "NotFound",
            TransitError::NotAssignedToDriver => "NotAssignedToDriver",
            TransitError::InvalidState(_) => "InvalidState",
            TransitError::ActiveTripExists { .. } => "ActiveTripExists",
            TransitError::Store(_) => "StorageFailure",
        }
    }

    /// Sentence the driver app shows verbatim.
    pub fn user_message(&self) -> &'static str {
        match self {
            TransitError::NotFound => "This order no longer exists.",
            TransitError::NotAssignedToDriver => "This order is not assigned to you.",
            TransitError::InvalidState(_) => "This order is not ready to go out for delivery.",
            TransitError::ActiveTripExists { .. } => "You already have an active delivery.",
            TransitError::Store(_) => "Something went wrong on our side. Please try again.",
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
