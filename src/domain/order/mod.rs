// ============================================================================
// Order Domain - Delivery Transitions for a Single Order
// ============================================================================
//
// This module contains ALL order-delivery code:
// - Value objects (OrderStatus)
// - Models (Order, OrderInWay)
// - Errors (TransitError)
// - Guard (DeliveryGuard, TransitReply)
//
// Storage and notification plumbing live behind the seams in store/ and
// notify/; nothing in here talks to Postgres or HTTP directly.
//
// ============================================================================

pub mod errors;
pub mod guard;
pub mod model;
pub mod value_objects;

// Re-export for convenience
pub use errors::*;
pub use guard::*;
pub use model::*;
pub use value_objects::*;
