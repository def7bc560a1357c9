// ============================================================================
// Storage Layer
// ============================================================================
//
// Trait seams the guard depends on, plus the Postgres implementation the
// deployment actually runs.
//
// ============================================================================

pub mod order_store;
pub mod postgres;

pub use order_store::{OrderStore, TrackingStore};
pub use postgres::{ensure_schema, PgOrderStore, PgTrackingStore};
