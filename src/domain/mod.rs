// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Order-delivery rules live here, separated from infrastructure. Each
// aggregate has its own subdirectory with:
// - Value objects
// - Models
// - Errors
// - Guard (transition logic)
//
// This layer holds no storage or HTTP code; it depends on the trait seams
// in store/ and notify/ only.
//
// ============================================================================

pub mod order;

// Future aggregates can be added here:
// pub mod driver;
