// =============================================================================
// Dashboard API
// =============================================================================

pub mod error;
pub mod rest;
