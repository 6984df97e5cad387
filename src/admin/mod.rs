// ============================================================================
// Admin - capability checks and action throttling for back-office commands
// ============================================================================

mod permissions;
mod rate_limit;

pub use permissions::{AdminPermissions, Capability};
pub use rate_limit::ActionRateLimiter;
