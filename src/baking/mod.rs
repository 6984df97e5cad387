// ============================================================================
// Baking - production queue and baking-complete cascade
// ============================================================================

mod aggregator;
mod queue;

pub use aggregator::{BakingQueueAggregator, PromotionOutcome};
pub use queue::{build_queue, eligible_for_promotion, BakingQueue, BakingQueueEntry};
