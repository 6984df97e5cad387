use super::value_objects::OrderStatus;

// ============================================================================
// Status Transition Policy - pure rules, no side effects
// ============================================================================
//
// Happy path: pending → baking → ready → packed → delivered
// Side-exit:  any non-terminal status → cancelled (absorbing)
//
// Every method answers a yes/no question. Rejecting a command is the
// aggregate's job, not this policy's.
//
// ============================================================================

/// Default forward jump allowed for administrative direct-set operations.
pub const DEFAULT_MAX_JUMP: usize = 2;

pub struct StatusTransitionPolicy;

impl StatusTransitionPolicy {
    /// True for every happy-path status except `delivered`.
    pub fn can_advance(current: OrderStatus) -> bool {
        Self::next_status(current).is_some()
    }

    /// True for every happy-path status except `pending`.
    pub fn can_revert(current: OrderStatus) -> bool {
        Self::previous_status(current).is_some()
    }

    pub fn next_status(current: OrderStatus) -> Option<OrderStatus> {
        let index = current.happy_path_index()?;
        OrderStatus::HAPPY_PATH.get(index + 1).copied()
    }

    pub fn previous_status(current: OrderStatus) -> Option<OrderStatus> {
        let index = current.happy_path_index()?;
        index.checked_sub(1).map(|i| OrderStatus::HAPPY_PATH[i])
    }

    /// Delivered orders cannot be cancelled, and cancelled stays cancelled.
    pub fn can_cancel(current: OrderStatus) -> bool {
        !current.is_terminal()
    }

    /// Direct-set rule: forward by at most `max_jump` steps, backward by any
    /// number of steps, or to `cancelled` from a non-terminal status.
    /// Staying put is never a transition.
    pub fn can_jump_to(current: OrderStatus, target: OrderStatus, max_jump: usize) -> bool {
        if target == OrderStatus::Cancelled {
            return Self::can_cancel(current);
        }

        match (current.happy_path_index(), target.happy_path_index()) {
            (Some(from), Some(to)) if to > from => to - from <= max_jump,
            (Some(from), Some(to)) => to < from,
            _ => false,
        }
    }

    /// Every status reachable from `current` under `can_jump_to`.
    pub fn reachable_from(current: OrderStatus, max_jump: usize) -> Vec<OrderStatus> {
        OrderStatus::HAPPY_PATH
            .iter()
            .copied()
            .chain(std::iter::once(OrderStatus::Cancelled))
            .filter(|target| Self::can_jump_to(current, *target, max_jump))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_advance_and_revert_along_happy_path() {
        for status in OrderStatus::HAPPY_PATH {
            assert_eq!(StatusTransitionPolicy::can_advance(status), status != Delivered);
            assert_eq!(StatusTransitionPolicy::can_revert(status), status != Pending);
        }

        assert!(!StatusTransitionPolicy::can_advance(Cancelled));
        assert!(!StatusTransitionPolicy::can_revert(Cancelled));
    }

    #[test]
    fn test_next_and_previous() {
        assert_eq!(StatusTransitionPolicy::next_status(Pending), Some(Baking));
        assert_eq!(StatusTransitionPolicy::next_status(Packed), Some(Delivered));
        assert_eq!(StatusTransitionPolicy::next_status(Delivered), None);
        assert_eq!(StatusTransitionPolicy::next_status(Cancelled), None);

        assert_eq!(StatusTransitionPolicy::previous_status(Baking), Some(Pending));
        assert_eq!(StatusTransitionPolicy::previous_status(Pending), None);
        assert_eq!(StatusTransitionPolicy::previous_status(Cancelled), None);
    }

    #[test]
    fn test_cancel_rules() {
        for status in [Pending, Baking, Ready, Packed] {
            assert!(StatusTransitionPolicy::can_cancel(status));
            assert!(StatusTransitionPolicy::can_jump_to(status, Cancelled, 0));
        }
        assert!(!StatusTransitionPolicy::can_cancel(Delivered));
        assert!(!StatusTransitionPolicy::can_cancel(Cancelled));
        assert!(!StatusTransitionPolicy::can_jump_to(Delivered, Cancelled, 5));
    }

    #[test]
    fn test_jump_bound() {
        assert!(!StatusTransitionPolicy::can_jump_to(Pending, Packed, 2));
        assert!(StatusTransitionPolicy::can_jump_to(Pending, Ready, 2));
        assert!(StatusTransitionPolicy::can_jump_to(Pending, Baking, 2));
        assert!(StatusTransitionPolicy::can_jump_to(Pending, Delivered, 4));
    }

    #[test]
    fn test_backward_jumps_of_any_size() {
        assert!(StatusTransitionPolicy::can_jump_to(Delivered, Pending, 0));
        assert!(StatusTransitionPolicy::can_jump_to(Packed, Baking, 2));
        assert!(StatusTransitionPolicy::can_jump_to(Ready, Baking, 1));
    }

    #[test]
    fn test_no_jump_out_of_cancelled_or_in_place() {
        for target in OrderStatus::HAPPY_PATH {
            assert!(!StatusTransitionPolicy::can_jump_to(Cancelled, target, 10));
            assert!(!StatusTransitionPolicy::can_jump_to(target, target, 10));
        }
        assert!(!StatusTransitionPolicy::can_jump_to(Cancelled, Cancelled, 10));
    }

    #[test]
    fn test_reachable_from() {
        assert_eq!(
            StatusTransitionPolicy::reachable_from(Pending, DEFAULT_MAX_JUMP),
            vec![Baking, Ready, Cancelled]
        );
        assert_eq!(
            StatusTransitionPolicy::reachable_from(Delivered, DEFAULT_MAX_JUMP),
            vec![Pending, Baking, Ready, Packed]
        );
        assert!(StatusTransitionPolicy::reachable_from(Cancelled, DEFAULT_MAX_JUMP).is_empty());
    }
}
