//! Detail-call budget allocation.
//!
//! The directory bills per detail lookup, so every enrichment round gets
//! an explicit budget. Selection is a plain prefix: callers hand in
//! candidates already ordered by priority (directory result order, or
//! "needs details first") and this never reorders them.

/// Returns the prefix of `candidates` that fits in `budget`.
///
/// A missing, zero, or negative budget selects nothing; a budget larger
/// than the candidate set selects everything. Never an error.
#[must_use]
pub fn allocate<T>(mut candidates: Vec<T>, budget: Option<i64>) -> Vec<T> {
    let budget = budget.unwrap_or(0).max(0);
    let take = usize::try_from(budget).unwrap_or(usize::MAX);

    candidates.truncate(take);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_budget_selects_nothing() {
        assert!(allocate(vec![1, 2, 3], None).is_empty());
    }

    #[test]
    fn zero_and_negative_budgets_select_nothing() {
        assert!(allocate(vec![1, 2, 3], Some(0)).is_empty());
        assert!(allocate(vec![1, 2, 3], Some(-5)).is_empty());
    }

    #[test]
    fn budget_caps_the_selection() {
        assert_eq!(allocate(vec![1, 2, 3, 4, 5], Some(2)), vec![1, 2]);
    }

    #[test]
    fn oversized_budget_selects_all_without_error() {
        assert_eq!(allocate(vec![1, 2], Some(100)), vec![1, 2]);
    }

    #[test]
    fn input_order_is_preserved() {
        let candidates = vec!["c", "a", "b"];
        assert_eq!(allocate(candidates, Some(3)), vec!["c", "a", "b"]);
    }
}
