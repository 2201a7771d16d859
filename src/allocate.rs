//! Recorder allocator.
//! Splits a digital recorder budget across the receivers of a plan, giving receivers that
//! carry control channels a small bonus, then clamps each count to the per-device bounds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::plan::{AllocationPlan, Hz, Receiver};

/// Extra recorders granted to a receiver that sees at least one control channel.
const MAX_CONTROL_BONUS: i64 = 2;

/// Recorder budget for one plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderBudget {
    pub total: i64,
    pub min_per_device: i64,
    pub max_per_device: i64,
}

impl Default for RecorderBudget {
    fn default() -> Self {
        Self {
            total: 36,
            min_per_device: 6,
            max_per_device: 10,
        }
    }
}

impl RecorderBudget {
    pub fn new(total: i64, min_per_device: i64, max_per_device: i64) -> Self {
        Self {
            total,
            min_per_device,
            max_per_device,
        }
    }

    /// Counts must fit a `u32` recorder count, so every field is bounded by `u32::MAX`.
    pub fn validate(&self) -> PlanResult<()> {
        let limit = i64::from(u32::MAX);
        if self.total < 0
            || self.total > limit
            || self.min_per_device < 0
            || self.min_per_device > self.max_per_device
            || self.max_per_device > limit
        {
            return Err(PlanError::InvalidBudgetRange {
                total: self.total,
                min_per_device: self.min_per_device,
                max_per_device: self.max_per_device,
            });
        }
        Ok(())
    }
}

/// Breakdown of one receiver's recorder count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecorderShare {
    pub base: i64,
    pub control_bonus: i64,
    pub remainder: i64,
    pub controls_in_range: usize,
    pub recorders: u32,
}

/// Control channels inside `receiver`'s window.
pub fn controls_in_range(receiver: &Receiver, control_channels: &BTreeSet<Hz>) -> usize {
    control_channels
        .range(receiver.lower()..=receiver.upper())
        .count()
}

/// Computes the share for the receiver at `index` of `receiver_count`.
///
/// The budget remainder goes one apiece to the first `total % receiver_count` receivers.
pub fn recorder_share(
    index: usize,
    receiver_count: usize,
    controls_in_range: usize,
    budget: &RecorderBudget,
) -> RecorderShare {
    let n = receiver_count.max(1) as i64;
    let base = budget.total / n;
    let leftover = budget.total % n;

    let control_bonus = (controls_in_range as i64).min(MAX_CONTROL_BONUS);
    let remainder = i64::from((index as i64) < leftover);

    let recorders = base
        .saturating_add(control_bonus)
        .saturating_add(remainder)
        .min(budget.max_per_device)
        .max(budget.min_per_device);

    RecorderShare {
        base,
        control_bonus,
        remainder,
        controls_in_range,
        recorders: u32::try_from(recorders.clamp(0, i64::from(u32::MAX))).unwrap_or(u32::MAX),
    }
}

/// Fills in `recorder_count` for every receiver of `plan`.
pub fn allocate(
    mut plan: AllocationPlan,
    control_channels: &BTreeSet<Hz>,
    budget: &RecorderBudget,
) -> PlanResult<AllocationPlan> {
    budget.validate()?;
    if plan.is_empty() {
        return Err(PlanError::EmptyInput);
    }

    let count = plan.len();
    for receiver in &mut plan.receivers {
        let controls = controls_in_range(receiver, control_channels);
        let share = recorder_share(receiver.index, count, controls, budget);
        debug!(
            index = receiver.index,
            base = share.base,
            bonus = share.control_bonus,
            remainder = share.remainder,
            recorders = share.recorders,
            "allocated recorders"
        );
        receiver.recorder_count = share.recorders;
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    const BW: Hz = 2_400_000;

    fn controls(freqs: &[Hz]) -> BTreeSet<Hz> {
        freqs.iter().copied().collect()
    }

    fn plan_of(centers: &[Hz]) -> AllocationPlan {
        AllocationPlan {
            receivers: centers
                .iter()
                .enumerate()
                .map(|(i, &c)| Receiver::new(i, c, BW))
                .collect(),
        }
    }

    #[test]
    fn test_four_channel_example_scenario() {
        let freqs = [851_012_500, 851_512_500, 852_012_500, 853_987_500];
        let plan = partition(&freqs, BW).unwrap();
        let budget = RecorderBudget::new(22, 6, 10);

        let plan = allocate(plan, &controls(&[851_012_500]), &budget).unwrap();

        // base 11 (+1 control bonus on receiver 0), both clamped to 10
        let counts: Vec<u32> = plan.receivers.iter().map(|r| r.recorder_count).collect();
        assert_eq!(counts, vec![10, 10]);
    }

    #[test]
    fn test_single_frequency_gets_clamped_total() {
        let budget = RecorderBudget::new(8, 6, 10);
        let plan = partition(&[460_100_000], BW).unwrap();
        let plan = allocate(plan, &BTreeSet::new(), &budget).unwrap();
        assert_eq!(plan.receivers[0].recorder_count, 8);

        let plan = partition(&[460_100_000], BW).unwrap();
        let plan = allocate(plan, &BTreeSet::new(), &RecorderBudget::new(22, 6, 10)).unwrap();
        assert_eq!(plan.receivers[0].recorder_count, 10);

        let plan = partition(&[460_100_000], BW).unwrap();
        let plan = allocate(plan, &BTreeSet::new(), &RecorderBudget::new(2, 6, 10)).unwrap();
        assert_eq!(plan.receivers[0].recorder_count, 6);
    }

    #[test]
    fn test_remainder_spreads_over_first_receivers() {
        // 22 over 3 receivers: base 7, remainder 1 -> only receiver 0 gets the extra
        let budget = RecorderBudget::new(22, 0, 100);
        let plan = allocate(
            plan_of(&[851_000_000, 856_000_000, 861_000_000]),
            &BTreeSet::new(),
            &budget,
        )
        .unwrap();
        let counts: Vec<u32> = plan.receivers.iter().map(|r| r.recorder_count).collect();
        assert_eq!(counts, vec![8, 7, 7]);

        // 23 over 3 receivers: remainder 2 -> receivers 0 and 1 get one each
        let budget = RecorderBudget::new(23, 0, 100);
        let plan = allocate(
            plan_of(&[851_000_000, 856_000_000, 861_000_000]),
            &BTreeSet::new(),
            &budget,
        )
        .unwrap();
        let counts: Vec<u32> = plan.receivers.iter().map(|r| r.recorder_count).collect();
        assert_eq!(counts, vec![8, 8, 7]);
        assert_eq!(plan.total_recorders(), 23);
    }

    #[test]
    fn test_control_bonus_is_capped_at_two() {
        let budget = RecorderBudget::new(30, 0, 100);
        let shares: Vec<u32> = (0..=4)
            .map(|k| recorder_share(1, 3, k, &budget).recorders)
            .collect();
        assert_eq!(shares, vec![10, 11, 12, 12, 12]);
    }

    #[test]
    fn test_control_bonus_is_monotonic_under_clamping() {
        for (min, max) in [(0, 100), (6, 10), (6, 6), (12, 20)] {
            let budget = RecorderBudget::new(30, min, max);
            let mut previous = 0;
            for k in 0..=2 {
                let recorders = recorder_share(2, 3, k, &budget).recorders;
                assert!(recorders >= previous, "k={} min={} max={}", k, min, max);
                previous = recorders;
            }
        }
    }

    #[test]
    fn test_controls_counted_on_inclusive_window_edges() {
        let rx = Receiver::new(0, 852_000_000, BW);
        let set = controls(&[850_800_000, 853_200_000, 853_200_001, 850_799_999]);
        assert_eq!(controls_in_range(&rx, &set), 2);
    }

    #[test]
    fn test_receiver_without_control_channel_gets_no_bonus() {
        let budget = RecorderBudget::new(20, 0, 100);
        let plan = allocate(
            plan_of(&[851_000_000, 856_000_000]),
            &controls(&[856_100_000, 856_200_000, 856_300_000]),
            &budget,
        )
        .unwrap();
        let counts: Vec<u32> = plan.receivers.iter().map(|r| r.recorder_count).collect();
        assert_eq!(counts, vec![10, 12]);
    }

    #[test]
    fn test_counts_stay_within_bounds_and_near_budget() {
        let centers: Vec<Hz> = (0..5).map(|i| 851_000_000 + i * 2_500_000).collect();
        let control_set = controls(&[851_000_000, 853_500_000, 853_600_000, 853_700_000]);
        for total in 0..=80 {
            for (min, max) in [(0, 4), (6, 10), (3, 30)] {
                let budget = RecorderBudget::new(total, min, max);
                let plan = allocate(plan_of(&centers), &control_set, &budget).unwrap();
                for rx in &plan.receivers {
                    assert!((min..=max).contains(&i64::from(rx.recorder_count)));
                }
                // Without clamping the sum is total plus at most 2 per receiver
                if min == 3 && total >= 15 {
                    let sum = i64::from(plan.total_recorders());
                    assert!(sum >= total && sum <= total + 2 * centers.len() as i64);
                }
            }
        }
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let freqs = [851_012_500, 851_512_500, 852_012_500, 853_987_500, 855_100_000];
        let control_set = controls(&[851_012_500, 855_100_000]);
        let budget = RecorderBudget::default();
        let first = allocate(partition(&freqs, BW).unwrap(), &control_set, &budget).unwrap();
        for _ in 0..10 {
            let again = allocate(partition(&freqs, BW).unwrap(), &control_set, &budget).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_largest_accepted_budget_stays_in_bounds() {
        let max = i64::from(u32::MAX);
        let budget = RecorderBudget::new(max, max, max);
        let plan = plan_of(&[851_000_000]);
        let plan = allocate(plan, &controls(&[851_000_000]), &budget).unwrap();
        assert_eq!(plan.receivers[0].recorder_count, u32::MAX);

        // No overflow even when the share is computed outside `allocate`
        let share = recorder_share(0, 1, 2, &RecorderBudget::new(i64::MAX, 0, i64::MAX));
        assert_eq!(share.recorders, u32::MAX);
    }

    #[test]
    fn test_invalid_budgets_are_rejected() {
        let plan = plan_of(&[851_000_000]);
        for budget in [
            RecorderBudget::new(-1, 0, 10),
            RecorderBudget::new(10, 8, 6),
            RecorderBudget::new(10, -2, 6),
            RecorderBudget::new(i64::MAX, 0, i64::MAX),
            RecorderBudget::new(5_000_000_000, 5_000_000_000, 5_000_000_000),
        ] {
            assert!(matches!(
                allocate(plan.clone(), &BTreeSet::new(), &budget),
                Err(PlanError::InvalidBudgetRange { .. })
            ));
        }
        assert_eq!(
            allocate(AllocationPlan::default(), &BTreeSet::new(), &RecorderBudget::default()),
            Err(PlanError::EmptyInput)
        );
    }
}
