//! Frequency partitioner.
//! Splits the sorted frequency list into contiguous, evenly sized groups and tunes one
//! receiver to the midpoint of each group's extremes.

use tracing::debug;

use crate::error::{PlanError, PlanResult};
use crate::plan::{AllocationPlan, Hz, Receiver};

/// Upper bound on receivers in one plan.
pub const MAX_RECEIVERS: u64 = 1024;

/// Number of receivers needed for `span` Hz at `bandwidth` Hz each.
pub fn receivers_needed(span: Hz, bandwidth: Hz) -> PlanResult<usize> {
    if bandwidth == 0 {
        return Err(PlanError::InvalidBandwidth { bandwidth });
    }
    let needed = span / bandwidth + 1;
    if needed > MAX_RECEIVERS {
        return Err(PlanError::TooManyReceivers {
            needed,
            limit: MAX_RECEIVERS,
        });
    }
    Ok(needed as usize)
}

/// Builds the receiver plan for `frequencies` (any order; a sorted copy is used).
///
/// Fails when the input is empty, when `bandwidth` is zero, when a frequency is zero, or when
/// the resulting windows would leave any frequency uncovered. Recorder counts are left at 0.
pub fn partition(frequencies: &[Hz], bandwidth: Hz) -> PlanResult<AllocationPlan> {
    if bandwidth == 0 {
        return Err(PlanError::InvalidBandwidth { bandwidth });
    }
    if let Some(&frequency) = frequencies.iter().find(|&&f| f == 0) {
        return Err(PlanError::InvalidFrequency { frequency });
    }

    let mut sorted = frequencies.to_vec();
    sorted.sort_unstable();

    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return Err(PlanError::EmptyInput);
    };
    let span = max - min;
    let count = receivers_needed(span, bandwidth)?;

    let per_group = sorted.len() / count;
    let remainder = sorted.len() % count;

    let mut receivers = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        // Earliest groups absorb the remainder.
        let size = per_group + usize::from(index < remainder);
        let group = &sorted[start..start + size];
        start += size;

        let center = match (group.first(), group.last()) {
            (Some(&lo), Some(&hi)) => lo + (hi - lo) / 2,
            _ => geometric_center(min, span, index, count),
        };
        debug!(index, center, members = group.len(), "placed receiver");
        receivers.push(Receiver::new(index, center, bandwidth));
    }

    let plan = AllocationPlan { receivers };
    if let Some(&frequency) = sorted.iter().find(|&&f| plan.covering(f).is_none()) {
        return Err(PlanError::UncoveredFrequency { frequency });
    }
    Ok(plan)
}

/// `min + span * (index + 0.5) / count`, floored.
fn geometric_center(min: Hz, span: Hz, index: usize, count: usize) -> Hz {
    let offset = u128::from(span) * (2 * index as u128 + 1) / (2 * count as u128);
    min + offset as Hz
}

#[cfg(test)]
mod tests {
    use super::*;

    const BW: Hz = 2_400_000;

    fn assert_covers_all(plan: &AllocationPlan, frequencies: &[Hz]) {
        for &f in frequencies {
            assert!(plan.covering(f).is_some(), "{} Hz not covered by {:?}", f, plan);
        }
    }

    #[test]
    fn test_four_channel_system_uses_two_receivers() {
        let freqs = [851_012_500, 851_512_500, 852_012_500, 853_987_500];
        let plan = partition(&freqs, BW).unwrap();

        assert_eq!(plan.len(), 2);
        // 4 frequencies over 2 receivers: two per group
        assert_eq!(plan.centers(), vec![851_262_500, 853_000_000]);
        assert!(plan.receivers.iter().all(|r| r.bandwidth == BW));
        assert_eq!(
            plan.receivers.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_covers_all(&plan, &freqs);
    }

    #[test]
    fn test_remainder_goes_to_earliest_groups() {
        // span 5.0 MHz -> 3 receivers, 8 frequencies -> groups of 3, 3, 2
        let freqs = [
            851_000_000,
            851_100_000,
            851_200_000,
            853_000_000,
            853_100_000,
            853_200_000,
            855_900_000,
            856_000_000,
        ];
        let plan = partition(&freqs, BW).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.centers(), vec![851_100_000, 853_100_000, 855_950_000]);
        assert_covers_all(&plan, &freqs);
    }

    #[test]
    fn test_single_frequency_gets_one_centered_receiver() {
        let plan = partition(&[460_100_000], 1).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.receivers[0].center, 460_100_000);
    }

    #[test]
    fn test_unsorted_input_matches_sorted_input() {
        let sorted = [851_012_500, 851_512_500, 852_012_500, 853_987_500];
        let shuffled = [853_987_500, 851_012_500, 852_012_500, 851_512_500];
        assert_eq!(partition(&sorted, BW), partition(&shuffled, BW));
    }

    #[test]
    fn test_duplicates_count_as_separate_entries() {
        // span 3.0 MHz -> 2 receivers; 5 entries -> groups of 3 and 2
        let freqs = [851_000_000, 851_000_000, 851_000_000, 853_000_000, 854_000_000];
        let plan = partition(&freqs, BW).unwrap();
        assert_eq!(plan.centers(), vec![851_000_000, 853_500_000]);
    }

    #[test]
    fn test_receiver_count_formula() {
        let cases: [(Vec<Hz>, usize); 4] = [
            (vec![851_000_000, 851_000_000], 1),
            (vec![851_000_000, 853_399_999], 1),
            (vec![851_000_000, 853_400_000], 2),
            (vec![851_000_000, 851_500_000, 856_000_000, 856_100_000], 3),
        ];
        for (freqs, expected) in cases {
            let span = freqs.iter().max().unwrap() - freqs.iter().min().unwrap();
            assert_eq!(receivers_needed(span, BW), Ok(expected));
            assert_eq!(partition(&freqs, BW).unwrap().len(), expected, "{:?}", freqs);
        }
    }

    #[test]
    fn test_inner_frequency_does_not_add_receivers() {
        let base = vec![851_000_000, 851_400_000, 853_600_000, 854_000_000];
        let before = partition(&base, BW).unwrap().len();

        let mut extended = base.clone();
        extended.push(852_500_000);
        assert_eq!(partition(&extended, BW).unwrap().len(), before);
    }

    #[test]
    fn test_sparse_span_falls_back_to_geometric_centers() {
        // 10 MHz apart with 4 MHz receivers -> 3 receivers for 2 frequencies
        let freqs = [100_000_000, 110_000_000];
        let plan = partition(&freqs, 4_000_000).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.receivers[0].center, 100_000_000);
        assert_eq!(plan.receivers[1].center, 110_000_000);
        // Third group is empty: min + 10 MHz * 2.5 / 3
        assert_eq!(plan.receivers[2].center, 108_333_333);
        assert_covers_all(&plan, &freqs);
    }

    #[test]
    fn test_skewed_distribution_is_rejected_instead_of_partially_covered() {
        // Three clustered low, one 2.8 MHz away: the second group spans 851.2..854.0 MHz
        let freqs = [851_000_000, 851_100_000, 851_200_000, 854_000_000];
        assert_eq!(
            partition(&freqs, BW),
            Err(PlanError::UncoveredFrequency {
                frequency: 854_000_000
            })
        );
    }

    #[test]
    fn test_coverage_holds_over_generated_systems() {
        // Evenly spaced channel plans at 12.5 kHz and 25 kHz steps across several widths
        for step in [12_500u64, 25_000] {
            for channels in 1..=120u64 {
                let freqs: Vec<Hz> = (0..channels).map(|i| 851_006_250 + i * step).collect();
                let plan = partition(&freqs, BW).unwrap();
                assert_covers_all(&plan, &freqs);
                let span = freqs[freqs.len() - 1] - freqs[0];
                assert_eq!(Ok(plan.len()), receivers_needed(span, BW));
            }
        }
    }

    #[test]
    fn test_huge_receiver_count_is_an_error() {
        assert_eq!(
            partition(&[1, 10_000], 1),
            Err(PlanError::TooManyReceivers {
                needed: 10_000,
                limit: MAX_RECEIVERS
            })
        );
        assert_eq!(receivers_needed(1023, 1), Ok(1024));
        assert_eq!(
            receivers_needed(0, 0),
            Err(PlanError::InvalidBandwidth { bandwidth: 0 })
        );
    }

    #[test]
    fn test_precondition_errors() {
        assert_eq!(partition(&[], BW), Err(PlanError::EmptyInput));
        assert_eq!(
            partition(&[851_000_000], 0),
            Err(PlanError::InvalidBandwidth { bandwidth: 0 })
        );
        assert_eq!(
            partition(&[0, 851_000_000], BW),
            Err(PlanError::InvalidFrequency { frequency: 0 })
        );
    }
}
