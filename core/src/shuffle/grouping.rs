//! Reduce-side grouping: which sorted records share one aggregation call.

use copairs_common::GroupingMode;
use std::fmt::Debug;

use crate::pair_key::PairKey;

/// Equivalence used to cut a sorted run of records into groups.
///
/// Groups are formed from adjacent records, so the relation must be
/// consistent with the sort order: records judged equal must sort next to
/// each other.
pub trait GroupingFunction<K>: Send + Sync + Debug {
    fn same_group(&self, a: &K, b: &K) -> bool;
}

/// Grouping policies for [`PairKey`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupingPolicy {
    /// Group by full `(low, high)` equality.
    #[default]
    ExactPair,
    /// Group by `low` alone; distinct high items share a group.
    LowItem,
}

impl From<GroupingMode> for GroupingPolicy {
    fn from(mode: GroupingMode) -> Self {
        match mode {
            GroupingMode::ExactPair => GroupingPolicy::ExactPair,
            GroupingMode::LowItem => GroupingPolicy::LowItem,
        }
    }
}

impl GroupingFunction<PairKey> for GroupingPolicy {
    fn same_group(&self, a: &PairKey, b: &PairKey) -> bool {
        match self {
            GroupingPolicy::ExactPair => a == b,
            GroupingPolicy::LowItem => a.route_eq(b),
        }
    }
}

/// Split records already sorted by key into groups.
pub fn group_sorted<'a, K, V, G>(
    records: &'a [(K, V)],
    grouping: &'a G,
) -> impl Iterator<Item = &'a [(K, V)]>
where
    G: GroupingFunction<K> + ?Sized,
{
    records.chunk_by(move |(a, _), (b, _)| grouping.same_group(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: u64, b: u64) -> PairKey {
        PairKey::new(a, b, 0).unwrap()
    }

    fn sorted_records() -> Vec<(PairKey, u64)> {
        let mut records = vec![
            (key(1, 2), 1),
            (key(1, 3), 1),
            (key(2, 1), 4),
            (key(2, 5), 1),
            (key(1, 3), 2),
        ];
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    #[test]
    fn test_exact_pair_groups() {
        let records = sorted_records();
        let groups: Vec<_> = group_sorted(&records, &GroupingPolicy::ExactPair).collect();
        let sizes: Vec<_> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(groups[0].iter().all(|(k, _)| k.pair() == (1, 2)));
    }

    #[test]
    fn test_low_item_groups_span_high_items() {
        let records = sorted_records();
        let groups: Vec<_> = group_sorted(&records, &GroupingPolicy::LowItem).collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 4);
        assert!(groups[0].iter().all(|(k, _)| k.low_id() == 1));
        assert_eq!(groups[1][0].0.pair(), (2, 5));
    }

    #[test]
    fn test_policy_from_mode() {
        assert_eq!(
            GroupingPolicy::from(GroupingMode::LowItem),
            GroupingPolicy::LowItem
        );
        assert_eq!(GroupingPolicy::from(GroupingMode::default()), GroupingPolicy::ExactPair);
    }
}
