//! In-process shuffle: bucketed map output and the reduce-side fetch.

use std::hash::Hash;

use crate::shuffle::{Aggregator, Partitioner, combine_by_key};
use crate::traits::{PairsError, PairsResult};

/// Output of one map task, one bucket per reduce partition.
#[derive(Debug)]
pub struct MapOutput<K, V> {
    map_id: usize,
    buckets: Vec<Vec<(K, V)>>,
}

impl<K, V> MapOutput<K, V> {
    pub fn new(map_id: usize, num_partitions: u32) -> Self {
        Self {
            map_id,
            buckets: (0..num_partitions).map(|_| Vec::new()).collect(),
        }
    }

    pub fn map_id(&self) -> usize {
        self.map_id
    }

    pub fn num_partitions(&self) -> usize {
        self.buckets.len()
    }

    /// Route one record to its bucket.
    pub fn push<P>(&mut self, partitioner: &P, key: K, value: V) -> PairsResult<()>
    where
        P: Partitioner<K> + ?Sized,
    {
        let partition = partitioner.get_partition(&key) as usize;
        let bucket = self
            .buckets
            .get_mut(partition)
            .ok_or(PairsError::InvalidPartition(partition))?;
        bucket.push((key, value));
        Ok(())
    }

    /// Run the combine pass over every bucket.
    ///
    /// Records never move between buckets, since routing depends only on the key.
    pub fn combine<A>(&mut self, aggregator: &A)
    where
        K: Hash + Eq,
        A: Aggregator<K, V, V> + ?Sized,
    {
        for bucket in &mut self.buckets {
            let records = std::mem::take(bucket);
            *bucket = combine_by_key(records, aggregator);
        }
    }

    pub fn num_records(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn bucket(&self, partition: usize) -> Option<&[(K, V)]> {
        self.buckets.get(partition).map(Vec::as_slice)
    }

    fn into_buckets(self) -> Vec<Vec<(K, V)>> {
        self.buckets
    }
}

/// Gather bucket `r` of every map output into reduce input `r`.
///
/// Called once every map task has finished.
pub fn exchange<K, V>(
    outputs: Vec<MapOutput<K, V>>,
    num_partitions: u32,
) -> PairsResult<Vec<Vec<(K, V)>>> {
    let mut reduce_inputs: Vec<Vec<(K, V)>> =
        (0..num_partitions).map(|_| Vec::new()).collect();

    for output in outputs {
        if output.num_partitions() != reduce_inputs.len() {
            return Err(PairsError::ShuffleError(format!(
                "map output {} has {} buckets, expected {}",
                output.map_id(),
                output.num_partitions(),
                num_partitions
            )));
        }
        for (input, bucket) in reduce_inputs.iter_mut().zip(output.into_buckets()) {
            input.extend(bucket);
        }
    }

    Ok(reduce_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair_key::PairKey;
    use crate::shuffle::{RouteKeyPartitioner, SumAggregator};

    fn key(a: u64, b: u64) -> PairKey {
        PairKey::new(a, b, 0).unwrap()
    }

    #[test]
    fn test_push_routes_by_partitioner() {
        let partitioner = RouteKeyPartitioner::<PairKey>::new(3);
        let mut output = MapOutput::new(0, 3);
        for high in 2..10 {
            output.push(&partitioner, key(1, high), 1u64).unwrap();
        }
        let target = partitioner.get_partition(&key(1, 2)) as usize;
        assert_eq!(output.bucket(target).unwrap().len(), 8);
        assert_eq!(output.num_records(), 8);
    }

    #[test]
    fn test_combine_keeps_totals() {
        let partitioner = RouteKeyPartitioner::<PairKey>::new(2);
        let mut output = MapOutput::new(0, 2);
        for _ in 0..3 {
            output.push(&partitioner, key(1, 2), 1u64).unwrap();
            output.push(&partitioner, key(4, 5), 1u64).unwrap();
        }
        output.combine(&SumAggregator::<u64>::new());
        assert_eq!(output.num_records(), 2);
        let total: u64 = (0..2)
            .flat_map(|p| output.bucket(p).unwrap().iter().map(|(_, v)| *v))
            .sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_exchange_gathers_buckets() {
        let partitioner = RouteKeyPartitioner::<PairKey>::new(4);
        let outputs: Vec<_> = (0..3)
            .map(|map_id| {
                let mut output = MapOutput::new(map_id, 4);
                for low in 0..10 {
                    output.push(&partitioner, key(low, 100), 1u64).unwrap();
                }
                output
            })
            .collect();

        let inputs = exchange(outputs, 4).unwrap();
        assert_eq!(inputs.len(), 4);
        assert_eq!(inputs.iter().map(Vec::len).sum::<usize>(), 30);
        for (r, input) in inputs.iter().enumerate() {
            assert!(input
                .iter()
                .all(|(k, _)| partitioner.get_partition(k) as usize == r));
        }
    }

    #[test]
    fn test_exchange_rejects_mismatched_outputs() {
        let outputs = vec![MapOutput::<PairKey, u64>::new(0, 2)];
        assert!(matches!(
            exchange(outputs, 3),
            Err(PairsError::ShuffleError(_))
        ));
    }
}
