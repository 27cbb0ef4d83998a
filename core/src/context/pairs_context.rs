//! PairsContext - local execution of a full pairs job
//!
//! A job runs in two parallel stages separated by a barrier. Each map task
//! parses its split, feeds a [`CandidateGenerator`], routes the emitted
//! records into per-reducer buckets and optionally combines them. Once
//! every map task is done the buckets are exchanged, and each reduce task
//! sorts its input, cuts it into groups and sums per exact pair.

use copairs_common::JobConfig;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accumulator::{CounterSnapshot, JobCounters};
use crate::candidates::CandidateGenerator;
use crate::input::{RawLine, RecordParser, read_input_lines, split_by_user};
use crate::pair_key::{PairCount, PairKey};
use crate::scheduler::{ComputeFn, LocalScheduler, Task};
use crate::shuffle::{
    Aggregator, GroupingFunction, GroupingPolicy, MapOutput, Partitioner, RouteKeyPartitioner,
    SumAggregator, exchange, group_sorted, merge_group,
};
use crate::sink::{MemorySink, PairSink, TextFileSink};
use crate::traits::{BasicPartition, PairsError, PairsResult, Partition};
use crate::types::{Count, ItemId, Score};

type PairRecord = (PairKey, Count);

/// Result of one job run.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub job_id: String,
    /// Final counts sorted by `(low, high)`.
    pub pairs: Vec<PairCount>,
    pub counters: CounterSnapshot,
}

impl JobOutput {
    /// Count for the pair `{a, b}`, given in any order.
    pub fn count_for(&self, a: ItemId, b: ItemId) -> Option<Count> {
        let key = (a.min(b), a.max(b));
        self.pairs
            .binary_search_by(|p| (p.low, p.high).cmp(&key))
            .ok()
            .map(|i| self.pairs[i].count)
    }
}

/// Entry point for running pairs jobs on the local machine.
#[derive(Debug)]
pub struct PairsContext {
    config: JobConfig,
    scheduler: LocalScheduler,
    partitioner: Arc<dyn Partitioner<PairKey>>,
    aggregator: Arc<dyn Aggregator<PairKey, Count, Count>>,
    grouping: Arc<dyn GroupingFunction<PairKey>>,
}

impl PairsContext {
    /// Create a context from a validated configuration, routing on the low item.
    pub fn new(config: JobConfig) -> PairsResult<Self> {
        config.validate()?;
        let scheduler = LocalScheduler::new(config.num_threads.unwrap_or(0))?;
        let partitioner =
            RouteKeyPartitioner::<PairKey>::with_seed(config.num_reducers, config.hash_seed);
        let grouping = GroupingPolicy::from(config.grouping);

        Ok(Self {
            config,
            scheduler,
            partitioner: Arc::new(partitioner),
            aggregator: Arc::new(SumAggregator::<Count>::new()),
            grouping: Arc::new(grouping),
        })
    }

    /// Replace the routing function.
    ///
    /// Any deterministic partitioner keeps totals exact, because every
    /// record of one `(low, high)` pair reaches the same reducer and the
    /// reduce step sums per exact pair. A partitioner that does not route on
    /// the low item only splits `LowItem` groups into smaller ones.
    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner<PairKey>>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Replace the reduce-side grouping.
    ///
    /// The grouping must be consistent with the `PairKey` sort order. Groups
    /// are cut within one reduce partition, so a group the partitioner
    /// scatters becomes several groups. Totals are unaffected either way.
    pub fn with_grouping(mut self, grouping: Arc<dyn GroupingFunction<PairKey>>) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn num_threads(&self) -> usize {
        self.scheduler.num_threads()
    }

    fn num_reducers(&self) -> u32 {
        self.partitioner.num_partitions()
    }

    /// Run over in-memory lines, split by user into the configured number of map tasks.
    pub fn run_lines(&self, lines: Vec<String>) -> PairsResult<JobOutput> {
        let lines = lines.into_iter().map(String::into_bytes).collect();
        let mut sink = MemorySink::new();
        self.run_to_sink(self.split_input(lines), &mut sink)
    }

    /// Run with caller-chosen map splits, one map task per split.
    ///
    /// Each map task keeps its own per-user working set. A user whose lines
    /// are spread over several splits contributes separate partial sets.
    pub fn run_splits(&self, splits: Vec<Vec<String>>) -> PairsResult<JobOutput> {
        let splits = splits
            .into_iter()
            .map(|split| split.into_iter().map(String::into_bytes).collect())
            .collect();
        let mut sink = MemorySink::new();
        self.run_to_sink(splits, &mut sink)
    }

    /// Read `input`, run the job and write text output under `output`.
    ///
    /// `output` must not exist. It is created only once the reduce phase
    /// has succeeded.
    pub fn run_path<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> PairsResult<JobOutput> {
        let lines = read_input_lines(input.as_ref())?;
        info!(input = %input.as_ref().display(), lines = lines.len(), "Read ratings input");
        let mut sink = TextFileSink::new(output.as_ref())?;
        self.run_to_sink(self.split_input(lines), &mut sink)
    }

    fn split_input(&self, lines: Vec<RawLine>) -> Vec<Vec<RawLine>> {
        let parser = RecordParser::from_config(&self.config);
        split_by_user(lines, self.config.num_map_tasks, &parser)
    }

    /// Run the job over `splits` and hand every reduce partition to `sink`.
    pub fn run_to_sink(
        &self,
        splits: Vec<Vec<RawLine>>,
        sink: &mut dyn PairSink,
    ) -> PairsResult<JobOutput> {
        let job_id = format!("{}-{}", self.config.app_name, Uuid::new_v4());
        let counters = JobCounters::new();
        let num_reducers = self.num_reducers();
        let job_start = Instant::now();
        info!(
            job_id = %job_id,
            map_tasks = splits.len(),
            reducers = num_reducers,
            combine = self.config.combine,
            threshold = self.config.quality_threshold,
            "Starting pairs job"
        );

        // Map phase
        let map_start = Instant::now();
        let map_stage = Arc::new(MapStage {
            parser: RecordParser::from_config(&self.config),
            threshold: self.config.quality_threshold,
            combine: self.config.combine,
            num_reducers,
            partitioner: self.partitioner.clone(),
            aggregator: self.aggregator.clone(),
            counters: counters.clone(),
        });
        let splits = Arc::new(splits);
        let map_tasks: Vec<Task<MapOutput<PairKey, Count>>> = (0..splits.len())
            .map(|i| {
                let stage = map_stage.clone();
                let splits = splits.clone();
                let compute_fn: ComputeFn<MapOutput<PairKey, Count>> =
                    Arc::new(move |p: &dyn Partition| {
                        let lines = splits
                            .get(p.index())
                            .ok_or(PairsError::InvalidPartition(p.index()))?;
                        stage.run(p.index(), lines)
                    });
                Task::new(Box::new(BasicPartition::new(i)), compute_fn)
            })
            .collect();
        let map_outputs = self.scheduler.execute_tasks(map_tasks)?;
        info!(
            phase = "map",
            tasks = map_outputs.len(),
            ratings_read = counters.ratings_read.value(),
            malformed = counters.malformed_records.value(),
            pairs_emitted = counters.pairs_emitted.value(),
            wall_ms = map_start.elapsed().as_millis() as u64,
            "Map phase complete"
        );

        // Shuffle: every map output is in hand before any reduce task starts
        let reduce_inputs: Arc<Vec<Mutex<Vec<PairRecord>>>> = Arc::new(
            exchange(map_outputs, num_reducers)?
                .into_iter()
                .map(Mutex::new)
                .collect(),
        );

        // Reduce phase
        let reduce_start = Instant::now();
        let reduce_stage = Arc::new(ReduceStage {
            grouping: self.grouping.clone(),
            aggregator: self.aggregator.clone(),
            counters: counters.clone(),
        });
        let reduce_tasks: Vec<Task<Vec<PairCount>>> = (0..num_reducers as usize)
            .map(|r| {
                let stage = reduce_stage.clone();
                let inputs = reduce_inputs.clone();
                let compute_fn: ComputeFn<Vec<PairCount>> = Arc::new(move |p: &dyn Partition| {
                    let slot = inputs
                        .get(p.index())
                        .ok_or(PairsError::InvalidPartition(p.index()))?;
                    let records = std::mem::take(&mut *slot.lock().map_err(|_| {
                        PairsError::ShuffleError(format!("reduce input {} poisoned", p.index()))
                    })?);
                    stage.run(p.index(), records)
                });
                Task::new(Box::new(BasicPartition::new(r)), compute_fn)
            })
            .collect();
        let reduce_outputs = self.scheduler.execute_tasks(reduce_tasks)?;
        info!(
            phase = "reduce",
            tasks = reduce_outputs.len(),
            groups = counters.reduce_groups.value(),
            wall_ms = reduce_start.elapsed().as_millis() as u64,
            "Reduce phase complete"
        );

        let mut pairs = Vec::new();
        for (partition, output) in reduce_outputs.into_iter().enumerate() {
            sink.write_partition(partition, &output)?;
            counters.output_pairs.add(output.len() as u64);
            pairs.extend(output);
        }
        sink.commit()?;
        pairs.sort();

        let snapshot = counters.snapshot();
        info!(
            job_id = %job_id,
            output_pairs = snapshot.output_pairs,
            malformed_records = snapshot.malformed_records,
            wall_ms = job_start.elapsed().as_millis() as u64,
            "Pairs job complete"
        );
        debug!("Job counters:\n{}", snapshot);

        Ok(JobOutput {
            job_id,
            pairs,
            counters: snapshot,
        })
    }
}

/// Shared state of the map tasks of one job.
#[derive(Debug)]
struct MapStage {
    parser: RecordParser,
    threshold: Score,
    combine: bool,
    num_reducers: u32,
    partitioner: Arc<dyn Partitioner<PairKey>>,
    aggregator: Arc<dyn Aggregator<PairKey, Count, Count>>,
    counters: JobCounters,
}

impl MapStage {
    fn run(&self, map_id: usize, lines: &[RawLine]) -> PairsResult<MapOutput<PairKey, Count>> {
        let mut generator = CandidateGenerator::new(self.threshold);
        for line in lines {
            match self.parser.parse_bytes(line) {
                Ok(Some(rating)) => {
                    self.counters.ratings_read.add(1);
                    if generator.observe(rating) {
                        self.counters.ratings_qualified.add(1);
                    } else {
                        self.counters.ratings_below_threshold.add(1);
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(map_id, error = %e, "Skipping malformed record");
                    self.counters.malformed_records.add(1);
                }
                Err(e) => return Err(e),
            }
        }

        let mut output = MapOutput::new(map_id, self.num_reducers);
        let partitioner = self.partitioner.as_ref();
        let stats = generator.finalize(&mut |key, count| output.push(partitioner, key, count))?;
        self.counters.users_seen.add(stats.users);
        self.counters.pairs_emitted.add(stats.pairs_emitted);

        if self.combine {
            output.combine(self.aggregator.as_ref());
            self.counters
                .combine_output_records
                .add(output.num_records() as u64);
        }

        debug!(
            map_id,
            lines = lines.len(),
            users = stats.users,
            pairs_emitted = stats.pairs_emitted,
            records_out = output.num_records(),
            "Map task finished"
        );
        Ok(output)
    }
}

/// Shared state of the reduce tasks of one job.
#[derive(Debug)]
struct ReduceStage {
    grouping: Arc<dyn GroupingFunction<PairKey>>,
    aggregator: Arc<dyn Aggregator<PairKey, Count, Count>>,
    counters: JobCounters,
}

impl ReduceStage {
    fn run(&self, partition: usize, mut records: Vec<PairRecord>) -> PairsResult<Vec<PairCount>> {
        let records_in = records.len();
        records.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = Vec::new();
        let mut groups = 0u64;
        for group in group_sorted(&records, self.grouping.as_ref()) {
            groups += 1;
            for (key, total) in merge_group(group, self.aggregator.as_ref()) {
                output.push(PairCount::new(&key, total));
            }
        }
        self.counters.reduce_groups.add(groups);

        debug!(
            partition,
            records_in,
            groups,
            pairs_out = output.len(),
            "Reduce task finished"
        );
        Ok(output)
    }
}
