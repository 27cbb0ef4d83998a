//! Local Task Scheduler
//!
//! This module provides a local task scheduler that uses a Rayon thread pool
//! to execute the map and reduce tasks of a job in parallel on a single machine.

use crate::traits::{PairsError, PairsResult, Partition};
use rayon::prelude::*;
use std::fmt::Debug;
use std::sync::Arc;

/// Task represents a unit of work to be executed
pub struct Task<T> {
    pub partition: Box<dyn Partition>,
    pub compute_fn: ComputeFn<T>,
}

/// Type alias for complex compute function type
pub type ComputeFn<T> = Arc<dyn Fn(&dyn Partition) -> PairsResult<T> + Send + Sync>;

impl<T> Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("partition", &self.partition)
            .field("compute_fn", &"<function>")
            .finish()
    }
}

impl<T> Task<T> {
    pub fn new(partition: Box<dyn Partition>, compute_fn: ComputeFn<T>) -> Self {
        Self {
            partition,
            compute_fn,
        }
    }

    pub fn execute(&self) -> PairsResult<T> {
        (self.compute_fn)(self.partition.as_ref())
    }
}

/// LocalScheduler manages parallel execution of tasks using Rayon
#[derive(Debug)]
pub struct LocalScheduler {
    pool: rayon::ThreadPool,
}

impl LocalScheduler {
    /// Create a new LocalScheduler with the specified number of threads
    pub fn new(num_threads: usize) -> PairsResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("copairs-worker-{}", i))
            .build()
            .map_err(|e| PairsError::ComputationError(format!("thread pool: {}", e)))?;
        Ok(Self { pool })
    }

    /// Create a new LocalScheduler with rayon's default number of threads (CPU cores)
    pub fn with_default_threads() -> PairsResult<Self> {
        Self::new(0)
    }

    /// Get the number of threads
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Execute a collection of tasks in parallel, returning results in task order.
    ///
    /// The first failing task fails the whole batch.
    pub fn execute_tasks<T>(&self, tasks: Vec<Task<T>>) -> PairsResult<Vec<T>>
    where
        T: Send,
    {
        self.pool
            .install(|| tasks.into_par_iter().map(|task| task.execute()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BasicPartition;

    fn create_test_tasks(num_tasks: usize) -> Vec<Task<Vec<i32>>> {
        (0..num_tasks)
            .map(|i| {
                let compute_fn: ComputeFn<Vec<i32>> = Arc::new(move |p: &dyn Partition| {
                    Ok(vec![(p.index() * 10) as i32, (p.index() * 10 + 1) as i32])
                });
                Task::new(Box::new(BasicPartition::new(i)), compute_fn)
            })
            .collect()
    }

    #[test]
    fn test_local_scheduler_new() {
        let scheduler = LocalScheduler::new(4).unwrap();
        assert_eq!(scheduler.num_threads(), 4);
    }

    #[test]
    fn test_local_scheduler_with_default_threads() {
        let scheduler = LocalScheduler::with_default_threads().unwrap();
        assert!(scheduler.num_threads() > 0);
    }

    #[test]
    fn test_execute_tasks() {
        let scheduler = LocalScheduler::new(2).unwrap();
        let results = scheduler.execute_tasks(create_test_tasks(3)).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], vec![0, 1]);
        assert_eq!(results[1], vec![10, 11]);
        assert_eq!(results[2], vec![20, 21]);
    }

    #[test]
    fn test_failing_task_fails_batch() {
        let scheduler = LocalScheduler::new(2).unwrap();
        let mut tasks = create_test_tasks(2);
        let failing: ComputeFn<Vec<i32>> = Arc::new(|p: &dyn Partition| {
            Err(PairsError::ComputationError(format!("{} failed", p.id())))
        });
        tasks.push(Task::new(Box::new(BasicPartition::new(2)), failing));

        let err = scheduler.execute_tasks(tasks).unwrap_err();
        assert!(err.to_string().contains("partition_2 failed"));
    }
}
