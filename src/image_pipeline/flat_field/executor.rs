//! Channel-level fan-out for the correction stages.
//!
//! Each stage hands the executor one task per channel plane and gets the
//! results back in channel order once all of them have finished, so no two
//! stages ever overlap. Tasks never share mutable state; the sequential and
//! pooled executors therefore produce bit-identical results.

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::common::error::{CorrectionError, Result};

pub trait ChannelExecutor: Send + Sync {
    /// Runs `task(i)` for every `i` in `0..count` and returns the results in index order.
    fn map_channels<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync;
}

/// Runs every task on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialExecutor;

impl ChannelExecutor for SequentialExecutor {
    fn map_channels<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        (0..count).map(task).collect()
    }
}

/// Runs tasks on a bounded rayon pool owned by the executor.
pub struct PoolExecutor {
    pool: rayon::ThreadPool,
}

impl PoolExecutor {
    /// `threads` of `None` lets rayon pick one worker per core.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("flatfield-worker-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| CorrectionError::ThreadPool(e.to_string()))?;
        debug!("Worker pool started with {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ChannelExecutor for PoolExecutor {
    fn map_channels<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        self.pool
            .install(|| (0..count).into_par_iter().map(&task).collect())
    }
}

/// Executor chosen at runtime from the `use_multithreading` setting.
pub enum Executor {
    Sequential(SequentialExecutor),
    Pool(PoolExecutor),
}

impl Executor {
    pub fn from_settings(use_multithreading: bool, threads: Option<usize>) -> Result<Self> {
        if use_multithreading {
            Ok(Executor::Pool(PoolExecutor::new(threads)?))
        } else {
            Ok(Executor::Sequential(SequentialExecutor))
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Executor::Pool(_))
    }
}

impl ChannelExecutor for Executor {
    fn map_channels<T, F>(&self, count: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match self {
            Executor::Sequential(executor) => executor.map_channels(count, task),
            Executor::Pool(executor) => executor.map_channels(count, task),
        }
    }
}
