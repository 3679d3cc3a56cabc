use crate::domain::density;
use crate::domain::model::{BoundingBox, DensityCell, GridSpec, RamenShop};
use crate::utils::error::{HeatmapError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Everything one aggregation needs, cheap to clone so the caller keeps a copy
/// for the inline fallback.
#[derive(Debug, Clone)]
pub struct AggregationJob {
    shops: Arc<Vec<RamenShop>>,
    bounds: BoundingBox,
    grid: GridSpec,
}

impl AggregationJob {
    pub fn new(shops: Vec<RamenShop>, bounds: BoundingBox, grid: GridSpec) -> Self {
        Self {
            shops: Arc::new(shops),
            bounds,
            grid,
        }
    }

    pub fn shop_count(&self) -> usize {
        self.shops.len()
    }

    pub fn run_inline(&self) -> Vec<DensityCell> {
        density::aggregate(&self.shops, &self.bounds, self.grid)
    }
}

/// Runs aggregation on another execution context and hands the result back.
#[async_trait]
pub trait AggregationWorker: Send + Sync {
    fn name(&self) -> &'static str;

    /// A panic or lost channel on the worker side becomes `WorkerFaultError`.
    async fn run(&self, job: AggregationJob) -> Result<Vec<DensityCell>>;
}

/// Uses tokio's blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingPoolWorker;

#[async_trait]
impl AggregationWorker for BlockingPoolWorker {
    fn name(&self) -> &'static str {
        "blocking-pool"
    }

    async fn run(&self, job: AggregationJob) -> Result<Vec<DensityCell>> {
        tokio::task::spawn_blocking(move || job.run_inline())
            .await
            .map_err(|e| HeatmapError::WorkerFaultError {
                message: e.to_string(),
            })
    }
}

/// Spawns a dedicated OS thread per job; the result comes back over a oneshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadWorker;

#[async_trait]
impl AggregationWorker for ThreadWorker {
    fn name(&self) -> &'static str {
        "thread"
    }

    async fn run(&self, job: AggregationJob) -> Result<Vec<DensityCell>> {
        let (tx, rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("density-worker".to_string())
            .spawn(move || {
                let _ = tx.send(job.run_inline());
            })
            .map_err(|e| HeatmapError::WorkerFaultError {
                message: format!("could not spawn worker thread: {}", e),
            })?;

        rx.await.map_err(|_| HeatmapError::WorkerFaultError {
            message: "worker thread exited without a result".to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    #[default]
    Blocking,
    Thread,
}

impl WorkerKind {
    pub fn build(self) -> Arc<dyn AggregationWorker> {
        match self {
            WorkerKind::Blocking => Arc::new(BlockingPoolWorker),
            WorkerKind::Thread => Arc::new(ThreadWorker),
        }
    }
}
