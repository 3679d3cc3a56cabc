use crate::core::worker::{AggregationJob, AggregationWorker};
use crate::domain::geo;
use crate::domain::model::{BoundingBox, DensityCell, GeoPoint, GridSpec};
use crate::domain::parser;
use crate::domain::ports::PointSource;
use crate::utils::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Lifecycle of one aggregation request. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Fetching,
    Parsing,
    Aggregating,
    Done,
    Failed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Done | RequestState::Failed | RequestState::Cancelled
        )
    }

    fn rank(&self) -> u8 {
        match self {
            RequestState::Idle => 0,
            RequestState::Fetching => 1,
            RequestState::Parsing => 2,
            RequestState::Aggregating => 3,
            RequestState::Done | RequestState::Failed | RequestState::Cancelled => 4,
        }
    }

    /// Failure and cancellation are reachable from any live state.
    pub fn can_advance_to(&self, next: RequestState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

/// Where the aggregation area comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaRequest {
    Tile { z: u32, x: u32, y: u32 },
    Viewport { center: GeoPoint, zoom: f64 },
    Bounds(BoundingBox),
}

impl AreaRequest {
    pub fn resolve(&self) -> Result<BoundingBox> {
        match *self {
            AreaRequest::Tile { z, x, y } => geo::tile_to_bounding_box(z, x, y),
            AreaRequest::Viewport { center, zoom } => geo::viewport_to_bounding_box(center, zoom),
            AreaRequest::Bounds(bbox) => Ok(bbox),
        }
    }
}

#[derive(Clone, Default)]
pub enum ExecutionMode {
    #[default]
    Inline,
    Offload(Arc<dyn AggregationWorker>),
}

impl std::fmt::Debug for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Inline => write!(f, "Inline"),
            ExecutionMode::Offload(worker) => write!(f, "Offload({})", worker.name()),
        }
    }
}

fn advance(state: &watch::Sender<RequestState>, next: RequestState) -> bool {
    state.send_if_modified(|current| {
        if current.can_advance_to(next) {
            tracing::debug!("Request state {:?} -> {:?}", current, next);
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Runs bounding box -> fetch -> parse -> aggregate for each request.
pub struct AggregationScheduler<S: PointSource> {
    source: Arc<S>,
    grid: GridSpec,
    mode: ExecutionMode,
    next_id: AtomicU64,
}

impl<S: PointSource + 'static> AggregationScheduler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            grid: GridSpec::default(),
            mode: ExecutionMode::Inline,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Runs one request to completion on the current task.
    pub async fn run(&self, area: AreaRequest) -> Result<Vec<DensityCell>> {
        let (state, _) = watch::channel(RequestState::Idle);
        Self::execute(
            self.source.clone(),
            self.grid,
            self.mode.clone(),
            area,
            &state,
        )
        .await
    }

    /// Starts a request in the background. The caller may observe its state,
    /// cancel it, or wait for the cells.
    pub fn submit(&self, area: AreaRequest) -> RequestHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(watch::channel(RequestState::Idle).0);
        let state_rx = state.subscribe();
        let (result_tx, result_rx) = oneshot::channel();

        let source = self.source.clone();
        let grid = self.grid;
        let mode = self.mode.clone();
        let task_state = state.clone();

        let task = tokio::spawn(async move {
            let outcome = Self::execute(source, grid, mode, area, &task_state).await;
            // 已取消的請求不再回傳結果
            let terminal = if outcome.is_ok() {
                RequestState::Done
            } else {
                RequestState::Failed
            };
            if advance(&task_state, terminal) {
                let _ = result_tx.send(outcome);
            }
        });

        tracing::debug!("Submitted aggregation request #{} for {:?}", id, area);
        RequestHandle {
            id,
            state,
            state_rx,
            result: result_rx,
            task,
        }
    }

    /// Drives the request up to `Aggregating`; the terminal state is left to
    /// the caller so that delivery and cancellation are decided in one place.
    async fn execute(
        source: Arc<S>,
        grid: GridSpec,
        mode: ExecutionMode,
        area: AreaRequest,
        state: &watch::Sender<RequestState>,
    ) -> Result<Vec<DensityCell>> {
        let outcome = Self::pipeline(source, grid, mode, area, state).await;
        match &outcome {
            Ok(cells) => tracing::info!("📊 Aggregated into {} non-empty cells", cells.len()),
            Err(e) => tracing::error!("❌ Aggregation request failed: {}", e),
        }
        outcome
    }

    async fn pipeline(
        source: Arc<S>,
        grid: GridSpec,
        mode: ExecutionMode,
        area: AreaRequest,
        state: &watch::Sender<RequestState>,
    ) -> Result<Vec<DensityCell>> {
        let bounds = area.resolve()?;
        tracing::debug!("Resolved {:?} to {}", area, bounds);

        advance(state, RequestState::Fetching);
        let records = source.fetch_points(&bounds).await?;

        advance(state, RequestState::Parsing);
        let shops = parser::parse_all(&records);
        tracing::debug!("Parsed {} shops", shops.len());

        advance(state, RequestState::Aggregating);
        let job = AggregationJob::new(shops, bounds, grid);
        Ok(Self::aggregate(&mode, job).await)
    }

    async fn aggregate(mode: &ExecutionMode, job: AggregationJob) -> Vec<DensityCell> {
        match mode {
            ExecutionMode::Inline => job.run_inline(),
            ExecutionMode::Offload(worker) => match worker.run(job.clone()).await {
                Ok(cells) => cells,
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Worker '{}' failed ({}), aggregating {} shops inline",
                        worker.name(),
                        e,
                        job.shop_count()
                    );
                    job.run_inline()
                }
            },
        }
    }
}

/// Handle to a request started with [`AggregationScheduler::submit`].
pub struct RequestHandle {
    id: u64,
    state: Arc<watch::Sender<RequestState>>,
    state_rx: watch::Receiver<RequestState>,
    result: oneshot::Receiver<Result<Vec<DensityCell>>>,
    task: JoinHandle<()>,
}

impl RequestHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> RequestState {
        *self.state_rx.borrow()
    }

    /// A receiver that sees every state change.
    pub fn watch_state(&self) -> watch::Receiver<RequestState> {
        self.state_rx.clone()
    }

    /// Stops the request if it has not finished yet. Returns `false` when the
    /// result was already decided; that result is still delivered.
    pub fn cancel(&self) -> bool {
        if advance(&self.state, RequestState::Cancelled) {
            self.task.abort();
            tracing::debug!("Cancelled aggregation request #{}", self.id);
            true
        } else {
            false
        }
    }

    /// The request's outcome, or `None` if it was cancelled. Returns only after
    /// the request's task, including any in-flight fetch, has been dropped.
    pub async fn wait(self) -> Option<Result<Vec<DensityCell>>> {
        let outcome = self.result.await.ok();
        let _ = self.task.await;

        if *self.state_rx.borrow() == RequestState::Cancelled {
            return None;
        }
        outcome
    }
}
