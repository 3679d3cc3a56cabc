pub mod scheduler;
pub mod worker;

pub use scheduler::{AggregationScheduler, AreaRequest, ExecutionMode, RequestHandle, RequestState};
pub use worker::{AggregationJob, AggregationWorker, BlockingPoolWorker, ThreadWorker, WorkerKind};
