// Boundary layer: turns density cells and parsed shops into the JSON shapes the map client reads.

pub mod shops;
pub mod tiles;

use crate::config::HeatmapConfig;
use crate::core::scheduler::{AggregationScheduler, ExecutionMode};
use crate::domain::ports::{ConfigProvider, PointSource};

pub use shops::{ShopListResponse, ShopPoint};
pub use tiles::HeatmapPoint;

/// Wires a point source into a scheduler using the grid and worker settings from `config`.
pub fn build_scheduler<S: PointSource + 'static>(
    source: S,
    config: &HeatmapConfig,
) -> AggregationScheduler<S> {
    let mode = if config.offload_aggregation() {
        ExecutionMode::Offload(config.worker_kind().build())
    } else {
        ExecutionMode::Inline
    };

    tracing::debug!("🧮 Grid {:?} / aggregation {:?}", config.grid(), mode);

    AggregationScheduler::new(source)
        .with_grid(config.grid())
        .with_mode(mode)
}
