pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FixtureSource, OverpassClient, RetryPolicy};
pub use config::HeatmapConfig;
pub use core::{AggregationScheduler, AreaRequest, ExecutionMode, RequestHandle, RequestState};
pub use domain::{BoundingBox, DensityCell, GeoPoint, GridSpec, PointSource, RamenShop};
pub use utils::error::{HeatmapError, Result};
