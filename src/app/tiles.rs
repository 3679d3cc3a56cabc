use crate::core::scheduler::{AggregationScheduler, AreaRequest};
use crate::domain::model::{DensityCell, GeoPoint};
use crate::domain::ports::PointSource;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

/// Wire shape of one density cell: `{ "position": [lon, lat], "density": n }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    pub position: [f64; 2],
    pub density: u32,
}

impl From<&DensityCell> for HeatmapPoint {
    fn from(cell: &DensityCell) -> Self {
        Self {
            position: cell.center().position(),
            density: cell.count(),
        }
    }
}

fn to_points(cells: &[DensityCell]) -> Vec<HeatmapPoint> {
    cells.iter().map(HeatmapPoint::from).collect()
}

/// Density for one slippy-map tile.
///
/// Lossy: any failure is logged and answered with an empty list, so a flaky
/// upstream shows up as a blank tile rather than an error on the map.
pub async fn tile_density<S: PointSource + 'static>(
    scheduler: &AggregationScheduler<S>,
    z: u32,
    x: u32,
    y: u32,
) -> Vec<HeatmapPoint> {
    match scheduler.run(AreaRequest::Tile { z, x, y }).await {
        Ok(cells) => {
            tracing::info!("🗺️ Tile {}/{}/{} -> {} cells", z, x, y, cells.len());
            to_points(&cells)
        }
        Err(e) => {
            tracing::error!(
                "❌ Tile {}/{}/{} failed, serving empty tile: {} (Category: {:?})",
                z,
                x,
                y,
                e,
                e.category()
            );
            Vec::new()
        }
    }
}

/// Density around a viewport centre. Unlike tiles, errors reach the caller.
pub async fn viewport_density<S: PointSource + 'static>(
    scheduler: &AggregationScheduler<S>,
    center: GeoPoint,
    zoom: f64,
) -> Result<Vec<HeatmapPoint>> {
    let cells = scheduler.run(AreaRequest::Viewport { center, zoom }).await?;
    tracing::info!("🗺️ Viewport {} z{} -> {} cells", center, zoom, cells.len());
    Ok(to_points(&cells))
}
