//! Conversions from map coordinates to search areas.

use crate::domain::model::{BoundingBox, GeoPoint};
use crate::utils::error::Result;
use std::f64::consts::PI;

const METERS_PER_DEGREE: f64 = 111_000.0;

/// Zoom level at which the view radius is exactly one kilometre.
const REFERENCE_ZOOM: f64 = 16.0;
const REFERENCE_RADIUS_METERS: f64 = 1000.0;

/// Converts a slippy-map tile (Web Mercator, row grows southward) into its bounds.
///
/// Tile indices are not range checked; `x, y >= 2^z` give boxes outside the
/// projection. Fails only when the arithmetic collapses (e.g. `z` large enough
/// that neighbouring tiles are indistinguishable in `f64`).
pub fn tile_to_bounding_box(z: u32, x: u32, y: u32) -> Result<BoundingBox> {
    let n = 2.0_f64.powi(z.min(i32::MAX as u32) as i32);

    let lon1 = x as f64 / n * 360.0 - 180.0;
    let lon2 = (x as f64 + 1.0) / n * 360.0 - 180.0;

    let north = tile_row_latitude(y as f64, n);
    let south = tile_row_latitude(y as f64 + 1.0, n);

    BoundingBox::new(lon1, south, lon2, north)
}

/// Inverse Web Mercator for the top edge of tile row `row`.
fn tile_row_latitude(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan() * 180.0 / PI
}

/// Approximates the area visible around a map center.
///
/// The radius halves with every zoom level (1 km at zoom 16). This is not a
/// screen-to-ground projection.
pub fn viewport_to_bounding_box(center: GeoPoint, zoom: f64) -> Result<BoundingBox> {
    let meters_per_lon_degree = METERS_PER_DEGREE * (center.latitude() * PI / 180.0).cos();
    let meters_per_lat_degree = METERS_PER_DEGREE;

    let radius = view_radius_meters(zoom);
    let d_lon = radius / meters_per_lon_degree;
    let d_lat = radius / meters_per_lat_degree;

    BoundingBox::new(
        center.longitude() - d_lon,
        center.latitude() - d_lat,
        center.longitude() + d_lon,
        center.latitude() + d_lat,
    )
}

pub fn view_radius_meters(zoom: f64) -> f64 {
    REFERENCE_RADIUS_METERS * 2.0_f64.powf(REFERENCE_ZOOM - zoom)
}
