use crate::utils::error::{HeatmapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Builds a point only if it lies on the globe.
    pub fn validated(longitude: f64, latitude: f64) -> Result<Self> {
        let point = Self::new(longitude, latitude);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(HeatmapError::InvalidConfigValueError {
                field: "coordinate".to_string(),
                value: point.to_string(),
                reason: "longitude must be in [-180, 180] and latitude in [-90, 90]".to_string(),
            })
        }
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude) && (-90.0..=90.0).contains(&self.latitude)
    }

    /// `[longitude, latitude]`, the order map layers expect.
    pub fn position(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Great-circle distance using the haversine formula.
    pub fn distance_to_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.longitude, self.latitude)
    }
}

/// Axis-aligned search area in degrees. `min_* < max_*` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let corners = [min_lon, min_lat, max_lon, max_lat];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(HeatmapError::InvalidBoundingBox {
                reason: format!("non-finite corner in {:?}", corners),
            });
        }
        if min_lon >= max_lon || min_lat >= max_lat {
            return Err(HeatmapError::InvalidBoundingBox {
                reason: format!(
                    "empty extent: lon {}..{}, lat {}..{}",
                    min_lon, max_lon, min_lat, max_lat
                ),
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Half-open on both axes: the west and south edges are inside, the east and north are not.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.longitude() >= self.min_lon
            && point.longitude() < self.max_lon
            && point.latitude() >= self.min_lat
            && point.latitude() < self.max_lat
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// One element of the upstream response, as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRecord {
    pub id: u64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ShopRecord {
    /// The record's coordinates, if both are present and on the globe.
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => GeoPoint::validated(lon, lat).ok(),
            _ => None,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// A parsed shop. Only `parser::parse` creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct RamenShop {
    id: String,
    name: String,
    location: GeoPoint,
    shop_type: Option<String>,
    is_open: Option<bool>,
}

impl RamenShop {
    pub(crate) fn new(
        id: String,
        name: String,
        location: GeoPoint,
        shop_type: Option<String>,
        is_open: Option<bool>,
    ) -> Self {
        Self {
            id,
            name,
            location,
            shop_type,
            is_open,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    pub fn shop_type(&self) -> Option<&str> {
        self.shop_type.as_deref()
    }

    pub fn is_open(&self) -> Option<bool> {
        self.is_open
    }
}

/// One non-empty bucket of the density grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityCell {
    col: u32,
    row: u32,
    center: GeoPoint,
    count: u32,
}

impl DensityCell {
    pub(crate) fn new(col: u32, row: u32, center: GeoPoint, count: u32) -> Self {
        debug_assert!(count >= 1, "empty cells are never emitted");
        Self {
            col,
            row,
            center,
            count,
        }
    }

    /// Column index, counted eastward from the box's west edge.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Row index, counted northward from the box's south edge.
    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSpec {
    cols: u32,
    rows: u32,
}

impl GridSpec {
    pub const DEFAULT_SIZE: u32 = 10;

    pub fn new(cols: u32, rows: u32) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(HeatmapError::InvalidGrid { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cols: Self::DEFAULT_SIZE,
            rows: Self::DEFAULT_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_rejects_empty_extent() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
        assert!(BoundingBox::new(1.0, 0.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 2.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_bounding_box_contains_is_half_open() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();

        assert!(bbox.contains(&GeoPoint::new(0.0, 0.0)));
        assert!(bbox.contains(&GeoPoint::new(0.5, 0.999)));
        assert!(!bbox.contains(&GeoPoint::new(1.0, 0.5)));
        assert!(!bbox.contains(&GeoPoint::new(0.5, 1.0)));
    }

    #[test]
    fn test_grid_spec_requires_positive_dimensions() {
        assert_eq!(GridSpec::default(), GridSpec::new(10, 10).unwrap());
        assert!(matches!(
            GridSpec::new(0, 10),
            Err(HeatmapError::InvalidGrid { cols: 0, rows: 10 })
        ));
        assert!(GridSpec::new(3, 0).is_err());
    }

    #[test]
    fn test_record_location_requires_both_coordinates() {
        let mut record = ShopRecord {
            id: 7,
            lat: Some(35.7295),
            lon: None,
            tags: HashMap::new(),
        };
        assert!(record.location().is_none());

        record.lon = Some(139.7109);
        assert_eq!(record.location(), Some(GeoPoint::new(139.7109, 35.7295)));

        record.lat = Some(123.0);
        assert!(record.location().is_none());
    }

    #[test]
    fn test_record_deserializes_without_coordinates() {
        let record: ShopRecord =
            serde_json::from_str(r#"{"type": "way", "id": 42, "nodes": [1, 2]}"#).unwrap();

        assert_eq!(record.id, 42);
        assert!(record.lat.is_none());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_distance_between_ikebukuro_and_shinjuku() {
        let ikebukuro = GeoPoint::new(139.7109, 35.7295);
        let shinjuku = GeoPoint::new(139.7005, 35.6896);

        let distance = ikebukuro.distance_to_km(&shinjuku);
        assert!((distance - 4.53).abs() < 0.1, "got {}", distance);
        assert_eq!(ikebukuro.distance_to_km(&ikebukuro), 0.0);
    }
}
