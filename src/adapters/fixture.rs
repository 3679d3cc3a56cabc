use crate::domain::model::{BoundingBox, ShopRecord};
use crate::domain::ports::PointSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Five sample shops around Ikebukuro station, `(longitude, latitude)`.
const SAMPLE_SHOPS: [(f64, f64); 5] = [
    (139.7027, 35.7295),
    (139.7109, 35.732),
    (139.72, 35.728),
    (139.715, 35.725),
    (139.708, 35.7265),
];

/// Offline stand-in for the upstream service.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource;

impl FixtureSource {
    pub fn new() -> Self {
        Self
    }

    pub fn records(&self) -> Vec<ShopRecord> {
        SAMPLE_SHOPS
            .iter()
            .enumerate()
            .map(|(i, (lon, lat))| {
                let mut tags = HashMap::new();
                tags.insert("name".to_string(), format!("Sample Ramen {}", i + 1));
                ShopRecord {
                    id: i as u64 + 1,
                    lat: Some(*lat),
                    lon: Some(*lon),
                    tags,
                }
            })
            .collect()
    }
}

#[async_trait]
impl PointSource for FixtureSource {
    async fn fetch_points(&self, bounds: &BoundingBox) -> Result<Vec<ShopRecord>> {
        Ok(self
            .records()
            .into_iter()
            .filter(|r| r.location().map(|p| bounds.contains(&p)).unwrap_or(false))
            .collect())
    }
}
