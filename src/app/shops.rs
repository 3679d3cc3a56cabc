use crate::adapters::{FixtureSource, OverpassClient};
use crate::domain::model::{GeoPoint, RamenShop};
use crate::domain::parser;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopPoint {
    pub position: [f64; 2],
    pub name: String,
}

impl From<&RamenShop> for ShopPoint {
    fn from(shop: &RamenShop) -> Self {
        Self {
            position: shop.location().position(),
            name: shop.name().to_string(),
        }
    }
}

/// `source` is set for fixture data, `area` for live data; never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopListResponse {
    pub data: Vec<ShopPoint>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub cached: bool,
}

impl ShopListResponse {
    fn new(shops: &[RamenShop], source: Option<String>, area: Option<String>) -> Self {
        let data: Vec<ShopPoint> = shops.iter().map(ShopPoint::from).collect();
        Self {
            count: data.len(),
            data,
            timestamp: Utc::now(),
            source,
            area,
            cached: false,
        }
    }
}

/// 不連網的範例資料
pub fn mock_shop_list(fixture: &FixtureSource) -> ShopListResponse {
    let shops = parser::parse_all(&fixture.records());
    tracing::info!("🍜 Serving {} sample shops", shops.len());
    ShopListResponse::new(&shops, Some("mock".to_string()), None)
}

/// Shops within `radius_m` metres of `center`, fetched live.
pub async fn live_shop_list(
    client: &OverpassClient,
    area_name: &str,
    center: GeoPoint,
    radius_m: f64,
) -> Result<ShopListResponse> {
    let records = client.fetch_around(center, radius_m).await?;
    let shops = parser::parse_all(&records);
    tracing::info!(
        "🍜 {} shops within {} m of {} ({})",
        shops.len(),
        radius_m,
        center,
        area_name
    );
    Ok(ShopListResponse::new(&shops, None, Some(area_name.to_string())))
}
