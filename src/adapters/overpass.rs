use crate::adapters::retry::RetryPolicy;
use crate::domain::model::{BoundingBox, GeoPoint, ShopRecord};
use crate::domain::ports::{ConfigProvider, PointSource};
use crate::utils::error::{HeatmapError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Server-side query budget sent in the `[timeout:..]` header.
const SERVER_TIMEOUT_SECS: u64 = 25;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryArea {
    Bounds(BoundingBox),
    Around { center: GeoPoint, radius_m: f64 },
}

/// Overpass QL for ramen shops in an area.
#[derive(Debug, Clone, PartialEq)]
pub struct OverpassQuery {
    area: QueryArea,
    ramen_type: Option<String>,
}

impl OverpassQuery {
    pub fn bounds(bbox: &BoundingBox) -> Self {
        Self {
            area: QueryArea::Bounds(*bbox),
            ramen_type: None,
        }
    }

    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        Self {
            area: QueryArea::Around { center, radius_m },
            ramen_type: None,
        }
    }

    /// Restricts results to shops tagged `ramen:type=<ramen_type>`.
    pub fn with_ramen_type(mut self, ramen_type: Option<String>) -> Self {
        self.ramen_type = ramen_type;
        self
    }

    pub fn area(&self) -> &QueryArea {
        &self.area
    }

    pub fn build(&self) -> String {
        let type_filter = self
            .ramen_type
            .as_deref()
            .map(|t| format!("[\"ramen:type\"=\"{}\"]", t.replace('\\', "\\\\").replace('"', "\\\"")))
            .unwrap_or_default();

        match &self.area {
            QueryArea::Bounds(bbox) => {
                // Overpass 的 bbox 順序是 south, west, north, east
                let filter = format!(
                    "({},{},{},{})",
                    bbox.min_lat(),
                    bbox.min_lon(),
                    bbox.max_lat(),
                    bbox.max_lon()
                );
                format!(
                    "[out:json][timeout:{t}];\n(\n  node[\"amenity\"=\"restaurant\"][\"cuisine\"=\"ramen\"]{ty}{f};\n  node[\"shop\"=\"ramen\"]{ty}{f};\n);\nout body;\n",
                    t = SERVER_TIMEOUT_SECS,
                    ty = type_filter,
                    f = filter
                )
            }
            QueryArea::Around { center, radius_m } => {
                let filter = format!(
                    "(around:{},{},{})",
                    radius_m,
                    center.latitude(),
                    center.longitude()
                );
                format!(
                    "[out:json][timeout:{t}];\n(\n  node[\"amenity\"=\"restaurant\"][\"cuisine\"=\"ramen\"]{ty}{f};\n  node[\"shop\"=\"ramen\"]{ty}{f};\n  way[\"amenity\"=\"restaurant\"][\"cuisine\"=\"ramen\"]{ty}{f};\n  relation[\"amenity\"=\"restaurant\"][\"cuisine\"=\"ramen\"]{ty}{f};\n);\nout body;\n>;\nout skel qt;\n",
                    t = SERVER_TIMEOUT_SECS,
                    ty = type_filter,
                    f = filter
                )
            }
        }
    }
}

/// Elements are kept as raw JSON so one odd element cannot fail the whole body.
#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

impl OverpassResponse {
    fn into_records(self) -> Vec<ShopRecord> {
        self.elements
            .into_iter()
            .filter_map(|element| match serde_json::from_value::<ShopRecord>(element) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!("Skipping undecodable element: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Upstream client with a per-attempt timeout and fixed-delay retries.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: Client,
    endpoint: String,
    policy: RetryPolicy,
    ramen_type: Option<String>,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            policy: RetryPolicy::default(),
            ramen_type: None,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(config.upstream_endpoint())
            .with_policy(RetryPolicy {
                max_retries: config.max_retries(),
                retry_delay: config.retry_delay(),
                timeout: config.fetch_timeout(),
            })
            .with_ramen_type(config.ramen_type().map(str::to_string))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ramen_type(mut self, ramen_type: Option<String>) -> Self {
        self.ramen_type = ramen_type;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Shops inside `bbox`.
    pub async fn fetch(&self, bbox: &BoundingBox) -> Result<Vec<ShopRecord>> {
        let query = OverpassQuery::bounds(bbox).with_ramen_type(self.ramen_type.clone());
        self.execute(&query).await
    }

    /// Shops within `radius_m` metres of `center`. Way members that Overpass
    /// returns from outside the circle are dropped.
    pub async fn fetch_around(&self, center: GeoPoint, radius_m: f64) -> Result<Vec<ShopRecord>> {
        let query = OverpassQuery::around(center, radius_m).with_ramen_type(self.ramen_type.clone());
        let records = self.execute(&query).await?;

        let radius_km = radius_m / 1000.0;
        Ok(records
            .into_iter()
            .filter(|record| {
                record
                    .location()
                    .map(|p| p.distance_to_km(&center) <= radius_km)
                    .unwrap_or(false)
            })
            .collect())
    }

    pub async fn execute(&self, query: &OverpassQuery) -> Result<Vec<ShopRecord>> {
        let body = query.build();
        let body = body.as_str();
        tracing::debug!("Overpass query:\n{}", body);

        let elements = self.policy.run(|_| self.attempt(body)).await?;
        let total = elements.len();

        let records: Vec<ShopRecord> = elements
            .into_iter()
            .filter(|record| record.location().is_some())
            .collect();

        tracing::info!(
            "✅ Received {} elements, {} with coordinates",
            total,
            records.len()
        );
        Ok(records)
    }

    async fn attempt(&self, body: &str) -> Result<Vec<ShopRecord>> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.policy.timeout)
            .form(&[("data", body)])
            .send()
            .await?;

        tracing::debug!("Overpass response status: {}", response.status());

        if !response.status().is_success() {
            return Err(HeatmapError::UpstreamError {
                status: response.status().as_u16(),
            });
        }

        let parsed: OverpassResponse = response.json().await?;
        Ok(parsed.into_records())
    }
}

#[async_trait]
impl PointSource for OverpassClient {
    async fn fetch_points(&self, bounds: &BoundingBox) -> Result<Vec<ShopRecord>> {
        self.fetch(bounds).await
    }
}
