use crate::domain::model::{BoundingBox, GridSpec, ShopRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// The one capability the pipeline needs from the outside world.
#[async_trait]
pub trait PointSource: Send + Sync {
    /// Raw records inside `bounds`. Records without coordinates are already dropped.
    async fn fetch_points(&self, bounds: &BoundingBox) -> Result<Vec<ShopRecord>>;
}

/// Resolved runtime settings, read-only after startup.
pub trait ConfigProvider: Send + Sync {
    fn upstream_endpoint(&self) -> &str;
    fn fetch_timeout(&self) -> Duration;
    fn max_retries(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn ramen_type(&self) -> Option<&str>;
    fn grid(&self) -> GridSpec;
    fn offload_aggregation(&self) -> bool;
}
