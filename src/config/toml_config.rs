use crate::adapters::overpass::DEFAULT_ENDPOINT;
use crate::adapters::retry::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use crate::core::worker::WorkerKind;
use crate::domain::model::{GeoPoint, GridSpec};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{HeatmapError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 池袋駅
const DEFAULT_AREA_NAME: &str = "Ikebukuro";
const DEFAULT_AREA_LAT: f64 = 35.7295;
const DEFAULT_AREA_LON: f64 = 139.7109;
/// Kept small so the radius query stays under the server's time budget.
const DEFAULT_AREA_RADIUS_M: f64 = 1500.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatmapConfig {
    pub upstream: Option<UpstreamConfig>,
    pub grid: Option<GridConfig>,
    pub aggregation: Option<AggregationConfig>,
    pub area: Option<AreaConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub ramen_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    pub cols: Option<u32>,
    pub rows: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub offload: Option<bool>,
    pub worker: Option<WorkerKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_m: Option<f64>,
}

impl HeatmapConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HeatmapError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HeatmapError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OVERPASS_URL})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HeatmapError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("upstream.endpoint", self.upstream_endpoint())?;

        let upstream = self.upstream.clone().unwrap_or_default();
        if let Some(timeout) = upstream.timeout_seconds {
            validate_positive_number("upstream.timeout_seconds", timeout, 1)?;
        }
        if let Some(retries) = upstream.max_retries {
            validate_positive_number("upstream.max_retries", retries, 1)?;
        }
        if let Some(ramen_type) = &upstream.ramen_type {
            validate_non_empty_string("upstream.ramen_type", ramen_type)?;
        }

        let grid = self.grid.clone().unwrap_or_default();
        validate_positive_number("grid.cols", grid.cols.unwrap_or(GridSpec::DEFAULT_SIZE), 1)?;
        validate_positive_number("grid.rows", grid.rows.unwrap_or(GridSpec::DEFAULT_SIZE), 1)?;

        let center = self.area_center();
        validate_range("area.lat", center.latitude(), -90.0, 90.0)?;
        validate_range("area.lon", center.longitude(), -180.0, 180.0)?;
        validate_range("area.radius_m", self.area_radius_m(), 1.0, 50_000.0)?;

        Ok(())
    }

    pub fn worker_kind(&self) -> WorkerKind {
        self.aggregation
            .as_ref()
            .and_then(|a| a.worker)
            .unwrap_or_default()
    }

    pub fn area_name(&self) -> &str {
        self.area
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(DEFAULT_AREA_NAME)
    }

    pub fn area_center(&self) -> GeoPoint {
        let area = self.area.as_ref();
        GeoPoint::new(
            area.and_then(|a| a.lon).unwrap_or(DEFAULT_AREA_LON),
            area.and_then(|a| a.lat).unwrap_or(DEFAULT_AREA_LAT),
        )
    }

    pub fn area_radius_m(&self) -> f64 {
        self.area
            .as_ref()
            .and_then(|a| a.radius_m)
            .unwrap_or(DEFAULT_AREA_RADIUS_M)
    }
}

impl ConfigProvider for HeatmapConfig {
    fn upstream_endpoint(&self) -> &str {
        self.upstream
            .as_ref()
            .and_then(|u| u.endpoint.as_deref())
            .unwrap_or(DEFAULT_ENDPOINT)
    }

    fn fetch_timeout(&self) -> Duration {
        self.upstream
            .as_ref()
            .and_then(|u| u.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }

    fn max_retries(&self) -> u32 {
        self.upstream
            .as_ref()
            .and_then(|u| u.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES)
    }

    fn retry_delay(&self) -> Duration {
        self.upstream
            .as_ref()
            .and_then(|u| u.retry_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_DELAY)
    }

    fn ramen_type(&self) -> Option<&str> {
        self.upstream.as_ref().and_then(|u| u.ramen_type.as_deref())
    }

    fn grid(&self) -> GridSpec {
        let grid = self.grid.as_ref();
        GridSpec::new(
            grid.and_then(|g| g.cols).unwrap_or(GridSpec::DEFAULT_SIZE),
            grid.and_then(|g| g.rows).unwrap_or(GridSpec::DEFAULT_SIZE),
        )
        .unwrap_or_default()
    }

    fn offload_aggregation(&self) -> bool {
        self.aggregation
            .as_ref()
            .and_then(|a| a.offload)
            .unwrap_or(true)
    }
}

impl Validate for HeatmapConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
