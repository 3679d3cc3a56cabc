#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use toml_config::HeatmapConfig;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::cli::{Command, LogFormat};
    use super::toml_config::{AggregationConfig, GridConfig, HeatmapConfig, UpstreamConfig};
    use crate::utils::error::Result;
    use crate::utils::validation::Validate;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "ramen-density")]
    #[command(about = "Ramen shop density grids from OpenStreetMap data")]
    pub struct CliConfig {
        #[arg(long, short, global = true, help = "TOML configuration file")]
        pub config: Option<PathBuf>,

        #[arg(long, global = true, help = "Overpass interpreter URL")]
        pub endpoint: Option<String>,

        #[arg(long, global = true, help = "Only count shops tagged with this ramen:type")]
        pub ramen_type: Option<String>,

        #[arg(long, global = true)]
        pub grid_cols: Option<u32>,

        #[arg(long, global = true)]
        pub grid_rows: Option<u32>,

        #[arg(long, global = true, help = "Aggregate on the request task instead of a worker")]
        pub inline: bool,

        #[arg(long, global = true, help = "Serve the built-in sample shops instead of Overpass")]
        pub mock: bool,

        #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
        pub log_format: LogFormat,

        #[arg(long, short, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    impl CliConfig {
        /// 載入設定檔 (若有)，套用命令列參數後驗證
        pub fn resolve(&self) -> Result<HeatmapConfig> {
            let base = match &self.config {
                Some(path) => HeatmapConfig::from_file(path)?,
                None => HeatmapConfig::default(),
            };

            let config = self.apply_overrides(base);
            config.validate()?;
            Ok(config)
        }

        /// Command-line flags win over the file.
        pub fn apply_overrides(&self, mut config: HeatmapConfig) -> HeatmapConfig {
            if self.endpoint.is_some() || self.ramen_type.is_some() {
                let upstream = config.upstream.get_or_insert_with(UpstreamConfig::default);
                if let Some(endpoint) = &self.endpoint {
                    upstream.endpoint = Some(endpoint.clone());
                }
                if let Some(ramen_type) = &self.ramen_type {
                    upstream.ramen_type = Some(ramen_type.clone());
                }
            }

            if self.grid_cols.is_some() || self.grid_rows.is_some() {
                let grid = config.grid.get_or_insert_with(GridConfig::default);
                grid.cols = self.grid_cols.or(grid.cols);
                grid.rows = self.grid_rows.or(grid.rows);
            }

            if self.inline {
                config
                    .aggregation
                    .get_or_insert_with(AggregationConfig::default)
                    .offload = Some(false);
            }

            config
        }
    }

}
