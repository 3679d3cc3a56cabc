use clap::Parser;
use ramen_density::app::{self, shops, tiles};
use ramen_density::config::cli::{Command, LogFormat};
use ramen_density::utils::error::ErrorSeverity;
use ramen_density::utils::logger;
use ramen_density::{CliConfig, FixtureSource, GeoPoint, HeatmapConfig, OverpassClient, PointSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting ramen-density CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let output = if cli.mock {
        tracing::info!("🧪 Mock mode: using built-in sample shops");
        run(&cli.command, FixtureSource::new(), &config).await
    } else {
        run(&cli.command, OverpassClient::from_config(&config), &config).await
    };

    match output {
        Ok(json) => {
            println!("{}", json);
        }
        Err(e) => {
            tracing::error!(
                "❌ Request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 可重試
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

/// Shop lists bypass the scheduler; tile and viewport go through it.
async fn run<S>(
    command: &Command,
    source: S,
    config: &HeatmapConfig,
) -> ramen_density::Result<String>
where
    S: PointSource + ShopLister + 'static,
{
    let json = match command {
        Command::Tile { z, x, y } => {
            let scheduler = app::build_scheduler(source, config);
            let points = tiles::tile_density(&scheduler, *z, *x, *y).await;
            serde_json::to_string_pretty(&points)?
        }
        Command::Viewport { lat, lon, zoom } => {
            let scheduler = app::build_scheduler(source, config);
            let center = GeoPoint::validated(*lon, *lat)?;
            let points = tiles::viewport_density(&scheduler, center, *zoom).await?;
            serde_json::to_string_pretty(&points)?
        }
        Command::Shops => {
            let response = source.shop_list(config).await?;
            serde_json::to_string_pretty(&response)?
        }
    };
    Ok(json)
}

/// How each source answers the shop-list command.
trait ShopLister {
    async fn shop_list(&self, config: &HeatmapConfig) -> ramen_density::Result<shops::ShopListResponse>;
}

impl ShopLister for FixtureSource {
    async fn shop_list(&self, _config: &HeatmapConfig) -> ramen_density::Result<shops::ShopListResponse> {
        Ok(shops::mock_shop_list(self))
    }
}

impl ShopLister for OverpassClient {
    async fn shop_list(&self, config: &HeatmapConfig) -> ramen_density::Result<shops::ShopListResponse> {
        shops::live_shop_list(
            self,
            config.area_name(),
            config.area_center(),
            config.area_radius_m(),
        )
        .await
    }
}
