use clap::{Subcommand, ValueEnum};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 單一瓦片的密度網格，輸出 `[{position, density}]`
    Tile {
        /// Zoom level
        z: u32,
        /// Tile column
        x: u32,
        /// Tile row, counted from the north edge
        y: u32,
    },

    /// Density grid around a map viewport
    Viewport {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, default_value_t = 15.0)]
        zoom: f64,
    },

    /// 列出設定區域內的拉麵店位置
    Shops,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}
