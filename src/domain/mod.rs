// Domain layer: value types, the point-source port, and the pure geo/parse/density services.

pub mod density;
pub mod geo;
pub mod model;
pub mod parser;
pub mod ports;

pub use model::{BoundingBox, DensityCell, GeoPoint, GridSpec, RamenShop, ShopRecord};
pub use ports::{ConfigProvider, PointSource};
