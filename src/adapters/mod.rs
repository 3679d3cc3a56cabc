// Adapters layer: the upstream point-data client and its offline stand-in.

pub mod fixture;
pub mod overpass;
pub mod retry;

pub use fixture::FixtureSource;
pub use overpass::{OverpassClient, OverpassQuery, QueryArea};
pub use retry::RetryPolicy;
