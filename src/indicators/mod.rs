pub mod atr;
pub mod percentile;
pub mod true_range;

pub use atr::smooth_atr;
pub use percentile::PercentileRanker;
pub use true_range::true_range;
