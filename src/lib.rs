pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod output;
pub mod score;

pub use analysis::{Analysis, analyze, analyze_many};
pub use config::AnalysisConfig;
pub use data::PriceBar;
pub use error::IndicatorError;
pub use score::AnalysisResult;
