//! `weather-archive` - historical weather lookup and analysis
//!
//! This library validates location and date-range input, fetches archived
//! observations from Open-Meteo, computes per-variable statistics with
//! z-score anomaly flags, and serves the results over HTTP as JSON or CSV.

pub mod analysis;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod forms;
pub mod location_resolver;
pub mod models;
pub mod report;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use analysis::{DEFAULT_Z_THRESHOLD, StatsSummary, compute_stats, detect_anomalies};
pub use api::{ArchiveClient, GeocodingResult, WeatherSource};
pub use cache::ResponseCache;
pub use config::ArchiveConfig;
pub use error::ArchiveError;
pub use forms::{
    ArchiveRequest, DateRange, DateRangeForm, DateRules, LocationForm, LocationMode,
    LocationQuery, ValidationError, ValidationErrors,
};
pub use location_resolver::LocationResolver;
pub use models::{Granularity, Location, ObservationTable};
pub use report::WeatherReport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
