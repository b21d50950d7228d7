//! Weather report: resolved location, fetched observations and their analysis

use crate::analysis::{VariableAnalysis, analyze_table};
use crate::api::WeatherSource;
use crate::forms::ArchiveRequest;
use crate::location_resolver::LocationResolver;
use crate::models::{Location, ObservationTable};
use crate::Result;
use serde::Serialize;
use tracing::info;

/// Everything shown for one archive request
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub location: Location,
    /// Name followed by country code
    pub display_name: String,
    pub request: ArchiveRequest,
    pub observations: ObservationTable,
    pub analysis: Vec<VariableAnalysis>,
}

impl WeatherReport {
    /// Analyze an already fetched table
    #[must_use]
    pub fn new(
        location: Location,
        request: ArchiveRequest,
        observations: ObservationTable,
        z_threshold: f64,
    ) -> Self {
        let analysis = analyze_table(&observations, z_threshold);
        Self {
            display_name: location.display_name(),
            location,
            request,
            observations,
            analysis,
        }
    }

    /// Resolve the request's location, fetch its observations and analyze them
    pub async fn build(
        source: &dyn WeatherSource,
        request: ArchiveRequest,
        z_threshold: f64,
    ) -> Result<Self> {
        let location =
            LocationResolver::resolve_location(source, &request.location_query()).await?;
        let observations = source
            .fetch_observations(&location, &request.range, request.granularity)
            .await?;

        let report = Self::new(location, request, observations, z_threshold);
        info!(
            "Built {} report for {} with {} rows and {} anomalies",
            report.request.granularity,
            report.display_name,
            report.observations.len(),
            report.anomaly_count()
        );
        Ok(report)
    }

    /// Total number of flagged values across all variables
    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.analysis.iter().map(|a| a.anomaly_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::DateRange;
    use crate::models::Granularity;
    use chrono::NaiveDate;

    #[test]
    fn test_report_analyzes_every_series() {
        let mut table = ObservationTable::new(
            Granularity::Daily,
            (1..=5).map(|d| format!("2020-01-0{d}")).collect(),
        );
        table
            .push_series("precipitation", Some("mm".into()), vec![0.0, 0.0, 0.0, 0.0, 50.0])
            .unwrap();
        table
            .push_series("wind_speed", Some("km/h".into()), vec![10.0; 5])
            .unwrap();

        let request = ArchiveRequest {
            label: "Berlin".to_string(),
            range: DateRange {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 1, 5).unwrap(),
            },
            granularity: Granularity::Daily,
        };
        let location = Location::with_country(52.52, 13.41, "Berlin".into(), "DE".into());

        let report = WeatherReport::new(location, request, table, 1.5);
        assert_eq!(report.display_name, "Berlin, DE");
        assert_eq!(report.analysis.len(), 2);
        assert_eq!(report.analysis[0].anomalies, vec![false, false, false, false, true]);
        assert_eq!(report.anomaly_count(), 1);
    }
}
