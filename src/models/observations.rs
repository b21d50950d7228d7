//! Archived observation series

use crate::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time resolution of archived observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Hourly,
}

const DAILY_VARIABLES: &[(&str, &str)] = &[
    ("temperature_2m_max", "temperature_max"),
    ("temperature_2m_min", "temperature_min"),
    ("precipitation_sum", "precipitation"),
    ("windspeed_10m_max", "wind_speed"),
];

const HOURLY_VARIABLES: &[(&str, &str)] = &[
    ("temperature_2m", "temperature"),
    ("relative_humidity_2m", "relative_humidity"),
    ("precipitation", "precipitation"),
    ("windspeed_10m", "wind_speed"),
];

impl Granularity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Hourly => "hourly",
        }
    }

    /// Archive API variable names paired with the names exposed to callers
    #[must_use]
    pub fn variables(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Granularity::Daily => DAILY_VARIABLES,
            Granularity::Hourly => HOURLY_VARIABLES,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named variable; missing observations are NaN
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub unit: Option<String>,
    pub values: Vec<f64>,
}

/// Named series sharing one time axis
#[derive(Debug, Clone, Serialize)]
pub struct ObservationTable {
    pub granularity: Granularity,
    /// Timezone the timestamps are expressed in
    pub timezone: Option<String>,
    /// ISO dates (daily) or date-times (hourly)
    pub time: Vec<String>,
    pub series: Vec<Series>,
}

impl ObservationTable {
    #[must_use]
    pub fn new(granularity: Granularity, time: Vec<String>) -> Self {
        Self {
            granularity,
            timezone: None,
            time,
            series: Vec::new(),
        }
    }

    /// Add a series aligned with the time axis.
    ///
    /// Fails when the series length differs from the number of timestamps.
    pub fn push_series(
        &mut self,
        name: impl Into<String>,
        unit: Option<String>,
        values: Vec<f64>,
    ) -> Result<()> {
        let name = name.into();
        if values.len() != self.time.len() {
            return Err(ArchiveError::api(format!(
                "Series '{}' has {} values for {} timestamps",
                name,
                values.len(),
                self.time.len()
            )));
        }
        self.series.push(Series { name, unit, values });
        Ok(())
    }

    /// Number of timestamps
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Values of a variable by name
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.values.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ObservationTable {
        ObservationTable::new(
            Granularity::Daily,
            vec!["2020-01-01".to_string(), "2020-01-02".to_string()],
        )
    }

    #[test]
    fn test_push_aligned_series() {
        let mut table = table();
        table
            .push_series("temperature_max", Some("°C".to_string()), vec![3.5, f64::NAN])
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.values("temperature_max").unwrap()[0], 3.5);
        assert!(table.values("temperature_max").unwrap()[1].is_nan());
        assert!(table.values("precipitation").is_none());
    }

    #[test]
    fn test_mismatched_series_rejected() {
        let mut table = table();
        let err = table.push_series("precipitation", None, vec![1.0]).unwrap_err();
        assert!(matches!(err, ArchiveError::Api { .. }));
        assert!(table.series.is_empty());
    }

    #[test]
    fn test_variable_names_per_granularity() {
        let daily: Vec<&str> = Granularity::Daily.variables().iter().map(|v| v.1).collect();
        assert_eq!(
            daily,
            ["temperature_max", "temperature_min", "precipitation", "wind_speed"]
        );
        assert_eq!(Granularity::Hourly.variables().len(), 4);
        assert_eq!(Granularity::Hourly.to_string(), "hourly");
    }
}
