//! Date-range form shared by the daily and hourly views

use super::location::LocationQuery;
use super::{Field, ValidationError, ValidationErrors};
use crate::models::Granularity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Limits applied when validating a date-range request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRules {
    /// Earliest date the archive holds observations for
    pub historical_floor: NaiveDate,
    /// Maximum length of the free-text location label, in characters
    pub max_label_length: usize,
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            historical_floor: NaiveDate::from_ymd_opt(1940, 1, 1).unwrap_or(NaiveDate::MIN),
            max_label_length: 100,
        }
    }
}

/// Raw date-range form, submitted as query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeForm {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Number of calendar days covered, both ends included
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// A validated request for archived observations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveRequest {
    /// Trimmed location label as entered
    pub label: String,
    pub range: DateRange,
    pub granularity: Granularity,
}

impl ArchiveRequest {
    /// Location query derived from the free-text label
    #[must_use]
    pub fn location_query(&self) -> LocationQuery {
        LocationQuery::from_label(&self.label)
    }
}

impl DateRangeForm {
    /// Validate the label and date range.
    ///
    /// Granularity does not influence any check; daily and hourly requests
    /// are validated identically.
    pub fn validate(
        &self,
        granularity: Granularity,
        rules: &DateRules,
    ) -> Result<ArchiveRequest, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let label = match self.location.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add(Field::Location, ValidationError::LocationRequired);
                None
            }
            Some(label) if label.chars().count() > rules.max_label_length => {
                errors.add(
                    Field::Location,
                    ValidationError::LocationTooLong {
                        max: rules.max_label_length,
                    },
                );
                None
            }
            Some(label) => Some(label.to_string()),
        };

        let start = parse_date(Field::StartDate, self.start_date.as_deref(), &mut errors);
        let end = parse_date(Field::EndDate, self.end_date.as_deref(), &mut errors);

        if let Some(start) = start {
            if start < rules.historical_floor {
                errors.add(
                    Field::StartDate,
                    ValidationError::StartBeforeFloor {
                        floor: rules.historical_floor,
                    },
                );
            }
        }

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                errors.add(Field::EndDate, ValidationError::EndBeforeStart);
            }
        }

        match (label, start, end) {
            (Some(label), Some(start), Some(end)) => errors.into_result(ArchiveRequest {
                label,
                range: DateRange { start, end },
                granularity,
            }),
            _ => Err(errors),
        }
    }
}

fn parse_date(field: Field, raw: Option<&str>, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    match raw.map(str::trim) {
        None | Some("") => {
            errors.add(field, ValidationError::DateRequired);
            None
        }
        Some(value) => match NaiveDate::parse_from_str(value, DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add(field, ValidationError::InvalidDate(value.to_string()));
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(location: &str, start: &str, end: &str) -> DateRangeForm {
        DateRangeForm {
            location: Some(location.to_string()),
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_start_before_floor() {
        let errors = form("Berlin", "1939-12-31", "1940-01-05")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap_err();
        assert!(errors.contains(
            Field::StartDate,
            &ValidationError::StartBeforeFloor {
                floor: date(1940, 1, 1)
            }
        ));
        assert!(errors.field(Field::EndDate).is_empty());
    }

    #[test]
    fn test_end_before_start() {
        let errors = form("Berlin", "2020-06-01", "2020-01-01")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap_err();
        assert!(errors.contains(Field::EndDate, &ValidationError::EndBeforeStart));
        assert!(errors.field(Field::StartDate).is_empty());
    }

    #[test]
    fn test_equal_dates_at_floor() {
        let request = form("Berlin", "1940-01-01", "1940-01-01")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap();
        assert_eq!(request.range.start, date(1940, 1, 1));
        assert_eq!(request.range.end, date(1940, 1, 1));
        assert_eq!(request.range.days(), 1);
        assert_eq!(request.label, "Berlin");
    }

    #[test]
    fn test_both_range_errors_fire_together() {
        let errors = form("Berlin", "1939-06-01", "1939-01-01")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap_err();
        assert!(!errors.field(Field::StartDate).is_empty());
        assert!(errors.contains(Field::EndDate, &ValidationError::EndBeforeStart));
    }

    #[test]
    fn test_all_fields_missing() {
        let errors = DateRangeForm::default()
            .validate(Granularity::Hourly, &DateRules::default())
            .unwrap_err();
        assert!(errors.contains(Field::Location, &ValidationError::LocationRequired));
        assert!(errors.contains(Field::StartDate, &ValidationError::DateRequired));
        assert!(errors.contains(Field::EndDate, &ValidationError::DateRequired));
    }

    #[test]
    fn test_label_too_long() {
        let label = "x".repeat(101);
        let errors = form(&label, "2020-01-01", "2020-01-02")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap_err();
        assert!(errors.contains(
            Field::Location,
            &ValidationError::LocationTooLong { max: 100 }
        ));

        let label = "x".repeat(100);
        assert!(
            form(&label, "2020-01-01", "2020-01-02")
                .validate(Granularity::Daily, &DateRules::default())
                .is_ok()
        );
    }

    #[test]
    fn test_invalid_date_text() {
        let errors = form("Berlin", "01/02/2020", "2020-01-02")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap_err();
        assert!(errors.contains(
            Field::StartDate,
            &ValidationError::InvalidDate("01/02/2020".to_string())
        ));
    }

    #[rstest]
    #[case("Berlin", "2020-01-01", "2020-01-31")]
    #[case("", "1939-12-31", "1939-01-01")]
    #[case("Berlin", "not-a-date", "2020-01-01")]
    #[case("10115", "1940-01-01", "1940-01-01")]
    fn test_daily_and_hourly_validate_identically(
        #[case] location: &str,
        #[case] start: &str,
        #[case] end: &str,
    ) {
        let rules = DateRules::default();
        let form = form(location, start, end);
        let daily = form.validate(Granularity::Daily, &rules);
        let hourly = form.validate(Granularity::Hourly, &rules);

        match (daily, hourly) {
            (Ok(daily), Ok(hourly)) => {
                assert_eq!(daily.label, hourly.label);
                assert_eq!(daily.range, hourly.range);
                assert_eq!(daily.granularity, Granularity::Daily);
                assert_eq!(hourly.granularity, Granularity::Hourly);
            }
            (Err(daily), Err(hourly)) => assert_eq!(daily, hourly),
            _ => panic!("daily and hourly validation disagree"),
        }
    }

    #[test]
    fn test_custom_floor() {
        let rules = DateRules {
            historical_floor: date(2000, 1, 1),
            max_label_length: 10,
        };
        let errors = form("Berlin", "1999-12-31", "2000-01-01")
            .validate(Granularity::Daily, &rules)
            .unwrap_err();
        assert!(!errors.field(Field::StartDate).is_empty());
    }

    #[test]
    fn test_location_query_from_label() {
        let request = form("52.52,13.41", "2020-01-01", "2020-01-02")
            .validate(Granularity::Daily, &DateRules::default())
            .unwrap();
        assert!(matches!(
            request.location_query(),
            LocationQuery::ManualCoordinates { .. }
        ));
    }
}
