//! CSV export of archived observations

use crate::forms::ArchiveRequest;
use crate::models::ObservationTable;
use crate::{ArchiveError, Result};

/// Serialize a table as CSV: a `time` column followed by one column per
/// variable. Missing values are written as empty cells.
pub fn to_csv(table: &ObservationTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = std::iter::once("time".to_string()).chain(table.series.iter().map(|s| {
        match &s.unit {
            Some(unit) => format!("{} ({})", s.name, unit),
            None => s.name.clone(),
        }
    }));
    writer.write_record(header).map_err(csv_error)?;

    for (row, time) in table.time.iter().enumerate() {
        let cells = std::iter::once(time.clone()).chain(table.series.iter().map(|s| {
            let value = s.values[row];
            if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            }
        }));
        writer.write_record(cells).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ArchiveError::export(e.to_string()))
}

/// Attachment filename for a request, e.g. `daily_2020-01-01_2020-01-31.csv`
#[must_use]
pub fn filename(request: &ArchiveRequest) -> String {
    format!(
        "{}_{}_{}.csv",
        request.granularity, request.range.start, request.range.end
    )
}

fn csv_error(err: csv::Error) -> ArchiveError {
    ArchiveError::export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::DateRange;
    use crate::models::Granularity;
    use chrono::NaiveDate;

    #[test]
    fn test_csv_layout() {
        let mut table = ObservationTable::new(
            Granularity::Daily,
            vec!["2020-01-01".to_string(), "2020-01-02".to_string()],
        );
        table
            .push_series("temperature_max", Some("°C".to_string()), vec![3.5, f64::NAN])
            .unwrap();
        table
            .push_series("precipitation", None, vec![0.0, 1.25])
            .unwrap();

        let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        assert_eq!(
            csv,
            "time,temperature_max (°C),precipitation\n2020-01-01,3.5,0\n2020-01-02,,1.25\n"
        );
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let table = ObservationTable::new(Granularity::Hourly, Vec::new());
        let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        assert_eq!(csv, "time\n");
    }

    #[test]
    fn test_filename() {
        let request = ArchiveRequest {
            label: "Berlin".to_string(),
            range: DateRange {
                start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
            },
            granularity: Granularity::Hourly,
        };
        assert_eq!(filename(&request), "hourly_2020-01-01_2020-01-31.csv");
    }
}
