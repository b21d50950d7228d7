//! Input validation for the location and date-range forms
//!
//! Validation never short-circuits: every failing check attaches a field-level
//! error so the caller can report all problems in one response.

pub mod date_range;
pub mod location;

pub use date_range::{ArchiveRequest, DateRange, DateRangeForm, DateRules};
pub use location::{LocationForm, LocationMode, LocationQuery};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Form field an error is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Input,
    City,
    Postcode,
    Latitude,
    Longitude,
    Location,
    StartDate,
    EndDate,
}

impl Field {
    /// Name of the field as submitted by the form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Input => "input",
            Field::City => "city",
            Field::Postcode => "postcode",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Location => "location",
            Field::StartDate => "start_date",
            Field::EndDate => "end_date",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed field constraint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Select how to identify the location.")]
    LocationModeRequired,

    #[error("City name is required.")]
    CityRequired,

    #[error("Postcode is required.")]
    PostcodeRequired,

    #[error("Select a valid choice. {0} is not one of the available choices.")]
    InvalidChoice(String),

    #[error("Latitude and longitude are required.")]
    CoordinatesRequired,

    #[error("Enter a number.")]
    InvalidNumber,

    #[error("Latitude must be between -90 and 90, got: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude must be between -180 and 180, got: {0}")]
    LongitudeOutOfRange(f64),

    #[error("Location is required.")]
    LocationRequired,

    #[error("Location must be at most {max} characters.")]
    LocationTooLong { max: usize },

    #[error("This date is required.")]
    DateRequired,

    #[error("Enter a valid date (YYYY-MM-DD), got: {0}")]
    InvalidDate(String),

    #[error("Start date cannot be before {floor}.")]
    StartBeforeFloor { floor: NaiveDate },

    #[error("End date must not be before the start date.")]
    EndBeforeStart,
}

/// Field-level errors collected during one validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, Vec<ValidationError>>,
}

impl ValidationErrors {
    /// Attach an error to a field
    pub fn add(&mut self, field: Field, error: ValidationError) {
        self.errors.entry(field).or_default().push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors attached to a single field
    #[must_use]
    pub fn field(&self, field: Field) -> &[ValidationError] {
        self.errors.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if `error` is attached to `field`
    #[must_use]
    pub fn contains(&self, field: Field, error: &ValidationError) -> bool {
        self.field(field).contains(error)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &ValidationError)> {
        self.errors
            .iter()
            .flat_map(|(field, errors)| errors.iter().map(move |e| (*field, e)))
    }

    /// Ok when nothing was attached, the collected errors otherwise
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .iter()
            .map(|(field, error)| format!("{field}: {error}"))
            .collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.errors.iter().map(|(field, errors)| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            (field.as_str(), messages)
        }))
    }
}

/// Treats blank form values as absent.
///
/// HTML forms submit untouched inputs as empty strings, which must not be
/// parsed as numbers or mode tags.
pub(crate) fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(de)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_collect_per_field() {
        let mut errors = ValidationErrors::default();
        assert!(errors.is_empty());

        errors.add(Field::StartDate, ValidationError::DateRequired);
        errors.add(Field::EndDate, ValidationError::EndBeforeStart);
        errors.add(Field::StartDate, ValidationError::InvalidDate("x".into()));

        assert_eq!(errors.field(Field::StartDate).len(), 2);
        assert!(errors.contains(Field::EndDate, &ValidationError::EndBeforeStart));
        assert!(errors.field(Field::City).is_empty());
        assert_eq!(errors.iter().count(), 3);
    }

    #[test]
    fn test_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::default();
        errors.add(Field::City, ValidationError::CityRequired);

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "city": ["City name is required."] }));
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::default();
        errors.add(Field::Postcode, ValidationError::PostcodeRequired);
        assert_eq!(errors.to_string(), "postcode: Postcode is required.");
    }
}
