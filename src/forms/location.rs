//! Location search form and the validated location query

use super::{Field, ValidationError, ValidationErrors, empty_string_as_none};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the user chose to identify the location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    City,
    Postcode,
    Manual,
}

impl FromStr for LocationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "city" => Ok(LocationMode::City),
            "postcode" => Ok(LocationMode::Postcode),
            "manual" => Ok(LocationMode::Manual),
            other => Err(format!(
                "unknown location mode '{other}', expected city, postcode or manual"
            )),
        }
    }
}

/// Raw location search form as submitted by the browser.
///
/// Values stay unparsed until `validate`, so a malformed field of an
/// unselected mode cannot reject the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationForm {
    /// Selected mode tag
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub input: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub longitude: Option<String>,
}

/// A validated location, exactly one identification mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum LocationQuery {
    City(String),
    Postcode(String),
    ManualCoordinates { latitude: f64, longitude: f64 },
}

impl LocationForm {
    /// Validate the fields required by the selected mode.
    ///
    /// Fields belonging to other modes are ignored. Zero is a valid coordinate.
    pub fn validate(&self) -> Result<LocationQuery, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let mode = match non_blank(self.input.as_deref()) {
            None => {
                errors.add(Field::Input, ValidationError::LocationModeRequired);
                None
            }
            Some(raw) => match raw.parse::<LocationMode>() {
                Ok(mode) => Some(mode),
                Err(_) => {
                    errors.add(Field::Input, ValidationError::InvalidChoice(raw));
                    None
                }
            },
        };

        let query = match mode {
            None => None,
            Some(LocationMode::City) => match non_blank(self.city.as_deref()) {
                Some(city) => Some(LocationQuery::City(city)),
                None => {
                    errors.add(Field::City, ValidationError::CityRequired);
                    None
                }
            },
            Some(LocationMode::Postcode) => match non_blank(self.postcode.as_deref()) {
                Some(postcode) => Some(LocationQuery::Postcode(postcode)),
                None => {
                    errors.add(Field::Postcode, ValidationError::PostcodeRequired);
                    None
                }
            },
            Some(LocationMode::Manual) => self.manual_coordinates(&mut errors),
        };

        match query {
            Some(query) => errors.into_result(query),
            None => Err(errors),
        }
    }

    fn manual_coordinates(&self, errors: &mut ValidationErrors) -> Option<LocationQuery> {
        let raw_latitude = non_blank(self.latitude.as_deref());
        let raw_longitude = non_blank(self.longitude.as_deref());
        if raw_latitude.is_none() || raw_longitude.is_none() {
            errors.add(Field::Latitude, ValidationError::CoordinatesRequired);
        }

        let latitude = raw_latitude.and_then(|raw| parse_number(Field::Latitude, &raw, errors));
        let longitude =
            raw_longitude.and_then(|raw| parse_number(Field::Longitude, &raw, errors));
        let (latitude, longitude) = (latitude?, longitude?);

        if !(-90.0..=90.0).contains(&latitude) {
            errors.add(Field::Latitude, ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            errors.add(
                Field::Longitude,
                ValidationError::LongitudeOutOfRange(longitude),
            );
        }

        Some(LocationQuery::ManualCoordinates {
            latitude,
            longitude,
        })
    }
}

fn parse_number(field: Field, raw: &str, errors: &mut ValidationErrors) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            errors.add(field, ValidationError::InvalidNumber);
            None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl LocationQuery {
    /// Interpret a free-text location label.
    ///
    /// `"lat,lon"` pairs within range become coordinates, postcode-shaped
    /// input becomes a postcode, anything else is treated as a city name.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();

        if let Some((latitude, longitude)) = parse_coordinates(label) {
            return LocationQuery::ManualCoordinates {
                latitude,
                longitude,
            };
        }

        if is_postcode(label) {
            return LocationQuery::Postcode(label.to_string());
        }

        LocationQuery::City(label.to_string())
    }

    #[must_use]
    pub fn mode(&self) -> LocationMode {
        match self {
            LocationQuery::City(_) => LocationMode::City,
            LocationQuery::Postcode(_) => LocationMode::Postcode,
            LocationQuery::ManualCoordinates { .. } => LocationMode::Manual,
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationQuery::City(name) => write!(f, "{name}"),
            LocationQuery::Postcode(code) => write!(f, "{code}"),
            LocationQuery::ManualCoordinates {
                latitude,
                longitude,
            } => write!(f, "{latitude:.4}, {longitude:.4}"),
        }
    }
}

/// Parse coordinates from strings like "52.52,13.41" or "52.52 13.41"
fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let [lat, lon] = parts.as_slice() else {
        return None;
    };

    let lat = lat.parse::<f64>().ok()?;
    let lon = lon.parse::<f64>().ok()?;

    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

/// Check if input looks like a postal code
fn is_postcode(input: &str) -> bool {
    let normalized = input.replace([' ', '-'], "");
    if !normalized.is_ascii() {
        return false;
    }

    // Numeric codes: 5 or 9 digits
    if normalized.len() == 5 || normalized.len() == 9 {
        if normalized.chars().all(|c| c.is_ascii_digit()) {
            return true;
        }
    }

    // Lettered prefix followed by alphanumerics that include a digit
    if (5..=10).contains(&normalized.len()) {
        let (prefix, suffix) = normalized.split_at(2);
        return prefix.chars().all(|c| c.is_ascii_alphabetic())
            && suffix.chars().all(|c| c.is_ascii_alphanumeric())
            && suffix.chars().any(|c| c.is_ascii_digit());
    }

    false
}
