//! Location Resolution Module
//!
//! Turns a validated location query (city, postcode or coordinates) into a
//! concrete `Location` with coordinates and a display name.

use crate::api::WeatherSource;
use crate::forms::LocationQuery;
use crate::models::Location;
use crate::{ArchiveError, Result};
use tracing::debug;

/// Service for resolving location queries
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve a location query into a structured Location
    pub async fn resolve_location(
        source: &dyn WeatherSource,
        query: &LocationQuery,
    ) -> Result<Location> {
        debug!("Resolving location query: {:?}", query);

        let location = match query {
            LocationQuery::ManualCoordinates {
                latitude,
                longitude,
            } => Location::from_coordinates(*latitude, *longitude),
            LocationQuery::City(name) => Self::resolve_name(source, name).await?,
            LocationQuery::Postcode(postcode) => Self::resolve_name(source, postcode).await?,
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            location.name, location.latitude, location.longitude
        );

        Ok(location)
    }

    /// Resolve a city name or postcode to coordinates via geocoding
    async fn resolve_name(source: &dyn WeatherSource, name: &str) -> Result<Location> {
        debug!("Geocoding: {}", name);

        match source.geocode(name).await? {
            Some(geocoding) => Ok(Location::from(geocoding)),
            None => Err(ArchiveError::location_not_found(name)),
        }
    }
}
