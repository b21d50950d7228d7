//! Data models for the weather archive service
//!
//! - Location: resolved place with coordinates and display name
//! - Observations: archived series aligned on a shared time axis

pub mod location;
pub mod observations;

pub use location::Location;
pub use observations::{Granularity, ObservationTable};
