//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Raw address fields as captured by the caller.
///
/// Every field is optional on the wire; empty strings are treated the same
/// as missing values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    /// Country as typed (or defaulted) by the caller. Often a generic placeholder.
    #[serde(default)]
    pub country: String,
    /// Business or venue name, used as an extra locale signal.
    #[serde(default)]
    pub name: Option<String>,
    /// Previously stored latitude, if any.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Previously stored longitude, if any.
    #[serde(default)]
    pub lon: Option<f64>,
}

impl AddressInput {
    pub fn has_stored_coordinates(&self) -> bool {
        self.lat.is_some() || self.lon.is_some()
    }

    /// The entity name, if present and not blank.
    pub fn entity_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// A validated geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate only if it passes [`is_valid_pair`](super::validate::is_valid_pair).
    pub fn new_checked(lat: f64, lon: f64) -> Option<Self> {
        super::validate::is_valid_pair(lat, lon).then_some(Self { lat, lon })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(f, "{:.4}°{}, {:.4}°{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

/// One result entry returned by a provider for a single query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeCandidate {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2, lowercase.
    pub country_code: Option<String>,
    /// First of city / town / village / municipality.
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub importance: f64,
    pub display_name: Option<String>,
}

/// Which address parts a query variant was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Full,
    WithoutPostal,
    EntityName,
    PostalCity,
    PostalCountry,
    CityCountry,
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "address+postal+city"),
            Self::WithoutPostal => write!(f, "address+city"),
            Self::EntityName => write!(f, "name+city"),
            Self::PostalCity => write!(f, "postal+city"),
            Self::PostalCountry => write!(f, "postal"),
            Self::CityCountry => write!(f, "city"),
        }
    }
}

/// A single free-text query sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVariant {
    pub kind: VariantKind,
    pub text: String,
}

/// Parameters of one provider lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub language: String,
    /// ISO 3166-1 alpha-2 filter, lowercase. `None` searches worldwide.
    pub country_code: Option<String>,
}

/// The candidate the orchestrator accepted, with the context that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeMatch {
    pub coordinate: Coordinate,
    pub query: String,
    pub attempt: usize,
    pub variant: VariantKind,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// How a location was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Stored,
    Geocoded,
    Fallback,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "Stored"),
            Self::Geocoded => write!(f, "Geocoded"),
            Self::Fallback => write!(f, "Default centroid"),
        }
    }
}

/// A resolved location with coordinates and provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lon: f64,
    pub source: LocationSource,
    /// Lowercase country identifier the pipeline worked with.
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<GeocodeMatch>,
}

impl ResolvedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate { lat: self.lat, lon: self.lon }
    }

    pub fn display_line(&self) -> String {
        let country = super::inference::country_display_name(&self.country);
        format!("\u{1F4CD} {} \u{2014} {} ({})", self.coordinate(), country, self.source)
    }
}

/// Provider lookup errors. None of them escape the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}
