//! Address-to-coordinate resolution.
//!
//! Provides coordinate validation, country inference from free text,
//! a multi-variant geocoding chain, and built-in per-country centroids.

pub mod defaults;
pub mod inference;
pub mod orchestrator;
pub mod providers;
pub mod resolver;
pub mod types;
pub mod validate;

pub use defaults::{centroid_list, default_coordinate, default_coordinate_for, CentroidInfo};
pub use inference::{country_display_name, country_iso_code, infer_country, infer_country_with};
pub use orchestrator::GeocodingOrchestrator;
pub use providers::{GeocodeProvider, NominatimProvider, SearchFuture};
pub use resolver::LocationResolver;
pub use types::{
    AddressInput, Coordinate, GeocodeCandidate, GeocodeMatch, LocationError, LocationSource,
    ResolvedLocation, SearchQuery, VariantKind,
};
pub use validate::{is_valid_coordinate, is_valid_pair};
