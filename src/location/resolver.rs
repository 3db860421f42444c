//! Location resolver — the caller-facing fallback chain.
//!
//! Flow:  stored coordinates → geocoding orchestrator → default centroid
//!
//! `resolve` stops before the centroid and returns `None`, so callers can flag
//! the record for review instead; `resolve_or_default` always yields a location.

use tracing::{debug, info};

use super::defaults::default_coordinate_for;
use super::orchestrator::GeocodingOrchestrator;
use super::providers::{GeocodeProvider, NominatimProvider};
use super::types::{AddressInput, LocationSource, ResolvedLocation};
use super::validate::is_valid_coordinate;
use crate::config::GeocoderConfig;

/// The location resolver with its fallback pipeline.
pub struct LocationResolver<P = NominatimProvider> {
    orchestrator: GeocodingOrchestrator<P>,
    offline: bool,
}

impl LocationResolver<NominatimProvider> {
    /// Resolver backed by the configured Nominatim endpoint.
    pub fn from_config(config: GeocoderConfig) -> Self {
        let provider = NominatimProvider::new(&config);
        Self::with_provider(provider, config)
    }
}

impl<P: GeocodeProvider> LocationResolver<P> {
    pub fn with_provider(provider: P, config: GeocoderConfig) -> Self {
        Self {
            orchestrator: GeocodingOrchestrator::new(provider, config),
            offline: false,
        }
    }

    /// Set offline mode — never call the provider.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn config(&self) -> &GeocoderConfig {
        self.orchestrator.config()
    }

    /// Stored coordinates if still valid, else a geocoded match, else `None`.
    pub async fn resolve(&self, input: &AddressInput) -> Option<ResolvedLocation> {
        let country = self.orchestrator.resolve_country(input);
        self.resolve_in(input, country).await.ok()
    }

    /// Like [`resolve`](Self::resolve), falling back to the country centroid.
    pub async fn resolve_or_default(&self, input: &AddressInput) -> ResolvedLocation {
        let country = self.orchestrator.resolve_country(input);
        match self.resolve_in(input, country).await {
            Ok(resolved) => resolved,
            Err(country) => self.fallback_in(country),
        }
    }

    /// Centroid of the (possibly inferred) country of `input`.
    pub fn fallback(&self, input: &AddressInput) -> ResolvedLocation {
        self.fallback_in(self.orchestrator.resolve_country(input))
    }

    /// Stored, then geocoded. Hands the country back when neither worked.
    async fn resolve_in(
        &self,
        input: &AddressInput,
        country: String,
    ) -> Result<ResolvedLocation, String> {
        if is_valid_coordinate(input.lat, input.lon) {
            if let Some((lat, lon)) = input.lat.zip(input.lon) {
                return Ok(ResolvedLocation {
                    lat,
                    lon,
                    source: LocationSource::Stored,
                    country,
                    matched: None,
                });
            }
        }
        if input.has_stored_coordinates() {
            debug!(lat = ?input.lat, lon = ?input.lon, "stored coordinates rejected");
        }

        if self.offline {
            debug!("offline, skipping provider lookup");
            return Err(country);
        }

        match self.orchestrator.geocode_in(input, &country).await {
            Some(matched) => Ok(ResolvedLocation {
                lat: matched.coordinate.lat,
                lon: matched.coordinate.lon,
                source: LocationSource::Geocoded,
                country,
                matched: Some(matched),
            }),
            None => Err(country),
        }
    }

    fn fallback_in(&self, country: String) -> ResolvedLocation {
        let coordinate = default_coordinate_for(&country, &self.config().baseline_country);
        info!(%country, %coordinate, "using default centroid");
        ResolvedLocation {
            lat: coordinate.lat,
            lon: coordinate.lon,
            source: LocationSource::Fallback,
            country,
            matched: None,
        }
    }
}
