//! Geocoding providers: the lookup contract and the Nominatim backend.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use super::types::{GeocodeCandidate, LocationError, SearchQuery};
use crate::config::GeocoderConfig;

pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<GeocodeCandidate>, LocationError>> + Send + 'a>>;

/// A free-text address search service.
///
/// An empty result is `Ok(vec![])`, not an error.
pub trait GeocodeProvider: Send + Sync {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> SearchFuture<'a>;
}

impl<P: GeocodeProvider + ?Sized> GeocodeProvider for Arc<P> {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> SearchFuture<'a> {
        (**self).search(query)
    }
}

// ─── Nominatim provider ─────────────────────────────────────────

/// OpenStreetMap Nominatim (or any server speaking its `/search` dialect).
#[derive(Clone)]
pub struct NominatimProvider {
    agent: ureq::Agent,
    endpoint: String,
}

impl NominatimProvider {
    pub fn new(config: &GeocoderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .build();
        Self {
            agent,
            endpoint: config.endpoint.clone(),
        }
    }
}

impl GeocodeProvider for NominatimProvider {
    fn search<'a>(&'a self, query: &'a SearchQuery) -> SearchFuture<'a> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let query = query.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || nominatim_search(&agent, &endpoint, &query))
                .await
                .map_err(|e| LocationError::Network(format!("lookup task failed: {e}")))?
        })
    }
}

fn nominatim_search(
    agent: &ureq::Agent,
    endpoint: &str,
    query: &SearchQuery,
) -> Result<Vec<GeocodeCandidate>, LocationError> {
    let limit = query.limit.to_string();
    let mut request = agent
        .get(endpoint)
        .query("q", &query.text)
        .query("format", "jsonv2")
        .query("limit", &limit)
        .query("addressdetails", "1")
        .query("extratags", "1")
        .query("accept-language", &query.language);
    if let Some(cc) = query.country_code.as_deref() {
        request = request.query("countrycodes", cc);
    }

    let response = request.call().map_err(|e| match e {
        ureq::Error::Status(code, _) => LocationError::Status(code),
        ureq::Error::Transport(t) => LocationError::Network(t.to_string()),
    })?;

    let body = response
        .into_string()
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    parse_search_response(&body)
}

#[derive(Deserialize, Debug)]
struct NominatimPlace {
    #[serde(default, deserialize_with = "lenient_f64")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    importance: Option<f64>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Deserialize, Debug, Default)]
struct NominatimAddress {
    country: Option<String>,
    country_code: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    postcode: Option<String>,
}

/// Nominatim sends coordinates as strings; other servers send numbers.
/// Anything unparsable becomes `None` and is rejected later by validation.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Parse a `/search` body. A blank body counts as zero results.
pub fn parse_search_response(body: &str) -> Result<Vec<GeocodeCandidate>, LocationError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let places: Vec<NominatimPlace> = serde_json::from_str(body)
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;
    Ok(places.into_iter().map(into_candidate).collect())
}

fn into_candidate(place: NominatimPlace) -> GeocodeCandidate {
    let address = place.address.unwrap_or_default();
    let locality = address
        .city
        .or(address.town)
        .or(address.village)
        .or(address.municipality);
    GeocodeCandidate {
        lat: place.lat,
        lon: place.lon,
        country: address.country,
        country_code: address.country_code.map(|cc| cc.to_lowercase()),
        locality,
        postal_code: address.postcode,
        importance: place.importance.filter(|i| i.is_finite()).unwrap_or(0.0),
        display_name: place.display_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const KRAKOW_BODY: &str = r#"[
        {
            "place_id": 1,
            "lat": "50.0619474",
            "lon": "19.9368564",
            "display_name": "Rynek Główny, Kraków, Poland",
            "importance": 0.52,
            "address": {
                "road": "Rynek Główny",
                "city": "Kraków",
                "postcode": "31-042",
                "country": "Poland",
                "country_code": "PL"
            }
        }
    ]"#;

    #[test]
    fn test_parse_string_coordinates() {
        let candidates = parse_search_response(KRAKOW_BODY).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_abs_diff_eq!(c.lat.unwrap(), 50.0619474, epsilon = 1e-9);
        assert_abs_diff_eq!(c.lon.unwrap(), 19.9368564, epsilon = 1e-9);
        assert_eq!(c.locality.as_deref(), Some("Kraków"));
        assert_eq!(c.postal_code.as_deref(), Some("31-042"));
        assert_eq!(c.country_code.as_deref(), Some("pl"));
        assert_abs_diff_eq!(c.importance, 0.52);
    }

    #[test]
    fn test_parse_numeric_coordinates_and_missing_importance() {
        let body = r#"[{ "lat": 48.85, "lon": 2.35, "address": { "town": "Vincennes" } }]"#;
        let c = &parse_search_response(body).unwrap()[0];
        assert_eq!(c.lat, Some(48.85));
        assert_eq!(c.importance, 0.0);
        assert_eq!(c.locality.as_deref(), Some("Vincennes"));
        assert!(c.country.is_none());
    }

    #[test]
    fn test_locality_precedence() {
        let body = r#"[{ "lat": "1", "lon": "1", "address": { "village": "Zalesie", "municipality": "Gmina X" } }]"#;
        let c = &parse_search_response(body).unwrap()[0];
        assert_eq!(c.locality.as_deref(), Some("Zalesie"));
    }

    #[test]
    fn test_garbage_coordinates_become_none() {
        let body = r#"[{ "lat": "n/a", "lon": null }]"#;
        let c = &parse_search_response(body).unwrap()[0];
        assert!(c.lat.is_none());
        assert!(c.lon.is_none());
    }

    #[test]
    fn test_empty_bodies() {
        assert!(parse_search_response("").unwrap().is_empty());
        assert!(parse_search_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            parse_search_response("<html>502</html>"),
            Err(LocationError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_search_response(r#"{"error":"Unable to geocode"}"#),
            Err(LocationError::InvalidResponse(_))
        ));
    }
}
