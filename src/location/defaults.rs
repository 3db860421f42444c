//! Built-in per-country centroids, the last-resort answer when geocoding fails.

use super::inference::{normalize_text, BASELINE_COUNTRY};
use super::types::Coordinate;
use serde::Serialize;

struct Centroid {
    names: &'static [&'static str], // English id first, then local spellings
    lat: f64,
    lon: f64,
    capital: &'static str,
}

const CENTROIDS: &[Centroid] = &[
    Centroid { names: &["france", "fr"], lat: 48.8566, lon: 2.3522, capital: "Paris" },
    Centroid { names: &["belgium", "belgique", "belgië", "belgien", "be"], lat: 50.8503, lon: 4.3517, capital: "Brussels" },
    Centroid { names: &["switzerland", "suisse", "schweiz", "svizzera", "ch"], lat: 46.9480, lon: 7.4474, capital: "Bern" },
    Centroid { names: &["luxembourg", "luxemburg", "lëtzebuerg", "lu"], lat: 49.6116, lon: 6.1319, capital: "Luxembourg" },
    Centroid { names: &["germany", "deutschland", "allemagne", "de"], lat: 52.5200, lon: 13.4050, capital: "Berlin" },
    Centroid { names: &["austria", "österreich", "autriche", "at"], lat: 48.2082, lon: 16.3738, capital: "Vienna" },
    Centroid { names: &["netherlands", "nederland", "pays-bas", "nl"], lat: 52.3676, lon: 4.9041, capital: "Amsterdam" },
    Centroid { names: &["spain", "españa", "espagne", "es"], lat: 40.4168, lon: -3.7038, capital: "Madrid" },
    Centroid { names: &["portugal", "pt"], lat: 38.7223, lon: -9.1393, capital: "Lisbon" },
    Centroid { names: &["italy", "italia", "italie", "it"], lat: 41.9028, lon: 12.4964, capital: "Rome" },
    Centroid { names: &["united kingdom", "uk", "royaume-uni", "gb"], lat: 51.5074, lon: -0.1278, capital: "London" },
    Centroid { names: &["ireland", "irlande", "éire", "ie"], lat: 53.3498, lon: -6.2603, capital: "Dublin" },
    Centroid { names: &["poland", "polska", "pologne", "pl"], lat: 52.2297, lon: 21.0122, capital: "Warsaw" },
    Centroid { names: &["czech republic", "czechia", "česko", "cz"], lat: 50.0755, lon: 14.4378, capital: "Prague" },
    Centroid { names: &["ukraine", "україна", "ua"], lat: 50.4501, lon: 30.5234, capital: "Kyiv" },
    Centroid { names: &["greece", "ελλάδα", "grèce", "gr"], lat: 37.9838, lon: 23.7275, capital: "Athens" },
    Centroid { names: &["canada", "ca"], lat: 45.4215, lon: -75.6972, capital: "Ottawa" },
    Centroid { names: &["morocco", "maroc", "المغرب", "ma"], lat: 34.0209, lon: -6.8416, capital: "Rabat" },
];

/// A centroid entry for the public listing.
#[derive(Debug, Clone, Serialize)]
pub struct CentroidInfo {
    pub country: String,
    pub capital: String,
    pub lat: f64,
    pub lon: f64,
}

fn find(country: &str) -> Option<&'static Centroid> {
    let key = normalize_text(country.trim());
    CENTROIDS
        .iter()
        .find(|c| c.names.iter().any(|n| normalize_text(n) == key))
}

/// Centroid for a country, or the baseline market's centroid on a miss.
pub fn default_coordinate(country: &str) -> Coordinate {
    default_coordinate_for(country, BASELINE_COUNTRY)
}

/// Centroid for a country with an explicit baseline market.
pub fn default_coordinate_for(country: &str, baseline: &str) -> Coordinate {
    let centroid = find(country)
        .or_else(|| find(baseline))
        .unwrap_or(&CENTROIDS[0]);
    Coordinate { lat: centroid.lat, lon: centroid.lon }
}

/// Whether the country has its own centroid (rather than the baseline's).
pub fn has_centroid(country: &str) -> bool {
    find(country).is_some()
}

/// Full centroid list (for the API).
pub fn centroid_list() -> Vec<CentroidInfo> {
    CENTROIDS
        .iter()
        .map(|c| CentroidInfo {
            country: c.names[0].to_string(),
            capital: c.capital.to_string(),
            lat: c.lat,
            lon: c.lon,
        })
        .collect()
}
