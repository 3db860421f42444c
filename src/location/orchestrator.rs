//! Geocoding orchestrator — runs the query-variant chain against a provider.
//!
//! Variant chain (most to least specific):
//!   address+postal+city → address+city → name+city → postal+city → postal → city
//!
//! Calls are strictly sequential with a pause between them. The first
//! candidate that passes validation and the acceptance heuristic wins.

use tracing::{debug, info, warn};

use super::inference::{
    canonical_country_id, country_display_name, country_iso_code, infer_country_with,
    is_generic_country, normalize_text,
};
use super::providers::GeocodeProvider;
use super::types::{
    AddressInput, Coordinate, GeocodeCandidate, GeocodeMatch, LocationError, QueryVariant,
    SearchQuery, VariantKind,
};
use crate::config::{GeocoderConfig, ScoringConfig};

pub struct GeocodingOrchestrator<P> {
    provider: P,
    config: GeocoderConfig,
}

/// What the caller told us, cleaned up, for comparing against candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub country_name: String,
    /// `None` when the country has no known ISO code (no filter applied).
    pub country_code: Option<String>,
    pub city: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub score: f64,
    pub country_match: bool,
    pub city_match: bool,
}

impl<P: GeocodeProvider> GeocodingOrchestrator<P> {
    pub fn new(provider: P, config: GeocoderConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Country the pipeline should work with: the caller's, unless it is blank
    /// or the generic form default, in which case it is inferred from the text.
    pub fn resolve_country(&self, input: &AddressInput) -> String {
        resolve_country(input, &self.config.baseline_country)
    }

    /// Try every query variant in order; `None` when none yields an acceptable candidate.
    pub async fn geocode(&self, input: &AddressInput) -> Option<GeocodeMatch> {
        let country = self.resolve_country(input);
        self.geocode_in(input, &country).await
    }

    /// [`geocode`](Self::geocode) with the country already resolved.
    pub async fn geocode_in(&self, input: &AddressInput, country: &str) -> Option<GeocodeMatch> {
        let country_name = country_display_name(country);
        let iso = country_iso_code(country);
        let country_code = (!iso.is_empty()).then(|| iso.to_string());

        let address = clean_field(&input.address);
        let postal_code = clean_field(&input.postal_code);
        let city = clean_field(&input.city);
        let name = input.entity_name().map(clean_field).unwrap_or_default();

        let variants = build_variants(&address, &postal_code, &city, &name, &country_name);
        if variants.is_empty() {
            debug!("no usable address parts, skipping lookup");
            return None;
        }

        let expected = Expectation {
            country_name,
            country_code,
            city,
            postal_code,
        };
        let deadline = self.config.lookup_deadline();
        let delay = self.config.rate_limit_delay();

        for (attempt, variant) in variants.iter().enumerate() {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
            }
            let lenient = attempt + 2 >= variants.len();

            let query = SearchQuery {
                text: variant.text.clone(),
                limit: self.config.result_limit,
                language: self.config.language.clone(),
                country_code: expected.country_code.clone(),
            };

            let outcome = tokio::time::timeout(deadline, self.provider.search(&query))
                .await
                .unwrap_or_else(|_| Err(LocationError::Timeout(deadline)));

            let candidates = match outcome {
                Ok(candidates) if !candidates.is_empty() => candidates,
                Ok(_) => {
                    debug!(attempt, query = %variant.text, "no candidates");
                    continue;
                }
                Err(e) => {
                    warn!(attempt, query = %variant.text, error = %e, "lookup failed");
                    continue;
                }
            };

            for candidate in &candidates {
                let Some(coordinate) = candidate
                    .lat
                    .zip(candidate.lon)
                    .and_then(|(lat, lon)| Coordinate::new_checked(lat, lon))
                else {
                    debug!(attempt, lat = ?candidate.lat, lon = ?candidate.lon, "discarding invalid coordinate");
                    continue;
                };

                let scored = score_candidate(candidate, &expected, attempt, lenient, &self.config.scoring);
                debug!(
                    attempt,
                    score = scored.score,
                    country_match = scored.country_match,
                    city_match = scored.city_match,
                    locality = ?candidate.locality,
                    "candidate scored"
                );

                if is_acceptable(&scored, attempt, &self.config.scoring) {
                    info!(attempt, variant = %variant.kind, %coordinate, "address geocoded");
                    return Some(GeocodeMatch {
                        coordinate,
                        query: variant.text.clone(),
                        attempt,
                        variant: variant.kind,
                        score: scored.score,
                        display_name: candidate.display_name.clone(),
                    });
                }
            }
        }

        info!(attempts = variants.len(), "no acceptable candidate");
        None
    }
}

pub fn resolve_country(input: &AddressInput, baseline: &str) -> String {
    if is_generic_country(&input.country, baseline) {
        let text = [&input.address, &input.city, &input.postal_code]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return infer_country_with(&text, input.entity_name(), baseline);
    }
    let country = input.country.trim();
    canonical_country_id(country)
        .map(str::to_string)
        .unwrap_or_else(|| country.to_lowercase())
}

/// Trim, collapse inner whitespace, drop trailing commas.
pub fn clean_field(s: &str) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

/// Ordered query variants. Variants with nothing but the country are dropped,
/// and a query string already present is not repeated.
pub fn build_variants(
    address: &str,
    postal_code: &str,
    city: &str,
    name: &str,
    country: &str,
) -> Vec<QueryVariant> {
    let mut plan: Vec<(VariantKind, Vec<&str>)> = vec![
        (VariantKind::Full, vec![address, postal_code, city]),
        (VariantKind::WithoutPostal, vec![address, city]),
    ];
    if !name.is_empty() {
        plan.push((VariantKind::EntityName, vec![name, city]));
    }
    if !postal_code.is_empty() {
        plan.push((VariantKind::PostalCity, vec![postal_code, city]));
        plan.push((VariantKind::PostalCountry, vec![postal_code]));
    }
    plan.push((VariantKind::CityCountry, vec![city]));

    let mut variants: Vec<QueryVariant> = Vec::with_capacity(plan.len());
    for (kind, parts) in plan {
        let parts: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            continue;
        }
        let text = parts
            .into_iter()
            .chain(Some(country).filter(|c| !c.is_empty()))
            .collect::<Vec<_>>()
            .join(", ");
        if variants.iter().any(|v| v.text == text) {
            continue;
        }
        variants.push(QueryVariant { kind, text });
    }
    variants
}

fn loosely_matches(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim().to_lowercase(), b.trim().to_lowercase());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    let (a, b) = (normalize_text(&a), normalize_text(&b));
    a.contains(&b) || b.contains(&a)
}

pub fn score_candidate(
    candidate: &GeocodeCandidate,
    expected: &Expectation,
    attempt: usize,
    lenient: bool,
    scoring: &ScoringConfig,
) -> CandidateScore {
    let country_match = lenient
        || expected.country_code.is_none()
        || candidate
            .country
            .as_deref()
            .is_some_and(|c| loosely_matches(c, &expected.country_name))
        || candidate.country_code.as_deref() == expected.country_code.as_deref();

    let city_match = lenient
        || candidate
            .locality
            .as_deref()
            .is_some_and(|l| loosely_matches(l, &expected.city));

    let postal_match = !expected.postal_code.is_empty()
        && candidate.postal_code.as_deref().map(str::trim) == Some(expected.postal_code.as_str());

    let mut score = candidate.importance;
    if country_match {
        score += scoring.country_bonus;
    }
    if city_match {
        score += scoring.city_bonus;
    }
    if postal_match {
        score += scoring.postal_bonus;
    }
    if attempt == 0 {
        score += scoring.first_attempt_bonus;
    }

    CandidateScore {
        score,
        country_match,
        city_match,
    }
}

pub fn is_acceptable(scored: &CandidateScore, attempt: usize, scoring: &ScoringConfig) -> bool {
    (scored.country_match && scored.city_match)
        || scored.score > scoring.accept_threshold
        || attempt >= scoring.accept_any_from_attempt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::providers::SearchFuture;
    use approx::assert_abs_diff_eq;
    use std::sync::Mutex;

    fn texts(variants: &[QueryVariant]) -> Vec<&str> {
        variants.iter().map(|v| v.text.as_str()).collect()
    }

    fn poland() -> Expectation {
        Expectation {
            country_name: "Poland".into(),
            country_code: Some("pl".into()),
            city: "Kraków".into(),
            postal_code: "31-042".into(),
        }
    }

    fn candidate(lat: f64, lon: f64) -> GeocodeCandidate {
        GeocodeCandidate {
            lat: Some(lat),
            lon: Some(lon),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("  Rynek   Główny 1 ,, "), "Rynek Główny 1");
        assert_eq!(clean_field("Kraków,"), "Kraków");
        assert_eq!(clean_field("   "), "");
        assert_eq!(clean_field("a, b"), "a, b");
    }

    #[test]
    fn test_variants_full_order() {
        let v = build_variants("Rynek Główny 1", "31-042", "Kraków", "Sukiennice", "Poland");
        assert_eq!(
            texts(&v),
            vec![
                "Rynek Główny 1, 31-042, Kraków, Poland",
                "Rynek Główny 1, Kraków, Poland",
                "Sukiennice, Kraków, Poland",
                "31-042, Kraków, Poland",
                "31-042, Poland",
                "Kraków, Poland",
            ]
        );
        assert_eq!(v[2].kind, VariantKind::EntityName);
        assert_eq!(v[5].kind, VariantKind::CityCountry);
    }

    #[test]
    fn test_variants_without_postal_or_name() {
        let v = build_variants("Grand Place 1", "", "Bruxelles", "", "Belgium");
        assert_eq!(
            texts(&v),
            vec![
                "Grand Place 1, Bruxelles, Belgium",
                "Bruxelles, Belgium",
            ]
        );
        // Full and WithoutPostal collapse into one query.
        assert_eq!(v[0].kind, VariantKind::Full);
    }

    #[test]
    fn test_variants_skip_country_only_queries() {
        assert!(build_variants("", "", "", "", "France").is_empty());
        let v = build_variants("", "75001", "", "", "France");
        assert_eq!(texts(&v), vec!["75001, France"]);
    }

    #[test]
    fn test_resolve_country_generic_is_inferred() {
        let input = AddressInput {
            address: "Rynek Główny 1".into(),
            postal_code: "31-042".into(),
            city: "Kraków".into(),
            country: "France".into(),
            ..Default::default()
        };
        assert_eq!(resolve_country(&input, "france"), "poland");
    }

    #[test]
    fn test_resolve_country_explicit_is_kept() {
        let input = AddressInput {
            city: "Bruxelles".into(),
            country: "Polska".into(),
            ..Default::default()
        };
        assert_eq!(resolve_country(&input, "france"), "poland");

        let input = AddressInput {
            city: "Osaka".into(),
            country: "Japan".into(),
            ..Default::default()
        };
        assert_eq!(resolve_country(&input, "france"), "japan");
    }

    #[test]
    fn test_score_full_match_first_attempt() {
        let c = GeocodeCandidate {
            country: Some("Polska".into()),
            country_code: Some("pl".into()),
            locality: Some("Kraków".into()),
            postal_code: Some("31-042".into()),
            importance: 0.5,
            ..candidate(50.06, 19.94)
        };
        let s = score_candidate(&c, &poland(), 0, false, &ScoringConfig::default());
        assert!(s.country_match);
        assert!(s.city_match);
        assert_abs_diff_eq!(s.score, 0.5 + 0.3 + 0.3 + 0.2 + 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_score_city_matches_without_diacritics() {
        let c = GeocodeCandidate {
            locality: Some("Krakow".into()),
            ..candidate(50.06, 19.94)
        };
        let s = score_candidate(&c, &poland(), 1, false, &ScoringConfig::default());
        assert!(s.city_match);
        // Country code absent and country name absent: no country match.
        assert!(!s.country_match);
    }

    #[test]
    fn test_score_mismatch_strict_then_lenient() {
        let c = GeocodeCandidate {
            country: Some("Germany".into()),
            country_code: Some("de".into()),
            locality: Some("Berlin".into()),
            importance: 0.05,
            ..candidate(52.5, 13.4)
        };
        let strict = score_candidate(&c, &poland(), 1, false, &ScoringConfig::default());
        assert!(!strict.country_match && !strict.city_match);
        assert_abs_diff_eq!(strict.score, 0.05, epsilon = 1e-9);
        assert!(!is_acceptable(&strict, 1, &ScoringConfig::default()));

        let lenient = score_candidate(&c, &poland(), 4, true, &ScoringConfig::default());
        assert!(lenient.country_match && lenient.city_match);
    }

    #[test]
    fn test_no_country_filter_counts_as_country_match() {
        let expected = Expectation {
            country_name: "Japan".into(),
            country_code: None,
            city: "Osaka".into(),
            postal_code: String::new(),
        };
        let s = score_candidate(&candidate(34.69, 135.5), &expected, 1, false, &ScoringConfig::default());
        assert!(s.country_match);
        assert!(!s.city_match);
    }

    #[test]
    fn test_acceptance_rules() {
        let scoring = ScoringConfig::default();
        let weak = CandidateScore { score: 0.2, country_match: true, city_match: false };
        assert!(!is_acceptable(&weak, 0, &scoring));
        assert!(!is_acceptable(&weak, 1, &scoring));
        assert!(is_acceptable(&weak, 2, &scoring));

        let both = CandidateScore { score: 0.0, country_match: true, city_match: true };
        assert!(is_acceptable(&both, 0, &scoring));

        let high = CandidateScore { score: 0.41, country_match: false, city_match: false };
        assert!(is_acceptable(&high, 0, &scoring));
        let edge = CandidateScore { score: 0.4, country_match: false, city_match: false };
        assert!(!is_acceptable(&edge, 0, &scoring));
    }

    /// Answers each call from a queue of canned responses and records the queries.
    struct Canned {
        responses: Mutex<Vec<Result<Vec<GeocodeCandidate>, LocationError>>>,
        seen: Mutex<Vec<SearchQuery>>,
    }

    impl Canned {
        fn new(mut responses: Vec<Result<Vec<GeocodeCandidate>, LocationError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl GeocodeProvider for Canned {
        fn search<'a>(&'a self, query: &'a SearchQuery) -> SearchFuture<'a> {
            self.seen.lock().unwrap().push(query.clone());
            let next = self.responses.lock().unwrap().pop().unwrap_or(Ok(Vec::new()));
            Box::pin(async move { next })
        }
    }

    fn fast_config() -> GeocoderConfig {
        GeocoderConfig {
            rate_limit_delay_ms: 1,
            ..GeocoderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_errors_and_invalid_candidates_advance_to_next_variant() {
        let provider = Canned::new(vec![
            Err(LocationError::Status(503)),
            Ok(vec![candidate(0.0, 0.0), candidate(f64::NAN, 10.0)]),
            Ok(vec![candidate(50.06, 19.94)]),
        ]);
        let orchestrator = GeocodingOrchestrator::new(provider, fast_config());
        let input = AddressInput {
            address: "Rynek Główny 1".into(),
            postal_code: "31-042".into(),
            city: "Kraków".into(),
            ..Default::default()
        };

        let m = orchestrator.geocode(&input).await.unwrap();
        // Third variant (index 2) accepts any valid candidate.
        assert_eq!(m.attempt, 2);
        assert_eq!(m.coordinate, Coordinate { lat: 50.06, lon: 19.94 });

        let seen = orchestrator.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|q| q.country_code.as_deref() == Some("pl")));
        assert!(seen.iter().all(|q| q.limit == 10));
    }

    #[tokio::test]
    async fn test_geocode_in_uses_given_country() {
        let orchestrator = GeocodingOrchestrator::new(Canned::new(vec![]), fast_config());
        let input = AddressInput {
            address: "Rynek Główny 1".into(),
            city: "Kraków".into(),
            country: "France".into(),
            ..Default::default()
        };
        assert!(orchestrator.geocode_in(&input, "belgium").await.is_none());

        let seen = orchestrator.provider.seen.lock().unwrap();
        assert_eq!(seen[0].text, "Rynek Główny 1, Kraków, Belgium");
        assert!(seen.iter().all(|q| q.country_code.as_deref() == Some("be")));
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_calls() {
        let orchestrator = GeocodingOrchestrator::new(Canned::new(vec![]), fast_config());
        assert!(orchestrator.geocode(&AddressInput::default()).await.is_none());
        assert!(orchestrator.provider.seen.lock().unwrap().is_empty());
    }
}
