//! Serial re-geocoding of a catalog of addresses.
//!
//! Records are resolved one after another with the provider pause between
//! them, so a large catalog never fans out against the rate limit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::location::{AddressInput, GeocodeProvider, LocationResolver, ResolvedLocation};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Resolved { location: ResolvedLocation },
    /// No acceptable coordinate; the record needs manual review.
    Unresolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRecord {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
    pub resolved_at: DateTime<Utc>,
}

/// Read a JSON array of addresses.
pub fn read_inputs(path: &Path) -> Result<Vec<AddressInput>, BatchError> {
    let data = fs::read_to_string(path).map_err(|source| BatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| BatchError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve every input in order, handing each record to `sink` as soon as it
/// is known. With `fallback`, unresolved records get their country centroid.
pub async fn run_batch<P, F>(
    resolver: &LocationResolver<P>,
    inputs: &[AddressInput],
    fallback: bool,
    mut sink: F,
) -> BatchSummary
where
    P: GeocodeProvider,
    F: FnMut(&BatchRecord),
{
    let delay = resolver.config().rate_limit_delay();
    let mut summary = BatchSummary::default();

    for (index, input) in inputs.iter().enumerate() {
        if index > 0 && !resolver.is_offline() {
            tokio::time::sleep(delay).await;
        }

        let resolved = if fallback {
            Some(resolver.resolve_or_default(input).await)
        } else {
            resolver.resolve(input).await
        };

        let outcome = match resolved {
            Some(location) => {
                summary.resolved += 1;
                BatchOutcome::Resolved { location }
            }
            None => {
                summary.unresolved += 1;
                BatchOutcome::Unresolved
            }
        };
        sink(&BatchRecord {
            index,
            outcome,
            resolved_at: Utc::now(),
        });
    }

    info!(resolved = summary.resolved, unresolved = summary.unresolved, "batch finished");
    summary
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub resolved: usize,
    pub unresolved: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeocoderConfig;
    use crate::location::LocationSource;
    use tempfile::TempDir;

    #[test]
    fn test_read_inputs_partial_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("venues.json");
        fs::write(
            &path,
            r#"[
                { "city": "Kraków", "postal_code": "31-042" },
                { "address": "Grand Place", "city": "Bruxelles", "name": "Maison du Roi", "lat": 50.8467, "lon": 4.3525 }
            ]"#,
        )
        .unwrap();

        let inputs = read_inputs(&path).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].country, "");
        assert_eq!(inputs[1].entity_name(), Some("Maison du Roi"));
        assert_eq!(inputs[1].lat, Some(50.8467));
    }

    #[test]
    fn test_read_inputs_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_inputs(&dir.path().join("missing.json")),
            Err(BatchError::Read { .. })
        ));
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"city": "not an array"}"#).unwrap();
        assert!(matches!(read_inputs(&path), Err(BatchError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_offline_batch() {
        let mut resolver = LocationResolver::from_config(GeocoderConfig::default());
        resolver.set_offline(true);
        let inputs = vec![
            AddressInput {
                city: "Paris".into(),
                lat: Some(48.8566),
                lon: Some(2.3522),
                ..Default::default()
            },
            AddressInput {
                city: "Gdańsk".into(),
                ..Default::default()
            },
        ];

        let mut records = Vec::new();
        let summary = run_batch(&resolver, &inputs, false, |r| records.push(r.clone())).await;
        assert_eq!(summary, BatchSummary { resolved: 1, unresolved: 1 });
        assert!(matches!(
            &records[0].outcome,
            BatchOutcome::Resolved { location } if location.source == LocationSource::Stored
        ));
        assert!(matches!(records[1].outcome, BatchOutcome::Unresolved));

        let mut records = Vec::new();
        let summary = run_batch(&resolver, &inputs, true, |r| records.push(r.clone())).await;
        assert_eq!(summary.resolved, 2);
        let json = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(json["status"], "resolved");
        assert_eq!(json["location"]["source"], "fallback");
        assert_eq!(json["location"]["country"], "poland");
    }
}
