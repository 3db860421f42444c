use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::location::defaults::{centroid_list, default_coordinate_for, has_centroid, CentroidInfo};
use crate::location::{
    country_display_name, country_iso_code, infer_country_with, AddressInput, GeocodeMatch,
    GeocodeProvider, LocationSource, ResolvedLocation,
};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub struct ApiError(pub StatusCode, pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /api/locate ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct LocateQuery {
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Fall back to the country centroid (default true).
    pub fallback: Option<bool>,
}

impl LocateQuery {
    fn into_input(self) -> AddressInput {
        AddressInput {
            address: self.address.unwrap_or_default(),
            postal_code: self.postal_code.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            name: self.name,
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocateResponse {
    pub lat: f64,
    pub lon: f64,
    pub source: LocationSource,
    pub country: String,
    pub country_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,
    pub formatted_coords: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<GeocodeMatch>,
}

impl From<ResolvedLocation> for LocateResponse {
    fn from(loc: ResolvedLocation) -> Self {
        let iso = country_iso_code(&loc.country);
        Self {
            lat: loc.lat,
            lon: loc.lon,
            source: loc.source,
            country_name: country_display_name(&loc.country),
            iso_code: (!iso.is_empty()).then(|| iso.to_string()),
            formatted_coords: loc.coordinate().to_string(),
            country: loc.country,
            matched: loc.matched,
        }
    }
}

pub async fn locate<P: GeocodeProvider>(
    State(state): State<Arc<AppState<P>>>,
    Query(params): Query<LocateQuery>,
) -> Result<Json<LocateResponse>, ApiError> {
    let start = Instant::now();
    let fallback = params.fallback.unwrap_or(true);
    let input = params.into_input();

    let blank = [&input.address, &input.postal_code, &input.city]
        .iter()
        .all(|s| s.trim().is_empty());
    if blank && input.entity_name().is_none() && !input.has_stored_coordinates() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Provide at least one of 'address', 'postal_code', 'city', 'name' or 'lat'+'lon'",
        ));
    }

    let resolved = {
        let _permit = state
            .permits
            .acquire()
            .await
            .map_err(|_| api_error(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down"))?;
        if fallback {
            Some(state.resolver.resolve_or_default(&input).await)
        } else {
            state.resolver.resolve(&input).await
        }
    };

    let elapsed = start.elapsed();
    let Some(resolved) = resolved else {
        info!(city = %input.city, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "GET /api/locate -> no result");
        return Err(api_error(StatusCode::NOT_FOUND, "No acceptable coordinate for this address"));
    };

    info!(
        city = %input.city,
        source = %resolved.source,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "GET /api/locate"
    );
    Ok(Json(resolved.into()))
}

// ─── GET /api/infer ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct InferQuery {
    pub text: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InferResponse {
    pub country: String,
    pub display_name: String,
    pub iso_code: String,
}

pub async fn infer<P: GeocodeProvider>(
    State(state): State<Arc<AppState<P>>>,
    Query(params): Query<InferQuery>,
) -> Json<InferResponse> {
    let text = params.text.unwrap_or_default();
    let country = infer_country_with(
        &text,
        params.name.as_deref(),
        &state.resolver.config().baseline_country,
    );
    Json(InferResponse {
        display_name: country_display_name(&country),
        iso_code: country_iso_code(&country).to_string(),
        country,
    })
}

// ─── GET /api/centroid ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct CentroidQuery {
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CentroidResponse {
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    /// False when the baseline market's centroid was substituted.
    pub exact: bool,
}

pub async fn centroid<P: GeocodeProvider>(
    State(state): State<Arc<AppState<P>>>,
    Query(params): Query<CentroidQuery>,
) -> Json<CentroidResponse> {
    let country = params.country.unwrap_or_default();
    let coordinate = default_coordinate_for(&country, &state.resolver.config().baseline_country);
    Json(CentroidResponse {
        exact: has_centroid(&country),
        country,
        lat: coordinate.lat,
        lon: coordinate.lon,
    })
}

// ─── GET /api/centroids ──────────────────────────────────────────

pub async fn centroids() -> Json<Vec<CentroidInfo>> {
    Json(centroid_list())
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
