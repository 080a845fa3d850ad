//! HTTP request handlers for the elevation service.

use std::sync::{Arc, PoisonError};

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::{AppState, Tier};

/// Query parameters for the GET lookup endpoints.
#[derive(Debug, Default, PartialEq)]
pub struct LookupQuery {
    /// `lat,lng` pairs separated by `;`.
    pub locations: Option<String>,
}

/// Raw query pairs; unparseable query strings become a JSON 400.
pub type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

impl LookupQuery {
    /// Pick `locations` out of decoded query pairs; the last one wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self {
            locations: pairs
                .into_iter()
                .filter(|(key, _)| key == "locations")
                .map(|(_, value)| value)
                .last(),
        }
    }

    fn extract(query: QueryPairs) -> Result<Self, ApiError> {
        let Query(pairs) = query.map_err(|e| {
            tracing::debug!(error = %e, "Rejected query string");
            ApiError::bad_request("Bad query string.")
        })?;
        Ok(Self::from_pairs(pairs))
    }
}

/// Elevation of one requested location.
#[derive(Debug, Serialize, PartialEq)]
pub struct LocationResult {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters; 0 outside coverage.
    pub elevation: i32,
}

/// Successful lookup response, one result per location in request order.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub results: Vec<LocationResult>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Configured tier names.
    pub tiers: Vec<String>,
}

/// Cache statistics for one tier.
#[derive(Debug, Serialize)]
pub struct TierStats {
    pub name: String,
    /// Number of catalogued tiles.
    pub tiles: usize,
    /// Whether every tile is held in memory.
    pub resident: bool,
    /// Number of tiles currently open.
    pub cached_tiles: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_evictions: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Cache statistics response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub tiers: Vec<TierStats>,
}

/// A request that cannot be served, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Parse `lat,lng;lat,lng` from the `locations` query parameter.
///
/// # Errors
///
/// Returns the client-facing message if the parameter is missing or empty,
/// or if any location is not exactly two numbers.
pub fn parse_query_locations(locations: Option<&str>) -> Result<Vec<(f64, f64)>, String> {
    let locations = match locations {
        Some(l) if !l.is_empty() => l,
        _ => return Err("\"Locations\" is required.".to_string()),
    };

    locations
        .split(';')
        .map(|location| {
            let parts: Vec<&str> = location.split(',').collect();
            match parts.as_slice() {
                [lat, lng] => match (lat.trim().parse(), lng.trim().parse()) {
                    (Ok(lat), Ok(lng)) => Ok((lat, lng)),
                    _ => Err(format!("Bad parameter format \"{}\".", location)),
                },
                _ => Err(format!("Bad parameter format \"{}\".", location)),
            }
        })
        .collect()
}

/// Parse `{"locations": [{"latitude": .., "longitude": ..}, ..]}`.
///
/// # Errors
///
/// Returns the client-facing message if the body is not a JSON object, has
/// no non-empty `locations` array, or contains an entry without numeric
/// `latitude` and `longitude`.
pub fn parse_body_locations(body: &[u8]) -> Result<Vec<(f64, f64)>, String> {
    let json: Value = serde_json::from_slice(body).map_err(|_| "Invalid JSON.".to_string())?;
    let object = json.as_object().ok_or_else(|| "Invalid JSON.".to_string())?;

    let locations = match object.get("locations").and_then(Value::as_array) {
        Some(list) if !list.is_empty() => list,
        _ => return Err("\"Locations\" is required in the body.".to_string()),
    };

    locations
        .iter()
        .map(|location| {
            let lat = location.get("latitude").and_then(Value::as_f64);
            let lng = location.get("longitude").and_then(Value::as_f64);
            match (lat, lng) {
                (Some(lat), Some(lng)) => Ok((lat, lng)),
                _ => Err(format!("\"{}\" is not in a valid format.", location)),
            }
        })
        .collect()
}

/// Resolve every location on the tier's service, off the async runtime.
async fn lookup_all(tier: &Tier, locations: Vec<(f64, f64)>) -> Result<LookupResponse, ApiError> {
    let service = Arc::clone(&tier.service);
    let tier_name = tier.name.clone();

    let results = tokio::task::spawn_blocking(move || {
        let mut service = service.lock().unwrap_or_else(PoisonError::into_inner);
        let elevations = service.lookup_batch(&locations);
        locations
            .into_iter()
            .zip(elevations)
            .map(|((latitude, longitude), elevation)| LocationResult {
                latitude,
                longitude,
                elevation,
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        tracing::error!(tier = %tier_name, error = %e, "Lookup task failed");
        ApiError::internal("Lookup failed.")
    })?;

    tracing::debug!(tier = %tier.name, count = results.len(), "Lookup served");
    Ok(LookupResponse { results })
}

fn find_tier<'a>(state: &'a AppState, name: &str) -> Result<&'a Tier, ApiError> {
    state
        .tier(name)
        .ok_or_else(|| ApiError::not_found(format!("Unknown tier \"{}\".", name)))
}

async fn get_lookup_on(tier: &Tier, query: LookupQuery) -> Result<Json<LookupResponse>, ApiError> {
    let locations =
        parse_query_locations(query.locations.as_deref()).map_err(ApiError::bad_request)?;
    Ok(Json(lookup_all(tier, locations).await?))
}

async fn post_lookup_on(tier: &Tier, body: &[u8]) -> Result<Json<LookupResponse>, ApiError> {
    let locations = parse_body_locations(body).map_err(ApiError::bad_request)?;
    Ok(Json(lookup_all(tier, locations).await?))
}

/// Look up `?locations=lat,lng;lat,lng` on the default tier.
///
/// # Returns
///
/// - `200 OK` with one result per location
/// - `400 Bad Request` if `locations` is missing or malformed
pub async fn get_lookup(
    State(state): State<Arc<AppState>>,
    query: QueryPairs,
) -> Result<Json<LookupResponse>, ApiError> {
    get_lookup_on(state.default_tier(), LookupQuery::extract(query)?).await
}

/// Look up a JSON body of locations on the default tier.
pub async fn post_lookup(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<LookupResponse>, ApiError> {
    post_lookup_on(state.default_tier(), &body).await
}

/// Look up `?locations=...` on a named tier.
///
/// # Returns
///
/// - `200 OK` with one result per location
/// - `400 Bad Request` if `locations` is missing or malformed
/// - `404 Not Found` if the tier is not configured
pub async fn get_tier_lookup(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
    query: QueryPairs,
) -> Result<Json<LookupResponse>, ApiError> {
    let query = LookupQuery::extract(query)?;
    get_lookup_on(find_tier(&state, &tier)?, query).await
}

/// Look up a JSON body of locations on a named tier.
pub async fn post_tier_lookup(
    State(state): State<Arc<AppState>>,
    Path(tier): Path<String>,
    body: Bytes,
) -> Result<Json<LookupResponse>, ApiError> {
    post_lookup_on(find_tier(&state, &tier)?, &body).await
}

/// Health check endpoint.
///
/// Returns service status, version and configured tiers.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tiers: state.tiers().iter().map(|t| t.name.clone()).collect(),
    })
}

/// Get cache statistics for every tier.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let tiers = tokio::task::spawn_blocking(move || {
        state
            .tiers()
            .iter()
            .map(|tier| {
                let service = tier.service.lock().unwrap_or_else(PoisonError::into_inner);
                let stats = service.cache_stats();
                TierStats {
                    name: tier.name.clone(),
                    tiles: service.catalog().len(),
                    resident: service.is_resident(),
                    cached_tiles: stats.entry_count,
                    cache_hits: stats.hit_count,
                    cache_misses: stats.miss_count,
                    cache_evictions: stats.eviction_count,
                    hit_rate: stats.hit_rate(),
                }
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Stats task failed");
        ApiError::internal("Stats unavailable.")
    })?;

    Ok(Json(StatsResponse { tiers }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_locations() {
        let locations = parse_query_locations(Some("15,105;-12.5, 77.25")).unwrap();
        assert_eq!(locations, vec![(15.0, 105.0), (-12.5, 77.25)]);
    }

    #[test]
    fn test_parse_query_locations_errors() {
        assert_eq!(
            parse_query_locations(None).unwrap_err(),
            "\"Locations\" is required."
        );
        assert_eq!(
            parse_query_locations(Some("")).unwrap_err(),
            "\"Locations\" is required."
        );
        assert_eq!(
            parse_query_locations(Some("15,105;abc")).unwrap_err(),
            "Bad parameter format \"abc\"."
        );
        assert_eq!(
            parse_query_locations(Some("1,2,3")).unwrap_err(),
            "Bad parameter format \"1,2,3\"."
        );
        assert_eq!(
            parse_query_locations(Some("15,105;")).unwrap_err(),
            "Bad parameter format \"\"."
        );
    }

    #[test]
    fn test_lookup_query_last_locations_wins() {
        let pair = |k: &str, v: &str| (k.to_string(), v.to_string());

        let query = LookupQuery::from_pairs(vec![
            pair("locations", "15,105"),
            pair("format", "json"),
            pair("locations", "16,106"),
        ]);
        assert_eq!(query.locations.as_deref(), Some("16,106"));

        assert_eq!(
            LookupQuery::from_pairs(vec![pair("format", "json")]),
            LookupQuery::default()
        );
    }

    #[test]
    fn test_parse_body_locations() {
        let body = br#"{"locations": [{"latitude": 15, "longitude": 105.5}]}"#;
        assert_eq!(parse_body_locations(body).unwrap(), vec![(15.0, 105.5)]);
    }

    #[test]
    fn test_parse_body_locations_errors() {
        assert_eq!(parse_body_locations(b"{oops").unwrap_err(), "Invalid JSON.");
        assert_eq!(parse_body_locations(b"[1, 2]").unwrap_err(), "Invalid JSON.");
        assert_eq!(
            parse_body_locations(br#"{"locations": []}"#).unwrap_err(),
            "\"Locations\" is required in the body."
        );
        assert_eq!(
            parse_body_locations(br#"{"points": [{"latitude": 1, "longitude": 2}]}"#).unwrap_err(),
            "\"Locations\" is required in the body."
        );
        assert_eq!(
            parse_body_locations(br#"{"locations": [{"lat": 1, "longitude": 2}]}"#).unwrap_err(),
            "\"{\"lat\":1,\"longitude\":2}\" is not in a valid format."
        );
    }

    #[test]
    fn test_lookup_response_serialize() {
        let response = LookupResponse {
            results: vec![LocationResult {
                latitude: 15.0,
                longitude: 105.0,
                elevation: 505,
            }],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][0]["elevation"], 505);
        assert_eq!(json["results"][0]["latitude"], 15.0);
    }

    #[test]
    fn test_error_response_serialize() {
        let response = ErrorResponse {
            error: "Invalid JSON.".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"error":"Invalid JSON."}"#);
    }
}
