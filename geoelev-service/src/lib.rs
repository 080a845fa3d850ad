//! geoelev Service Library
//!
//! HTTP handlers, tier configuration and router for the elevation service.
//! This library is used by both the geoelev-service binary and integration tests.

pub mod config;
pub mod handlers;

use std::sync::{Arc, Mutex};

use axum::{
    http::{header, HeaderName, Method},
    routing::get,
    Router,
};
use geoelev::{ElevationError, ElevationService};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// One tile folder served under its own name.
pub struct Tier {
    /// Path segment under `/api/v1/lookup/`.
    pub name: String,
    /// Lookups lock the service for the whole batch.
    pub service: Arc<Mutex<ElevationService>>,
}

/// Application state shared across handlers.
pub struct AppState {
    tiers: Vec<Tier>,
    default_tier: usize,
}

impl AppState {
    /// Create state from named services.
    ///
    /// `default_tier` names the tier served by the bare lookup endpoint; when
    /// `None` the last tier is used.
    ///
    /// # Errors
    ///
    /// Returns an error if `tiers` is empty or `default_tier` is not one of
    /// the given names.
    pub fn new(
        tiers: Vec<(String, ElevationService)>,
        default_tier: Option<&str>,
    ) -> Result<Self, ElevationError> {
        let tiers: Vec<Tier> = tiers
            .into_iter()
            .map(|(name, service)| Tier {
                name,
                service: Arc::new(Mutex::new(service)),
            })
            .collect();

        let default_tier = match default_tier {
            Some(name) => tiers.iter().position(|t| t.name == name).ok_or_else(|| {
                ElevationError::InvalidConfig(format!("default tier \"{}\" is not configured", name))
            })?,
            None => tiers
                .len()
                .checked_sub(1)
                .ok_or_else(|| ElevationError::InvalidConfig("no tiers configured".into()))?,
        };

        Ok(Self {
            tiers,
            default_tier,
        })
    }

    /// Find a tier by name.
    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// The tier served by `/api/v1/lookup`.
    pub fn default_tier(&self) -> &Tier {
        &self.tiers[self.default_tier]
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/lookup",
            get(handlers::get_lookup).post(handlers::post_lookup),
        )
        .route(
            "/api/v1/lookup/:tier",
            get(handlers::get_tier_lookup).post(handlers::post_tier_lookup),
        )
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::PUT,
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-csrf-token"),
        ])
}

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, HealthResponse, LocationResult, LookupQuery, LookupResponse, StatsResponse,
    TierStats,
};
