//! geoelev Service - HTTP microservice for GeoTIFF elevation lookups.
//!
//! Serves one or more tile folders ("tiers", e.g. by resolution) behind a
//! small JSON API.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GEOELEV_TIERS` | `name=folder` pairs, comma separated | Unset |
//! | `GEOELEV_DATA_DIR` | Single tile folder, served as tier `default` | `.` |
//! | `GEOELEV_SUMMARY_FILE` | Catalog path for `GEOELEV_DATA_DIR` | `<folder>/summary.json` |
//! | `GEOELEV_DEFAULT_TIER` | Tier behind `/api/v1/lookup` | Last tier |
//! | `GEOELEV_OPEN_HANDLES` | Maximum open tiles per tier | 5 |
//! | `GEOELEV_ALWAYS_REBUILD` | Rebuild catalogs on every start | false |
//! | `GEOELEV_CACHE_ALL` | Load every tile into memory | false |
//! | `GEOELEV_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /api/v1/lookup?locations=lat,lng;lat,lng` - Elevations on the default tier
//! - `POST /api/v1/lookup` - Same, with `{"locations": [{"latitude", "longitude"}]}`
//! - `GET|POST /api/v1/lookup/{tier}` - Same, on a named tier
//! - `GET /health` - Health check
//! - `GET /stats` - Per-tier cache statistics

use std::net::SocketAddr;
use std::sync::Arc;

use geoelev_service::{config::ServiceConfig, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoelev_service=info,geoelev=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        tiers = config.tiers.len(),
        default_tier = ?config.default_tier,
        port = config.port,
        "Starting geoelev service"
    );

    // Catalog scans block; finish them before accepting requests
    let state = Arc::new(config.build_state()?);
    tracing::info!(
        default_tier = %state.default_tier().name,
        "All tiers ready"
    );

    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
