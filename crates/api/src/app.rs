use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::store::BandStore;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, require_auth,
    security_headers_middleware, trace_id,
};
use crate::routes::{admin, assignments, bands, groups, health, pilgrims, telemetry};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BandStore>,
    pub config: Arc<Config>,
}

pub fn create_app(config: Config, store: Arc<dyn BandStore>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        store,
        config: config.clone(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Hardware ingress: called by the physical bands, unauthenticated
    // (rate limiting belongs to the gateway in front of this service).
    let hardware_routes =
        Router::new().route("/api/v1/hardware/ping", post(telemetry::report_location));

    // Moderator routes (any valid API key)
    let moderator_routes = Router::new()
        .route("/api/v1/assignments", post(assignments::assign_band))
        .route(
            "/api/v1/assignments/release",
            post(assignments::release_band),
        )
        .route("/api/v1/groups/:group_id", get(groups::get_group))
        .route(
            "/api/v1/groups/:group_id/available-bands",
            get(groups::get_available_bands),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Admin routes (admin API key): band lifecycle, pool staging, pilgrim
    // directory, fleet statistics, on-demand audits.
    let admin_routes = Router::new()
        .route(
            "/api/v1/bands",
            post(bands::register_band).get(bands::list_bands),
        )
        .route(
            "/api/v1/bands/:serial",
            get(bands::get_band).delete(bands::deregister_band),
        )
        .route(
            "/api/v1/bands/:serial/deactivate",
            post(bands::deactivate_band),
        )
        .route("/api/v1/bands/:serial/activate", post(bands::activate_band))
        .route("/api/v1/groups", post(groups::create_group))
        .route("/api/v1/groups/:group_id/pool", post(groups::stage_band))
        .route(
            "/api/v1/groups/:group_id/pool/:serial",
            delete(groups::unstage_band),
        )
        .route(
            "/api/v1/pilgrims",
            post(pilgrims::create_pilgrim).get(pilgrims::list_pilgrims),
        )
        .route(
            "/api/v1/pilgrims/:pilgrim_id",
            get(pilgrims::get_pilgrim).delete(pilgrims::delete_pilgrim),
        )
        .route("/api/v1/admin/stats", get(admin::get_fleet_stats))
        .route("/api/v1/admin/pool-audit", post(admin::run_pool_audit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(hardware_routes)
        .merge(moderator_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
