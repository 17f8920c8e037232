#[cfg(feature = "swagger")]
pub mod openapi;
pub mod error;
pub mod estimate;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, state::AppState};

pub fn v1_router(state: AppState) -> Router {
    Router::new()
        .route("/costs/estimate", post(estimate::estimate_bill))
        .route("/tariffs/:provider", get(estimate::get_tariff))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new().nest("/api/v1", v1_router(state));

    if cfg.server.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([
                axum::http::header::AUTHORIZATION,
                axum::http::header::CONTENT_TYPE,
            ]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(cfg.server.request_timeout_secs))),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(feature = "swagger")]
pub fn with_swagger(app: Router) -> Router {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;
    app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
}
