pub mod todos;

use axum::{routing::get, Json, Router};
use tower_http::trace::TraceLayer;

use super::types::HealthzResponse;

pub fn app(router: Router) -> Router {
    Router::new()
        .route("/healthz", get(|| async { Json(HealthzResponse { message: "OK".into() }) }))
        .merge(router)
        .layer(TraceLayer::new_for_http())
}
