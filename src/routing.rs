//! Application router configuration and the CORS layer.

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use crate::{AppConfig, auth, categories, endpoints, transactions};

/// Return a router with all the app's routes.
pub fn build_router(state: AppConfig) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(auth::register))
        .route(endpoints::LOG_IN, post(auth::log_in))
        .route(
            endpoints::CATEGORIES,
            get(categories::get_categories).post(categories::create_category),
        )
        .route(
            endpoints::TRANSACTIONS,
            get(transactions::get_transactions).post(transactions::create_transaction),
        )
        .route(
            endpoints::TRANSACTION,
            delete(transactions::delete_transaction),
        )
        .with_state(state)
}

/// A health check endpoint for load balancers and uptime monitors.
async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the CORS layer for the configured `allowed_origin`.
///
/// `"*"` allows any origin without credentials; an explicit origin is allowed
/// with credentials.
///
/// # Panics
///
/// Panics if `allowed_origin` is not `"*"` and cannot be used as a header
/// value. This is a configuration error that should abort start-up.
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match allowed_origin {
        "*" => cors.allow_origin(Any),
        origin => {
            let origin = origin
                .parse::<HeaderValue>()
                .expect("The allowed origin is not a valid header value.");

            cors.allow_origin(origin).allow_credentials(true)
        }
    }
}
