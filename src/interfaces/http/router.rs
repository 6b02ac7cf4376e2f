//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        // Checkout
        .route("/payment/intents", post(handlers::create_intent))
        .route("/payment/intents/:id", get(handlers::get_intent))
        .route("/payment/intents/:id/session", post(handlers::open_session))
        .route("/payment/intents/:id/cancel", post(handlers::cancel_intent))
        // Gateway callback relay
        .route("/payment/verify", post(handlers::verify_payment))
        // Orders
        .route("/orders", get(handlers::list_orders))
        .route("/orders/latest", get(handlers::latest_order))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}
