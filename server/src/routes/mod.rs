use axum::http::{header, HeaderValue};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{add_security_headers, create_cors_layer, log_security_mode, Config};
use crate::handlers::{health_check, lots, reservations, spots};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    log_security_mode(config.production);

    Router::new()
        .route("/health", get(health_check))
        .route("/lots", get(lots::list_lots).post(lots::create_lot))
        .route(
            "/lots/:lot_id",
            get(lots::get_lot)
                .put(lots::update_lot)
                .delete(lots::delete_lot),
        )
        .route("/lots/:lot_id/reservations", post(lots::book_spot))
        .route("/spots/:spot_id", get(spots::get_spot))
        .route("/reservations", get(reservations::history))
        .route("/reservations/active", get(reservations::active))
        .route(
            "/reservations/:reservation_id/preview",
            get(reservations::preview),
        )
        .route(
            "/reservations/:reservation_id/release",
            post(reservations::release),
        )
        .with_state(state)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(middleware::map_response_with_state(
            config.production,
            add_security_headers,
        ))
        .layer(create_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
