//! The REST surface: `/api/<ver>/<kind>[/<id>]` CRUD, `/api/<ver>/watch/<kind>` streaming
//! watch, and `/healthz`. Exposes one [`router`] entry point; `orc-server` supplies
//! the [`state::ApiState`] and binds the listener.
mod error;
mod format;
mod handlers;
mod kinds;
mod state;

#[cfg(test)]
mod tests;

pub use state::ApiState;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

/// Default REST request timeout: 20 seconds, used when the caller has no configured
/// value of its own. Does not apply to the watch route, which is deliberately exempt from
/// the outer timeout layer below.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub fn router(state: ApiState, request_timeout: Duration) -> Router {
    let versioned = Router::new()
        .route("/{ver}/{kind}", get(handlers::list).post(handlers::create))
        .route(
            "/{ver}/{kind}/{id}",
            get(handlers::get_one).put(handlers::update).delete(handlers::delete),
        )
        .layer(TimeoutLayer::new(request_timeout));

    let watch = Router::new().route("/{ver}/watch/{kind}", get(handlers::watch));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api", versioned.merge(watch))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(state)
}
