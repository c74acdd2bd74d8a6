use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::server::endpoints::calendars;
use crate::types::ServerState;

mod endpoints;
mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(calendars::get_index))
        .route("/calendars/", get(calendars::get_index))
        .route("/calendars/:name", get(calendars::get_calendar))
        .with_state(app_state)
}
