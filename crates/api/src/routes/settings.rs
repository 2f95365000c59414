//! Route definitions for the settings document, mounted at `/settings`.

use axum::routing::get;
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

/// ```text
/// GET  / -> get_settings
/// POST / -> update_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(settings::get_settings).post(settings::update_settings),
    )
}
