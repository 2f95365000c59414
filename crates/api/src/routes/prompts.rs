//! Route definitions for the template library, mounted at `/prompts`.

use axum::routing::get;
use axum::Router;

use crate::handlers::prompts;
use crate::state::AppState;

/// ```text
/// GET    /     -> list_templates
/// POST   /     -> save_template
/// GET    /{id} -> get_template
/// DELETE /{id} -> delete_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(prompts::list_templates).post(prompts::save_template),
        )
        .route(
            "/{id}",
            get(prompts::get_template).delete(prompts::delete_template),
        )
}
