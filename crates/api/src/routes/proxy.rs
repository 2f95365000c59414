//! Route definitions for upstream pass-through endpoints, merged at the
//! API root.

use axum::routing::get;
use axum::Router;

use crate::handlers::proxy;
use crate::state::AppState;

/// ```text
/// GET /object_info               -> object_info (cached)
/// GET /object_info/{node_class}  -> object_info_class
/// GET /history                   -> history
/// GET /view                      -> view (streaming)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/object_info", get(proxy::object_info))
        .route("/object_info/{node_class}", get(proxy::object_info_class))
        .route("/history", get(proxy::history))
        .route("/view", get(proxy::view))
}
