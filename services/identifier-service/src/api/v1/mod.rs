//! API v1 routes.

mod codes;
mod lots;
mod scopes;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/codes", codes::routes())
        .nest("/lots", lots::routes())
        .nest("/scopes", scopes::routes())
}
