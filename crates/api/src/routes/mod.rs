//! Route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::identity_middleware};

pub mod entries;
pub mod health;
pub mod images;

/// Creates the application router with public and protected routes.
#[allow(clippy::needless_pass_by_value)]
pub fn app_routes(state: AppState) -> Router<AppState> {
    // Every diary route needs a verified identity
    let protected_routes = Router::new()
        .merge(entries::routes())
        .merge(images::routes(state.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
