use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers::*;

pub fn queue_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_queue).post(add_to_queue))
        .route("/{entry_id}", patch(update_queue_entry).delete(remove_from_queue))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
