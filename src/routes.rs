use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler, catalog::catalog_handler, comment::comment_handler,
        review::review_handler, title::title_handler, users::users_handler,
    },
    middleware::auth,
    models::{Category, Genre},
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/categories", catalog_handler::<Category>(app_state.clone()))
        .nest("/genres", catalog_handler::<Genre>(app_state.clone()))
        .nest("/titles", title_handler(app_state.clone()))
        .nest(
            "/titles/{title_id}/reviews",
            review_handler(app_state.clone()),
        )
        .nest(
            "/titles/{title_id}/reviews/{review_id}/comments",
            comment_handler(app_state.clone()),
        )
        // every /users route needs a logged-in user
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api/v1", api_route)
}
