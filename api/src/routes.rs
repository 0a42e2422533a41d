use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, staff_middleware};
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/code", post(handlers::auth::send_code))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh_token))
        .route("/api/categories", get(handlers::categories::list_categories))
        .route("/api/categories/:id", get(handlers::categories::get_category))
        .route("/api/posts", get(handlers::posts::list_posts))
        .route("/api/posts/:id", get(handlers::posts::get_post));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        // Profile endpoints
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/users/me", put(handlers::users::update_me))
        .route("/api/users/me/password", put(handlers::users::change_password))
        // Category management
        .route("/api/categories", post(handlers::categories::create_category))
        .route(
            "/api/categories/:id",
            put(handlers::categories::update_category),
        )
        // Post management
        .route("/api/posts", post(handlers::posts::create_post))
        .route("/api/posts/:id", put(handlers::posts::update_post))
        .route("/api/posts/:id", delete(handlers::posts::delete_post))
        .route("/api/posts/:id/like", post(handlers::posts::like_post))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Staff routes (authentication + staff flag required)
    let staff_routes = Router::new()
        .route(
            "/api/categories/:id",
            delete(handlers::categories::delete_category),
        )
        .route("/api/users", get(handlers::users::list_users))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    staff_middleware,
                )),
        );

    // Metrics endpoint (no authentication for Prometheus scraping)
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_handler));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(staff_routes)
        .merge(metrics_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
