use axum::{
    extract::Request,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use warmcycle_shared::ai::TextWriter;
use warmcycle_shared::auth::{admin_middleware, AdminGate};
use warmcycle_shared::email::Mailer;
use warmcycle_shared::images::ImageBucket;
use warmcycle_shared::store::{dynamo::DynamoStore, SiteStore};

use crate::config::SiteConfig;
use crate::handlers::{
    admin_handlers::{
        delete_event, list_subscribers, login, postcard_queue, publish_event, reload,
        send_bulk_email, update_event, update_postcard_status, upload_image,
    },
    guestbook_handlers::{add_message, list_messages, suggest_encouragement},
    stats_handlers::record_page_view,
    subscriber_handlers::subscribe,
    timeline_handlers::{get_timeline, list_events},
};
use crate::state::AppState;

/// Creates a router backed by DynamoDB and the configured collaborators.
pub async fn create_router(config: &SiteConfig) -> anyhow::Result<Router> {
    info!("Creating router with DynamoDB store");

    let store = Arc::new(DynamoStore::new().await);

    let images = match ImageBucket::from_env() {
        Ok(bucket) => Some(bucket),
        Err(e) => {
            warn!("Image uploads disabled: {}", e);
            None
        }
    };

    let state = AppState::new(
        store,
        Mailer::from_env(),
        TextWriter::from_env(),
        images,
        AdminGate::new(
            config.admin_password.clone(),
            config.admin_token_secret.clone().into_bytes(),
        ),
    );

    state
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("Initial load failed: {}", e))?;

    info!("Using API route prefix: '{}'", config.route_prefix);
    Ok(create_router_with_state(
        Arc::new(state),
        &config.route_prefix,
    ))
}

/// Creates a router over an already-built application state.
pub fn create_router_with_state<S>(state: Arc<AppState<S>>, prefix: &str) -> Router
where
    S: SiteStore + 'static,
{
    info!("Setting up API routes with prefix: '{}'", prefix);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        next.run(req).await
    }

    let public_routes = Router::new()
        .route("/api/timeline", get(get_timeline::<S>))
        .route("/api/events", get(list_events::<S>))
        .route("/api/subscribers", post(subscribe::<S>))
        .route(
            "/api/messages",
            get(list_messages::<S>).post(add_message::<S>),
        )
        .route(
            "/api/messages/encouragement",
            get(suggest_encouragement::<S>),
        )
        .route("/api/stats/views", post(record_page_view::<S>))
        .route("/admin/login", post(login::<S>));

    let admin_routes = Router::new()
        .route("/admin/events", post(publish_event::<S>))
        .route(
            "/admin/events/:id",
            put(update_event::<S>).delete(delete_event::<S>),
        )
        .route("/admin/subscribers", get(list_subscribers::<S>))
        .route(
            "/admin/subscribers/:index/postcard",
            patch(update_postcard_status::<S>),
        )
        .route("/admin/postcards", get(postcard_queue::<S>))
        .route("/admin/emails", post(send_bulk_email::<S>))
        .route("/admin/images", post(upload_image::<S>))
        .route("/admin/reload", post(reload::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            admin_middleware,
        ));

    let api_routes = public_routes.merge(admin_routes).with_state(state);

    let router = if prefix.is_empty() {
        api_routes
            .layer(cors)
            .layer(middleware::from_fn(logging_middleware))
    } else {
        Router::new()
            .nest(prefix, api_routes)
            .layer(cors)
            .layer(middleware::from_fn(logging_middleware))
    };

    router.fallback(|req: Request| async move {
        warn!("No route matched for: {} {}", req.method(), req.uri());
        (
            axum::http::StatusCode::NOT_FOUND,
            "The requested resource was not found".to_string(),
        )
    })
}
