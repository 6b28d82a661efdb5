use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{error, info, warn};
use std::sync::Arc;
use warmcycle_shared::auth::AdminSession;
use warmcycle_shared::email::{recipient_list, render_markdown_email};
use warmcycle_shared::images::{append_markdown_image, markdown_image, ImageError};
use warmcycle_shared::models::EventDraft;
use warmcycle_shared::postcards::{filter_for_postcard_queue, PostcardFilter};
use warmcycle_shared::store::SiteStore;

use crate::error::{AppError, Result};
use crate::models::{
    BulkEmailRequest, DeleteEventQuery, ImageUploadRequest, ImageUploadResponse, LoginRequest,
    NotificationOutcome, PostcardQuery, PostcardQueueResponse, PostcardStatusRequest,
    PublishEventRequest, PublishEventResponse,
};
use crate::state::AppState;

// POST /admin/login
pub async fn login<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    if !state.gate.check_password(&request.password) {
        warn!("Admin login rejected");
        return Err(AppError::unauthorized("Wrong password".into()));
    }

    let token = state.gate.issue_token()?;
    info!("Admin login accepted");
    Ok(Json(serde_json::json!({ "token": token })))
}

// POST /admin/events
pub async fn publish_event<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<PublishEventRequest>,
) -> Result<(StatusCode, Json<PublishEventResponse>)>
where
    S: SiteStore,
{
    let event = state.publish_event(request.draft).await?;

    // The event is already published; a failed dispatch is reported, not raised.
    let notification = if request.notify_subscribers {
        let recipients = recipient_list(&state.subscribers().await);
        let subject = format!("New campaign: {}", event.title);
        let html = render_markdown_email(&event.description);
        match state.mailer.send_bulk(&recipients, &subject, &html).await {
            Ok(report) => NotificationOutcome::sent(report),
            Err(e) => {
                error!("Failed to notify subscribers about {}: {}", event.id, e);
                NotificationOutcome::failed(e.to_string())
            }
        }
    } else {
        NotificationOutcome::skipped()
    };

    Ok((
        StatusCode::CREATED,
        Json(PublishEventResponse {
            event,
            notification,
        }),
    ))
}

// PUT /admin/events/:id
pub async fn update_event<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let event = state.update_event(&id, draft).await?;
    Ok(Json(serde_json::json!({ "event": event })))
}

// DELETE /admin/events/:id?confirm=true
pub async fn delete_event<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteEventQuery>,
    Extension(session): Extension<AdminSession>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    if !query.confirm {
        return Err(AppError::conflict(format!(
            "Deleting event {} cannot be undone; repeat with confirm=true",
            id
        )));
    }

    info!(
        "Deleting event {} (admin session issued at {})",
        id, session.issued_at
    );
    let event = state.delete_event(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": event.id })))
}

// GET /admin/subscribers
pub async fn list_subscribers<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let subscribers = state.subscribers().await;
    Ok(Json(serde_json::json!({ "subscribers": subscribers })))
}

// GET /admin/postcards?filter=PENDING
pub async fn postcard_queue<S>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PostcardQuery>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let filter = match query.filter.as_deref() {
        Some(value) => value
            .parse::<PostcardFilter>()
            .map_err(AppError::bad_request)?,
        None => PostcardFilter::All,
    };

    let subscribers = state.subscribers().await;
    let response = PostcardQueueResponse {
        filter,
        entries: filter_for_postcard_queue(&subscribers, filter),
    };

    let body = serde_json::to_value(&response)
        .map_err(|e| AppError::internal_server_error(e.to_string()))?;
    Ok(Json(body))
}

// PATCH /admin/subscribers/:index/postcard
pub async fn update_postcard_status<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(index): Path<usize>,
    Json(request): Json<PostcardStatusRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let subscriber = state.update_postcard_status(index, request.status).await?;
    Ok(Json(serde_json::json!({ "subscriber": subscriber })))
}

// POST /admin/emails
pub async fn send_bulk_email<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(session): Extension<AdminSession>,
    Json(request): Json<BulkEmailRequest>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    if request.subject.trim().is_empty() || request.body.trim().is_empty() {
        return Err(AppError::bad_request(
            "Email subject and body are required".into(),
        ));
    }

    let recipients = recipient_list(&state.subscribers().await);
    info!(
        "Sending bulk email to {} subscribers (admin session issued at {})",
        recipients.len(),
        session.issued_at
    );

    let html = render_markdown_email(&request.body);
    let report = state
        .mailer
        .send_bulk(&recipients, request.subject.trim(), &html)
        .await?;

    Ok(Json(serde_json::json!({ "report": report })))
}

fn decode_image(payload: &str) -> Result<Vec<u8>> {
    // Accept data URLs as produced by browser file readers.
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => payload,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::bad_request(format!("Image payload is not valid base64: {}", e)))
}

// POST /admin/images
pub async fn upload_image<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<ImageUploadRequest>,
) -> Result<Json<ImageUploadResponse>>
where
    S: SiteStore,
{
    let bucket = state.images.as_ref().ok_or_else(|| {
        AppError::from(ImageError::NotConfigured("no image bucket".into()))
    })?;

    let bytes = decode_image(&request.content_base64)?;
    let url = bucket.upload(bytes, &request.filename).await?;

    Ok(Json(ImageUploadResponse {
        markdown: markdown_image(&request.filename, &url),
        text: append_markdown_image(&request.text, &request.filename, &url),
        target: request.target,
        url,
    }))
}

// POST /admin/reload
pub async fn reload<S>(State(state): State<Arc<AppState<S>>>) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let counts = state.load().await?;
    Ok(Json(serde_json::json!({ "loaded": counts })))
}
