use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use warmcycle_shared::models::MessageDraft;
use warmcycle_shared::store::SiteStore;

use crate::error::Result;
use crate::models::MessagesResponse;
use crate::state::AppState;

// GET /api/messages
pub async fn list_messages<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<MessagesResponse>>
where
    S: SiteStore,
{
    Ok(Json(MessagesResponse {
        messages: state.messages().await,
    }))
}

// POST /api/messages
pub async fn add_message<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(draft): Json<MessageDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>)>
where
    S: SiteStore,
{
    let message = state.add_message(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": message })),
    ))
}

// GET /api/messages/encouragement
pub async fn suggest_encouragement<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<serde_json::Value>
where
    S: SiteStore,
{
    let text = state.writer.encouragement().await;
    Json(serde_json::json!({ "text": text }))
}
