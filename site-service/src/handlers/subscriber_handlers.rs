use axum::{extract::State, http::StatusCode, Json};
use log::info;
use std::sync::Arc;
use warmcycle_shared::models::SubscriberForm;
use warmcycle_shared::store::SiteStore;

use crate::error::Result;
use crate::models::SubscribeResponse;
use crate::state::AppState;

// POST /api/subscribers
pub async fn subscribe<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(form): Json<SubscriberForm>,
) -> Result<(StatusCode, Json<SubscribeResponse>)>
where
    S: SiteStore,
{
    let subscriber = state.add_subscriber(form).await?;
    info!(
        "New subscriber (postcard requested: {})",
        subscriber.wants_postcard
    );

    let thank_you_note = state
        .writer
        .thank_you_note(&subscriber.name, subscriber.wants_postcard)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            subscriber,
            thank_you_note,
        }),
    ))
}
