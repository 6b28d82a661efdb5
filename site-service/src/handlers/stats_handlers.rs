use axum::{extract::State, Json};
use log::debug;
use std::sync::Arc;
use warmcycle_shared::store::SiteStore;

use crate::error::Result;
use crate::state::AppState;

// POST /api/stats/views
pub async fn record_page_view<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let views = state.store.record_page_view().await?;
    debug!("Page views now {}", views);
    Ok(Json(serde_json::json!({ "views": views })))
}
