use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use warmcycle_shared::models::DonationEvent;
use warmcycle_shared::store::SiteStore;
use warmcycle_shared::timeline::{group_by_quarter, TimelineView};

use crate::error::Result;
use crate::models::{TimelineItem, TimelineQuarter, TimelineQuery, TimelineResponse};
use crate::state::AppState;

// GET /api/timeline
pub async fn get_timeline<S>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<TimelineResponse>>
where
    S: SiteStore,
{
    let events = state.events().await;

    // The navigation "donate" action follows the first open campaign.
    let active_donation_link = events
        .iter()
        .find_map(|e| e.active_donation_link())
        .map(String::from);

    let buckets = group_by_quarter(events, |e: &DonationEvent| e.date);

    let mut view = TimelineView::new(buckets.iter().map(|b| &b.key));
    for id in query.expanded_events() {
        view.toggle_event(id);
    }
    for key in query.toggled_quarters() {
        view.toggle_quarter(key);
    }

    let quarters = buckets
        .into_iter()
        .map(|bucket| TimelineQuarter {
            key: bucket.key,
            year: bucket.key.year,
            quarter: bucket.key.quarter.number(),
            expanded: view.is_quarter_expanded(&bucket.key),
            events: bucket
                .items
                .into_iter()
                .map(|event| TimelineItem::build(event, &view))
                .collect(),
        })
        .collect();

    Ok(Json(TimelineResponse {
        quarters,
        active_donation_link,
    }))
}

// GET /api/events
pub async fn list_events<S>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<serde_json::Value>>
where
    S: SiteStore,
{
    let events = state.events().await;
    Ok(Json(serde_json::json!({ "events": events })))
}
