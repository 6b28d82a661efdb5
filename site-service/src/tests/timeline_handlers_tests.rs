use axum::http::StatusCode;
use serde_json::Value;
use warmcycle_shared::models::{EventDetails, EventStatus};
use warmcycle_shared::test_utils::http_test_utils::{create_test_request, response_to_json};
use warmcycle_shared::test_utils::mock_store::MockStore;

use super::{create_test_app, event};

fn quarter_keys(body: &Value) -> Vec<String> {
    body["quarters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["key"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn timeline_groups_events_by_quarter_newest_first() {
    let store = MockStore::new();
    store.seed_event(event("old", "2023-12-20", EventStatus::Completed, None));
    store.seed_event(event("spring", "2024-05-02", EventStatus::Received, None));
    store.seed_event(event("summer", "2024-08-10", EventStatus::Announced, None));
    store.seed_event(event("summer-2", "2024-07-01", EventStatus::Shipped, None));
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request("GET", "/api/timeline", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;

    assert_eq!(quarter_keys(&body), vec!["2024-Q3", "2024-Q2", "2023-Q4"]);

    let quarters = body["quarters"].as_array().unwrap();
    assert_eq!(quarters[0]["year"], 2024);
    assert_eq!(quarters[0]["quarter"], 3);
    assert_eq!(quarters[0]["expanded"], true);
    assert_eq!(quarters[1]["expanded"], false);
    assert_eq!(quarters[2]["expanded"], false);

    let summer: Vec<&str> = quarters[0]["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(summer, vec!["summer", "summer-2"]);
    assert_eq!(quarters[0]["events"][0]["expanded"], false);
}

#[tokio::test]
async fn empty_timeline_has_no_quarters() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request("GET", "/api/timeline", None, None))
        .await;
    let body = response_to_json(response).await;

    assert!(body["quarters"].as_array().unwrap().is_empty());
    assert!(body["activeDonationLink"].is_null());
}

#[tokio::test]
async fn expand_toggles_come_from_the_query() {
    let store = MockStore::new();
    store.seed_event(event("a", "2024-08-10", EventStatus::Announced, None));
    store.seed_event(event("b", "2023-11-10", EventStatus::Completed, None));
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request(
            "GET",
            "/api/timeline?expand=b&quarters=2023-Q4,2024-Q3,not-a-quarter",
            None,
            None,
        ))
        .await;
    let body = response_to_json(response).await;
    let quarters = body["quarters"].as_array().unwrap();

    // Toggling the default-open quarter closes it.
    assert_eq!(quarters[0]["key"], "2024-Q3");
    assert_eq!(quarters[0]["expanded"], false);
    assert_eq!(quarters[1]["expanded"], true);
    assert_eq!(quarters[1]["events"][0]["expanded"], true);
    assert_eq!(quarters[0]["events"][0]["expanded"], false);
}

#[tokio::test]
async fn donate_link_only_shown_while_collecting() {
    let store = MockStore::new();
    store.seed_event(event(
        "open",
        "2024-08-10",
        EventStatus::Collecting,
        Some("https://give.example/open"),
    ));
    store.seed_event(event(
        "done",
        "2024-09-10",
        EventStatus::Completed,
        Some("https://give.example/stale"),
    ));
    store.seed_event(event("blank", "2024-09-01", EventStatus::Collecting, Some("")));
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request("GET", "/api/timeline", None, None))
        .await;
    let body = response_to_json(response).await;

    assert_eq!(body["activeDonationLink"], "https://give.example/open");

    let items = body["quarters"][0]["events"].as_array().unwrap();
    let link_of = |id: &str| {
        items
            .iter()
            .find(|e| e["id"] == id)
            .map(|e| e["donateLink"].clone())
            .unwrap()
    };
    assert!(link_of("done").is_null());
    assert!(link_of("blank").is_null());
    assert_eq!(link_of("open"), "https://give.example/open");
}

#[tokio::test]
async fn timeline_items_carry_images_preview_and_badge() {
    let store = MockStore::new();
    let mut rich = event("rich", "2024-08-10", EventStatus::Completed, None);
    rich.description = "![Kids](https://cdn.example/kids.jpg)\nWe delivered 200 jackets to the mountain school and the children tried them on right away."
        .to_string();
    rich.images = vec!["https://cdn.example/extra.jpg".to_string()];
    rich.details = Some(EventDetails {
        item_count: Some(200),
        beneficiaries: Some(0),
        feedback_summary: Some("Warm winter".to_string()),
    });
    store.seed_event(rich);
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request("GET", "/api/timeline", None, None))
        .await;
    let body = response_to_json(response).await;
    let item = &body["quarters"][0]["events"][0];

    assert_eq!(item["coverImage"]["url"], "https://cdn.example/kids.jpg");
    assert_eq!(item["coverImage"]["alt"], "Kids");
    assert_eq!(
        item["gallery"],
        serde_json::json!(["https://cdn.example/kids.jpg", "https://cdn.example/extra.jpg"])
    );
    assert_eq!(item["carousel"]["len"], 2);
    assert_eq!(item["carousel"]["index"], 0);

    let preview = item["preview"].as_str().unwrap();
    assert!(preview.starts_with("We delivered"));
    assert!(!preview.contains("!["));

    assert_eq!(item["status"]["code"], "COMPLETED");
    assert_eq!(item["status"]["completedStyle"], true);

    assert_eq!(item["details"]["itemCount"], 200);
    assert!(item["details"].get("beneficiaries").is_none());
    assert_eq!(item["details"]["feedbackSummary"], "Warm winter");
}

#[tokio::test]
async fn event_without_images_has_no_carousel() {
    let store = MockStore::new();
    store.seed_event(event("plain", "2024-08-10", EventStatus::Announced, None));
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request("GET", "/api/timeline", None, None))
        .await;
    let body = response_to_json(response).await;
    let item = &body["quarters"][0]["events"][0];

    assert!(item["carousel"].is_null());
    assert!(item["coverImage"].is_null());
    assert!(item["details"].is_null());
    assert_eq!(item["status"]["completedStyle"], false);
}

#[tokio::test]
async fn events_are_listed_newest_first() {
    let store = MockStore::new();
    store.seed_event(event("older", "2024-01-10", EventStatus::Completed, None));
    store.seed_event(event("newer", "2024-06-10", EventStatus::Announced, None));
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request("GET", "/api/events", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_to_json(response).await;

    let ids: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["newer", "older"]);
}

#[tokio::test]
async fn page_views_increment_with_fallback() {
    let app = create_test_app(MockStore::new()).await;

    let first = app
        .send(create_test_request("POST", "/api/stats/views", None, None))
        .await;
    assert_eq!(response_to_json(first).await["views"], 1);

    app.store.set_fail_atomic_increment(true);
    let second = app
        .send(create_test_request("POST", "/api/stats/views", None, None))
        .await;
    assert_eq!(response_to_json(second).await["views"], 2);
    assert_eq!(app.store.views(), 2);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request("GET", "/api/nowhere", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
