use axum::http::StatusCode;
use mockito::Matcher;
use serde_json::json;
use warmcycle_shared::ai::TextWriter;
use warmcycle_shared::test_utils::http_test_utils::{create_test_request, response_to_json};
use warmcycle_shared::test_utils::mock_store::MockStore;

use super::{create_test_app, TestAppBuilder};

#[tokio::test]
async fn email_only_subscription_is_stored() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({ "name": "Lin", "email": "lin@example.com" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_to_json(response).await;

    assert_eq!(body["subscriber"]["email"], "lin@example.com");
    assert_eq!(body["subscriber"]["wantsPostcard"], false);
    assert!(!body["thankYouNote"].as_str().unwrap().is_empty());

    assert_eq!(app.store.subscribers().len(), 1);
    assert_eq!(app.state.subscribers().await.len(), 1);
}

#[tokio::test]
async fn postcard_without_address_is_rejected() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({
                "name": "Mei",
                "email": "mei@example.com",
                "wantsPostcard": true,
                "phone": "555-0101"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_to_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("address"));

    assert!(app.store.subscribers().is_empty());
    assert!(app.state.subscribers().await.is_empty());
}

#[tokio::test]
async fn postcard_subscription_keeps_contact_details() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({
                "name": "Mei",
                "email": "mei@example.com",
                "wantsPostcard": true,
                "address": "3 Hill Lane",
                "zip": "100000",
                "phone": "555-0101",
                "postcardPeriod": "2024 Winter"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = app.store.subscribers();
    assert_eq!(stored[0].address.as_deref(), Some("3 Hill Lane"));
    assert_eq!(stored[0].postcard_period.as_deref(), Some("2024 Winter"));
}

#[tokio::test]
async fn missing_email_is_rejected() {
    let app = create_test_app(MockStore::new()).await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({ "name": "Lin", "email": "  " })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.subscribers().is_empty());
}

#[tokio::test]
async fn failed_write_leaves_list_untouched() {
    let store = MockStore::new();
    store.set_fail_writes(true);
    let app = create_test_app(store).await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({ "name": "Lin", "email": "lin@example.com" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(app.state.subscribers().await.is_empty());
}

#[tokio::test]
async fn thank_you_note_comes_from_text_api() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/test-model:generateContent")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("Lin".into()))
        .with_status(200)
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Thank you, Lin."}]}}]}"#)
        .create_async()
        .await;

    let app = TestAppBuilder::new(MockStore::new())
        .writer(TextWriter::with_base_url(
            Some("key".into()),
            server.url(),
            "test-model",
        ))
        .build()
        .await;

    let response = app
        .send(create_test_request(
            "POST",
            "/api/subscribers",
            None,
            Some(json!({ "name": "Lin", "email": "lin@example.com" })),
        ))
        .await;
    let body = response_to_json(response).await;

    assert_eq!(body["thankYouNote"], "Thank you, Lin.");
    mock.assert_async().await;
}
