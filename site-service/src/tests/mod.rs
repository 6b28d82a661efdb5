mod subscriber_handlers_tests;
mod timeline_handlers_tests;

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::NaiveDate;
use std::sync::Arc;
use tower::ServiceExt;
use warmcycle_shared::ai::TextWriter;
use warmcycle_shared::auth::AdminGate;
use warmcycle_shared::email::Mailer;
use warmcycle_shared::images::ImageBucket;
use warmcycle_shared::models::{DonationEvent, EventStatus, Subscriber};
use warmcycle_shared::test_utils::mock_store::MockStore;
use warmcycle_shared::test_utils::test_logging::init_test_logging;

use crate::routes::create_router_with_state;
use crate::state::AppState;

pub const TEST_PASSWORD: &str = "warm-hands";
const UNREACHABLE: &str = "http://127.0.0.1:9";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MockStore>,
    pub state: Arc<AppState<MockStore>>,
    pub token: String,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub struct TestAppBuilder {
    store: MockStore,
    mailer: Mailer,
    writer: TextWriter,
    images: Option<ImageBucket>,
}

impl TestAppBuilder {
    pub fn new(store: MockStore) -> Self {
        TestAppBuilder {
            store,
            mailer: Mailer::with_base_url("test-key", "test@warmcycle.space", UNREACHABLE),
            writer: TextWriter::with_base_url(None, UNREACHABLE, "test-model"),
            images: None,
        }
    }

    pub fn mailer(mut self, base_url: String) -> Self {
        self.mailer = Mailer::with_base_url("test-key", "test@warmcycle.space", base_url);
        self
    }

    pub fn writer(mut self, writer: TextWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn images(mut self, bucket: ImageBucket) -> Self {
        self.images = Some(bucket);
        self
    }

    pub async fn build(self) -> TestApp {
        init_test_logging();

        let store = Arc::new(self.store);
        let state = AppState::new(
            store.clone(),
            self.mailer,
            self.writer,
            self.images,
            AdminGate::new(TEST_PASSWORD, "test-secret"),
        );
        state.load().await.unwrap();

        let state = Arc::new(state);
        let token = state.gate.issue_token().unwrap();
        let router = create_router_with_state(state.clone(), "");

        TestApp {
            router,
            store,
            state,
            token,
        }
    }
}

pub async fn create_test_app(store: MockStore) -> TestApp {
    TestAppBuilder::new(store).build().await
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn event(id: &str, on: &str, status: EventStatus, link: Option<&str>) -> DonationEvent {
    DonationEvent {
        record_id: None,
        id: id.to_string(),
        title: format!("Campaign {}", id),
        date: date(on),
        status,
        description: format!("Details for campaign {}.", id),
        donation_link: link.map(String::from),
        images: Vec::new(),
        details: None,
    }
}

pub fn subscriber(name: &str, wants_postcard: bool) -> Subscriber {
    Subscriber {
        record_id: None,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        wants_postcard,
        address: wants_postcard.then(|| "12 School Road".to_string()),
        zip: None,
        phone: wants_postcard.then(|| "555-0100".to_string()),
        postcard_status: None,
        postcard_period: None,
    }
}
