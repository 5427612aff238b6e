#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use stockroom_api::{
    config::AppConfig,
    db,
    entities::{catalogue, location},
    events,
    handlers::AppServices,
    services::catalogue::{CatalogueEntryFields, NewCatalogueEntry},
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str =
    "k7Qz9pLm2Xv8Rt4Wn6Yb3Jc5Hd1Fg0Se-stockroom-test-secret-9Tq2Lw7Vx4Nz";
pub const TEST_USER: &str = "bench-tech";

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub brand_id: i32,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection, so every query sees the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(db_arc, cfg, Arc::new(event_sender));
        let token = state
            .auth
            .issue_token(TEST_USER)
            .expect("issue test token");
        let brand_id = state
            .services
            .catalogue
            .create_brand("Sick")
            .await
            .expect("seed brand")
            .brand_id;

        let router = stockroom_api::app_router(state.clone());

        Self {
            router,
            state,
            brand_id,
            token,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Access the bearer token for the default user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Adds a catalogue entry under the harness brand.
    pub async fn seed_part(&self, part_number: &str) -> catalogue::Model {
        self.services()
            .catalogue
            .create_entry(
                NewCatalogueEntry {
                    part_number: part_number.to_string(),
                    fields: CatalogueEntryFields {
                        brand_id: self.brand_id,
                        description: Some(format!("Test part {}", part_number)),
                        ..Default::default()
                    },
                },
                Some(TEST_USER.to_string()),
            )
            .await
            .expect("seed catalogue entry")
    }

    pub async fn seed_location(&self, name: &str) -> location::Model {
        self.services()
            .locations
            .create_location(name)
            .await
            .expect("seed location")
    }
}

/// Reads a response body as JSON.
pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
