use async_trait::async_trait;
use axum::{
    body::Body,
    http::{self, Request, StatusCode},
};
use serde_json::json;
use shared::{config::WorkerConfig, AppError, DatabaseService};
use sheet_sync::{
    create_app_router,
    models::{ReplicationRecord, RowId},
    processing::{BatchQueue, BatchWorkerPool, Dispatcher},
    services::{DestinationStore, DestinationWriter, SheetRowFetcher, SmartsheetClient},
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[derive(Debug, Clone, PartialEq)]
enum Applied {
    Insert(Vec<String>),
    Update(Vec<String>),
    Delete(u64),
}

#[derive(Default, Clone)]
struct MemoryStore {
    applied: Arc<Mutex<Vec<Applied>>>,
}

#[async_trait]
impl DestinationStore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn DestinationWriter>, AppError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl DestinationWriter for MemoryStore {
    async fn insert(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        let values = record.values().to_vec();
        self.applied.lock().unwrap().push(Applied::Insert(values));
        Ok(())
    }

    async fn update(&mut self, record: &ReplicationRecord) -> Result<(), AppError> {
        let values = record.values().to_vec();
        self.applied.lock().unwrap().push(Applied::Update(values));
        Ok(())
    }

    async fn delete(&mut self, row_id: RowId) -> Result<(), AppError> {
        self.applied.lock().unwrap().push(Applied::Delete(row_id.0));
        Ok(())
    }
}

struct Harness {
    app: axum::Router,
    pool: BatchWorkerPool,
    store: MemoryStore,
}

fn harness(source: &MockServer) -> Harness {
    let client = SmartsheetClient::with_client(reqwest::Client::new(), &source.uri(), "token");
    let store = MemoryStore::default();
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(SheetRowFetcher::new(client, 10)),
        Arc::new(store.clone()),
    ));

    let (queue, receiver) = BatchQueue::new(8);
    let pool = BatchWorkerPool::start(dispatcher, receiver, queue.stats(), 2);

    let lazy_pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/sheet_sync_test")
        .unwrap();
    let state = AppState::new(
        queue,
        DatabaseService::from_pool(lazy_pool),
        WorkerConfig {
            max_concurrent_batches: 2,
            queue_capacity: 8,
        },
    );

    Harness {
        app: create_app_router(Arc::new(state)),
        pool,
        store,
    }
}

fn callback(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(http::Method::POST)
        .uri("/")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn mount_row(server: &MockServer, row_id: u64, version: i64, cells: &[&str]) {
    let cells: Vec<_> = cells
        .iter()
        .enumerate()
        .map(|(i, value)| json!({"columnId": i + 1, "value": value}))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/sheets/10/rows/{}", row_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": row_id,
            "version": version,
            "cells": cells
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_created_row_is_replicated() {
    let source = MockServer::start().await;
    mount_row(&source, 42, 1, &["East", "1001", "Acme", "Jo", "Y", "B1", "note"]).await;
    let Harness { app, pool, store } = harness(&source);

    let response = app
        .oneshot(callback(json!({
            "scope": "sheet",
            "scopeObjectId": 10,
            "events": [{"objectType": "row", "eventType": "created", "id": 42}]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Dropping the router closes the queue; workers finish what was accepted
    pool.join().await;

    let applied = store.applied.lock().unwrap().clone();
    assert_eq!(
        applied,
        vec![Applied::Insert(
            ["East", "1001", "Acme", "Jo", "Y", "B1", "note", "42"]
                .iter()
                .map(|v| v.to_string())
                .collect()
        )]
    );
}

#[tokio::test]
async fn test_mixed_batch_applies_in_order() {
    let source = MockServer::start().await;
    mount_row(&source, 7, 3, &["W", "2", "Beta", "Al", "N", "B2", ""]).await;
    Mock::given(method("GET"))
        .and(path("/sheets/10/rows/8"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorCode": 1006,
            "message": "Not Found"
        })))
        .mount(&source)
        .await;
    let Harness { app, pool, store } = harness(&source);

    let response = app
        .oneshot(callback(json!({
            "scope": "sheet",
            "events": [
                {"objectType": "row", "eventType": "updated", "id": 7},
                {"objectType": "cell", "eventType": "updated", "rowId": 7, "columnId": 1},
                {"objectType": "row", "eventType": "updated", "id": 7},
                {"objectType": "row", "eventType": "updated", "id": 8},
                {"objectType": "row", "eventType": "deleted", "id": 9}
            ]
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    pool.join().await;

    let applied = store.applied.lock().unwrap().clone();
    assert_eq!(applied.len(), 2);
    assert!(matches!(&applied[0], Applied::Update(values) if values[7] == "7" && values[6].is_empty()));
    assert_eq!(applied[1], Applied::Delete(9));
}

#[tokio::test]
async fn test_verification_does_not_reach_workers() {
    let source = MockServer::start().await;
    let Harness { app, pool, store } = harness(&source);

    let response = app
        .oneshot(callback(json!({"challenge": "d78dd1d3", "webhookId": 7})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"smartsheetHookResponse": "d78dd1d3"}));

    pool.join().await;
    assert!(store.applied.lock().unwrap().is_empty());
}
