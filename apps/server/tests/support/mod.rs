//! Shared harness for the HTTP integration tests
//!
//! Every test gets its own router wired to a fresh in-memory store, so tests
//! run in parallel without sharing data.

use std::{future::Future, pin::Pin, sync::Arc};

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use registrar::{
    api::create_router,
    config::{Config, StoreBackend},
    db::MemoryStore,
    state::AppState,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;

pub type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    router: Router,
}

impl TestApp {
    fn new(config: Config) -> Self {
        let store = MemoryStore::new();
        let state = AppState::with_store(config, Arc::new(store.clone()));
        let router = create_router(state.clone());
        Self {
            state,
            store,
            router,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Vec<u8>)> {
        self.request_with_extra_headers(method, path, body, &[])
            .await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Vec<u8>)> {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty))?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, headers, bytes.to_vec()))
    }

    /// POST a course and return its assigned ID.
    pub async fn create_course(&self, name: &str) -> anyhow::Result<i64> {
        let (status, _headers, body) = self
            .request(
                Method::POST,
                "/api/course",
                Some(to_json_body(&json!({ "name": name }))?),
            )
            .await?;
        assert_status(status, StatusCode::CREATED, "create course");
        let course = json_body(&body)?;
        course["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("course response without id: {course}"))
    }

    /// POST a person and return the response body.
    pub async fn create_person(&self, payload: &Value) -> anyhow::Result<Value> {
        let (status, _headers, body) = self
            .request(Method::POST, "/api/person", Some(to_json_body(payload)?))
            .await?;
        assert_status(status, StatusCode::CREATED, "create person");
        json_body(&body)
    }
}

pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: FnOnce(TestApp) -> TestFuture,
{
    with_test_app_with_config(|_| {}, f).await
}

pub async fn with_test_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: FnOnce(TestApp) -> TestFuture,
{
    let mut config = Config::default();
    config.database.backend = StoreBackend::Memory;
    configure(&mut config);

    f(TestApp::new(config)).await
}

pub fn person_payload(first: &str, last: &str, kind: &str, age: i64, courses: &[i64]) -> Value {
    json!({
        "first_name": first,
        "last_name": last,
        "type": kind,
        "age": age,
        "courses": courses,
    })
}

pub fn to_json_body<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub fn json_body(body: &[u8]) -> anyhow::Result<Value> {
    serde_json::from_slice(body).map_err(|e| {
        anyhow::anyhow!(
            "response is not JSON ({e}): {}",
            String::from_utf8_lossy(body)
        )
    })
}

#[track_caller]
pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(actual, expected, "unexpected status for {context}");
}
