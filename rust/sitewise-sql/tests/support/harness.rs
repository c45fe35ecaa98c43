use axum::{
    body::{self, Body},
    http::{self, Method, Request, StatusCode},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use sitewise_sql::{config::AppConfig, server::Server};
use std::{future::Future, sync::Once};
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";

static TRACING_INIT: Once = Once::new();

/// Runs a test closure against an in-process router guarded by a test API key.
pub async fn with_sitewise_harness<F, Fut>(test: F)
where
    F: FnOnce(SitewiseTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    with_config(test_config(), test).await;
}

/// Same as [`with_sitewise_harness`] with caller-supplied configuration.
#[allow(dead_code)]
pub async fn with_config<F, Fut>(config: AppConfig, test: F)
where
    F: FnOnce(SitewiseTestHarness) -> Fut,
    Fut: Future<Output = ()>,
{
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });

    let api_key = config.api_key.clone();
    let router = Server::new(config).router();
    test(SitewiseTestHarness { router, api_key }).await;
}

pub fn test_config() -> AppConfig {
    AppConfig {
        api_key: Some(API_KEY.to_string()),
        ..AppConfig::embedded()
    }
}

#[derive(Clone)]
pub struct SitewiseTestHarness {
    router: Router,
    api_key: Option<String>,
}

#[allow(dead_code)]
impl SitewiseTestHarness {
    pub async fn get(&self, path: &str) -> http::Response<Body> {
        self.send(Method::GET, path, None::<&()>, true).await
    }

    pub async fn get_without_api_key(&self, path: &str) -> http::Response<Body> {
        self.send(Method::GET, path, None::<&()>, false).await
    }

    pub async fn post<T: Serialize>(&self, path: &str, payload: &T) -> http::Response<Body> {
        self.send(Method::POST, path, Some(payload), true).await
    }

    pub async fn post_empty(&self, path: &str) -> http::Response<Body> {
        self.send(Method::POST, path, None::<&()>, true).await
    }

    pub async fn patch<T: Serialize>(&self, path: &str, payload: &T) -> http::Response<Body> {
        self.send(Method::PATCH, path, Some(payload), true).await
    }

    pub async fn put<T: Serialize>(&self, path: &str, payload: &T) -> http::Response<Body> {
        self.send(Method::PUT, path, Some(payload), true).await
    }

    pub async fn delete(&self, path: &str) -> http::Response<Body> {
        self.send(Method::DELETE, path, None::<&()>, true).await
    }

    pub async fn raw(&self, request: Request<Body>) -> http::Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }

    async fn send<T>(
        &self,
        method: Method,
        path: &str,
        payload: Option<&T>,
        include_api_key: bool,
    ) -> http::Response<Body>
    where
        T: Serialize,
    {
        let mut builder = Request::builder().method(method).uri(path);

        if include_api_key {
            if let Some(key) = &self.api_key {
                builder = builder.header("x-api-key", key);
            }
        }

        let body = match payload {
            Some(payload) => {
                builder = builder.header(http::header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(payload).expect("request payload should serialize"))
            }
            None => Body::empty(),
        };

        let request = builder
            .body(body)
            .expect("failed to build harness request");
        self.raw(request).await
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
