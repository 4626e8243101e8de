//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use cattery::auth::{Clock, SecretScheme};
use cattery::config::Config;
use cattery::store::Backends;
use cattery::{api, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Clock the tests move by hand.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn starting_at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn test_config() -> Config {
    let mut cfg = Config::with_secret(SECRET);
    // argon2 is covered separately; plain keeps the suites fast
    cfg.password_scheme = SecretScheme::Plain;
    cfg
}

pub fn state_with(cfg: Config) -> (Arc<AppState>, Arc<ManualClock>) {
    let clock = ManualClock::starting_at(1_700_000_000);
    let state = AppState::new(cfg, Backends::in_memory(), clock.clone()).unwrap();
    (Arc::new(state), clock)
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(cfg: Config) -> Self {
        let (state, clock) = state_with(cfg);
        Self {
            router: api::app(state.clone()),
            state,
            clock,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.send_request(req).await
    }

    pub async fn send_request(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, json)
    }

    /// Registers `email` and signs in, returning the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let creds = serde_json::json!({"email": email, "password": password});
        let (status, _, _) = self
            .send(Method::POST, "/register/", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {email}");

        let (status, _, body) = self.send(Method::POST, "/signin/", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK, "signin {email}");
        body["token"].as_str().unwrap().to_string()
    }
}
