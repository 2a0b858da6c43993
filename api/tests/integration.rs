use std::{sync::Arc, time::Duration};

use alert_engine::InMemoryAlertRepository;
use api::{
    app::build_router,
    auth_middleware::AUTH_TOKEN_COOKIE,
    bootstrap::{assemble_state, Collaborators},
    config::AppConfig,
};
use async_trait::async_trait;
use auth::{derive_token, InMemoryUserDirectory, UserDirectory};
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderValue, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::SameSite;
use chrono::NaiveDate;
use domain::{CoreError, CoreResult, RatePoint, User};
use portfolio_engine::InMemoryPortfolioRepository;
use rates::{InMemoryCurrencyRepository, RateProvider, StaticRateProvider};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const PASSWORD: &str = "correct horse";

fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        rates_api_base: "http://127.0.0.1:9".to_string(),
        rates_timeout: Duration::from_secs(1),
        local_currency: "CAD".to_string(),
        rate_lookup_concurrency: 4,
        alert_poll_interval: Duration::from_secs(60),
        enable_alert_worker: false,
        rate_pairs: Vec::new(),
        frontend_origins: vec!["http://localhost:3000".to_string()],
        cookie_secure: false,
        cookie_same_site: SameSite::Lax,
        port: 0,
    }
}

fn cad_rates() -> StaticRateProvider {
    let day = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
    StaticRateProvider::new()
        .with_rate("USD", "CAD", 1.35)
        .with_rate("EUR", "CAD", 1.47)
        .with_series(
            "USD",
            "CAD",
            vec![
                RatePoint { date: day(2), rate: 1.34 },
                RatePoint { date: day(1), rate: 1.33 },
            ],
        )
}

struct DownRates;

#[async_trait]
impl RateProvider for DownRates {
    async fn current_rate(&self, _from: &str, _to: &str) -> CoreResult<f64> {
        Err(CoreError::upstream("connection refused"))
    }

    async fn monthly_series(&self, _from: &str, _to: &str) -> CoreResult<Vec<RatePoint>> {
        Err(CoreError::upstream("connection refused"))
    }
}

struct DownDirectory;

#[async_trait]
impl UserDirectory for DownDirectory {
    async fn find_user_by_id(&self, _user_id: Uuid) -> CoreResult<Option<User>> {
        Err(CoreError::upstream("db down"))
    }

    async fn find_user_by_email(&self, _email: &str) -> CoreResult<Option<User>> {
        Err(CoreError::upstream("db down"))
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        Err(CoreError::upstream("db down"))
    }
}

struct TestApp {
    router: Router,
    user: User,
    token: String,
}

fn test_app_with_rates(rates: Arc<dyn RateProvider>) -> TestApp {
    let user = User {
        id: Uuid::new_v4(),
        email: "alice@example.com".to_string(),
        password_hash: bcrypt::hash(PASSWORD, 4).expect("hash password"),
    };
    let other = User {
        id: Uuid::new_v4(),
        email: "bob@example.com".to_string(),
        password_hash: bcrypt::hash("bob's password", 4).expect("hash password"),
    };
    let token = derive_token(&user.email, &user.password_hash);

    let state = assemble_state(
        &test_config(),
        Collaborators {
            users: Arc::new(InMemoryUserDirectory::new(vec![other, user.clone()])),
            alerts: Arc::new(InMemoryAlertRepository::new()),
            portfolio: Arc::new(InMemoryPortfolioRepository::new()),
            currencies: Arc::new(InMemoryCurrencyRepository::with_symbols(&[
                "CAD", "EUR", "GBP", "USD",
            ])),
            rates,
        },
    );
    let router = build_router(
        state,
        vec![HeaderValue::from_static("http://localhost:3000")],
    );
    TestApp {
        router,
        user,
        token,
    }
}

fn test_app() -> TestApp {
    test_app_with_rates(Arc::new(cad_rates()))
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn authed(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn healthz_reports_local_currency() {
    let app = test_app();
    let (status, body) = app.send(get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "local_currency": "CAD" }));
}

#[tokio::test]
async fn login_returns_token_and_sets_cookie() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "alice@example.com", "password": PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header")
        .to_string();
    assert!(cookie.starts_with(&format!("{AUTH_TOKEN_COOKIE}={}", app.token)));
    assert!(cookie.contains("HttpOnly"));

    let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["token"], app.token);
    assert_eq!(body["user_id"], app.user.id.to_string());
}

#[tokio::test]
async fn login_failures_map_to_statuses() {
    let app = test_app();
    let login = |email: &str, password: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    };
    let (status, _) = app.send(login("nobody@example.com", PASSWORD)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send(login("alice@example.com", "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app();
    let (status, _) = app.send(get("/api/alert")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Request::builder()
                .uri("/api/portfolio")
                .header(header::AUTHORIZATION, "Bearer bm90LWEtdG9rZW4=")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_cookie_is_accepted() {
    let app = test_app();
    let (status, body) = app
        .send(
            Request::builder()
                .uri("/api/isLogin")
                .header(header::COOKIE, format!("{AUTH_TOKEN_COOKIE}={}", app.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "login": true }));

    let (_, body) = app.send(get("/api/isLogin")).await;
    assert_eq!(body, json!({ "login": false }));
}

#[tokio::test]
async fn is_login_surfaces_directory_outage() {
    let state = assemble_state(
        &test_config(),
        Collaborators {
            users: Arc::new(DownDirectory),
            alerts: Arc::new(InMemoryAlertRepository::new()),
            portfolio: Arc::new(InMemoryPortfolioRepository::new()),
            currencies: Arc::new(InMemoryCurrencyRepository::with_symbols(&["CAD"])),
            rates: Arc::new(cad_rates()),
        },
    );
    let router = build_router(
        state,
        vec![HeaderValue::from_static("http://localhost:3000")],
    );

    let request = Request::builder()
        .uri("/api/isLogin")
        .header(header::AUTHORIZATION, "Bearer some-token")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // Without a token the directory is never consulted.
    let response = router.oneshot(get("/api/isLogin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_expires_cookie() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(cookie.starts_with(&format!("{AUTH_TOKEN_COOKIE}=")));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn alert_lifecycle() {
    let app = test_app();
    let draft = json!({
        "name": "USD dips",
        "from_currency": "usd",
        "to_currency": "cad",
        "threshold": 1.40,
        "is_below": true
    });

    let (status, created) = app.authed(Method::POST, "/api/alert", Some(draft.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], app.user.id.to_string());
    assert_eq!(created["from_currency"], "USD");

    let (status, _) = app.authed(Method::POST, "/api/alert", Some(draft)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // USD/CAD is 1.35, below the 1.40 threshold.
    let (status, active) = app.authed(Method::GET, "/api/alert/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().map(Vec::len), Some(1));

    let (status, updated) = app
        .authed(
            Method::PUT,
            "/api/alert",
            Some(json!({
                "name": "USD dips further",
                "from_currency": "USD",
                "to_currency": "CAD",
                "threshold": 1.30,
                "is_below": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["threshold"], 1.3);

    let (_, active) = app.authed(Method::GET, "/api/alert/active", None).await;
    assert_eq!(active, json!([]));

    let (status, _) = app
        .authed(Method::DELETE, "/api/alert?from=USD&to=CAD", None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .authed(Method::DELETE, "/api/alert?from=USD&to=CAD", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, alerts) = app.authed(Method::GET, "/api/alert", None).await;
    assert_eq!(alerts, json!([]));
}

#[tokio::test]
async fn alert_with_unknown_currency_is_bad_request() {
    let app = test_app();
    let (status, _) = app
        .authed(
            Method::POST,
            "/api/alert",
            Some(json!({
                "name": "nope",
                "from_currency": "XYZ",
                "to_currency": "CAD",
                "threshold": 1.0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn portfolio_sum_in_local_currency() {
    let app = test_app();
    for (symbol, quantity) in [("USD", 100.0), ("EUR", 50.0)] {
        let (status, _) = app
            .authed(
                Method::PUT,
                "/api/portfolio",
                Some(json!({ "currency_symbol": symbol, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, sum) = app.authed(Method::GET, "/api/portfolio/sum", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sum["currency"], "CAD");
    let total = sum["total"].as_f64().unwrap();
    assert!((total - 208.5).abs() < 1e-9, "total was {total}");

    let (_, removed) = app
        .authed(Method::DELETE, "/api/portfolio?symbol=GBP", None)
        .await;
    assert_eq!(removed, json!({ "deleted": false }));
    let (_, removed) = app
        .authed(Method::DELETE, "/api/portfolio?symbol=usd", None)
        .await;
    assert_eq!(removed, json!({ "deleted": true }));

    let (_, entries) = app.authed(Method::GET, "/api/portfolio", None).await;
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["currency_symbol"], "EUR");
}

#[tokio::test]
async fn public_rate_routes() {
    let app = test_app();
    let (status, currencies) = app.send(get("/api/currencies")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(currencies.as_array().map(Vec::len), Some(4));

    let (status, conversion) = app.send(get("/api/convert?from=usd&to=CAD")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(conversion, json!({ "from": "USD", "to": "CAD", "rate": 1.35 }));

    let (status, chart) = app.send(get("/api/chart?from=USD&to=CAD")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        chart["rates"],
        json!({ "2024-02-01": 1.33, "2024-02-02": 1.34 })
    );

    let (status, _) = app.send(get("/api/convert?from=XYZ&to=CAD")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rate_outage_is_bad_gateway() {
    let app = test_app_with_rates(Arc::new(DownRates));
    let (status, _) = app.send(get("/api/convert?from=USD&to=CAD")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // Active alerts skip failed lookups instead of failing the request.
    let (status, _) = app
        .authed(
            Method::POST,
            "/api/alert",
            Some(json!({
                "name": "USD dips",
                "from_currency": "USD",
                "to_currency": "CAD",
                "threshold": 1.40,
                "is_below": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, active) = app.authed(Method::GET, "/api/alert/active", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, json!([]));

    let (status, _) = app
        .authed(
            Method::PUT,
            "/api/portfolio",
            Some(json!({ "currency_symbol": "USD", "quantity": 1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.authed(Method::GET, "/api/portfolio/sum", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
