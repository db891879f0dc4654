//! Samanyay HTTP Server
//!
//! Axum-based JSON surface over the practice core: sign-up/sign-in, the
//! case list and the three-step Pro checkout. One server instance serves one
//! profile store, so there is a single current session.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use samanyay_core::{Practice, StoreConfig};
use samanyay_payments::{
    GatewayConfig, HttpPaymentBackend, OfflineBackend, PaymentBackend, SimulatedGateway,
};

use crate::handlers::{
    checkout_back, checkout_submit, checkout_upgrade, create_case, current_session, health_check,
    list_cases, login, logout, open_checkout, register,
};
use crate::state::AppState;

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Accounts & session
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(current_session))
        // Cases
        .route("/api/cases", get(list_cases).post(create_case))
        // Checkout
        .route("/api/checkout", get(open_checkout))
        .route("/api/checkout/upgrade", post(checkout_upgrade))
        .route("/api/checkout/back", post(checkout_back))
        .route("/api/checkout/submit", post(checkout_submit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Open the profile store
    let store_config = StoreConfig::from_env();
    let store = store_config.open()?;
    match &store_config.path {
        Some(path) => tracing::info!("✓ Store file: {}", path.display()),
        None => {
            tracing::warn!("⚠ SAMANYAY_STORE_PATH not set - data kept in memory only");
        }
    }
    let practice = Practice::bootstrap(store)?;

    // Payments
    let gateway_config = GatewayConfig::from_env();
    tracing::info!(
        latency = ?gateway_config.latency,
        success_rate = gateway_config.success_rate,
        seeded = gateway_config.seed.is_some(),
        "Simulated gateway configured"
    );
    let gateway = Arc::new(SimulatedGateway::from_config(&gateway_config));

    let backend: Arc<dyn PaymentBackend> = match HttpPaymentBackend::from_env() {
        Ok(backend) => {
            tracing::info!("✓ Payment backend configured");
            Arc::new(backend)
        }
        Err(e) => {
            tracing::warn!("⚠ {e} - checkouts confirmed offline");
            Arc::new(OfflineBackend)
        }
    };

    let state = AppState::new(practice, gateway, backend);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Samanyay server running on http://{}", addr);
    tracing::info!("  POST /api/auth/register | /api/auth/login | /api/auth/logout");
    tracing::info!("  GET  /api/auth/session");
    tracing::info!("  GET  /api/cases?q=      POST /api/cases");
    tracing::info!("  GET  /api/checkout      POST /api/checkout/{{upgrade,back,submit}}");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use samanyay_core::Store;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let practice = Practice::bootstrap(Store::memory()).unwrap();
        app(AppState::new(
            practice,
            Arc::new(SimulatedGateway::approving()),
            Arc::new(OfflineBackend),
        ))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_protected_routes_need_session() {
        let app = test_app();
        for uri in ["/api/auth/session", "/api/cases", "/api/checkout"] {
            let (status, body) = call(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["code"], "UNAUTHENTICATED");
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let app = test_app();
        let form = json!({
            "firstName": "Alice", "lastName": "Law", "email": "alice@firm.com",
            "password": "secret1", "confirmPassword": "secret1"
        });
        let (status, _) = call(&app, Method::POST, "/api/auth/register", Some(form.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&app, Method::POST, "/api/auth/register", Some(form)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn test_register_case_and_upgrade() {
        let app = test_app();
        let form = json!({
            "firstName": "Alice", "lastName": "Law", "email": "alice@firm.com",
            "password": "secret1", "confirmPassword": "secret1"
        });
        let (status, account) = call(&app, Method::POST, "/api/auth/register", Some(form)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(account["isPro"], false);
        assert_eq!(account["plan"], "free");
        assert!(account.get("passwordHash").is_none());

        let case = json!({"title": "Roe v. Doe", "description": "...", "attachedFiles": ["brief.pdf"]});
        let (status, _) = call(&app, Method::POST, "/api/cases", Some(case)).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, cases) = call(&app, Method::GET, "/api/cases?q=roe", None).await;
        assert_eq!(cases.as_array().unwrap().len(), 1);

        let (_, view) = call(&app, Method::GET, "/api/checkout", None).await;
        assert_eq!(view["stepNumber"], 1);
        let (_, view) = call(&app, Method::POST, "/api/checkout/upgrade", None).await;
        assert_eq!(view["step"]["step"], "capture");

        let bad_card = json!({"nameOnCard": "John Doe", "number": "4242-4242", "expiry": "12/29", "cvc": "123"});
        let (status, body) = call(&app, Method::POST, "/api/checkout/submit", Some(bad_card)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Card number must be 16 digits");

        let card = json!({"nameOnCard": "John Doe", "number": "4242 4242 4242 4242", "expiry": "12/29", "cvc": "123"});
        let (status, receipt) = call(&app, Method::POST, "/api/checkout/submit", Some(card)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["currency"], "USD");
        assert_eq!(receipt["cardLast4"], "4242");

        let (_, session) = call(&app, Method::GET, "/api/auth/session", None).await;
        assert_eq!(session["isPro"], true);
        assert_eq!(session["plan"], "pro");

        let (_, view) = call(&app, Method::GET, "/api/checkout", None).await;
        assert_eq!(view["stepNumber"], 3);

        call(&app, Method::POST, "/api/auth/logout", None).await;
        call(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(json!({"email": "alice@firm.com", "password": "secret1"})),
        )
        .await;
        let (_, view) = call(&app, Method::GET, "/api/checkout", None).await;
        assert_eq!(view["alreadySubscribed"], true);
    }
}
