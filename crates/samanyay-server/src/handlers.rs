//! HTTP Handlers

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError};

use samanyay_core::{Account, AttachedFile, Case, CoreError, Practice, RegistrationForm};
use samanyay_payments::{
    CardDetails, Checkout, CheckoutEntry, CheckoutStep, PaymentError, Plan, PlanPricing, Receipt,
};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway: String,
    pub backend: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Account as shown to the client (no credential material)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_pro: bool,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id().to_string(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            is_pro: account.is_pro(),
            plan: Plan::of(account),
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaseQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    pub title: String,
    pub description: String,
    /// File names only; content is not uploaded
    #[serde(default)]
    pub attached_files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub already_subscribed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<CheckoutStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u8>,
    pub busy: bool,
    pub error: Option<String>,
    pub pricing: PlanPricing,
}

impl CheckoutView {
    fn subscribed() -> Self {
        Self {
            already_subscribed: true,
            step: None,
            step_number: None,
            busy: false,
            error: None,
            pricing: PlanPricing::pro(),
        }
    }

    fn of(checkout: &Checkout) -> Self {
        let step = checkout.step();
        Self {
            already_subscribed: false,
            step_number: Some(step.number()),
            step: Some(step),
            busy: checkout.is_busy(),
            error: checkout.last_error(),
            pricing: checkout.pricing().clone(),
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

fn error_response(status: StatusCode, code: &str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.into(),
        }),
    )
}

fn core_error(err: CoreError) -> ApiError {
    let (status, code) = match &err {
        CoreError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION"),
        CoreError::Conflict(_) => (StatusCode::CONFLICT, "EMAIL_TAKEN"),
        CoreError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
        CoreError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        CoreError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
        CoreError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    };
    if !err.is_user_error() {
        tracing::error!(error = %err, "Request failed");
    }
    error_response(status, code, err.user_message())
}

fn payment_error(err: PaymentError) -> ApiError {
    let err = match err {
        PaymentError::Core(inner) => return core_error(inner),
        other => other,
    };
    let (status, code) = match &err {
        PaymentError::Card(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CARD"),
        PaymentError::Busy => (StatusCode::CONFLICT, "PAYMENT_IN_PROGRESS"),
        PaymentError::Declined => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_DECLINED"),
        PaymentError::Backend(_) => (StatusCode::BAD_GATEWAY, "PAYMENT_NOT_CONFIRMED"),
        PaymentError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_STEP"),
        PaymentError::AlreadySubscribed => (StatusCode::CONFLICT, "ALREADY_SUBSCRIBED"),
        PaymentError::Config(_) | PaymentError::Core(_) => {
            tracing::error!(error = %err, "Checkout failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
        }
    };
    error_response(status, code, err.user_message())
}

/// Run practice work (password hashing, store file IO) on the blocking pool
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(Practice) -> samanyay_core::Result<T> + Send + 'static,
{
    let practice = state.practice.clone();
    tokio::task::spawn_blocking(move || work(practice))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Blocking task failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "An unexpected error occurred.".into(),
            )
        })?
        .map_err(core_error)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateway: state.gateway.name().to_string(),
        backend: state.backend.name().to_string(),
    })
}

/// Create an account and sign it in
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<AccountView>), ApiError> {
    let account = blocking(&state, move |practice| practice.sign_up(&form)).await?;
    state.reset_checkout();
    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AccountView> {
    let account = blocking(&state, move |practice| {
        practice.sign_in(&payload.email, &payload.password)
    })
    .await?;
    state.reset_checkout();
    Ok(Json(AccountView::from(&account)))
}

pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    blocking(&state, |practice| practice.sign_out()).await?;
    state.reset_checkout();
    Ok(StatusCode::NO_CONTENT)
}

/// Signed-in account, or 401
pub async fn current_session(State(state): State<AppState>) -> ApiResult<AccountView> {
    let account = blocking(&state, |practice| practice.sessions.require_session()).await?;
    Ok(Json(AccountView::from(&account)))
}

pub async fn list_cases(
    State(state): State<AppState>,
    Query(query): Query<CaseQuery>,
) -> ApiResult<Vec<Case>> {
    let query = query.q.unwrap_or_default();
    let cases = blocking(&state, move |practice| practice.my_cases(&query)).await?;
    Ok(Json(cases))
}

pub async fn create_case(
    State(state): State<AppState>,
    Json(payload): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let files: Vec<AttachedFile> = payload.attached_files.into_iter().map(AttachedFile::new).collect();
    let case = blocking(&state, move |practice| {
        practice.open_case(&payload.title, &payload.description, files)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// Checkout for the signed-in account, entering the flow when needed
fn active_checkout(state: &AppState) -> Result<Option<Arc<Checkout>>, ApiError> {
    let account = state.practice.sessions.require_session().map_err(core_error)?;
    let mut slot = state.checkout.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(checkout) = slot.as_ref().filter(|c| c.account_id() == account.id()) {
        return Ok(Some(checkout.clone()));
    }

    match Checkout::enter(&state.practice, state.gateway.clone(), state.backend.clone())
        .map_err(payment_error)?
    {
        CheckoutEntry::AlreadySubscribed(_) => Ok(None),
        CheckoutEntry::Started(checkout) => {
            let checkout = Arc::new(checkout);
            *slot = Some(checkout.clone());
            Ok(Some(checkout))
        }
    }
}

fn require_checkout(state: &AppState) -> Result<Arc<Checkout>, ApiError> {
    active_checkout(state)?.ok_or_else(|| payment_error(PaymentError::AlreadySubscribed))
}

pub async fn open_checkout(State(state): State<AppState>) -> ApiResult<CheckoutView> {
    Ok(Json(
        active_checkout(&state)?.map_or_else(CheckoutView::subscribed, |c| CheckoutView::of(&c)),
    ))
}

pub async fn checkout_upgrade(State(state): State<AppState>) -> ApiResult<CheckoutView> {
    let checkout = require_checkout(&state)?;
    checkout.upgrade().map_err(payment_error)?;
    Ok(Json(CheckoutView::of(&checkout)))
}

pub async fn checkout_back(State(state): State<AppState>) -> ApiResult<CheckoutView> {
    let checkout = require_checkout(&state)?;
    checkout.back().map_err(payment_error)?;
    Ok(Json(CheckoutView::of(&checkout)))
}

pub async fn checkout_submit(
    State(state): State<AppState>,
    Json(card): Json<CardDetails>,
) -> ApiResult<Receipt> {
    let checkout = require_checkout(&state)?;
    let receipt = checkout.submit_payment(&card).await.map_err(payment_error)?;
    Ok(Json(receipt))
}
