//! HTTP API for the public sign-up form.
//!
//! Admin operations go through the local admin socket instead.

use crate::captcha::CaptchaVerifier;
use crate::error::Error;
use crate::waitlist::Waitlist;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use plotline_core::{Entrant, FieldError, SignUpForm};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub struct ApiState {
    pub waitlist: Arc<Waitlist>,

    /// `None` when no reCAPTCHA secret is configured
    pub captcha: Option<Arc<dyn CaptchaVerifier>>,

    /// The garden's own ZIP code
    pub home_zip: String,
}

type AppState = Arc<ApiState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health (at root and under /api/v1 for compatibility)
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        // Public intake
        .route("/api/v1/signup", post(signup))
        .route("/api/v1/waitlist/count", get(waitlist_count))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

// --- Errors ---

/// JSON error body: `{"message": ...}` plus optional code and field errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code: None,
                message: message.into(),
                errors: Vec::new(),
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Conflict(_) => Self {
                status: StatusCode::CONFLICT,
                body: ErrorBody {
                    // Unique-violation code the sign-up form checks for.
                    code: Some("23505"),
                    message: "Email already signed up".to_string(),
                    errors: Vec::new(),
                },
            },
            Error::Core(plotline_core::Error::Validation(errors)) => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorBody {
                    code: None,
                    message: errors
                        .first()
                        .map_or_else(|| "Invalid sign-up".to_string(), |e| e.message.clone()),
                    errors,
                },
            },
            other => {
                tracing::error!(error = %other, "signup_failed");
                Self::server_error()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// --- Sign-up endpoint ---

#[derive(Debug, Serialize)]
struct SignUpResponse {
    entrant: Entrant,
    /// The applicant lives outside the garden's home ZIP
    outside_service_area: bool,
}

async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignUpForm>, JsonRejection>,
) -> Result<Json<SignUpResponse>, ApiError> {
    let Json(form) = payload?;

    let Some(captcha) = state.captcha.as_ref() else {
        tracing::error!("signup refused: PLOTLINE_RECAPTCHA_SECRET is not configured");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error",
        ));
    };

    let Some(token) = form.captcha_token() else {
        return Err(ApiError::bad_request("Missing CAPTCHA token"));
    };

    let profile = form.validate().map_err(Error::from)?;

    match captcha.verify(token).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::bad_request("reCAPTCHA verification failed")),
        Err(e) => {
            tracing::error!(error = %e, "captcha_verify_failed");
            return Err(ApiError::server_error());
        }
    }

    let entrant = state.waitlist.admit(profile).await?;

    Ok(Json(SignUpResponse {
        outside_service_area: form.is_outside_service_area(&state.home_zip),
        entrant,
    }))
}

// --- Waitlist size ---

#[derive(Debug, Serialize)]
struct CountResponse {
    count: usize,
}

async fn waitlist_count(State(state): State<AppState>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.waitlist.len()?;
    Ok(Json(CountResponse { count }))
}
