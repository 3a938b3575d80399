use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    AppState,
    otp::{self, ConsumeOutcome, IssueOutcome, VerifyOutcome},
};

// Missing fields fall back to "" so the client gets the stable error
// message instead of a deserialization rejection.
#[derive(Deserialize, ToSchema)]
pub struct SendOtpBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyOtpBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ConsumeSignupTokenBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub signup_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct SendOtpResponse {
    pub success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub ok: bool,
    pub signup_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct ConsumeSignupTokenResponse {
    pub ok: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_body(message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: message.to_owned(),
    })
}

#[utoipa::path(
    post,
    tags = ["Verification"],
    description = "Send a 6-digit verification code to the given email. Re-issuing replaces any previous code for that address.",
    path = "/send-otp",
    request_body(content = SendOtpBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Code stored and sent", body = SendOtpResponse),
        (status = 400, description = "Missing email", body = ErrorResponse),
        (status = 429, description = "A code was requested for this address too recently", body = ErrorResponse),
        (status = 500, description = "Storage or delivery failure", body = ErrorResponse),
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpBody>,
) -> impl IntoResponse {
    if body.email.is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("Email is required")).into_response();
    }

    match otp::issue(state.store.as_ref(), state.mailer.as_ref(), &body.email).await {
        Ok(IssueOutcome::Sent) => {
            (StatusCode::OK, Json(SendOtpResponse { success: true })).into_response()
        }
        Ok(IssueOutcome::Throttled) => (
            StatusCode::TOO_MANY_REQUESTS,
            error_body("Please wait before requesting a new code"),
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to send OTP to {}: {}", body.email, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to send OTP"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    tags = ["Verification"],
    description = "Verify a submitted code. On success the code is consumed and a short-lived signup token is returned for the account-creation step.",
    path = "/verify-otp",
    request_body(content = VerifyOtpBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Code verified", body = VerifyOtpResponse),
        (status = 400, description = "Missing fields, no pending code, expired code, or wrong code", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpBody>,
) -> impl IntoResponse {
    if body.email.is_empty() || body.otp.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Email and OTP are required"),
        )
            .into_response();
    }

    match otp::verify(state.store.as_ref(), &body.email, &body.otp).await {
        Ok(VerifyOutcome::Verified { signup_token }) => (
            StatusCode::OK,
            Json(VerifyOtpResponse {
                ok: true,
                signup_token,
            }),
        )
            .into_response(),
        Ok(VerifyOutcome::NotFound) => (
            StatusCode::BAD_REQUEST,
            error_body("No OTP pending for this email"),
        )
            .into_response(),
        Ok(VerifyOutcome::Expired) => {
            (StatusCode::BAD_REQUEST, error_body("OTP expired")).into_response()
        }
        Ok(VerifyOutcome::Mismatch) => {
            (StatusCode::BAD_REQUEST, error_body("Invalid OTP")).into_response()
        }
        Err(e) => {
            warn!("Failed to verify OTP for {}: {}", body.email, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to verify OTP"),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    post,
    tags = ["Verification"],
    description = "Redeem the signup token returned by a successful verification. Single use; called by the account-creation service.",
    path = "/consume-signup-token",
    request_body(content = ConsumeSignupTokenBody, content_type = "application/json"),
    responses(
        (status = 200, description = "Token redeemed", body = ConsumeSignupTokenResponse),
        (status = 400, description = "Missing fields, no pending token, expired token, or wrong token", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn consume_signup_token(
    State(state): State<AppState>,
    Json(body): Json<ConsumeSignupTokenBody>,
) -> impl IntoResponse {
    if body.email.is_empty() || body.signup_token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_body("Email and signup token are required"),
        )
            .into_response();
    }

    match otp::consume_signup_token(state.store.as_ref(), &body.email, &body.signup_token).await {
        Ok(ConsumeOutcome::Consumed) => {
            (StatusCode::OK, Json(ConsumeSignupTokenResponse { ok: true })).into_response()
        }
        Ok(ConsumeOutcome::NotFound) => (
            StatusCode::BAD_REQUEST,
            error_body("No signup token pending for this email"),
        )
            .into_response(),
        Ok(ConsumeOutcome::Expired) => {
            (StatusCode::BAD_REQUEST, error_body("Signup token expired")).into_response()
        }
        Ok(ConsumeOutcome::Mismatch) => {
            (StatusCode::BAD_REQUEST, error_body("Invalid signup token")).into_response()
        }
        Err(e) => {
            warn!("Failed to redeem signup token for {}: {}", body.email, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to redeem signup token"),
            )
                .into_response()
        }
    }
}

pub fn verification_router() -> Router<AppState> {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/consume-signup-token", post(consume_signup_token))
}
