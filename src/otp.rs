use chrono::{Duration, Utc};
use nanoid::nanoid;
use rand::{Rng, rngs::OsRng};
use string_builder::Builder;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::{
    constants::{CODE_TTL_SECONDS, RESEND_INTERVAL_SECONDS, TOKEN_TTL_SECONDS},
    email_client::{MailError, Mailer},
    store::{PendingStore, PendingVerification, SignupToken, StoreError},
};

#[derive(Debug, Error)]
pub enum OtpError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, PartialEq, Eq)]
pub enum IssueOutcome {
    Sent,
    /// A code was issued to this address less than the resend interval ago;
    /// nothing was replaced or sent.
    Throttled,
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { signup_token: String },
    NotFound,
    Expired,
    Mismatch,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    NotFound,
    Expired,
    Mismatch,
}

/// Uniform draw over the full 6-digit range from the OS random source.
pub fn generate_code() -> String {
    OsRng.gen_range(100_000..=999_999).to_string()
}

fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// Store a fresh code for `email` and dispatch it. The record is persisted
/// before the send, and a failed send does not roll it back, so "sent"
/// never names a code the store has no record of.
pub async fn issue(
    store: &dyn PendingStore,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<IssueOutcome, OtpError> {
    let now = Utc::now();

    if let Some(existing) = store.get(email).await? {
        if now.timestamp() < existing.issued_at + RESEND_INTERVAL_SECONDS {
            return Ok(IssueOutcome::Throttled);
        }
    }

    let code = generate_code();
    let record = PendingVerification {
        email: email.to_owned(),
        code: code.clone(),
        expires_at: (now + Duration::seconds(CODE_TTL_SECONDS)).timestamp(),
        issued_at: now.timestamp(),
    };
    store.upsert(record).await?;

    let mut body_builder = Builder::default();
    body_builder.append("Your verification code is: ");
    body_builder.append(code);
    body_builder.append(format!(
        "\n\nThis code will expire in {} minutes.",
        CODE_TTL_SECONDS / 60
    ));
    let email_body = body_builder.string().unwrap();

    mailer
        .send(email, "Email Verification Code", &email_body)
        .await?;

    Ok(IssueOutcome::Sent)
}

/// Check a submitted code against the pending record for `email`.
///
/// The record is removed on a match or on expiry, never on a mismatch, so a
/// mistyped code can be retried until the window closes. A match mints a
/// single-use signup token for the account-creation step.
pub async fn verify(
    store: &dyn PendingStore,
    email: &str,
    submitted: &str,
) -> Result<VerifyOutcome, OtpError> {
    let now = Utc::now();

    let pending = match store.get(email).await? {
        Some(p) => p,
        None => return Ok(VerifyOutcome::NotFound),
    };

    if pending.expires_at < now.timestamp() {
        store.delete(email).await?;
        return Ok(VerifyOutcome::Expired);
    }

    if !codes_match(&pending.code, submitted) {
        return Ok(VerifyOutcome::Mismatch);
    }

    // Consume the code before anything else can observe it.
    store.delete(email).await?;

    let signup_token = nanoid!(32);
    store
        .put_token(SignupToken {
            email: email.to_owned(),
            token: signup_token.clone(),
            expires_at: (now + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
        })
        .await?;

    Ok(VerifyOutcome::Verified { signup_token })
}

/// Redeem the signup token minted by a successful verification. Same state
/// machine as `verify`: consumed on a match or on expiry, kept on a
/// mismatch.
pub async fn consume_signup_token(
    store: &dyn PendingStore,
    email: &str,
    submitted: &str,
) -> Result<ConsumeOutcome, OtpError> {
    let now = Utc::now().timestamp();

    let stored = match store.get_token(email).await? {
        Some(t) => t,
        None => return Ok(ConsumeOutcome::NotFound),
    };

    if stored.expires_at < now {
        store.delete_token(email).await?;
        return Ok(ConsumeOutcome::Expired);
    }

    if !codes_match(&stored.token, submitted) {
        return Ok(ConsumeOutcome::Mismatch);
    }

    store.delete_token(email).await?;
    Ok(ConsumeOutcome::Consumed)
}
