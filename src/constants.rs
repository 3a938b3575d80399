use std::time::Duration;

pub const CODE_TTL_SECONDS: i64 = 10 * 60; // 10 minutes
pub const TOKEN_TTL_SECONDS: i64 = 15 * 60; // 15 minutes

/// Minimum gap between two codes sent to the same address.
pub const RESEND_INTERVAL_SECONDS: i64 = 60;

pub const SMTP_SEND_TIMEOUT: Duration = Duration::from_secs(10);
