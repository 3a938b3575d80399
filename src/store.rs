use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, SetExpiry, SetOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::constants::{CODE_TTL_SECONDS, TOKEN_TTL_SECONDS};

/// Code waiting to be redeemed for a given address. One per email at most;
/// re-issuing replaces the whole record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVerification {
    pub email: String,
    pub code: String,
    pub expires_at: i64, // Unix timestamp
    pub issued_at: i64,  // Unix timestamp
}

/// Proof that an email was verified, handed to the signup step and
/// consumed there exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupToken {
    pub email: String,
    pub token: String,
    pub expires_at: i64, // Unix timestamp
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Keyed persistence for pending codes and signup tokens. Upserts replace
/// the record for an email wholesale and atomically; records for different
/// emails never contend.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn upsert(&self, record: PendingVerification) -> Result<(), StoreError>;
    async fn get(&self, email: &str) -> Result<Option<PendingVerification>, StoreError>;
    async fn delete(&self, email: &str) -> Result<(), StoreError>;

    async fn put_token(&self, token: SignupToken) -> Result<(), StoreError>;
    async fn get_token(&self, email: &str) -> Result<Option<SignupToken>, StoreError>;
    async fn delete_token(&self, email: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    pending: HashMap<String, PendingVerification>,
    tokens: HashMap<String, SignupToken>,
}

/// In-memory store. Backs tests, and the service itself when no Redis URL
/// is configured; records die with the process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for MemoryStore {
    async fn upsert(&self, record: PendingVerification) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .pending
            .insert(record.email.clone(), record);
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<PendingVerification>, StoreError> {
        Ok(self.inner.read().await.pending.get(email).cloned())
    }

    async fn delete(&self, email: &str) -> Result<(), StoreError> {
        self.inner.write().await.pending.remove(email);
        Ok(())
    }

    async fn put_token(&self, token: SignupToken) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .tokens
            .insert(token.email.clone(), token);
        Ok(())
    }

    async fn get_token(&self, email: &str) -> Result<Option<SignupToken>, StoreError> {
        Ok(self.inner.read().await.tokens.get(email).cloned())
    }

    async fn delete_token(&self, email: &str) -> Result<(), StoreError> {
        self.inner.write().await.tokens.remove(email);
        Ok(())
    }
}

// Redis key prefixes
fn pending_key(email: &str) -> String {
    format!("otp:pending:{}", email)
}

fn token_key(email: &str) -> String {
    format!("otp:signup_token:{}", email)
}

/// Redis-backed store. Records are JSON values written with a single
/// `SET ... EX`, so an upsert replaces the code/expiry pair atomically and
/// Redis enforces an upper bound on record lifetime on top of the lazy
/// expiry check done at verification time.
#[derive(Clone)]
pub struct RedisStore {
    redis: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    pub fn new(redis: redis::aio::MultiplexedConnection) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PendingStore for RedisStore {
    async fn upsert(&self, record: PendingVerification) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_options(
                pending_key(&record.email),
                serde_json::to_string(&record)?,
                SetOptions::default().with_expiration(SetExpiry::EX(CODE_TTL_SECONDS as u64)),
            )
            .await?;
        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<PendingVerification>, StoreError> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = redis.get(pending_key(email)).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, email: &str) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(pending_key(email)).await?;
        Ok(())
    }

    async fn put_token(&self, token: SignupToken) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_options(
                token_key(&token.email),
                serde_json::to_string(&token)?,
                SetOptions::default().with_expiration(SetExpiry::EX(TOKEN_TTL_SECONDS as u64)),
            )
            .await?;
        Ok(())
    }

    async fn get_token(&self, email: &str) -> Result<Option<SignupToken>, StoreError> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = redis.get(token_key(email)).await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    async fn delete_token(&self, email: &str) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(token_key(email)).await?;
        Ok(())
    }
}
