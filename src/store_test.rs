#[cfg(test)]
mod tests {
    use super::super::store::{MemoryStore, PendingStore, PendingVerification, SignupToken};

    fn record(email: &str, code: &str) -> PendingVerification {
        PendingVerification {
            email: email.to_owned(),
            code: code.to_owned(),
            expires_at: 2_000_000_000,
            issued_at: 1_000_000_000,
        }
    }

    #[tokio::test]
    async fn get_on_empty_store_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("a@x.com").await.unwrap().is_none());
        assert!(store.get_token("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_record_wholesale() {
        let store = MemoryStore::new();

        store.upsert(record("a@x.com", "111111")).await.unwrap();
        store.upsert(record("a@x.com", "222222")).await.unwrap();

        let stored = store.get("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.code, "222222");
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_email() {
        let store = MemoryStore::new();

        store.upsert(record("a@x.com", "111111")).await.unwrap();
        store.upsert(record("b@x.com", "222222")).await.unwrap();

        store.delete("a@x.com").await.unwrap();
        assert!(store.get("a@x.com").await.unwrap().is_none());
        assert!(store.get("b@x.com").await.unwrap().is_some());

        // Deleting an absent record is not an error.
        store.delete("a@x.com").await.unwrap();
    }

    #[tokio::test]
    async fn emails_are_distinct_keys_without_normalization() {
        let store = MemoryStore::new();

        store.upsert(record("A@x.com", "111111")).await.unwrap();
        assert!(store.get("a@x.com").await.unwrap().is_none());
        assert!(store.get("A@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tokens_live_beside_pending_records() {
        let store = MemoryStore::new();

        store.upsert(record("a@x.com", "111111")).await.unwrap();
        store
            .put_token(SignupToken {
                email: "a@x.com".to_owned(),
                token: "tok".to_owned(),
                expires_at: 2_000_000_000,
            })
            .await
            .unwrap();

        // Deleting the pending record leaves the token, and vice versa.
        store.delete("a@x.com").await.unwrap();
        assert!(store.get_token("a@x.com").await.unwrap().is_some());

        store.delete_token("a@x.com").await.unwrap();
        assert!(store.get_token("a@x.com").await.unwrap().is_none());
    }
}
