//! In-memory token store.
//!
//! Insertion order is tracked in a side vector guarded by a mutex; that same
//! mutex serializes every write so create/rename races have exactly one
//! winner. Reads go straight to the map.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use subtle::ConstantTimeEq;

use crate::errors::AppError;
use crate::models::Token;
use crate::store::{TokenPatch, TokenStore};

#[derive(Default)]
pub struct MemoryStore {
    tokens: DashMap<String, Token>,
    order: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn create(&self, token: &Token) -> Result<(), AppError> {
        let mut order = self.order.lock().expect("order lock poisoned");
        if self.tokens.contains_key(&token.identifier) {
            return Err(AppError::validation(format!(
                "token identifier already in use: {}",
                token.identifier
            )));
        }
        self.tokens.insert(token.identifier.clone(), token.clone());
        order.push(token.identifier.clone());
        Ok(())
    }

    async fn get(&self, identifier: &str) -> Result<Option<Token>, AppError> {
        Ok(self.tokens.get(identifier).map(|t| t.value().clone()))
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<Token>, AppError> {
        for entry in self.tokens.iter() {
            if bool::from(entry.value().key.as_bytes().ct_eq(key.as_bytes())) {
                return Ok(Some(entry.value().clone()));
            }
        }
        Ok(None)
    }

    async fn update(
        &self,
        identifier: &str,
        patch: &TokenPatch,
    ) -> Result<Option<Token>, AppError> {
        let mut order = self.order.lock().expect("order lock poisoned");
        let Some(current) = self.tokens.get(identifier).map(|t| t.value().clone()) else {
            return Ok(None);
        };

        let mut updated = current;
        if let Some(description) = &patch.description {
            updated.description = Some(description.clone());
        }
        if let Some(user) = &patch.user {
            updated.user = user.clone();
        }
        if let Some(new_ident) = &patch.identifier {
            if new_ident != identifier {
                if self.tokens.contains_key(new_ident) {
                    return Err(AppError::validation(format!(
                        "token identifier already in use: {}",
                        new_ident
                    )));
                }
                updated.identifier = new_ident.clone();
                self.tokens.remove(identifier);
                if let Some(slot) = order.iter_mut().find(|i| i.as_str() == identifier) {
                    *slot = new_ident.clone();
                }
            }
        }

        self.tokens.insert(updated.identifier.clone(), updated.clone());
        Ok(Some(updated))
    }

    async fn set_key(&self, identifier: &str, key: &str) -> Result<bool, AppError> {
        let _order = self.order.lock().expect("order lock poisoned");
        match self.tokens.get_mut(identifier) {
            Some(mut token) => {
                token.key = key.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, identifier: &str) -> Result<bool, AppError> {
        let mut order = self.order.lock().expect("order lock poisoned");
        let removed = self.tokens.remove(identifier).is_some();
        if removed {
            order.retain(|i| i != identifier);
        }
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<Token>, AppError> {
        let order = self.order.lock().expect("order lock poisoned");
        Ok(order
            .iter()
            .filter_map(|ident| self.tokens.get(ident).map(|t| t.value().clone()))
            .collect())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut order = self.order.lock().expect("order lock poisoned");
        let expired: Vec<String> = self
            .tokens
            .iter()
            .filter(|t| t.value().is_expired(now))
            .map(|t| t.value().identifier.clone())
            .collect();
        for ident in &expired {
            self.tokens.remove(ident);
        }
        order.retain(|i| !expired.contains(i));
        Ok(expired.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenIntent;
    use chrono::Duration;

    fn token(identifier: &str, key: &str) -> Token {
        Token {
            identifier: identifier.into(),
            key: key.into(),
            user: "alice".into(),
            intent: TokenIntent::Api,
            expiring: true,
            expires: Utc::now() + Duration::days(30),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_identifier() {
        let store = MemoryStore::new();
        store.create(&token("dup", "k1")).await.unwrap();
        let err = store.create(&token("dup", "k2")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        // no silent overwrite
        assert_eq!(store.get("dup").await.unwrap().unwrap().key, "k1");
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = MemoryStore::new();
        for name in ["c", "a", "b"] {
            store.create(&token(name, name)).await.unwrap();
        }
        let idents: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.identifier)
            .collect();
        assert_eq!(idents, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_rename_keeps_position_and_uniqueness() {
        let store = MemoryStore::new();
        store.create(&token("one", "k1")).await.unwrap();
        store.create(&token("two", "k2")).await.unwrap();

        let patch = TokenPatch {
            identifier: Some("one-renamed".into()),
            ..Default::default()
        };
        store.update("one", &patch).await.unwrap().unwrap();

        let idents: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.identifier)
            .collect();
        assert_eq!(idents, vec!["one-renamed", "two"]);

        let clash = TokenPatch {
            identifier: Some("one-renamed".into()),
            ..Default::default()
        };
        assert!(store.update("two", &clash).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired_only_removes_past_deadlines() {
        let store = MemoryStore::new();
        let mut dead = token("dead", "k1");
        dead.expires = Utc::now() - Duration::seconds(5);
        let mut frozen = token("frozen", "k2");
        frozen.expiring = false;
        frozen.expires = Utc::now() - Duration::days(1);
        store.create(&dead).await.unwrap();
        store.create(&frozen).await.unwrap();
        store.create(&token("alive", "k3")).await.unwrap();

        let purged = store.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("dead").await.unwrap().is_none());
        assert!(store.get("frozen").await.unwrap().is_some());
        assert!(store.get("alive").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_get_by_key() {
        let store = MemoryStore::new();
        store.create(&token("t", "secret-key")).await.unwrap();
        assert!(store.get_by_key("secret-key").await.unwrap().is_some());
        assert!(store.get_by_key("wrong").await.unwrap().is_none());
    }
}
