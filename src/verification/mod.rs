//! Verification Session Store
//!
//! A verified identity document is parked here until the member details are
//! submitted. Each session is addressed by an unguessable token and expires
//! after a configured lifetime:
//! - expiry is checked on every read, so a stale token is rejected even if
//!   the background sweep has not run yet
//! - the sweep removes expired sessions and deletes their temporary PDFs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::identifier::Identifier;

/// How often the background sweep runs
const CLEANUP_INTERVAL_SECS: u64 = 60;

/// Session lookup errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Verification session not found: {0}")]
    NotFound(String),

    #[error("Verification session expired: {0}")]
    Expired(String),
}

/// A document that passed verification and awaits member details
#[derive(Debug, Clone, Serialize)]
pub struct VerificationSession {
    pub token: Uuid,
    pub temp_pdf_path: PathBuf,
    pub identifier: Identifier,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Token-addressed store of pending verifications
#[derive(Clone)]
pub struct VerificationStore {
    inner: Arc<VerificationStoreInner>,
}

struct VerificationStoreInner {
    sessions: RwLock<HashMap<Uuid, VerificationSession>>,
    ttl: Duration,
}

impl VerificationStore {
    pub fn new(ttl_minutes: i64) -> Self {
        Self::with_ttl(Duration::minutes(ttl_minutes))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(VerificationStoreInner {
                sessions: RwLock::new(HashMap::new()),
                ttl,
            }),
        }
    }

    /// Register a verified document and hand out its token
    pub async fn create(
        &self,
        temp_pdf_path: PathBuf,
        identifier: Identifier,
    ) -> VerificationSession {
        let now = Utc::now();
        let session = VerificationSession {
            token: Uuid::new_v4(),
            temp_pdf_path,
            identifier,
            created_at: now,
            expires_at: now + self.inner.ttl,
        };

        self.inner
            .sessions
            .write()
            .await
            .insert(session.token, session.clone());

        tracing::info!(
            token = %session.token,
            identifier = %session.identifier,
            expires_at = %session.expires_at,
            "Created verification session"
        );

        session
    }

    /// Look up a live session
    pub async fn get(&self, token: &str) -> Result<VerificationSession, SessionError> {
        let id = parse_token(token)?;
        let sessions = self.inner.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))?;

        if session.is_expired() {
            return Err(SessionError::Expired(token.to_string()));
        }

        Ok(session.clone())
    }

    /// Remove and return a live session. An expired session is removed too,
    /// but reported as expired and its temporary file left for the sweep.
    pub async fn take(&self, token: &str) -> Result<VerificationSession, SessionError> {
        let id = parse_token(token)?;
        let session = self
            .inner
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| SessionError::NotFound(token.to_string()))?;

        if session.is_expired() {
            remove_temp_file(&session).await;
            return Err(SessionError::Expired(token.to_string()));
        }

        tracing::debug!(token = %id, "Verification session consumed");
        Ok(session)
    }

    /// Number of stored sessions, expired or not
    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove expired sessions and delete their temporary PDFs
    ///
    /// Returns the number of sessions removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<VerificationSession> = {
            let mut sessions = self.inner.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.is_expired_at(now))
                .map(|s| s.token)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            remove_temp_file(session).await;
            tracing::debug!(token = %session.token, "Cleaned up expired verification session");
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Cleaned up expired verification sessions");
        }

        expired.len()
    }

    /// Start the periodic sweep
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

fn parse_token(token: &str) -> Result<Uuid, SessionError> {
    Uuid::parse_str(token.trim()).map_err(|_| SessionError::NotFound(token.to_string()))
}

async fn remove_temp_file(session: &VerificationSession) {
    match tokio::fs::remove_file(&session.temp_pdf_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %session.temp_pdf_path.display(),
            error = %e,
            "Failed to delete temporary PDF"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identifier() -> Identifier {
        Identifier::parse("ABC1234567").unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = VerificationStore::new(15);
        let session = store.create(PathBuf::from("/tmp/doc.pdf"), identifier()).await;

        let found = store.get(&session.token.to_string()).await.unwrap();
        assert_eq!(found.identifier.as_str(), "ABC1234567");
        assert_eq!(found.expires_at - found.created_at, Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_tokens() {
        let store = VerificationStore::new(15);
        assert!(matches!(
            store.get(&Uuid::new_v4().to_string()).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(store.get("demo-token").await, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expiry_is_checked_on_read() {
        let store = VerificationStore::with_ttl(Duration::seconds(-1));
        let session = store.create(PathBuf::from("/tmp/doc.pdf"), identifier()).await;
        let token = session.token.to_string();

        // Still stored, but rejected
        assert_eq!(store.len().await, 1);
        assert!(matches!(store.get(&token).await, Err(SessionError::Expired(_))));
        assert!(matches!(store.take(&token).await, Err(SessionError::Expired(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_consumes_session() {
        let store = VerificationStore::new(15);
        let session = store.create(PathBuf::from("/tmp/doc.pdf"), identifier()).await;
        let token = session.token.to_string();

        assert!(store.take(&token).await.is_ok());
        assert!(matches!(store.take(&token).await, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_and_their_files() {
        let dir = TempDir::new().unwrap();
        let stale_pdf = dir.path().join("stale.pdf");
        let fresh_pdf = dir.path().join("fresh.pdf");
        std::fs::write(&stale_pdf, b"%PDF").unwrap();
        std::fs::write(&fresh_pdf, b"%PDF").unwrap();

        let expired = VerificationStore::with_ttl(Duration::seconds(-1));
        expired.create(stale_pdf.clone(), identifier()).await;
        assert_eq!(expired.cleanup_expired().await, 1);
        assert!(!stale_pdf.exists());
        assert!(expired.is_empty().await);

        let live = VerificationStore::new(15);
        live.create(fresh_pdf.clone(), identifier()).await;
        assert_eq!(live.cleanup_expired().await, 0);
        assert!(fresh_pdf.exists());
        assert_eq!(live.len().await, 1);
    }
}
