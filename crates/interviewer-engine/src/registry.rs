//! Session registry keyed by session id.
//!
//! The map lock is held only to look up, insert, or remove entries. Each
//! session sits behind its own async mutex, so a slow evaluator call on one
//! session never blocks another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{InterviewError, Result};
use crate::evaluator::Evaluator;
use crate::session::{InterviewSession, ReportSinks, SessionConfig};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<InterviewSession>>;

/// Concurrent map of live sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    evaluator: Arc<dyn Evaluator>,
    sinks: ReportSinks,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sinks", &self.sinks)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Creates an empty registry whose sessions use `evaluator` and `sinks`.
    #[must_use]
    pub fn new(evaluator: Arc<dyn Evaluator>, sinks: ReportSinks) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            evaluator,
            sinks,
        }
    }

    /// Returns the sinks shared by every session.
    #[must_use]
    pub const fn sinks(&self) -> &ReportSinks {
        &self.sinks
    }

    /// Validates `config`, registers a new `Created` session, and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::Validation` if the configuration is invalid.
    pub async fn create(&self, config: SessionConfig) -> Result<String> {
        config.validate()?;

        let mut sessions = self.sessions.write().await;
        let mut id = Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let session =
            InterviewSession::new(id.clone(), config, Arc::clone(&self.evaluator), self.sinks.clone());
        sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        debug!(session_id = %id, active = sessions.len(), "Session registered");
        Ok(id)
    }

    /// Looks up a session.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::SessionNotFound` for an unknown id.
    pub async fn get(&self, id: &str) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| InterviewError::session_not_found(id))
    }

    /// Removes a session. Removing an unknown id is a no-op.
    ///
    /// Returns `true` if a session was removed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Returns the number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Removes sessions idle for longer than `ttl` and returns their ids.
    ///
    /// Sessions with an operation in flight are skipped.
    pub async fn evict_idle(&self, ttl: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter_map(|(id, handle)| {
                let session = handle.try_lock().ok()?;
                (session.idle_for() > ttl).then(|| id.clone())
            })
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            info!(
                evicted = expired.len(),
                remaining = sessions.len(),
                "Evicted idle sessions"
            );
        }
        expired
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::ScriptedEvaluator;

    fn registry() -> Arc<SessionRegistry> {
        Arc::new(SessionRegistry::new(
            Arc::new(ScriptedEvaluator::default()),
            ReportSinks::none(),
        ))
    }

    fn config() -> SessionConfig {
        SessionConfig::new("Site reliability engineer")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        let id = registry.create(config()).await.unwrap();

        let handle = registry.get(&id).await.unwrap();
        let session = handle.lock().await;
        assert_eq!(session.id(), id);
        assert_eq!(session.status(), crate::session::SessionStatus::Created);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_config() {
        let registry = registry();
        let result = registry.create(SessionConfig::new("")).await;
        assert!(matches!(result, Err(InterviewError::Validation { .. })));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let registry = registry();
        assert!(matches!(
            registry.get("missing").await,
            Err(InterviewError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = registry();
        let id = registry.create(config()).await.unwrap();

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(!registry.remove("never-existed").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_unique_ids() {
        let registry = registry();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.create(config()).await.unwrap() })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }

        assert_eq!(ids.len(), 32);
        assert_eq!(registry.len().await, 32);
        for id in &ids {
            assert!(registry.get(id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_sessions_progress_independently() {
        let registry = registry();
        let first = registry.create(config()).await.unwrap();
        let second = registry.create(config()).await.unwrap();

        registry.get(&first).await.unwrap().lock().await.ask_first().await.unwrap();

        let second_handle = registry.get(&second).await.unwrap();
        let second_session = second_handle.lock().await;
        assert_eq!(
            second_session.status(),
            crate::session::SessionStatus::Created
        );
        assert_eq!(second_session.current_question_number(), 0);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_only_expired_unlocked_sessions() {
        let registry = registry();
        let idle = registry.create(config()).await.unwrap();
        let busy = registry.create(config()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let busy_handle = registry.get(&busy).await.unwrap();
        let _guard = busy_handle.lock().await;

        let evicted = registry.evict_idle(Duration::from_millis(10)).await;
        assert_eq!(evicted, vec![idle.clone()]);
        assert!(registry.get(&idle).await.is_err());
        assert!(registry.get(&busy).await.is_ok());
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recent_sessions() {
        let registry = registry();
        registry.create(config()).await.unwrap();

        let evicted = registry.evict_idle(Duration::from_secs(3600)).await;
        assert!(evicted.is_empty());
        assert_eq!(registry.len().await, 1);
    }
}
