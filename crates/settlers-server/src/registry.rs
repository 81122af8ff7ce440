//! Session registry: code → session.
//!
//! All mutations go through a single lock, so code generation and insertion
//! are atomic with respect to concurrent creates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use settlers_core::code;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ServerConfig;
use crate::session::{Player, Session, SessionError};

/// Every live session in the process.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    code_length: usize,
    code_attempts: u32,
}

impl SessionRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            code_length: config.code_length,
            code_attempts: config.code_attempts,
        }
    }

    /// Create a session under a fresh code with `creator_name` as host.
    pub async fn create(&self, creator_name: String) -> Result<(Arc<Session>, Player), SessionError> {
        let mut sessions = self.sessions.lock().await;

        let existing: HashSet<String> = sessions.keys().cloned().collect();
        let code = code::generate_with_rng(
            &mut rand::thread_rng(),
            self.code_length,
            &existing,
            self.code_attempts,
        )?;

        let (session, creator) = Session::new(code.clone(), creator_name)?;
        let session = Arc::new(session);
        sessions.insert(code.clone(), Arc::clone(&session));

        info!(code = %code, host = %creator.name, "Session created");
        Ok((session, creator))
    }

    pub async fn lookup(&self, code: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(code.to_string()))
    }

    /// Whether this exact session is still registered under its code.
    pub async fn contains(&self, session: &Arc<Session>) -> bool {
        self.sessions
            .lock()
            .await
            .get(session.code())
            .map_or(false, |s| Arc::ptr_eq(s, session))
    }

    /// Drop a session. Returns it if it was present.
    pub async fn remove(&self, code: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.lock().await.remove(code);
        if removed.is_some() {
            info!(code = %code, "Session dropped");
        }
        removed
    }

    /// Drop every session, returning them so the caller can tear them down.
    pub async fn clear_all(&self) -> Vec<Arc<Session>> {
        let drained: Vec<_> = self.sessions.lock().await.drain().map(|(_, s)| s).collect();
        info!(count = drained.len(), "All sessions cleared");
        drained
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}
