//! Registry of live sessions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::id::SessionId;
use super::shell::{Outcome, SessionInfo, SessionTimeouts, TclSession};
use crate::error::VivadoError;
use crate::execution::{run_batch_command, CommandResult};
use crate::install::{Installation, InstallationResolver};
use crate::process::ProcessSpawner;

#[derive(Default)]
struct RegistryState {
    // Ids are allocated in increasing order, so this iterates by creation.
    sessions: BTreeMap<SessionId, Arc<TclSession>>,
    default_id: Option<SessionId>,
}

/// Owns every started session and tracks which one is the default.
///
/// `create`, `close` and `close_all` are serialized with each other.
/// `get` and `list` only take a short read lock and never wait behind them.
pub struct SessionRegistry {
    spawner: Arc<dyn ProcessSpawner>,
    resolver: Arc<dyn InstallationResolver>,
    timeouts: SessionTimeouts,
    state: RwLock<RegistryState>,
    mutation: Mutex<()>,
}

impl SessionRegistry {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        resolver: Arc<dyn InstallationResolver>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            spawner,
            resolver,
            timeouts,
            state: RwLock::new(RegistryState::default()),
            mutation: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session and register it if it came up.
    ///
    /// Without an explicit installation the resolver picks one. The session
    /// becomes the default when `set_as_default` is set or when there is no
    /// default yet. A session that failed to start is returned but not
    /// registered.
    pub async fn create(
        &self,
        installation: Option<Installation>,
        working_directory: Option<PathBuf>,
        set_as_default: bool,
    ) -> (Arc<TclSession>, Outcome) {
        let _guard = self.mutation.lock().await;

        let installation = installation.or_else(|| self.resolver.resolve());
        let session = Arc::new(TclSession::new(
            installation,
            working_directory,
            self.spawner.clone(),
            self.timeouts,
        ));

        let outcome = session.start().await;
        if outcome.success {
            let mut state = self.write();
            state.sessions.insert(session.id(), session.clone());
            if set_as_default || state.default_id.is_none() {
                state.default_id = Some(session.id());
            }
            info!(
                "Registered session {} ({} total)",
                session.id(),
                state.sessions.len()
            );
        }

        (session, outcome)
    }

    /// Look up a session, or the default one when `session_id` is `None`.
    pub fn get(&self, session_id: Option<&SessionId>) -> Option<Arc<TclSession>> {
        let state = self.read();
        let id = session_id.copied().or(state.default_id)?;
        state.sessions.get(&id).cloned()
    }

    /// Close and unregister a session, or the default one.
    ///
    /// When the default goes away, the oldest remaining session takes its
    /// place.
    pub async fn close(&self, session_id: Option<&SessionId>) -> Outcome {
        let _guard = self.mutation.lock().await;

        let found = {
            let state = self.read();
            match session_id {
                Some(id) => state
                    .sessions
                    .get(id)
                    .cloned()
                    .ok_or_else(|| VivadoError::SessionNotFound(id.to_string())),
                None => state
                    .default_id
                    .and_then(|id| state.sessions.get(&id).cloned())
                    .ok_or(VivadoError::NoSession),
            }
        };
        let session = match found {
            Ok(session) => session,
            Err(e) => return Outcome::failed(e.to_string()),
        };

        let outcome = session.close().await;

        let mut state = self.write();
        state.sessions.remove(&session.id());
        if state.default_id == Some(session.id()) {
            state.default_id = state.sessions.keys().next().copied();
            debug!("Default session is now {:?}", state.default_id);
        }

        outcome
    }

    /// Close every session and clear the default.
    pub async fn close_all(&self) -> Vec<(SessionId, Outcome)> {
        let _guard = self.mutation.lock().await;

        let sessions: Vec<_> = self.read().sessions.values().cloned().collect();
        let mut outcomes = Vec::with_capacity(sessions.len());
        for session in sessions {
            let outcome = session.close().await;
            self.write().sessions.remove(&session.id());
            outcomes.push((session.id(), outcome));
        }

        self.write().default_id = None;
        if !outcomes.is_empty() {
            info!("Closed {} session(s)", outcomes.len());
        }
        outcomes
    }

    /// Snapshot of every registered session, oldest first.
    pub fn list(&self) -> Vec<SessionInfo> {
        self.read().sessions.values().map(|s| s.info()).collect()
    }

    pub fn default_session_id(&self) -> Option<SessionId> {
        self.read().default_id
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `command` in an active session if one resolves, otherwise as a
    /// one-shot batch run. The fallback never creates or registers a
    /// session.
    pub async fn run_command_with_fallback(
        &self,
        command: &str,
        session_id: Option<&SessionId>,
        installation: Option<Installation>,
        timeout: Duration,
    ) -> CommandResult {
        if let Some(session) = self.get(session_id).filter(|s| s.is_active()) {
            return session.execute(command, timeout).await;
        }

        debug!("No active session, running {:?} in batch mode", command);
        let installation = installation.or_else(|| self.resolver.resolve());
        run_batch_command(
            self.spawner.as_ref(),
            installation.as_ref(),
            command,
            timeout,
        )
        .await
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SessionRegistry")
            .field("sessions", &state.sessions.keys().collect::<Vec<_>>())
            .field("default_id", &state.default_id)
            .finish_non_exhaustive()
    }
}
