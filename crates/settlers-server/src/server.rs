//! Gateway-facing operations.
//!
//! [`ServerState`] is what a request gateway links against: every lobby and
//! match operation a client can trigger goes through here. Errors come back
//! as [`SessionError`] for the gateway to render.

use std::sync::Arc;
use std::time::Duration;

use settlers_core::{ClientMessage, ServerMessage};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::coordinator::{Coordinator, DiceRoller, RandomDice};
use crate::protocol::{JoinTicket, PlayerInfo, Polled, SessionTicket};
use crate::registry::SessionRegistry;
use crate::session::{MatchStart, PlayerToken, Session, SessionError, SessionPhase};

/// Server state shared across all gateway requests.
#[derive(Debug)]
pub struct ServerState {
    registry: Arc<SessionRegistry>,
    config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(&config)),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Create a session with the caller as host in seat 0.
    pub async fn create_session(&self, creator_name: &str) -> Result<SessionTicket, SessionError> {
        let (session, creator) = self.registry.create(creator_name.to_string()).await?;
        Ok(SessionTicket {
            code: session.code().to_string(),
            player_token: creator.token,
            color: creator.color,
            seat: creator.seat,
        })
    }

    /// Join a session that has not started yet.
    pub async fn join_session(&self, code: &str, player_name: &str) -> Result<JoinTicket, SessionError> {
        let session = self.registry.lookup(code).await?;
        let (player, roster) = session.join(player_name.to_string()).await?;
        Ok(JoinTicket {
            player_token: player.token,
            color: player.color,
            seat: player.seat,
            roster,
        })
    }

    /// Leave a session before it starts. The host leaving closes it.
    pub async fn leave_session(&self, code: &str, token: PlayerToken) -> Result<(), SessionError> {
        let session = self.registry.lookup(code).await?;
        if session.leave(token).await? {
            self.registry.remove(code).await;
        }
        Ok(())
    }

    /// Start the match (host only) with fair dice.
    pub async fn start_session(&self, code: &str, token: PlayerToken) -> Result<(), SessionError> {
        self.start_session_with(code, token, Box::new(RandomDice::new()))
            .await
    }

    /// Start the match with a specific dice source.
    pub async fn start_session_with(
        &self,
        code: &str,
        token: PlayerToken,
        dice: Box<dyn DiceRoller>,
    ) -> Result<(), SessionError> {
        let session = self.registry.lookup(code).await?;
        let start = session.begin(token).await?;
        self.launch(session, start, dice).await;
        Ok(())
    }

    async fn launch(&self, session: Arc<Session>, start: MatchStart, dice: Box<dyn DiceRoller>) {
        let coordinator = Coordinator::new(
            Arc::clone(&session),
            Arc::clone(&self.registry),
            start,
            dice,
        );
        info!(code = %session.code(), order = ?coordinator.turn_order(), "Coordinator spawned");
        session.attach_coordinator(coordinator.spawn()).await;

        // A clear that ran after `begin` could not see the handle
        if !self.registry.contains(&session).await {
            warn!(code = %session.code(), "Session cleared while starting, stopping coordinator");
            session.abort_coordinator().await;
        }
    }

    /// Queue a player's message for the session's coordinator.
    ///
    /// A `quit` before the start closes the lobby and drops the session.
    pub async fn post_action(
        &self,
        code: &str,
        token: PlayerToken,
        action: ClientMessage,
    ) -> Result<(), SessionError> {
        let session = self.registry.lookup(code).await?;
        if session.post(token, action).await? {
            self.registry.remove(code).await;
        }
        Ok(())
    }

    /// Parse a flat wire string and post it.
    pub async fn post_wire(&self, code: &str, token: PlayerToken, raw: &str) -> Result<(), SessionError> {
        let action: ClientMessage = raw.parse().map_err(|e| {
            warn!(code = %code, raw = %raw, error = %e, "Malformed action");
            SessionError::Malformed(e)
        })?;
        self.post_action(code, token, action).await
    }

    /// Long-poll a player's outbound mailbox.
    ///
    /// Waits up to `timeout` (or the configured default) and returns
    /// [`Polled::NoMessageYet`] if nothing arrived.
    pub async fn poll_outbound(
        &self,
        code: &str,
        token: PlayerToken,
        timeout: Option<Duration>,
    ) -> Result<Polled, SessionError> {
        let session = self.registry.lookup(code).await?;
        let player = session.player(token).await?;
        let timeout = timeout.unwrap_or(self.config.poll_timeout);
        Ok(player.outbox.receive_timeout(timeout).await)
    }

    /// Drop every session. Players are told the match ended and running
    /// coordinators are stopped.
    pub async fn clear_all_sessions(&self, admin_secret: &str) -> Result<usize, SessionError> {
        match self.config.admin_secret.as_deref() {
            Some(secret) if secret == admin_secret => {}
            _ => {
                warn!("Rejected session clear with bad admin secret");
                return Err(SessionError::Unauthorized);
            }
        }

        let sessions = self.registry.clear_all().await;
        for session in &sessions {
            session.broadcast(ServerMessage::Quit { by: None }).await;
            session.abort_coordinator().await;
        }
        Ok(sessions.len())
    }

    pub async fn session_phase(&self, code: &str) -> Result<SessionPhase, SessionError> {
        Ok(self.registry.lookup(code).await?.phase().await)
    }

    pub async fn roster(&self, code: &str) -> Result<Vec<PlayerInfo>, SessionError> {
        Ok(self.registry.lookup(code).await?.roster().await)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
