//! Session and player management.

use std::sync::Arc;

use settlers_core::{
    BoardLayout, ClientMessage, ColorPool, DevelopmentDeck, IdentifierError, PlayerColor,
    ProtocolError, ServerMessage, MAX_PLAYERS, MIN_PLAYERS,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::mailbox::{self, InboxReceiver, InboxSender, Outbox};
use crate::protocol::PlayerInfo;

/// Opaque per-player identity handed out on create/join.
pub type PlayerToken = Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Player not in session")]
    PlayerNotFound,

    #[error("Game already started")]
    AlreadyStarted,

    #[error("Session is full")]
    SessionFull,

    #[error("Not enough players")]
    NotEnoughPlayers,

    #[error("Not the host")]
    NotHost,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Malformed message: {0}")]
    Malformed(#[from] ProtocolError),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionPhase {
    Lobby,
    Setup,
    TurnLoop,
    GameOver,
}

/// A seated player.
#[derive(Debug, Clone)]
pub struct Player {
    pub token: PlayerToken,
    pub name: String,
    pub color: PlayerColor,
    /// Seat index (0-3), lowest free seat on join
    pub seat: u8,
    pub host: bool,
    pub outbox: Arc<Outbox>,
}

impl Player {
    pub fn new(name: String, color: PlayerColor, seat: u8, host: bool) -> Self {
        Self {
            token: Uuid::new_v4(),
            name,
            color,
            seat,
            host,
            outbox: Arc::new(Outbox::new()),
        }
    }

    pub fn send(&self, msg: ServerMessage) {
        self.outbox.send(msg);
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            name: self.name.clone(),
            color: self.color,
            seat: self.seat,
            host: self.host,
        }
    }
}

/// Seated players and lobby bookkeeping.
///
/// Players are kept ordered by seat. Colors and seats are unique among
/// seated players; both are released when a player leaves. Each roster
/// draws its colors in its own random order.
#[derive(Debug)]
pub struct Roster {
    players: Vec<Player>,
    colors: ColorPool,
    phase: SessionPhase,
    winner: Option<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            players: Vec::with_capacity(MAX_PLAYERS),
            colors: ColorPool::shuffled(),
            phase: SessionPhase::Lobby,
            winner: None,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn is_started(&self) -> bool {
        self.phase != SessionPhase::Lobby
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn get(&self, token: PlayerToken) -> Option<&Player> {
        self.players.iter().find(|p| p.token == token)
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.host)
    }

    pub fn add_player(&mut self, name: String) -> Result<Player, SessionError> {
        if self.is_started() {
            return Err(SessionError::AlreadyStarted);
        }
        if self.is_full() {
            return Err(SessionError::SessionFull);
        }
        let color = self.colors.acquire().ok_or(SessionError::SessionFull)?;

        // Lowest seat not held by anyone
        let seat = (0..MAX_PLAYERS as u8)
            .find(|s| self.players.iter().all(|p| p.seat != *s))
            .ok_or(SessionError::SessionFull)?;

        let player = Player::new(name, color, seat, self.players.is_empty());
        let idx = self.players.partition_point(|p| p.seat < seat);
        self.players.insert(idx, player.clone());
        Ok(player)
    }

    /// Take a player out of the lobby.
    ///
    /// A guest gives up their seat and color. The host leaving closes the
    /// lobby for everyone instead.
    pub fn remove_player(&mut self, token: PlayerToken) -> Result<Departure, SessionError> {
        if self.is_started() {
            return Err(SessionError::AlreadyStarted);
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.token == token)
            .ok_or(SessionError::PlayerNotFound)?;

        if self.players[idx].host {
            self.phase = SessionPhase::GameOver;
            return Ok(Departure::Closed(self.players[idx].clone()));
        }

        let removed = self.players.remove(idx);
        self.colors.release(removed.color);
        Ok(Departure::Left(removed))
    }

    /// End the lobby because `token` quit before the start.
    pub fn abandon(&mut self, token: PlayerToken) -> Result<Player, SessionError> {
        if self.is_started() {
            return Err(SessionError::AlreadyStarted);
        }
        let player = self.get(token).cloned().ok_or(SessionError::PlayerNotFound)?;
        self.phase = SessionPhase::GameOver;
        Ok(player)
    }

    /// Lock the roster for play. Only the host may start.
    pub fn start(&mut self, requester: PlayerToken) -> Result<Vec<Player>, SessionError> {
        let player = self.get(requester).ok_or(SessionError::PlayerNotFound)?;
        if !player.host {
            return Err(SessionError::NotHost);
        }
        if self.is_started() {
            return Err(SessionError::AlreadyStarted);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(SessionError::NotEnoughPlayers);
        }

        self.phase = SessionPhase::Setup;
        Ok(self.players.clone())
    }

    pub fn to_info(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(Player::to_info).collect()
    }
}

/// Result of a lobby departure.
#[derive(Debug)]
pub enum Departure {
    /// A guest left, the session stays open
    Left(Player),
    /// The host left and the lobby is closed
    Closed(Player),
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinator-owned state, parked in the session until the match starts.
#[derive(Debug)]
struct Pending {
    inbox: InboxReceiver,
    deck: DevelopmentDeck,
}

/// Everything the coordinator takes over when the host starts the match.
#[derive(Debug)]
pub struct MatchStart {
    /// Seated players, ordered by seat
    pub players: Vec<Player>,
    pub inbox: InboxReceiver,
    pub board: BoardLayout,
    pub deck: DevelopmentDeck,
}

/// One match, from lobby to game over.
///
/// The roster is shared between gateway callers and the coordinator and is
/// only touched under its lock. Board and deck are dealt at creation; the
/// inbound receiver and the deck stay parked until the coordinator takes
/// them.
#[derive(Debug)]
pub struct Session {
    code: String,
    board: BoardLayout,
    roster: Mutex<Roster>,
    inbox: InboxSender,
    pending: Mutex<Option<Pending>>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session with its creator seated as host.
    pub fn new(code: String, creator_name: String) -> Result<(Self, Player), SessionError> {
        let mut roster = Roster::new();
        let creator = roster.add_player(creator_name)?;
        let (tx, rx) = mailbox::inbox();

        let session = Self {
            code,
            board: BoardLayout::random(),
            roster: Mutex::new(roster),
            inbox: tx,
            pending: Mutex::new(Some(Pending {
                inbox: rx,
                deck: DevelopmentDeck::shuffled(),
            })),
            coordinator: Mutex::new(None),
        };
        Ok((session, creator))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn board(&self) -> &BoardLayout {
        &self.board
    }

    pub async fn phase(&self) -> SessionPhase {
        self.roster.lock().await.phase()
    }

    pub async fn set_phase(&self, phase: SessionPhase) {
        let mut roster = self.roster.lock().await;
        debug!(code = %self.code, from = ?roster.phase, to = ?phase, "Phase change");
        roster.phase = phase;
    }

    pub async fn winner(&self) -> Option<String> {
        self.roster.lock().await.winner().map(str::to_string)
    }

    pub async fn set_winner(&self, name: String) {
        let mut roster = self.roster.lock().await;
        roster.winner = Some(name);
        roster.phase = SessionPhase::GameOver;
    }

    pub async fn roster(&self) -> Vec<PlayerInfo> {
        self.roster.lock().await.to_info()
    }

    pub async fn player(&self, token: PlayerToken) -> Result<Player, SessionError> {
        self.roster
            .lock()
            .await
            .get(token)
            .cloned()
            .ok_or(SessionError::PlayerNotFound)
    }

    /// Seat a new player and announce them to everyone already seated.
    pub async fn join(&self, name: String) -> Result<(Player, Vec<PlayerInfo>), SessionError> {
        let mut roster = self.roster.lock().await;
        let player = roster.add_player(name)?;

        for other in roster.players().iter().filter(|p| p.token != player.token) {
            other.send(ServerMessage::Enemy {
                name: player.name.clone(),
                color: player.color,
            });
        }

        info!(code = %self.code, name = %player.name, color = %player.color, seat = player.seat, "Player joined");
        Ok((player, roster.to_info()))
    }

    /// Remove a player from the lobby. Returns `true` if the session closed
    /// and should be dropped.
    pub async fn leave(&self, token: PlayerToken) -> Result<bool, SessionError> {
        let mut roster = self.roster.lock().await;
        match roster.remove_player(token)? {
            Departure::Left(removed) => {
                for other in roster.players() {
                    other.send(ServerMessage::EnemyLeave {
                        name: removed.name.clone(),
                        color: removed.color,
                    });
                }
                info!(code = %self.code, name = %removed.name, color = %removed.color, "Player left");
                Ok(false)
            }
            Departure::Closed(host) => {
                for player in roster.players() {
                    player.send(ServerMessage::LobbyClosed);
                }
                info!(code = %self.code, host = %host.name, "Host left, lobby closed");
                Ok(true)
            }
        }
    }

    /// Start the match, handing over what the coordinator will own.
    pub async fn begin(&self, requester: PlayerToken) -> Result<MatchStart, SessionError> {
        let mut roster = self.roster.lock().await;
        let mut pending = self.pending.lock().await;
        if pending.is_none() {
            return Err(SessionError::AlreadyStarted);
        }
        let players = roster.start(requester)?;
        let Pending { inbox, deck } = pending.take().ok_or(SessionError::AlreadyStarted)?;

        info!(code = %self.code, players = players.len(), "Match starting");
        Ok(MatchStart {
            players,
            inbox,
            board: self.board.clone(),
            deck,
        })
    }

    /// Queue a player's message for the coordinator.
    ///
    /// Before the start only `prestart` and `quit` are accepted and handled
    /// here; a lobby `quit` closes the session. Returns `true` if the
    /// session closed and should be dropped.
    pub async fn post(&self, token: PlayerToken, msg: ClientMessage) -> Result<bool, SessionError> {
        {
            let mut roster = self.roster.lock().await;
            if roster.get(token).is_none() {
                return Err(SessionError::PlayerNotFound);
            }
            if !roster.is_started() {
                return match msg {
                    ClientMessage::PreStart => {
                        for player in roster.players() {
                            player.send(ServerMessage::CloseListen);
                        }
                        Ok(false)
                    }
                    ClientMessage::Quit => {
                        let quitter = roster.abandon(token)?;
                        for other in roster.players().iter().filter(|p| p.token != token) {
                            other.send(ServerMessage::Quit {
                                by: Some(quitter.color),
                            });
                        }
                        info!(code = %self.code, name = %quitter.name, "Player quit the lobby, session closed");
                        Ok(true)
                    }
                    _ => Err(SessionError::GameNotStarted),
                };
            }
            if roster.phase() == SessionPhase::GameOver {
                return Err(SessionError::SessionNotFound(self.code.clone()));
            }
        }

        self.inbox
            .send(token, msg)
            .map_err(|_| SessionError::SessionNotFound(self.code.clone()))?;
        Ok(false)
    }

    /// Send a message to every seated player.
    pub async fn broadcast(&self, msg: ServerMessage) {
        for player in self.roster.lock().await.players() {
            player.send(msg.clone());
        }
    }

    pub async fn attach_coordinator(&self, handle: JoinHandle<()>) {
        *self.coordinator.lock().await = Some(handle);
    }

    /// Whether a coordinator task is attached and still running.
    pub async fn coordinator_running(&self) -> bool {
        self.coordinator
            .lock()
            .await
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Stop the coordinator task, if one is running.
    pub async fn abort_coordinator(&self) {
        if let Some(handle) = self.coordinator.lock().await.take() {
            handle.abort();
        }
    }
}
