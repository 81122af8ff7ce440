//! Settlers multiplayer session server.
//!
//! Lobby management and per-match coordination for the settlement game,
//! meant to sit behind a request gateway:
//! - [`registry`]: live sessions by code
//! - [`session`]: roster, colors, seats and host handling
//! - [`mailbox`]: the per-session inbound queue and per-player outboxes
//! - [`coordinator`]: the match state machine, one task per session
//! - [`server`]: the operations a gateway calls
//!
//! Everything runs on tokio. Players never block one another: posting is a
//! queue send, and polling waits only on the caller's own outbox.

pub mod config;
pub mod coordinator;
pub mod mailbox;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use coordinator::{Coordinator, DiceRoller, MatchOutcome, RandomDice};
pub use protocol::{JoinTicket, PlayerInfo, Polled, SessionTicket};
pub use registry::SessionRegistry;
pub use server::ServerState;
pub use session::{PlayerToken, Session, SessionError, SessionPhase};
