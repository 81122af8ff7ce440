//! Gateway-facing request results.
//!
//! The match messages themselves live in `settlers_core::protocol`; these
//! are the lobby responses the gateway hands back to its callers.

use serde::{Deserialize, Serialize};
use settlers_core::PlayerColor;
use uuid::Uuid;

pub use crate::mailbox::Polled;

/// Result of creating a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTicket {
    pub code: String,
    pub player_token: Uuid,
    pub color: PlayerColor,
    pub seat: u8,
}

/// Result of joining a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTicket {
    pub player_token: Uuid,
    pub color: PlayerColor,
    pub seat: u8,
    /// Everyone seated after the join, ordered by seat
    pub roster: Vec<PlayerInfo>,
}

/// Player information visible to other players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub name: String,
    pub color: PlayerColor,
    pub seat: u8,
    pub host: bool,
}
