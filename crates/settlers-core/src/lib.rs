//! Settlers - shared building blocks for a multiplayer settlement game
//!
//! This crate provides the runtime-free pieces of a match:
//! - Board randomization from the fixed tile, number and port sets
//! - The draw-only development card deck
//! - Player colors and resource bundles
//! - Collision-free session codes
//! - The typed match protocol and its flat-string wire form
//!
//! # Modules
//!
//! - [`board`]: Resources, terrain, ports and the dealt board
//! - [`deck`]: Development cards
//! - [`player`]: Colors, the color pool and resource bundles
//! - [`code`]: Session code generation
//! - [`protocol`]: Client and server messages

pub mod board;
pub mod code;
pub mod deck;
pub mod player;
pub mod protocol;

// Re-export commonly used types
pub use board::{BoardLayout, Port, Resource, Terrain, UnknownName};
pub use code::IdentifierError;
pub use deck::{DeckError, DevelopmentCard, DevelopmentDeck};
pub use player::{ColorPool, PlayerColor, ResourceBundle, MAX_PLAYERS, MIN_PLAYERS};
pub use protocol::{
    ClientMessage, DiscardResponse, GameUpdate, ProtocolError, ServerMessage, UpdateKind,
};
