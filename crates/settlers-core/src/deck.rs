//! Development card stack.
//!
//! The deck is shuffled once when a session is created and only ever
//! shrinks afterwards.

use crate::board::UnknownName;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of cards in a fresh deck
pub const DECK_SIZE: usize = 26;

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevelopmentCard {
    /// Move robber and steal
    Knight,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All players must give you all of one resource type
    Monopoly,
    /// Worth 1 VP, never played
    VictoryPoint,
}

impl DevelopmentCard {
    pub const ALL: [DevelopmentCard; 5] = [
        DevelopmentCard::Knight,
        DevelopmentCard::RoadBuilding,
        DevelopmentCard::YearOfPlenty,
        DevelopmentCard::Monopoly,
        DevelopmentCard::VictoryPoint,
    ];

    /// Create the standard development card deck, unshuffled
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(DECK_SIZE);

        // 15 Knights
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(15));

        // 2 Road Building
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(2));

        // 2 Year of Plenty
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(2));

        // 2 Monopoly
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(2));

        // 5 Victory Points
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(5));

        deck
    }

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            DevelopmentCard::Knight => "knight",
            DevelopmentCard::RoadBuilding => "roadbuilding",
            DevelopmentCard::YearOfPlenty => "yearofplenty",
            DevelopmentCard::Monopoly => "monopoly",
            DevelopmentCard::VictoryPoint => "victorypoint",
        }
    }
}

impl fmt::Display for DevelopmentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevelopmentCard {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DevelopmentCard::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName::new("development card", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("No development cards left in deck")]
    Empty,
}

/// A shuffled, draw-only development card stack.
#[derive(Debug, Clone)]
pub struct DevelopmentDeck {
    cards: Vec<DevelopmentCard>,
}

impl DevelopmentDeck {
    /// Shuffle a fresh deck
    pub fn shuffled() -> Self {
        let mut rng = rand::thread_rng();
        Self::shuffled_with_rng(&mut rng)
    }

    /// Shuffle a fresh deck with a provided RNG
    pub fn shuffled_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = DevelopmentCard::standard_deck();
        cards.shuffle(rng);
        Self { cards }
    }

    /// Take the top card off the stack
    pub fn draw(&mut self) -> Result<DevelopmentCard, DeckError> {
        self.cards.pop().ok_or(DeckError::Empty)
    }

    /// Cards left to draw
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
