//! Board layout and randomization.
//!
//! This module contains:
//! - Resource types and their wire names
//! - Terrain tiles and harbor ports
//! - `BoardLayout`, the immutable board dealt once per session
//! - Shuffling helpers for each fixed multiset
//!
//! Tile placement geometry is owned by the clients. The layout only fixes
//! *which* terrain, number and port lands in each slot, in slot order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of land tiles on the board
pub const TILE_COUNT: usize = 19;

/// Number of number tokens on the board (one per non-desert tile)
pub const NUMBER_COUNT: usize = 18;

/// Number of harbor ports on the board
pub const PORT_COUNT: usize = 9;

/// Error returned when a wire name does not match any known value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownName {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Tradeable resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Wheat,
    Sheep,
    Ore,
    Brick,
    Wood,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wheat,
        Resource::Sheep,
        Resource::Ore,
        Resource::Brick,
        Resource::Wood,
    ];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Wheat => "wheat",
            Resource::Sheep => "sheep",
            Resource::Ore => "ore",
            Resource::Brick => "brick",
            Resource::Wood => "wood",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownName::new("resource", s))
    }
}

/// Terrain of a single land tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    /// No production, robber starts here
    Desert,
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terrain::Resource(r) => r.fmt(f),
            Terrain::Desert => f.write_str("desert"),
        }
    }
}

impl FromStr for Terrain {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desert" => Ok(Terrain::Desert),
            other => other
                .parse()
                .map(Terrain::Resource)
                .map_err(|_| UnknownName::new("terrain", s)),
        }
    }
}

/// Harbor port types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Generic => f.write_str("none"),
            Port::Specific(r) => r.fmt(f),
        }
    }
}

impl FromStr for Port {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Port::Generic),
            other => other
                .parse()
                .map(Port::Specific)
                .map_err(|_| UnknownName::new("port", s)),
        }
    }
}

/// Standard tile distribution:
/// 4 Wheat, 4 Sheep, 3 Ore, 3 Brick, 4 Wood, 1 Desert
pub fn standard_tiles() -> Vec<Terrain> {
    let mut tiles = Vec::with_capacity(TILE_COUNT);
    for (resource, count) in [
        (Resource::Wheat, 4),
        (Resource::Sheep, 4),
        (Resource::Ore, 3),
        (Resource::Brick, 3),
        (Resource::Wood, 4),
    ] {
        tiles.extend(std::iter::repeat(Terrain::Resource(resource)).take(count));
    }
    tiles.push(Terrain::Desert);
    tiles
}

/// Standard number tokens: one 2, one 12, two each of 3-6 and 8-11.
/// There is never a 7.
pub fn standard_numbers() -> Vec<u8> {
    vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12]
}

/// Standard ports: one per resource plus four generic
pub fn standard_ports() -> Vec<Port> {
    let mut ports: Vec<Port> = Resource::ALL.into_iter().map(Port::Specific).collect();
    ports.extend(std::iter::repeat(Port::Generic).take(4));
    ports
}

/// Shuffled copy of the standard tile multiset
pub fn shuffled_tiles<R: Rng + ?Sized>(rng: &mut R) -> Vec<Terrain> {
    let mut tiles = standard_tiles();
    tiles.shuffle(rng);
    tiles
}

/// Shuffled copy of the standard number tokens
pub fn shuffled_numbers<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut numbers = standard_numbers();
    numbers.shuffle(rng);
    numbers
}

/// Shuffled copy of the standard ports
pub fn shuffled_ports<R: Rng + ?Sized>(rng: &mut R) -> Vec<Port> {
    let mut ports = standard_ports();
    ports.shuffle(rng);
    ports
}

/// The board dealt for one session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLayout {
    tiles: Vec<Terrain>,
    numbers: Vec<u8>,
    ports: Vec<Port>,
}

impl BoardLayout {
    /// Deal a random board
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self::random_with_rng(&mut rng)
    }

    /// Deal a random board with a provided RNG
    pub fn random_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            tiles: shuffled_tiles(rng),
            numbers: shuffled_numbers(rng),
            ports: shuffled_ports(rng),
        }
    }

    /// Rebuild a layout received over the wire, checking every multiset.
    pub fn from_parts(
        tiles: Vec<Terrain>,
        numbers: Vec<u8>,
        ports: Vec<Port>,
    ) -> Option<Self> {
        let layout = Self {
            tiles,
            numbers,
            ports,
        };
        layout.is_standard().then_some(layout)
    }

    pub fn tiles(&self) -> &[Terrain] {
        &self.tiles
    }

    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Check that each sequence is a permutation of its standard multiset
    pub fn is_standard(&self) -> bool {
        same_multiset(&self.tiles, standard_tiles())
            && same_multiset(&self.numbers, standard_numbers())
            && same_multiset(&self.ports, standard_ports())
    }
}

fn same_multiset<T: PartialEq>(actual: &[T], mut expected: Vec<T>) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    for item in actual {
        match expected.iter().position(|e| e == item) {
            Some(idx) => {
                expected.swap_remove(idx);
            }
            None => return false,
        }
    }
    true
}
