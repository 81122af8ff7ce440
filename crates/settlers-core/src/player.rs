//! Player colors and resource bundles.
//!
//! This module contains:
//! - PlayerColor and the pool that keeps colors unique within a session
//! - ResourceBundle for trade offers and discards

use crate::board::{Resource, UnknownName};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Maximum number of seated players
pub const MAX_PLAYERS: usize = 4;

/// Minimum number of players needed to start a match
pub const MIN_PLAYERS: usize = 2;

/// Player color, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    White,
    Orange,
}

impl PlayerColor {
    /// All colors
    pub const ALL: [PlayerColor; MAX_PLAYERS] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::White,
        PlayerColor::Orange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::Blue => "blue",
            PlayerColor::White => "white",
            PlayerColor::Orange => "orange",
        }
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerColor {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayerColor::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName::new("color", s))
    }
}

/// All four colors in random order
pub fn shuffled_colors<R: Rng + ?Sized>(rng: &mut R) -> Vec<PlayerColor> {
    let mut colors = PlayerColor::ALL.to_vec();
    colors.shuffle(rng);
    colors
}

/// Colors not yet held by a seated player.
///
/// Colors are handed out front to back. A released color goes to the back
/// of the queue, so it is the last one reused.
#[derive(Debug, Clone)]
pub struct ColorPool {
    free: VecDeque<PlayerColor>,
}

impl ColorPool {
    /// Pool handing out colors in [`PlayerColor::ALL`] order
    pub fn new() -> Self {
        Self::from_order(PlayerColor::ALL.to_vec())
    }

    /// Pool with a fresh random order, one per session
    pub fn shuffled() -> Self {
        Self::shuffled_with_rng(&mut rand::thread_rng())
    }

    pub fn shuffled_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::from_order(shuffled_colors(rng))
    }

    fn from_order(order: Vec<PlayerColor>) -> Self {
        Self { free: order.into() }
    }

    /// Take the next free color, if any
    pub fn acquire(&mut self) -> Option<PlayerColor> {
        self.free.pop_front()
    }

    /// Return a color to the pool
    pub fn release(&mut self, color: PlayerColor) {
        if !self.free.contains(&color) {
            self.free.push_back(color);
        }
    }

    pub fn is_free(&self, color: PlayerColor) -> bool {
        self.free.contains(&color)
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }
}

impl Default for ColorPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A bundle of resources, used for trade offers and discards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBundle {
    pub wheat: u32,
    pub sheep: u32,
    pub ore: u32,
    pub brick: u32,
    pub wood: u32,
}

impl ResourceBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bundle with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut bundle = Self::new();
        bundle.add(resource, amount);
        bundle
    }

    /// Total number of resource cards
    pub fn total(&self) -> u64 {
        Resource::ALL.iter().map(|r| u64::from(self.get(*r))).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wheat => self.wheat,
            Resource::Sheep => self.sheep,
            Resource::Ore => self.ore,
            Resource::Brick => self.brick,
            Resource::Wood => self.wood,
        }
    }

    /// Add resources to the bundle, saturating at `u32::MAX`
    pub fn add(&mut self, resource: Resource, amount: u32) {
        let count = self.count_mut(resource);
        *count = count.saturating_add(amount);
    }

    /// Add resources, or `None` if the count would overflow
    pub fn checked_add(&mut self, resource: Resource, amount: u32) -> Option<()> {
        let count = self.count_mut(resource);
        *count = count.checked_add(amount)?;
        Some(())
    }

    fn count_mut(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wheat => &mut self.wheat,
            Resource::Sheep => &mut self.sheep,
            Resource::Ore => &mut self.ore,
            Resource::Brick => &mut self.brick,
            Resource::Wood => &mut self.wood,
        }
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        let mut first = true;
        for resource in Resource::ALL {
            let count = self.get(resource);
            if count == 0 {
                continue;
            }
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{resource}:{count}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for ResourceBundle {
    type Err = UnknownName;

    /// Parses `wheat:2+ore:1`; `-` is the empty bundle.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bundle = ResourceBundle::new();
        if s == "-" {
            return Ok(bundle);
        }
        for part in s.split('+') {
            let (name, count) = part
                .split_once(':')
                .ok_or_else(|| UnknownName::new("resource bundle", s))?;
            let resource: Resource = name.parse()?;
            let count: u32 = count
                .parse()
                .map_err(|_| UnknownName::new("resource count", count))?;
            bundle
                .checked_add(resource, count)
                .ok_or_else(|| UnknownName::new("resource count", part))?;
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_color_pool_hands_out_unique_colors() {
        let mut pool = ColorPool::new();
        let colors: Vec<_> = std::iter::from_fn(|| pool.acquire()).collect();
        assert_eq!(colors, PlayerColor::ALL.to_vec());
        assert_eq!(pool.acquire(), None);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_color_pool_release() {
        let mut pool = ColorPool::new();
        let red = pool.acquire().unwrap();
        let blue = pool.acquire().unwrap();
        assert!(!pool.is_free(red));

        pool.release(red);
        pool.release(red);
        assert!(pool.is_free(red));
        assert!(!pool.is_free(blue));
        assert_eq!(pool.available(), 3);

        // Released colors queue behind the untouched ones
        assert_eq!(pool.acquire(), Some(PlayerColor::White));
        assert_eq!(pool.acquire(), Some(PlayerColor::Orange));
        assert_eq!(pool.acquire(), Some(PlayerColor::Red));
    }

    #[test]
    fn test_shuffled_pools_differ_between_sessions() {
        let mut rng = StdRng::seed_from_u64(11);
        let orders: HashSet<Vec<PlayerColor>> = (0..20)
            .map(|_| {
                let mut pool = ColorPool::shuffled_with_rng(&mut rng);
                std::iter::from_fn(|| pool.acquire()).collect()
            })
            .collect();

        assert!(orders.len() > 1);
        for order in &orders {
            let unique: HashSet<_> = order.iter().collect();
            assert_eq!(unique.len(), MAX_PLAYERS);
        }
    }

    #[test]
    fn test_bundle_wire_form() {
        let mut bundle = ResourceBundle::single(Resource::Wheat, 2);
        bundle.add(Resource::Ore, 1);
        assert_eq!(bundle.to_string(), "wheat:2+ore:1");
        assert_eq!("wheat:2+ore:1".parse::<ResourceBundle>().unwrap(), bundle);
        assert_eq!(bundle.total(), 3);
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = ResourceBundle::new();
        assert!(bundle.is_empty());
        assert_eq!(bundle.to_string(), "-");
        assert_eq!("-".parse::<ResourceBundle>().unwrap(), bundle);
    }

    #[test]
    fn test_bundle_rejects_garbage() {
        assert!("wheat".parse::<ResourceBundle>().is_err());
        assert!("gold:1".parse::<ResourceBundle>().is_err());
        assert!("wood:x".parse::<ResourceBundle>().is_err());
    }

    #[test]
    fn test_bundle_counts_never_overflow() {
        assert!("wheat:4294967295+wheat:1".parse::<ResourceBundle>().is_err());

        let bundle: ResourceBundle = "wheat:4294967295+ore:1".parse().unwrap();
        assert_eq!(bundle.total(), u64::from(u32::MAX) + 1);
        assert!(!bundle.is_empty());

        let mut bundle = ResourceBundle::single(Resource::Wood, u32::MAX);
        bundle.add(Resource::Wood, 5);
        assert_eq!(bundle.get(Resource::Wood), u32::MAX);
    }
}
