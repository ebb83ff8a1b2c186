//! Game state and core world-model types
//!
//! All state that must be persisted for Continue/determinism lives here.
//! Coins are identity-bearing: a serial is minted once, never reused, and
//! only a coin's cell changes as it moves between caches and the player.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, LatLng};

/// A single coin
///
/// `cell` is the cache the coin was minted in or last deposited into; it is
/// left untouched while the coin rides in the inventory. Two coins are the
/// same coin iff their serials match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub cell: Cell,
    pub serial: u64,
}

impl Coin {
    /// Compact identity shown in cache popups, e.g. `369894:-1220628#17`
    pub fn label(&self) -> String {
        format!("{}:{}#{}", self.cell.i, self.cell.j, self.serial)
    }
}

/// A realized cache and the coins currently resting in it
///
/// Coin order is insertion order; it carries no meaning but must stay
/// stable so popups render the same list every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    pub cell: Cell,
    pub coins: Vec<Coin>,
}

impl Cache {
    pub fn new(cell: Cell) -> Self {
        Self {
            cell,
            coins: Vec::new(),
        }
    }

    /// Remove the coin with `serial`, preserving the order of the rest
    pub fn take_coin(&mut self, serial: u64) -> Option<Coin> {
        let idx = self.coins.iter().position(|c| c.serial == serial)?;
        Some(self.coins.remove(idx))
    }
}

/// Outcome of the one-shot spawn roll for a cell
///
/// Recorded the first time a cell is examined and never re-rolled; the map
/// of decisions is what makes lazy generation idempotent.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoCache,
    Realized(Cache),
}

/// Authoritative mapping from cell to decision, plus the serial mint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldStore {
    decisions: HashMap<Cell, Decision>,
    next_serial: u64,
}

impl WorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted caches; `next_serial` must be the
    /// saved counter so restored serials never collide with new mints.
    pub fn from_saved(caches: Vec<Cache>, next_serial: u64) -> Self {
        let decisions = caches
            .into_iter()
            .map(|c| (c.cell, Decision::Realized(c)))
            .collect();
        Self {
            decisions,
            next_serial,
        }
    }

    pub fn decision(&self, cell: &Cell) -> Option<&Decision> {
        self.decisions.get(cell)
    }

    pub fn is_decided(&self, cell: &Cell) -> bool {
        self.decisions.contains_key(cell)
    }

    pub fn cache(&self, cell: &Cell) -> Option<&Cache> {
        match self.decisions.get(cell) {
            Some(Decision::Realized(cache)) => Some(cache),
            _ => None,
        }
    }

    pub fn cache_mut(&mut self, cell: &Cell) -> Option<&mut Cache> {
        match self.decisions.get_mut(cell) {
            Some(Decision::Realized(cache)) => Some(cache),
            _ => None,
        }
    }

    /// Record that `cell` rolled no cache
    pub fn record_empty(&mut self, cell: Cell) {
        debug_assert!(!self.is_decided(&cell), "cell {} re-decided", cell.key());
        self.decisions.insert(cell, Decision::NoCache);
    }

    /// Materialize a cache at `cell` holding `coin_count` freshly minted coins
    pub fn realize(&mut self, cell: Cell, coin_count: u32) -> &Cache {
        debug_assert!(!self.is_decided(&cell), "cell {} re-decided", cell.key());
        let mut cache = Cache::new(cell);
        for _ in 0..coin_count {
            let serial = self.next_serial;
            self.next_serial += 1;
            cache.coins.push(Coin { cell, serial });
        }
        self.decisions.insert(cell, Decision::Realized(cache));
        match self.decisions.get(&cell) {
            Some(Decision::Realized(cache)) => cache,
            _ => unreachable!("realize just inserted"),
        }
    }

    /// Total serials ever minted; also the next serial to be handed out
    pub fn serials_minted(&self) -> u64 {
        self.next_serial
    }

    /// All realized caches, in unspecified order
    pub fn caches(&self) -> impl Iterator<Item = &Cache> {
        self.decisions.values().filter_map(|d| match d {
            Decision::Realized(cache) => Some(cache),
            Decision::NoCache => None,
        })
    }

    /// Coins currently resting in caches
    pub fn coins_in_caches(&self) -> u64 {
        self.caches().map(|c| c.coins.len() as u64).sum()
    }
}

/// Complete game state
///
/// Mutated only through `sim::command::apply`, one event at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// Where the player spawned; reset regenerates the world here
    pub origin: LatLng,
    /// Current player position
    pub player: LatLng,
    /// Decision map + serial mint
    pub world: WorldStore,
    /// Coins held by the player; the back is the most recently collected
    pub inventory: Vec<Coin>,
    /// Geolocation movement history (thinned by the trail threshold)
    pub trail: Vec<LatLng>,
    /// Is a geolocation subscription currently driving the player?
    pub tracking: bool,
}

impl GameState {
    pub fn new(origin: LatLng) -> Self {
        Self {
            origin,
            player: origin,
            world: WorldStore::new(),
            inventory: Vec::new(),
            trail: Vec::new(),
            tracking: false,
        }
    }

    /// The cell the player is standing in
    pub fn player_cell(&self) -> Cell {
        Cell::containing(&self.player)
    }

    pub fn coins_held(&self) -> usize {
        self.inventory.len()
    }

    /// Coins in caches plus coins in hand; equals serials minted unless a
    /// coin has been duplicated or lost
    pub fn coins_everywhere(&self) -> u64 {
        self.world.coins_in_caches() + self.inventory.len() as u64
    }
}
