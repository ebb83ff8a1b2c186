//! Lazy deterministic world generation and the visibility window
//!
//! Cells are decided at most once: the first time a cell falls inside the
//! candidate square around the player, its spawn roll is recorded in the
//! world store, and the record is what every later query answers from.
//! Moving away only hides markers; realized caches are never de-spawned.

use crate::consts::{
    CACHE_SPAWN_PROBABILITY, INITIAL_COINS_MAX, NEIGHBORHOOD_RADIUS, VISIBILITY_RADIUS_M,
};
use serde::Serialize;

use super::cell::{Cell, LatLng};
use super::luck::{luck, luck_salted};
use super::state::{Cache, Coin, WorldStore};

/// Salt for the coin-count roll, keeping it independent of the spawn gate
const COIN_COUNT_SALT: &str = "initialValue";

/// Decide `cell` once and return its cache, if it has one
///
/// Idempotent: a decided cell is answered straight from the store with no
/// new rolls and no new serials.
pub fn ensure_cache_decided(world: &mut WorldStore, cell: Cell) -> Option<&Cache> {
    if !world.is_decided(&cell) {
        if luck(&cell.key()) < CACHE_SPAWN_PROBABILITY {
            let coins = initial_coin_count(&cell);
            world.realize(cell, coins);
            log::debug!("cache realized at {} with {} coins", cell.key(), coins);
        } else {
            world.record_empty(cell);
        }
    }
    world.cache(&cell)
}

/// How many coins a fresh cache at `cell` starts with, in 1..=INITIAL_COINS_MAX
fn initial_coin_count(cell: &Cell) -> u32 {
    let roll = luck_salted(&cell.key(), COIN_COUNT_SALT);
    ((roll * INITIAL_COINS_MAX as f64).ceil() as u32).max(1)
}

/// Cells whose caches are in interaction range of `player`
///
/// Enumerates the candidate square of half-width NEIGHBORHOOD_RADIUS around
/// the player's cell (deciding each cell on first contact), then keeps the
/// caches within `radius_m` of the player. Sorted by cell for deterministic
/// marker and popup order.
pub fn visible_caches(world: &mut WorldStore, player: &LatLng, radius_m: f64) -> Vec<Cell> {
    let center = Cell::containing(player);
    let mut visible = Vec::new();

    for di in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
        for dj in -NEIGHBORHOOD_RADIUS..=NEIGHBORHOOD_RADIUS {
            let cell = center.offset(di, dj);
            if ensure_cache_decided(world, cell).is_none() {
                continue;
            }
            if player.distance_m(&cell.center()) <= radius_m {
                visible.push(cell);
            }
        }
    }

    visible.sort();
    visible
}

/// `visible_caches` at the configured gameplay radius
pub fn visible_caches_default(world: &mut WorldStore, player: &LatLng) -> Vec<Cell> {
    visible_caches(world, player, VISIBILITY_RADIUS_M)
}

/// Everything the presentation layer needs to draw one cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheView {
    pub cell: Cell,
    pub center: LatLng,
    pub bounds: (LatLng, LatLng),
    pub coins: Vec<Coin>,
}

/// Renderable view of the cache at `cell`, if one is realized there
pub fn cache_view(world: &WorldStore, cell: &Cell) -> Option<CacheView> {
    let cache = world.cache(cell)?;
    Some(CacheView {
        cell: *cell,
        center: cell.center(),
        bounds: cell.bounds(),
        coins: cache.coins.clone(),
    })
}
