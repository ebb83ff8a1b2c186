//! Deterministic world model
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Spawn decisions keyed only by cell coordinates
//! - Decisions recorded once, never re-rolled
//! - Stable iteration order (cells sort by coordinate)
//! - No rendering or platform dependencies

pub mod cell;
pub mod command;
pub mod luck;
pub mod state;
pub mod world;

pub use cell::{Cell, LatLng};
pub use command::{Command, Direction, Outcome, apply, refresh_visibility};
pub use luck::{luck, luck_salted};
pub use state::{Cache, Coin, Decision, GameState, WorldStore};
pub use world::{CacheView, cache_view, ensure_cache_decided, visible_caches, visible_caches_default};
