//! Geocoin Carrier - a map-based coin-carrying game
//!
//! Core modules:
//! - `sim`: Deterministic world model (grid, cache spawning, inventory, transfers)
//! - `persistence`: Save/load with integrity verification
//! - `geo`: Device geolocation subscription (wasm)
//!
//! The map itself (tiles, markers, popups) is presentation glue in `main.rs`;
//! everything the game *decides* lives in `sim` and runs natively.

pub mod geo;
pub mod persistence;
pub mod sim;

pub use sim::{Cell, Command, Direction, GameState, LatLng, Outcome};

/// Game configuration constants
pub mod consts {
    use crate::sim::LatLng;

    /// Grid tile size in degrees (~11 m of latitude per tile)
    pub const TILE_DEGREES: f64 = 1e-4;
    /// Half-width of the candidate square enumerated around the player, in cells
    pub const NEIGHBORHOOD_RADIUS: i32 = 8;
    /// Luck threshold below which a cell realizes a cache
    pub const CACHE_SPAWN_PROBABILITY: f64 = 0.05;
    /// Largest initial coin count a fresh cache can roll (minimum is 1)
    pub const INITIAL_COINS_MAX: u32 = 10;
    /// Caches beyond this geodesic distance stay hidden even when decided
    pub const VISIBILITY_RADIUS_M: f64 = 80.0;

    /// Geolocation fixes closer than this to the last trail point are jitter
    pub const TRAIL_MIN_STEP_M: f64 = 2.0;
    /// How long to wait for a single geolocation fix before reporting failure
    pub const GEO_TIMEOUT_MS: u32 = 10_000;
    /// Maximum acceptable age of a cached geolocation fix
    pub const GEO_MAX_AGE_MS: u32 = 5_000;

    /// Map zoom level the game is tuned for
    pub const GAMEPLAY_ZOOM: u8 = 19;

    /// Where a fresh game drops the player
    pub const DEFAULT_ORIGIN: LatLng = LatLng {
        lat: 36.98949379578401,
        lng: -122.06277128548296,
    };
}
