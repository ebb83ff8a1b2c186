//! Event-driven command application
//!
//! Every mutation of the game state - button movement, geolocation fixes,
//! coin transfers, reset - arrives here as a discrete `Command` and is
//! applied strictly sequentially. Transfers are the only two code paths
//! that relocate a coin, so conservation (coins in caches + coins in hand
//! == serials minted) holds by construction.

use crate::consts::TRAIL_MIN_STEP_M;

use super::cell::{Cell, LatLng};
use super::state::{Coin, GameState};
use super::world::visible_caches_default;

/// One button press worth of movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Whole-tile displacement (di is latitude, dj is longitude)
    fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (1, 0),
            Direction::South => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }
}

/// A single user or sensor event
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Directional button: displace the player by one tile
    Move(Direction),
    /// Absolute position from the geolocation stream
    GeoFix(LatLng),
    /// Geolocation mode toggled on or off
    SetTracking(bool),
    /// Take one identified coin out of a cache into the inventory
    Collect { cell: Cell, serial: u64 },
    /// Drop the most recently collected coin into a cache
    Deposit { cell: Cell },
    /// Throw the world away and regenerate at the origin
    Reset,
}

/// What a command did, for the caller to react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Player position changed; visible set should be re-rendered
    Moved,
    /// A coin changed hands
    Transferred(Coin),
    /// Tracking mode is now the carried value
    Tracking(bool),
    /// World regenerated from scratch
    Reset,
    /// Stale popup, missing cache, empty hands, redundant toggle
    NoOp,
}

/// Apply one command to the state
pub fn apply(state: &mut GameState, command: Command) -> Outcome {
    match command {
        Command::Move(direction) => {
            let (di, dj) = direction.delta();
            state.player = state.player.offset_tiles(di, dj);
            refresh_visibility(state);
            Outcome::Moved
        }
        Command::GeoFix(fix) => {
            state.player = fix;
            let jitter = state
                .trail
                .last()
                .is_some_and(|last| last.distance_m(&fix) < TRAIL_MIN_STEP_M);
            if !jitter {
                state.trail.push(fix);
            }
            refresh_visibility(state);
            Outcome::Moved
        }
        Command::SetTracking(on) => {
            if state.tracking == on {
                return Outcome::NoOp;
            }
            state.tracking = on;
            log::info!("geolocation tracking {}", if on { "on" } else { "off" });
            Outcome::Tracking(on)
        }
        Command::Collect { cell, serial } => collect(state, cell, serial),
        Command::Deposit { cell } => deposit(state, cell),
        Command::Reset => {
            *state = GameState::new(state.origin);
            refresh_visibility(state);
            log::info!("world reset at origin");
            Outcome::Reset
        }
    }
}

/// Realize and return the caches currently in interaction range
///
/// Safe to call any number of times; realization is idempotent and the
/// filtering is cheap.
pub fn refresh_visibility(state: &mut GameState) -> Vec<Cell> {
    visible_caches_default(&mut state.world, &state.player)
}

/// Move `serial` from the cache at `cell` into the inventory
///
/// A missing cache or serial is a stale popup, not an error.
fn collect(state: &mut GameState, cell: Cell, serial: u64) -> Outcome {
    let Some(cache) = state.world.cache_mut(&cell) else {
        return Outcome::NoOp;
    };
    let Some(coin) = cache.take_coin(serial) else {
        return Outcome::NoOp;
    };
    state.inventory.push(coin);
    log::info!("collected {} ({} held)", coin.label(), state.inventory.len());
    Outcome::Transferred(coin)
}

/// Move the most recently collected coin into the cache at `cell`
///
/// The inventory is a stack: last in, first out.
fn deposit(state: &mut GameState, cell: Cell) -> Outcome {
    let Some(cache) = state.world.cache_mut(&cell) else {
        return Outcome::NoOp;
    };
    let Some(mut coin) = state.inventory.pop() else {
        return Outcome::NoOp;
    };
    coin.cell = cell;
    cache.coins.push(coin);
    log::info!("deposited {} ({} held)", coin.label(), state.inventory.len());
    Outcome::Transferred(coin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DEFAULT_ORIGIN;
    use proptest::prelude::*;

    /// Fresh state with two hand-realized caches, bypassing the spawn gate
    fn state_with_caches() -> (GameState, Cell, Cell) {
        let mut state = GameState::new(DEFAULT_ORIGIN);
        let here = state.player_cell();
        let there = here.offset(2, 3);
        state.world.realize(here, 5); // serials 0..=4
        state.world.realize(there, 2); // serials 5..=6
        (state, here, there)
    }

    fn serials(state: &GameState, cell: &Cell) -> Vec<u64> {
        state
            .world
            .cache(cell)
            .map(|c| c.coins.iter().map(|coin| coin.serial).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_deposit_is_lifo() {
        let (mut state, here, there) = state_with_caches();

        assert!(matches!(
            apply(&mut state, Command::Collect { cell: here, serial: 0 }),
            Outcome::Transferred(_)
        ));
        assert!(matches!(
            apply(&mut state, Command::Collect { cell: here, serial: 3 }),
            Outcome::Transferred(_)
        ));

        // Most recently collected (3) comes back out first
        match apply(&mut state, Command::Deposit { cell: there }) {
            Outcome::Transferred(coin) => assert_eq!(coin.serial, 3),
            other => panic!("expected transfer, got {other:?}"),
        }
        match apply(&mut state, Command::Deposit { cell: there }) {
            Outcome::Transferred(coin) => assert_eq!(coin.serial, 0),
            other => panic!("expected transfer, got {other:?}"),
        }
        assert_eq!(serials(&state, &there), vec![5, 6, 3, 0]);
    }

    #[test]
    fn test_collect_unknown_serial_is_noop() {
        let (mut state, here, _) = state_with_caches();
        let before = serials(&state, &here);

        assert_eq!(
            apply(&mut state, Command::Collect { cell: here, serial: 99 }),
            Outcome::NoOp
        );
        assert_eq!(serials(&state, &here), before);
        assert!(state.inventory.is_empty());
    }

    #[test]
    fn test_transfers_against_missing_cache_are_noops() {
        let (mut state, here, _) = state_with_caches();
        let nowhere = here.offset(40, 40);

        assert_eq!(
            apply(&mut state, Command::Collect { cell: nowhere, serial: 0 }),
            Outcome::NoOp
        );

        // Deposit against a missing cache must not eat the held coin
        apply(&mut state, Command::Collect { cell: here, serial: 0 });
        assert_eq!(
            apply(&mut state, Command::Deposit { cell: nowhere }),
            Outcome::NoOp
        );
        assert_eq!(state.coins_held(), 1);
    }

    #[test]
    fn test_deposit_with_empty_hands_is_noop() {
        let (mut state, here, _) = state_with_caches();
        let before = serials(&state, &here);

        assert_eq!(apply(&mut state, Command::Deposit { cell: here }), Outcome::NoOp);
        assert_eq!(serials(&state, &here), before);
    }

    #[test]
    fn test_collect_then_deposit_back_restores_cache() {
        let mut state = GameState::new(DEFAULT_ORIGIN);
        let cell = state.player_cell().offset(2, 3);
        let original = state.world.realize(cell, 1).clone();
        let minted = state.world.serials_minted();

        apply(&mut state, Command::Collect { cell, serial: original.coins[0].serial });
        apply(&mut state, Command::Deposit { cell });

        // Identical contents, identical recorded cell, no new serials
        assert_eq!(state.world.cache(&cell), Some(&original));
        assert_eq!(state.world.serials_minted(), minted);
        assert!(state.inventory.is_empty());
    }

    #[test]
    fn test_move_displaces_one_tile_and_decides_neighborhood() {
        let mut state = GameState::new(DEFAULT_ORIGIN);
        let start = state.player_cell();

        apply(&mut state, Command::Move(Direction::North));
        assert_eq!(state.player_cell(), start.offset(1, 0));
        apply(&mut state, Command::Move(Direction::West));
        assert_eq!(state.player_cell(), start.offset(1, -1));

        // Movement realizes the neighborhood as a side effect
        assert!(state.world.is_decided(&state.player_cell()));
    }

    #[test]
    fn test_geo_fix_thins_trail_jitter() {
        let mut state = GameState::new(DEFAULT_ORIGIN);

        apply(&mut state, Command::GeoFix(DEFAULT_ORIGIN));
        assert_eq!(state.trail.len(), 1);

        // ~1 m of drift: player follows, trail does not
        let jitter = LatLng::new(DEFAULT_ORIGIN.lat + 0.9e-5, DEFAULT_ORIGIN.lng);
        apply(&mut state, Command::GeoFix(jitter));
        assert_eq!(state.player, jitter);
        assert_eq!(state.trail.len(), 1);

        // ~11 m: appended
        let step = DEFAULT_ORIGIN.offset_tiles(1, 0);
        apply(&mut state, Command::GeoFix(step));
        assert_eq!(state.trail.len(), 2);
    }

    #[test]
    fn test_tracking_toggle_is_idempotent() {
        let mut state = GameState::new(DEFAULT_ORIGIN);

        assert_eq!(apply(&mut state, Command::SetTracking(true)), Outcome::Tracking(true));
        assert_eq!(apply(&mut state, Command::SetTracking(true)), Outcome::NoOp);
        assert_eq!(apply(&mut state, Command::SetTracking(false)), Outcome::Tracking(false));
        assert_eq!(apply(&mut state, Command::SetTracking(false)), Outcome::NoOp);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut state, here, _) = state_with_caches();
        apply(&mut state, Command::Collect { cell: here, serial: 0 });
        apply(&mut state, Command::GeoFix(DEFAULT_ORIGIN.offset_tiles(3, 3)));

        apply(&mut state, Command::Reset);
        assert_eq!(state.player, DEFAULT_ORIGIN);
        assert!(state.inventory.is_empty());
        assert!(state.trail.is_empty());
        assert!(!state.tracking);
        // The serial mint restarted along with the world
        assert_eq!(state.coins_everywhere(), state.world.serials_minted());
    }

    fn command_strategy() -> impl Strategy<Value = Command> {
        let base = Cell::containing(&DEFAULT_ORIGIN);
        prop_oneof![
            prop_oneof![
                Just(Direction::North),
                Just(Direction::South),
                Just(Direction::East),
                Just(Direction::West),
            ]
            .prop_map(Command::Move),
            ((-12i32..12), (-12i32..12))
                .prop_map(move |(di, dj)| Command::GeoFix(base.offset(di, dj).center())),
            ((-12i32..12), (-12i32..12), 0u64..60).prop_map(move |(di, dj, serial)| {
                Command::Collect { cell: base.offset(di, dj), serial }
            }),
            ((-12i32..12), (-12i32..12))
                .prop_map(move |(di, dj)| Command::Deposit { cell: base.offset(di, dj) }),
        ]
    }

    proptest! {
        /// No command sequence can duplicate or lose a coin, and collect
        /// must never rewrite the serial it carries.
        #[test]
        fn conservation_over_random_commands(
            commands in prop::collection::vec(command_strategy(), 1..80)
        ) {
            let mut state = GameState::new(DEFAULT_ORIGIN);
            refresh_visibility(&mut state);

            for command in commands {
                let outcome = apply(&mut state, command.clone());
                if let (Command::Collect { serial, .. }, Outcome::Transferred(coin)) =
                    (&command, &outcome)
                {
                    prop_assert_eq!(coin.serial, *serial);
                }
                prop_assert_eq!(state.coins_everywhere(), state.world.serials_minted());
            }
        }
    }
}
