//! Save/load persistence with integrity verification
//!
//! Features:
//! - Versioned JSON envelope
//! - BLAKE3 integrity digest over the payload
//! - Corruption detection: a blob that fails to parse, carries the wrong
//!   version, or fails the digest check is treated as absent (fresh game)
//!
//! One named LocalStorage slot holds the whole game; every mutation
//! overwrites it. Only realized caches are serialized - "no cache"
//! decisions re-derive identically from the luck function on demand.

use serde::{Deserialize, Serialize};

use crate::sim::{Cache, Coin, GameState, LatLng, WorldStore};

/// Bump when the save shape changes; older blobs fall back to a fresh game
pub const SAVE_VERSION: u32 = 1;

/// LocalStorage key (used only in wasm32)
#[allow(dead_code)]
const STORAGE_KEY: &str = "geocoin_carrier_save";

/// Snapshot of everything a session needs to resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub origin: LatLng,
    pub player: LatLng,
    /// Serial mint counter; restored so new coins never collide with saved ones
    pub next_serial: u64,
    /// Held coins, oldest first (the back is next to deposit)
    pub inventory: Vec<Coin>,
    /// Every realized cache, including ones currently holding zero coins
    pub caches: Vec<Cache>,
    #[serde(default)]
    pub trail: Vec<LatLng>,
}

impl SaveGame {
    /// Capture a snapshot of the live state
    pub fn capture(state: &GameState) -> Self {
        let mut caches: Vec<Cache> = state.world.caches().cloned().collect();
        // Sorted so identical states encode to identical blobs
        caches.sort_by_key(|c| c.cell);
        Self {
            origin: state.origin,
            player: state.player,
            next_serial: state.world.serials_minted(),
            inventory: state.inventory.clone(),
            caches,
            trail: state.trail.clone(),
        }
    }

    /// Rebuild a live state; saved caches are authoritative and never re-rolled
    pub fn restore(self) -> GameState {
        GameState {
            origin: self.origin,
            player: self.player,
            world: WorldStore::from_saved(self.caches, self.next_serial),
            inventory: self.inventory,
            trail: self.trail,
            tracking: false,
        }
    }
}

/// Outer wrapper: the payload is the SaveGame JSON, digested as stored
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    digest: String,
    payload: String,
}

fn digest_hex(payload: &str) -> String {
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

/// Serialize the full game state into a storable blob
pub fn encode(state: &GameState) -> Option<String> {
    let payload = match serde_json::to_string(&SaveGame::capture(state)) {
        Ok(json) => json,
        Err(err) => {
            log::error!("save serialization failed: {err}");
            return None;
        }
    };
    let envelope = Envelope {
        version: SAVE_VERSION,
        digest: digest_hex(&payload),
        payload,
    };
    serde_json::to_string(&envelope).ok()
}

/// Parse a blob back into a game state
///
/// Any failure logs a warning and yields `None`; callers keep their default
/// fresh-game state. Never surfaces a parse error to the player.
pub fn decode(blob: &str) -> Option<GameState> {
    let envelope: Envelope = match serde_json::from_str(blob) {
        Ok(envelope) => envelope,
        Err(err) => {
            log::warn!("discarding unreadable save: {err}");
            return None;
        }
    };
    if envelope.version != SAVE_VERSION {
        log::warn!(
            "discarding save with version {} (want {})",
            envelope.version,
            SAVE_VERSION
        );
        return None;
    }
    if digest_hex(&envelope.payload) != envelope.digest {
        log::warn!("discarding save with bad integrity digest");
        return None;
    }
    match serde_json::from_str::<SaveGame>(&envelope.payload) {
        Ok(save) => Some(save.restore()),
        Err(err) => {
            log::warn!("discarding save with unreadable payload: {err}");
            None
        }
    }
}

/// Write the current state to LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn save(state: &GameState) {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten();

    if let (Some(storage), Some(blob)) = (storage, encode(state)) {
        let _ = storage.set_item(STORAGE_KEY, &blob);
        log::debug!(
            "saved ({} caches, {} held)",
            state.world.caches().count(),
            state.coins_held()
        );
    }
}

/// Read the saved state from LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn load() -> Option<GameState> {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()?;
    let blob = storage.get_item(STORAGE_KEY).ok()??;
    let state = decode(&blob)?;
    log::info!(
        "resumed session ({} caches, {} held)",
        state.world.caches().count(),
        state.coins_held()
    );
    Some(state)
}

/// Drop the saved state from LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn clear() {
    if let Some(storage) = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
    {
        let _ = storage.remove_item(STORAGE_KEY);
        log::info!("saved game cleared");
    }
}

/// Native stubs
#[cfg(not(target_arch = "wasm32"))]
pub fn save(_state: &GameState) {
    // No durable slot outside the browser
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load() -> Option<GameState> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
pub fn clear() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::DEFAULT_ORIGIN;
    use crate::sim::{Command, apply, refresh_visibility};

    /// A state with some history: realized caches, held coins, a trail
    fn played_state() -> GameState {
        let mut state = GameState::new(DEFAULT_ORIGIN);
        let here = state.player_cell();
        state.world.realize(here, 3);
        state.world.realize(here.offset(1, 1), 2);
        refresh_visibility(&mut state);

        apply(&mut state, Command::Collect { cell: here, serial: 0 });
        apply(&mut state, Command::Collect { cell: here, serial: 2 });
        apply(&mut state, Command::GeoFix(DEFAULT_ORIGIN.offset_tiles(2, 0)));
        state
    }

    #[test]
    fn test_round_trip_reproduces_state() {
        let state = played_state();
        let blob = encode(&state).expect("state encodes");
        let restored = decode(&blob).expect("blob decodes");

        assert_eq!(restored.player, state.player);
        assert_eq!(restored.inventory, state.inventory);
        assert_eq!(restored.trail, state.trail);
        assert_eq!(
            restored.world.serials_minted(),
            state.world.serials_minted()
        );
        // Snapshot equality covers every cache's coin list and order
        assert_eq!(SaveGame::capture(&restored), SaveGame::capture(&state));
    }

    #[test]
    fn test_identical_states_encode_identically() {
        let state = played_state();
        assert_eq!(encode(&state), encode(&state.clone()));
    }

    #[test]
    fn test_emptied_cache_survives_round_trip_without_rerolling() {
        let mut state = GameState::new(DEFAULT_ORIGIN);
        let cell = state.player_cell();
        state.world.realize(cell, 1);
        apply(&mut state, Command::Collect { cell, serial: 0 });
        assert!(state.world.cache(&cell).unwrap().coins.is_empty());

        let restored = decode(&encode(&state).unwrap()).unwrap();
        let cache = restored.world.cache(&cell).expect("cache still realized");
        assert!(cache.coins.is_empty(), "emptied cache must not refill on load");
        assert_eq!(restored.world.serials_minted(), 1);
    }

    #[test]
    fn test_garbage_blob_decodes_to_none() {
        assert!(decode("").is_none());
        assert!(decode("not json at all").is_none());
        assert!(decode("{\"version\":1}").is_none());
    }

    #[test]
    fn test_truncated_blob_decodes_to_none() {
        let blob = encode(&played_state()).unwrap();
        assert!(decode(&blob[..blob.len() / 2]).is_none());
    }

    #[test]
    fn test_tampered_payload_fails_digest() {
        let blob = encode(&played_state()).unwrap();
        let mut envelope: serde_json::Value = serde_json::from_str(&blob).unwrap();
        let payload = envelope["payload"].as_str().unwrap().to_owned();
        envelope["payload"] =
            serde_json::Value::String(payload.replacen("\"serial\":0", "\"serial\":7", 1));

        let tampered = serde_json::to_string(&envelope).unwrap();
        assert_ne!(tampered, blob, "tampering should have changed the payload");
        assert!(decode(&tampered).is_none());
    }

    #[test]
    fn test_wrong_version_decodes_to_none() {
        let blob = encode(&played_state()).unwrap();
        let mut envelope: serde_json::Value = serde_json::from_str(&blob).unwrap();
        envelope["version"] = serde_json::Value::from(SAVE_VERSION + 1);
        assert!(decode(&serde_json::to_string(&envelope).unwrap()).is_none());
    }

    #[test]
    fn test_restored_session_plays_on() {
        let state = played_state();
        let mut restored = decode(&encode(&state).unwrap()).unwrap();

        // Deposit the held coins back and keep the books balanced
        let cell = restored.player_cell();
        apply(&mut restored, Command::Deposit { cell });
        assert_eq!(
            restored.coins_everywhere(),
            restored.world.serials_minted()
        );
        assert!(!restored.tracking, "tracking is a per-session choice");
    }
}
