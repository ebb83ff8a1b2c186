//! Grid addressing over the globe
//!
//! The world is tiled into TILE_DEGREES x TILE_DEGREES cells anchored at
//! (0, 0) lat/lng. A cell is the canonical address for everything in the
//! world model; lat/lng only matters at the presentation edge and for the
//! visibility distance check.

use serde::{Deserialize, Serialize};

use crate::consts::TILE_DEGREES;

/// Mean Earth radius in meters (IUGG)
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geodetic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in meters (haversine)
    pub fn distance_m(&self, other: &LatLng) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let dphi = (other.lat - self.lat).to_radians();
        let dlambda = (other.lng - self.lng).to_radians();

        let a = (dphi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Displace by whole tiles (positive di = north, positive dj = east)
    pub fn offset_tiles(&self, di: i32, dj: i32) -> LatLng {
        LatLng {
            lat: self.lat + di as f64 * TILE_DEGREES,
            lng: self.lng + dj as f64 * TILE_DEGREES,
        }
    }
}

/// Integer grid address of one world tile
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub i: i32,
    pub j: i32,
}

impl Cell {
    pub fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// The cell containing a position
    pub fn containing(point: &LatLng) -> Self {
        Self {
            i: (point.lat / TILE_DEGREES).floor() as i32,
            j: (point.lng / TILE_DEGREES).floor() as i32,
        }
    }

    /// Stable string key, used to seed the luck function
    pub fn key(&self) -> String {
        format!("{},{}", self.i, self.j)
    }

    /// Center of the cell
    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.i as f64 + 0.5) * TILE_DEGREES,
            lng: (self.j as f64 + 0.5) * TILE_DEGREES,
        }
    }

    /// South-west and north-east corners, for drawing the cell footprint
    pub fn bounds(&self) -> (LatLng, LatLng) {
        (
            LatLng {
                lat: self.i as f64 * TILE_DEGREES,
                lng: self.j as f64 * TILE_DEGREES,
            },
            LatLng {
                lat: (self.i + 1) as f64 * TILE_DEGREES,
                lng: (self.j + 1) as f64 * TILE_DEGREES,
            },
        )
    }

    #[inline]
    pub fn offset(&self, di: i32, dj: i32) -> Cell {
        Cell {
            i: self.i + di,
            j: self.j + dj,
        }
    }
}
