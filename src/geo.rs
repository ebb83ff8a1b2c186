//! Device geolocation subscription
//!
//! Wraps the browser's watch-position stream as a cancellable subscription:
//! one watch at a time, fixes delivered through a plain callback, and a
//! deterministic unsubscribe when the watch is stopped or dropped. The rest
//! of the game only ever sees `GeoFix` and `GeoError`.

use std::fmt;

use crate::sim::LatLng;

/// One position report from the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub lat: f64,
    pub lng: f64,
    /// Reported confidence radius in meters
    pub accuracy: f64,
}

impl GeoFix {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Sensor unavailable, permission denied, or fix timeout
#[derive(Debug, Clone)]
pub struct GeoError {
    pub message: String,
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geolocation unavailable: {}", self.message)
    }
}

/// An active watch on the device position (WASM only)
///
/// Holds its callbacks alive for as long as the browser may invoke them;
/// dropping the watch clears it, so no callback can fire after toggle-off.
#[cfg(target_arch = "wasm32")]
pub struct GeoWatch {
    watch_id: i32,
    _on_fix: wasm_bindgen::closure::Closure<dyn FnMut(web_sys::GeolocationPosition)>,
    _on_error: wasm_bindgen::closure::Closure<dyn FnMut(web_sys::GeolocationPositionError)>,
}

#[cfg(target_arch = "wasm32")]
impl GeoWatch {
    /// Subscribe to the position stream with the gameplay options
    /// (high-accuracy hint, bounded fix timeout, bounded cache tolerance)
    pub fn start(
        mut on_fix: impl FnMut(GeoFix) + 'static,
        mut on_error: impl FnMut(GeoError) + 'static,
    ) -> Result<Self, GeoError> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::closure::Closure;

        use crate::consts::{GEO_MAX_AGE_MS, GEO_TIMEOUT_MS};

        let geolocation = web_sys::window()
            .map(|w| w.navigator())
            .and_then(|n| n.geolocation().ok())
            .ok_or_else(|| GeoError {
                message: "not supported by this browser".into(),
            })?;

        let fix_closure = Closure::new(move |position: web_sys::GeolocationPosition| {
            let coords = position.coords();
            on_fix(GeoFix {
                lat: coords.latitude(),
                lng: coords.longitude(),
                accuracy: coords.accuracy(),
            });
        });
        let error_closure = Closure::new(move |err: web_sys::GeolocationPositionError| {
            on_error(GeoError {
                message: err.message(),
            });
        });

        let options = web_sys::PositionOptions::new();
        options.set_enable_high_accuracy(true);
        options.set_timeout(GEO_TIMEOUT_MS);
        options.set_maximum_age(GEO_MAX_AGE_MS);

        let watch_id = geolocation
            .watch_position_with_error_callback_and_options(
                fix_closure.as_ref().unchecked_ref(),
                Some(error_closure.as_ref().unchecked_ref()),
                &options,
            )
            .map_err(|err| GeoError {
                message: format!("{err:?}"),
            })?;

        log::info!("geolocation watch {watch_id} started");
        Ok(Self {
            watch_id,
            _on_fix: fix_closure,
            _on_error: error_closure,
        })
    }

    /// Unsubscribe; no further fixes will be delivered
    pub fn stop(self) {
        // Drop does the clearing
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for GeoWatch {
    fn drop(&mut self) {
        if let Some(geolocation) = web_sys::window()
            .map(|w| w.navigator())
            .and_then(|n| n.geolocation().ok())
        {
            geolocation.clear_watch(self.watch_id);
            log::info!("geolocation watch {} cleared", self.watch_id);
        }
    }
}
