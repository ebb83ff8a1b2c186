//! Geocoin Carrier entry point
//!
//! Handles platform-specific initialization: on wasm this is all the DOM
//! and map glue around the deterministic core; on native it runs a scripted
//! smoke walk through the world model.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::MouseEvent;

    use geocoin_carrier::consts::*;
    use geocoin_carrier::geo::GeoWatch;
    use geocoin_carrier::persistence;
    use geocoin_carrier::sim::{
        self, CacheView, Cell, Command, Direction, GameState, Outcome, cache_view,
    };

    // JS bindings for the Leaflet map; everything the game decides crosses
    // this boundary as plain numbers or JSON
    #[wasm_bindgen(inline_js = "
        let map, playerMarker, trailLine, cacheLayer;

        export function map_init(lat, lng, zoom) {
            map = L.map('map', { zoomControl: false, scrollWheelZoom: false })
                .setView([lat, lng], zoom);
            L.tileLayer('https://tile.openstreetmap.org/{z}/{x}/{y}.png', {
                maxZoom: zoom,
                attribution: '&copy; OpenStreetMap',
            }).addTo(map);
            playerMarker = L.marker([lat, lng]).addTo(map).bindTooltip('You are here');
            trailLine = L.polyline([], { color: 'red', weight: 2 }).addTo(map);
            cacheLayer = L.layerGroup().addTo(map);
        }

        export function map_set_player(lat, lng) {
            playerMarker.setLatLng([lat, lng]);
            map.panTo([lat, lng]);
        }

        export function map_sync_caches(json) {
            const caches = JSON.parse(json);
            cacheLayer.clearLayers();
            for (const c of caches) {
                L.rectangle(
                    [[c.bounds[0].lat, c.bounds[0].lng], [c.bounds[1].lat, c.bounds[1].lng]],
                    { weight: 1 },
                )
                    .bindTooltip(c.coins.length + ' coin(s)')
                    .addTo(cacheLayer);
            }
        }

        export function map_set_trail(json) {
            trailLine.setLatLngs(JSON.parse(json).map((p) => [p.lat, p.lng]));
        }
    ")]
    extern "C" {
        fn map_init(lat: f64, lng: f64, zoom: u8);
        fn map_set_player(lat: f64, lng: f64);
        fn map_sync_caches(json: &str);
        fn map_set_trail(json: &str);
    }

    /// App instance: the deterministic core plus presentation session state
    pub struct App {
        state: GameState,
        /// Live geolocation subscription, if tracking is on
        geo: Option<GeoWatch>,
    }

    impl App {
        fn new(state: GameState) -> Self {
            Self { state, geo: None }
        }

        /// Apply one command; every real mutation is snapshotted to storage
        fn dispatch(&mut self, command: Command) -> Outcome {
            let outcome = sim::apply(&mut self.state, command);
            if outcome != Outcome::NoOp {
                persistence::save(&self.state);
            }
            outcome
        }

        /// Redraw everything that depends on the state
        fn render(&mut self) {
            let visible = sim::refresh_visibility(&mut self.state);

            map_set_player(self.state.player.lat, self.state.player.lng);
            if let Ok(json) = serde_json::to_string(&self.state.trail) {
                map_set_trail(&json);
            }
            let views: Vec<CacheView> = visible
                .iter()
                .filter_map(|cell| cache_view(&self.state.world, cell))
                .collect();
            if let Ok(json) = serde_json::to_string(&views) {
                map_sync_caches(&json);
            }

            self.render_cache_panel(&views);
            self.render_status(None);
        }

        /// Rebuild the cache panel; buttons carry their command in data attributes
        fn render_cache_panel(&self, views: &[CacheView]) {
            let Some(panel) = element_by_id("cache-panel") else {
                return;
            };

            if views.is_empty() {
                panel.set_inner_html("<p class='empty'>No caches in range. Keep moving!</p>");
                return;
            }

            let mut html = String::new();
            for view in views {
                let key = view.cell.key();
                let distance = self.state.player.distance_m(&view.center).round();
                html.push_str(&format!(
                    "<div class='cache'><h3>Cache {key} ({distance} m)</h3>\
                     <button data-action='deposit' data-cell='{key}'>Deposit</button><ul>"
                ));
                for coin in &view.coins {
                    html.push_str(&format!(
                        "<li>{label} <button data-action='collect' data-cell='{key}' \
                         data-serial='{serial}'>Collect</button></li>",
                        label = coin.label(),
                        serial = coin.serial,
                    ));
                }
                html.push_str("</ul></div>");
            }
            panel.set_inner_html(&html);
        }

        /// Status line: held coins, tracking mode, and any transient message
        fn render_status(&self, message: Option<&str>) {
            let Some(el) = element_by_id("status-panel") else {
                return;
            };
            let mode = if self.state.tracking {
                "following device"
            } else {
                "manual control"
            };
            let mut text = format!("Holding {} coin(s) | {mode}", self.state.coins_held());
            if let Some(message) = message {
                text.push_str(" | ");
                text.push_str(message);
            }
            el.set_text_content(Some(&text));
        }
    }

    fn element_by_id(id: &str) -> Option<web_sys::Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }

    /// Apply a command and redraw
    fn act(app: &Rc<RefCell<App>>, command: Command) {
        let mut a = app.borrow_mut();
        a.dispatch(command);
        a.render();
    }

    /// Parse the `"i,j"` key format used in data attributes
    fn parse_cell(attr: &str) -> Option<Cell> {
        let (i, j) = attr.split_once(',')?;
        Some(Cell::new(i.parse().ok()?, j.parse().ok()?))
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Geocoin Carrier starting...");

        // Resume the saved session, or start fresh at the origin
        let state = persistence::load().unwrap_or_else(|| {
            log::info!("no saved game, starting fresh");
            GameState::new(DEFAULT_ORIGIN)
        });

        let app = Rc::new(RefCell::new(App::new(state)));

        {
            let a = app.borrow();
            map_init(a.state.player.lat, a.state.player.lng, GAMEPLAY_ZOOM);
        }
        app.borrow_mut().render();

        setup_move_buttons(app.clone());
        setup_cache_panel(app.clone());
        setup_geo_toggle(app.clone());
        setup_reset_button(app.clone());

        log::info!("Geocoin Carrier running!");
    }

    fn setup_move_buttons(app: Rc<RefCell<App>>) {
        let buttons = [
            ("btn-north", Direction::North),
            ("btn-south", Direction::South),
            ("btn-east", Direction::East),
            ("btn-west", Direction::West),
        ];
        for (id, direction) in buttons {
            let Some(btn) = element_by_id(id) else {
                continue;
            };
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                act(&app, Command::Move(direction));
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// One delegated listener handles every collect/deposit button the
    /// panel will ever render
    fn setup_cache_panel(app: Rc<RefCell<App>>) {
        let Some(panel) = element_by_id("cache-panel") else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
            let Some(target) = event.target() else {
                return;
            };
            let Ok(el) = target.dyn_into::<web_sys::Element>() else {
                return;
            };
            let Some(action) = el.get_attribute("data-action") else {
                return;
            };
            let Some(cell) = el.get_attribute("data-cell").as_deref().and_then(parse_cell)
            else {
                return;
            };

            match action.as_str() {
                "collect" => {
                    let Some(serial) = el
                        .get_attribute("data-serial")
                        .and_then(|s| s.parse().ok())
                    else {
                        return;
                    };
                    act(&app, Command::Collect { cell, serial });
                }
                "deposit" => act(&app, Command::Deposit { cell }),
                _ => {}
            }
        });
        let _ = panel.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_geo_toggle(app: Rc<RefCell<App>>) {
        let Some(btn) = element_by_id("geo-btn") else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let tracking = app.borrow().state.tracking;
            if tracking {
                // Deterministic unsubscribe: dropping the watch clears it
                let watch = app.borrow_mut().geo.take();
                drop(watch);
                act(&app, Command::SetTracking(false));
                return;
            }

            let fix_app = app.clone();
            let err_app = app.clone();
            let started = GeoWatch::start(
                move |fix| {
                    // A fix may still arrive after an error reverted us to
                    // manual control; the flag is authoritative
                    if !fix_app.borrow().state.tracking {
                        return;
                    }
                    act(&fix_app, Command::GeoFix(fix.position()));
                },
                move |err| {
                    log::warn!("{err}");
                    let mut a = err_app.borrow_mut();
                    a.dispatch(Command::SetTracking(false));
                    a.render_status(Some(&err.to_string()));
                },
            );

            match started {
                Ok(watch) => {
                    app.borrow_mut().geo = Some(watch);
                    act(&app, Command::SetTracking(true));
                }
                Err(err) => {
                    log::warn!("{err}");
                    app.borrow().render_status(Some(&err.to_string()));
                }
            }
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_reset_button(app: Rc<RefCell<App>>) {
        let Some(btn) = element_by_id("reset-btn") else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let confirmed = web_sys::window()
                .and_then(|w| {
                    w.confirm_with_message("Erase all caches and coins and start over?")
                        .ok()
                })
                .unwrap_or(false);
            if !confirmed {
                return;
            }

            // Stop tracking before the world goes away
            let watch = app.borrow_mut().geo.take();
            drop(watch);
            act(&app, Command::Reset);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Geocoin Carrier (native) starting...");
    log::info!("Native mode has no map - run with `trunk serve` for the web version");

    println!("\nRunning world smoke walk...");
    smoke_walk();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn smoke_walk() {
    use geocoin_carrier::consts::DEFAULT_ORIGIN;
    use geocoin_carrier::sim::{self, Command, Direction, GameState};

    let mut state = GameState::new(DEFAULT_ORIGIN);
    let visible = sim::refresh_visibility(&mut state);
    println!("{} cache(s) in range at spawn", visible.len());

    // Walk east until a stocked cache is in range
    let mut target = None;
    for _ in 0..500 {
        let visible = sim::refresh_visibility(&mut state);
        if let Some(cell) = visible.iter().find(|c| {
            state
                .world
                .cache(c)
                .map(|cache| !cache.coins.is_empty())
                .unwrap_or(false)
        }) {
            target = Some(*cell);
            break;
        }
        sim::apply(&mut state, Command::Move(Direction::East));
    }

    let cell = target.expect("walk found no stocked cache");
    let serial = state
        .world
        .cache(&cell)
        .expect("target is realized")
        .coins[0]
        .serial;
    println!("collecting coin #{serial} from cache {}", cell.key());

    sim::apply(&mut state, Command::Collect { cell, serial });
    assert_eq!(state.coins_held(), 1);
    sim::apply(&mut state, Command::Deposit { cell });
    assert_eq!(state.coins_held(), 0);
    assert_eq!(state.coins_everywhere(), state.world.serials_minted());

    println!("✓ World smoke walk passed!");
}
