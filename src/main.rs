//! XR Runner entry point
//!
//! Native: headless autopilot runs, useful for tuning rule sets and checking
//! determinism. Web: the browser game, driven by requestAnimationFrame.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use glam::Vec3;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, MouseEvent};

    use xr_runner::GameLoop;
    use xr_runner::audio::{AudioManager, SoundEffect};
    use xr_runner::game_loop::Collaborators;
    use xr_runner::highscores::LocalStorageStore;
    use xr_runner::platform::{
        Clock, Effects, FallbackInput, HostCapability, Hud, InputSource, Renderer, SessionLifecycle,
    };
    use xr_runner::settings::Settings;
    use xr_runner::sim::{EntityKind, GamePhase, GameSession, HudSnapshot};

    // Hands each frame to the scene layer on the page, if one is loaded
    #[wasm_bindgen(inline_js = "
        export function render_frame(entities, lateral, tilt) {
            const scene = window.xrRunnerScene;
            if (scene && scene.render) {
                scene.render(entities, lateral, tilt);
            }
        }

        export function has_immersive_support() {
            return 'xr' in navigator;
        }
    ")]
    extern "C" {
        fn render_frame(entities: &[f32], lateral: f32, tilt: f32);
        fn has_immersive_support() -> bool;
    }

    /// Floats per entity in the frame buffer: x, y, z, radius, kind, spin
    const ENTITY_STRIDE: usize = 6;

    /// Delta from requestAnimationFrame timestamps
    struct FrameClock {
        now: Rc<Cell<f64>>,
        last: f64,
    }

    impl Clock for FrameClock {
        fn delta(&mut self) -> f32 {
            let now = self.now.get();
            let dt = if self.last > 0.0 {
                ((now - self.last) / 1000.0) as f32
            } else {
                0.0
            };
            self.last = now;
            dt.max(0.0)
        }
    }

    #[derive(Default)]
    struct KeyState {
        left: bool,
        right: bool,
        fire: bool,
    }

    struct KeyboardInput(Rc<RefCell<KeyState>>);

    impl InputSource for KeyboardInput {
        fn lateral_axis(&mut self) -> Option<f32> {
            let keys = self.0.borrow();
            match (keys.left, keys.right) {
                (false, false) => None,
                (left, right) => Some(right as i32 as f32 - left as i32 as f32),
            }
        }

        fn fire(&mut self) -> bool {
            self.0.borrow().fire
        }
    }

    /// First connected gamepad / motion controller
    struct GamepadInput;

    impl GamepadInput {
        const DEADZONE: f64 = 0.15;

        fn first_pad() -> Option<web_sys::Gamepad> {
            let navigator = web_sys::window()?.navigator();
            let pads = navigator.get_gamepads().ok()?;
            pads.iter().find_map(|pad| pad.dyn_into::<web_sys::Gamepad>().ok())
        }
    }

    impl InputSource for GamepadInput {
        fn lateral_axis(&mut self) -> Option<f32> {
            let pad = Self::first_pad()?;
            let x = pad.axes().get(0).as_f64()?;
            (x.abs() > Self::DEADZONE).then_some(x as f32)
        }

        fn fire(&mut self) -> bool {
            Self::first_pad()
                .and_then(|pad| pad.buttons().get(0).dyn_into::<web_sys::GamepadButton>().ok())
                .is_some_and(|button| button.pressed())
        }
    }

    /// Packs the visible world into a flat buffer for the scene layer
    #[derive(Default)]
    struct SceneRenderer {
        buffer: Vec<f32>,
    }

    impl Renderer for SceneRenderer {
        fn submit_frame(&mut self, session: &GameSession) {
            self.buffer.clear();
            let pools = [session.obstacles(), session.collectibles(), session.projectiles()];
            for entity in pools.iter().flat_map(|pool| pool.iter_active()) {
                let kind = match entity.kind() {
                    EntityKind::Obstacle => 0.0,
                    EntityKind::Collectible => 1.0,
                    EntityKind::Projectile => 2.0,
                };
                self.buffer.extend_from_slice(&[
                    entity.pos.x,
                    entity.pos.y,
                    entity.pos.z,
                    entity.radius,
                    kind,
                    entity.spin,
                ]);
            }
            for particle in session.particles() {
                self.buffer.extend_from_slice(&[
                    particle.pos.x,
                    particle.pos.y,
                    particle.pos.z,
                    particle.size * particle.life,
                    3.0,
                    0.0,
                ]);
            }
            debug_assert_eq!(self.buffer.len() % ENTITY_STRIDE, 0);
            let player = session.player();
            render_frame(&self.buffer, player.lateral, player.tilt);
        }
    }

    /// Audio shared with the click handler so it can resume on a user gesture
    struct SharedAudio(Rc<RefCell<AudioManager>>);

    impl Effects for SharedAudio {
        fn play_sound(&mut self, effect: SoundEffect) {
            self.0.borrow_mut().play_sound(effect);
        }

        fn spawn_visual_burst(&mut self, pos: Vec3) {
            self.0.borrow_mut().spawn_visual_burst(pos);
        }
    }

    /// Writes the HUD into the page
    struct DomHud {
        document: Document,
    }

    impl DomHud {
        fn set_text(&self, selector: &str, text: &str) {
            if let Some(el) = self.document.query_selector(selector).ok().flatten() {
                el.set_text_content(Some(text));
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let classes = el.class_list();
                let _ = if visible {
                    classes.remove_1("hidden")
                } else {
                    classes.add_1("hidden")
                };
            }
        }
    }

    impl Hud for DomHud {
        fn update(&mut self, snapshot: &HudSnapshot) {
            self.set_text("#hud-score .hud-value", &snapshot.score.to_string());
            self.set_text("#hud-health .hud-value", &snapshot.health.to_string());
            self.set_text(
                "#hud-time .hud-value",
                &format!("{:.0}", snapshot.survival_time),
            );
            self.set_text("#hud-level .hud-value", &(snapshot.level + 1).to_string());

            self.set_visible("menu", snapshot.phase == GamePhase::Menu);
            self.set_visible("game-over", snapshot.phase == GamePhase::GameOver);
            self.set_visible("win", snapshot.phase == GamePhase::Win);
            self.set_visible("hud", snapshot.phase == GamePhase::Playing);
        }

        fn notify(&mut self, message: &str) {
            self.set_text("#notice", message);
            self.set_visible("notice", true);
        }
    }

    /// Host page dispatches `xr-session-start` when immersive mode begins
    struct WindowLifecycle;

    impl SessionLifecycle for WindowLifecycle {
        fn on_immersive_start(&mut self, mut callback: Box<dyn FnMut()>) {
            let Some(window) = web_sys::window() else { return };
            let closure = Closure::<dyn FnMut()>::new(move || callback());
            let _ = window
                .add_event_listener_with_callback("xr-session-start", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("logger init failed: {e}").into());
        }

        log::info!("XR Runner starting...");

        let Some(window) = web_sys::window() else {
            log::error!("no window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("no document");
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let mut config = settings.preset.config();
        if !settings.visual_bursts {
            config.max_particles = 0;
        }
        let seed = js_sys::Date::now() as u64;
        let session = GameSession::new(config, seed);
        log::info!("Session created: {} (seed {})", settings.preset.as_str(), seed);

        let now = Rc::new(Cell::new(0.0));
        let keys = Rc::new(RefCell::new(KeyState::default()));
        let audio = Rc::new(RefCell::new(AudioManager::new(&settings)));

        let collaborators = Collaborators {
            clock: Box::new(FrameClock {
                now: now.clone(),
                last: 0.0,
            }),
            input: FallbackInput::new()
                .with(Box::new(GamepadInput))
                .with(Box::new(KeyboardInput(keys.clone()))),
            renderer: Box::new(SceneRenderer::default()),
            effects: Box::new(SharedAudio(audio.clone())),
            hud: Box::new(DomHud {
                document: document.clone(),
            }),
            scores: Box::new(LocalStorageStore),
        };

        let mut game = GameLoop::new(session, collaborators).with_settings(settings);
        game.register_lifecycle(&mut WindowLifecycle);
        if !has_immersive_support() {
            game.report_missing_capability(HostCapability::ImmersiveSession);
        }
        if let Some(el) = document.get_element_by_id("best-score") {
            el.set_text_content(Some(&game.high_score().best.to_string()));
        }

        let game = Rc::new(RefCell::new(game));
        setup_keyboard(&document, game.clone(), keys, audio.clone());
        setup_start_button(&document, game.borrow().start_handle(), audio);

        request_animation_frame(game, now);
        log::info!("XR Runner running!");
    }

    fn setup_keyboard(
        document: &Document,
        game: Rc<RefCell<GameLoop>>,
        keys: Rc<RefCell<KeyState>>,
        audio: Rc<RefCell<AudioManager>>,
    ) {
        {
            let keys = keys.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => keys.borrow_mut().left = true,
                    "ArrowRight" | "d" | "D" => keys.borrow_mut().right = true,
                    " " => keys.borrow_mut().fire = true,
                    "Enter" => {
                        audio.borrow().resume();
                        game.borrow().request_start();
                    }
                    "m" | "M" => toggle_mute(&game, &audio),
                    _ => return,
                }
                event.prevent_default();
            });
            let _ = document
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            match event.key().as_str() {
                "ArrowLeft" | "a" | "A" => keys.borrow_mut().left = false,
                "ArrowRight" | "d" | "D" => keys.borrow_mut().right = false,
                " " => keys.borrow_mut().fire = false,
                _ => {}
            }
        });
        let _ = document.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn toggle_mute(game: &Rc<RefCell<GameLoop>>, audio: &Rc<RefCell<AudioManager>>) {
        let mut game = game.borrow_mut();
        let mut settings = game.settings().clone();
        settings.muted = !settings.muted;
        audio.borrow_mut().apply_settings(&settings);
        settings.save();
        log::info!("Audio {}", if settings.muted { "muted" } else { "unmuted" });
        game.set_settings(settings);
    }

    fn setup_start_button(document: &Document, start: Rc<Cell<bool>>, audio: Rc<RefCell<AudioManager>>) {
        for id in ["start-btn", "restart-btn"] {
            let Some(btn) = document.get_element_by_id(id) else {
                continue;
            };
            let start = start.clone();
            let audio = audio.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                audio.borrow().resume();
                start.set(true);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<GameLoop>>, now: Rc<Cell<f64>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, now, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<GameLoop>>, now: Rc<Cell<f64>>, time: f64) {
        now.set(time);
        game.borrow_mut().frame();
        request_animation_frame(game, now);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Usage: xr-runner [preset|config.json] [seconds] [best-score.json]
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::PathBuf;

    use xr_runner::GameLoop;
    use xr_runner::consts::{DEFAULT_SEED, HEADSET_DT};
    use xr_runner::game_loop::Collaborators;
    use xr_runner::highscores::JsonFileStore;
    use xr_runner::platform::{FallbackInput, FixedClock, LogEffects, LogHud, NullRenderer};
    use xr_runner::settings::Settings;
    use xr_runner::sim::GameSession;
    use xr_runner::{GameConfig, Preset};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("XR Runner (native, headless) starting...");

    let mut args = std::env::args().skip(1);
    let rules = args.next();
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);
    let best_path = PathBuf::from(args.next().unwrap_or_else(|| "xr-runner-best.json".to_string()));
    let settings = Settings::load_from(best_path.with_file_name("xr-runner-settings.json"));

    let (name, config) = match rules.as_deref() {
        Some(path) if path.ends_with(".json") => match GameConfig::load_from_file(path) {
            Ok(config) => (path.to_string(), config),
            Err(e) => {
                log::warn!("Falling back to {}: {}", settings.preset.as_str(), e);
                (settings.preset.as_str().to_string(), settings.preset.config())
            }
        },
        Some(name) => {
            let preset = Preset::from_str(name).unwrap_or_else(|| {
                log::warn!("Unknown preset `{}`, using {}", name, settings.preset.as_str());
                settings.preset
            });
            (preset.as_str().to_string(), preset.config())
        }
        None => (settings.preset.as_str().to_string(), settings.preset.config()),
    };

    let session = GameSession::new(config, DEFAULT_SEED);
    let collaborators = Collaborators {
        clock: Box::new(FixedClock(HEADSET_DT)),
        input: FallbackInput::new(),
        renderer: Box::new(NullRenderer::default()),
        effects: Box::new(LogEffects),
        hud: Box::new(LogHud::default()),
        scores: Box::new(JsonFileStore::new(&best_path)),
    };
    let mut game = GameLoop::new(session, collaborators)
        .with_settings(settings)
        .with_autopilot(true);

    let frames = (seconds.max(0.0) / HEADSET_DT).ceil() as u64;
    log::info!("Running {} for {:.0}s ({} frames)", name, seconds, frames);

    let mut best_run = 0;
    game.request_start();
    for _ in 0..frames {
        game.frame();
        if game.phase().is_finished() {
            best_run = best_run.max(game.session().score());
            game.request_start();
        }
    }
    best_run = best_run.max(game.session().score());

    println!(
        "{}: {} runs, best this session {}, all-time best {}",
        name,
        game.session().runs(),
        best_run,
        game.high_score().best
    );
}
