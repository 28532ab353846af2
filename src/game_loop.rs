//! Per-frame driver
//!
//! Wires a `GameSession` to its host collaborators: pulls dt and input,
//! ticks the simulation, turns events into sounds and bursts, keeps the HUD
//! current, stores a beaten best score, and renders every frame.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::audio::SoundEffect;
use crate::consts::MAX_FRAME_DT;
use crate::highscores::{HighScore, ScoreStore};
use crate::platform::{Clock, Effects, FallbackInput, HostCapability, Hud, InputSource, Renderer, SessionLifecycle};
use crate::settings::Settings;
use crate::sim::{CollisionEvent, GameEvent, GamePhase, GameSession, HudSnapshot, TickInput, tick};

/// Everything the loop needs from the host
pub struct Collaborators {
    pub clock: Box<dyn Clock>,
    pub input: FallbackInput,
    pub renderer: Box<dyn Renderer>,
    pub effects: Box<dyn Effects>,
    pub hud: Box<dyn Hud>,
    pub scores: Box<dyn ScoreStore>,
}

pub struct GameLoop {
    session: GameSession,
    clock: Box<dyn Clock>,
    input: FallbackInput,
    renderer: Box<dyn Renderer>,
    effects: Box<dyn Effects>,
    hud: Box<dyn Hud>,
    scores: Box<dyn ScoreStore>,
    high_score: HighScore,
    settings: Settings,
    /// Set by UI callbacks, consumed by the next frame
    start_requested: Rc<Cell<bool>>,
    autopilot: bool,
    last_hud: Option<HudSnapshot>,
    notified: HashSet<HostCapability>,
}

impl GameLoop {
    pub fn new(session: GameSession, collaborators: Collaborators) -> Self {
        let Collaborators {
            clock,
            input,
            renderer,
            effects,
            hud,
            mut scores,
        } = collaborators;
        let high_score = HighScore::load(scores.as_mut());
        Self {
            session,
            clock,
            input,
            renderer,
            effects,
            hud,
            scores,
            high_score,
            settings: Settings::default(),
            start_requested: Rc::new(Cell::new(false)),
            autopilot: false,
            last_hud: None,
            notified: HashSet::new(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Let the core steer (and fire) by itself
    pub fn with_autopilot(mut self, autopilot: bool) -> Self {
        self.autopilot = autopilot;
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase()
    }

    pub fn high_score(&self) -> HighScore {
        self.high_score
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Ask for a start/restart on the next frame. Ignored if not legal then.
    pub fn request_start(&self) {
        self.start_requested.set(true);
    }

    /// Shared flag for UI callbacks that outlive a borrow of the loop
    pub fn start_handle(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.start_requested)
    }

    /// Reset-and-start whenever the host enters immersive presentation
    pub fn register_lifecycle(&self, lifecycle: &mut dyn SessionLifecycle) {
        let start = self.start_handle();
        lifecycle.on_immersive_start(Box::new(move || start.set(true)));
    }

    /// Tell the player once per capability; the game keeps running without it
    pub fn report_missing_capability(&mut self, capability: HostCapability) {
        if !self.notified.insert(capability) {
            return;
        }
        log::warn!("Host capability unavailable: {:?}", capability);
        self.hud.notify(capability.message());
    }

    /// Run one frame. Returns the simulation events it produced.
    pub fn frame(&mut self) -> Vec<GameEvent> {
        let raw = self.clock.delta();
        let dt = if raw.is_finite() {
            raw.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        let input = TickInput {
            lateral: self.input.axis(),
            fire: self.input.fire(),
            start: self.start_requested.replace(false),
            autopilot: self.autopilot,
        };

        let events = tick(&mut self.session, &input, dt);
        for event in &events {
            self.dispatch(event);
        }

        let snapshot = self.session.hud_snapshot();
        if self.last_hud != Some(snapshot) {
            self.hud.update(&snapshot);
            self.last_hud = Some(snapshot);
        }

        self.renderer.submit_frame(&self.session);
        events
    }

    fn dispatch(&mut self, event: &GameEvent) {
        match *event {
            GameEvent::Collision(hit) => {
                let sound = match hit {
                    CollisionEvent::Crash { .. } => SoundEffect::Crash,
                    CollisionEvent::Collect { .. } => SoundEffect::Collect,
                    CollisionEvent::Kill { .. } => SoundEffect::Explosion,
                };
                self.effects.play_sound(sound);
                if self.settings.visual_bursts {
                    self.effects.spawn_visual_burst(hit.pos());
                }
            }
            GameEvent::ShotFired { .. } => self.effects.play_sound(SoundEffect::Shoot),
            GameEvent::DifficultyUp { .. } => self.effects.play_sound(SoundEffect::DifficultyUp),
            GameEvent::PhaseChanged { to, .. } => match to {
                GamePhase::Playing => self.effects.play_sound(SoundEffect::Start),
                GamePhase::GameOver => {
                    self.effects.play_sound(SoundEffect::GameOver);
                    self.record_score();
                }
                GamePhase::Win => {
                    self.effects.play_sound(SoundEffect::Win);
                    self.record_score();
                }
                GamePhase::Menu => {}
            },
        }
    }

    fn record_score(&mut self) {
        let score = self.session.score();
        if self.high_score.submit_and_save(score, self.scores.as_mut()) {
            self.effects.play_sound(SoundEffect::HighScore);
            self.hud.notify(&format!("New best score: {}", score));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highscores::MemoryStore;
    use crate::persistence::PersistError;
    use crate::platform::FixedClock;
    use crate::sim::Payload;
    use crate::tuning::Preset;
    use glam::Vec3;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Record {
        frames: u32,
        sounds: Vec<SoundEffect>,
        bursts: Vec<Vec3>,
        hud_updates: u32,
        notices: Vec<String>,
        saved: Option<u64>,
    }

    type Shared = Rc<RefCell<Record>>;

    struct MockRenderer(Shared);
    impl Renderer for MockRenderer {
        fn submit_frame(&mut self, _session: &GameSession) {
            self.0.borrow_mut().frames += 1;
        }
    }

    struct MockEffects(Shared);
    impl Effects for MockEffects {
        fn play_sound(&mut self, effect: SoundEffect) {
            self.0.borrow_mut().sounds.push(effect);
        }
        fn spawn_visual_burst(&mut self, pos: Vec3) {
            self.0.borrow_mut().bursts.push(pos);
        }
    }

    struct MockHud(Shared);
    impl Hud for MockHud {
        fn update(&mut self, _snapshot: &HudSnapshot) {
            self.0.borrow_mut().hud_updates += 1;
        }
        fn notify(&mut self, message: &str) {
            self.0.borrow_mut().notices.push(message.to_string());
        }
    }

    struct SharedStore {
        record: Shared,
        initial: Option<u64>,
    }
    impl ScoreStore for SharedStore {
        fn load(&mut self) -> Result<Option<u64>, PersistError> {
            Ok(self.initial)
        }
        fn save(&mut self, best: u64) -> Result<(), PersistError> {
            self.record.borrow_mut().saved = Some(best);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLifecycle {
        callback: Option<Box<dyn FnMut()>>,
    }
    impl SessionLifecycle for MockLifecycle {
        fn on_immersive_start(&mut self, callback: Box<dyn FnMut()>) {
            self.callback = Some(callback);
        }
    }

    fn harness(preset: Preset, dt: f32, best: Option<u64>) -> (GameLoop, Shared) {
        let record = Shared::default();
        let collaborators = Collaborators {
            clock: Box::new(FixedClock(dt)),
            input: FallbackInput::new(),
            renderer: Box::new(MockRenderer(record.clone())),
            effects: Box::new(MockEffects(record.clone())),
            hud: Box::new(MockHud(record.clone())),
            scores: Box::new(SharedStore {
                record: record.clone(),
                initial: best,
            }),
        };
        let session = GameSession::new(preset.config(), 21);
        (GameLoop::new(session, collaborators), record)
    }

    /// Start a run and drop a lethal obstacle on the player
    fn crash_with_score(game: &mut GameLoop, score: u64) -> Vec<GameEvent> {
        game.request_start();
        game.frame();
        assert_eq!(game.phase(), GamePhase::Playing);
        game.session.vitals.score = score;
        let pos = game.session.player().pos();
        game.session
            .obstacles
            .spawn_at(pos, 1.0, Payload::Obstacle { damage: 1000 });
        game.frame()
    }

    #[test]
    fn test_renders_every_frame_in_menu() {
        let (mut game, record) = harness(Preset::GemRunner, 1.0 / 72.0, None);
        for _ in 0..3 {
            game.frame();
        }
        assert_eq!(game.phase(), GamePhase::Menu);
        assert_eq!(record.borrow().frames, 3);
        // Menu snapshot never changes
        assert_eq!(record.borrow().hud_updates, 1);
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let (mut game, _) = harness(Preset::HighwayDodge, 5.0, None);
        game.request_start();
        game.frame();
        assert_eq!(game.session().survival_time(), 0.0);
        game.frame();
        assert!((game.session().survival_time() - MAX_FRAME_DT).abs() < 1e-6);
    }

    #[test]
    fn test_start_request_consumed_once() {
        let (mut game, record) = harness(Preset::GemRunner, 1.0 / 72.0, None);
        game.request_start();
        game.frame();
        game.frame();
        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.session().runs(), 1);
        assert_eq!(record.borrow().sounds, vec![SoundEffect::Start]);
    }

    #[test]
    fn test_game_over_saves_new_best() {
        let (mut game, record) = harness(Preset::HighwayDodge, 1.0 / 72.0, Some(100));
        let events = crash_with_score(&mut game, 500);
        assert!(events.contains(&GameEvent::PhaseChanged {
            from: GamePhase::Playing,
            to: GamePhase::GameOver
        }));
        assert_eq!(game.high_score().best, 500);

        let record = record.borrow();
        assert_eq!(record.saved, Some(500));
        assert!(record.sounds.contains(&SoundEffect::Crash));
        assert!(record.sounds.contains(&SoundEffect::GameOver));
        assert_eq!(record.sounds.last(), Some(&SoundEffect::HighScore));
        assert_eq!(record.notices.len(), 1);
    }

    #[test]
    fn test_lower_score_not_saved() {
        let (mut game, record) = harness(Preset::HighwayDodge, 1.0 / 72.0, Some(1000));
        crash_with_score(&mut game, 500);
        assert_eq!(game.phase(), GamePhase::GameOver);
        assert_eq!(game.high_score().best, 1000);
        let record = record.borrow();
        assert_eq!(record.saved, None);
        assert!(!record.sounds.contains(&SoundEffect::HighScore));
    }

    #[test]
    fn test_bursts_follow_settings() {
        let (mut game, record) = harness(Preset::HighwayDodge, 1.0 / 72.0, None);
        crash_with_score(&mut game, 0);
        assert_eq!(record.borrow().bursts.len(), 1);

        let (mut game, record) = harness_without_bursts();
        crash_with_score(&mut game, 0);
        assert!(record.borrow().bursts.is_empty());
        assert!(record.borrow().sounds.contains(&SoundEffect::Crash));
    }

    fn harness_without_bursts() -> (GameLoop, Shared) {
        let (game, record) = harness(Preset::HighwayDodge, 1.0 / 72.0, None);
        let settings = Settings {
            visual_bursts: false,
            ..Settings::default()
        };
        (game.with_settings(settings), record)
    }

    #[test]
    fn test_missing_capability_notified_once() {
        let (mut game, record) = harness(Preset::GemRunner, 1.0 / 72.0, None);
        game.report_missing_capability(HostCapability::ImmersiveSession);
        game.report_missing_capability(HostCapability::ImmersiveSession);
        game.report_missing_capability(HostCapability::MotionControllers);
        assert_eq!(record.borrow().notices.len(), 2);
    }

    #[test]
    fn test_lifecycle_callback_starts_run() {
        let (mut game, _) = harness(Preset::GemRunner, 1.0 / 72.0, None);
        let mut lifecycle = MockLifecycle::default();
        game.register_lifecycle(&mut lifecycle);
        game.frame();
        assert_eq!(game.phase(), GamePhase::Menu);

        if let Some(callback) = lifecycle.callback.as_mut() {
            callback();
        }
        game.frame();
        assert_eq!(game.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_autopilot_headless_run_stays_consistent() {
        let record = Shared::default();
        let collaborators = Collaborators {
            clock: Box::new(FixedClock(1.0 / 72.0)),
            input: FallbackInput::new(),
            renderer: Box::new(MockRenderer(record.clone())),
            effects: Box::new(MockEffects(record.clone())),
            hud: Box::new(MockHud(record.clone())),
            scores: Box::new(MemoryStore::default()),
        };
        let session = GameSession::new(Preset::SpaceShooter.config(), 4);
        let mut game = GameLoop::new(session, collaborators).with_autopilot(true);
        game.request_start();
        for _ in 0..(72 * 10) {
            game.frame();
            let lane = game.session().config().lane_limit;
            assert!(game.session().player().lateral.abs() <= lane);
        }
        assert_eq!(record.borrow().frames, 72 * 10);
        assert!(record.borrow().sounds.contains(&SoundEffect::Shoot));
    }
}
