//! Platform abstraction layer
//!
//! The simulation only talks to the host through these traits:
//! - Time (`Clock`)
//! - Input (`InputSource`, chained with `FallbackInput`)
//! - Output (`Renderer`, `Effects`, `Hud`)
//! - Immersive session start (`SessionLifecycle`)
//!
//! Browser implementations live in the binary; the ones here are
//! host-neutral and drive the headless runner and the tests.

use glam::Vec3;

use crate::audio::SoundEffect;
use crate::sim::{GameSession, HudSnapshot};

/// Per-frame elapsed time
pub trait Clock {
    /// Seconds since the previous call (non-negative)
    fn delta(&mut self) -> f32;
}

/// A source of steering input
pub trait InputSource {
    /// Lateral axis in [-1, 1], or `None` if this source has nothing to say
    fn lateral_axis(&mut self) -> Option<f32>;

    /// Fire held this frame
    fn fire(&mut self) -> bool {
        false
    }
}

/// Draws the current frame. Called once per frame, in every phase.
pub trait Renderer {
    fn submit_frame(&mut self, session: &GameSession);
}

/// Fire-and-forget sound and visual effects
pub trait Effects {
    fn play_sound(&mut self, effect: SoundEffect);
    fn spawn_visual_burst(&mut self, pos: Vec3);
}

/// Score/health display
pub trait Hud {
    fn update(&mut self, snapshot: &HudSnapshot);

    /// One-off message to the player (missing capability and the like)
    fn notify(&mut self, _message: &str) {}
}

/// Hook into the host's immersive presentation
pub trait SessionLifecycle {
    /// Register `callback` to run when immersive presentation begins
    fn on_immersive_start(&mut self, callback: Box<dyn FnMut()>);
}

/// Host features the game can run without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCapability {
    ImmersiveSession,
    MotionControllers,
}

impl HostCapability {
    pub fn message(&self) -> &'static str {
        match self {
            HostCapability::ImmersiveSession => {
                "Immersive mode is not supported here - playing in the flat view"
            }
            HostCapability::MotionControllers => {
                "No motion controllers found - use the keyboard or a gamepad"
            }
        }
    }
}

/// Tries each source in order; the first one with a value wins. With no
/// value anywhere the axis is 0.
#[derive(Default)]
pub struct FallbackInput {
    sources: Vec<Box<dyn InputSource>>,
}

impl FallbackInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Box<dyn InputSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Resolved axis for this frame, clamped
    pub fn axis(&mut self) -> f32 {
        InputSource::lateral_axis(self).unwrap_or(0.0)
    }
}

impl InputSource for FallbackInput {
    fn lateral_axis(&mut self) -> Option<f32> {
        self.sources
            .iter_mut()
            .find_map(|source| source.lateral_axis().filter(|axis| axis.is_finite()))
            .map(|axis| axis.clamp(-1.0, 1.0))
    }

    fn fire(&mut self) -> bool {
        // Every source gets polled so edge-triggered sources stay in sync
        self.sources
            .iter_mut()
            .fold(false, |held, source| source.fire() || held)
    }
}

/// Same delta every frame
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f32);

impl Clock for FixedClock {
    fn delta(&mut self) -> f32 {
        self.0
    }
}

/// Draws nothing
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub frames: u64,
}

impl Renderer for NullRenderer {
    fn submit_frame(&mut self, _session: &GameSession) {
        self.frames += 1;
    }
}

/// Writes effects to the log
#[derive(Debug, Default)]
pub struct LogEffects;

impl Effects for LogEffects {
    fn play_sound(&mut self, effect: SoundEffect) {
        log::debug!("sound: {}", effect.name());
    }

    fn spawn_visual_burst(&mut self, pos: Vec3) {
        log::debug!("burst at ({:.1}, {:.1}, {:.1})", pos.x, pos.y, pos.z);
    }
}

/// Writes HUD changes to the log
#[derive(Debug, Default)]
pub struct LogHud {
    last_phase: Option<crate::sim::GamePhase>,
}

impl Hud for LogHud {
    fn update(&mut self, snapshot: &HudSnapshot) {
        if self.last_phase != Some(snapshot.phase) {
            log::info!(
                "[{}] score {} health {} t={:.1}s level {}",
                snapshot.phase.as_str(),
                snapshot.score,
                snapshot.health,
                snapshot.survival_time,
                snapshot.level
            );
            self.last_phase = Some(snapshot.phase);
        } else {
            log::trace!(
                "score {} health {} t={:.1}s",
                snapshot.score,
                snapshot.health,
                snapshot.survival_time
            );
        }
    }

    fn notify(&mut self, message: &str) {
        log::warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<f32>);

    impl InputSource for Fixed {
        fn lateral_axis(&mut self) -> Option<f32> {
            self.0
        }
    }

    struct AlwaysFire;

    impl InputSource for AlwaysFire {
        fn lateral_axis(&mut self) -> Option<f32> {
            None
        }

        fn fire(&mut self) -> bool {
            true
        }
    }

    #[test]
    fn test_fallback_first_value_wins() {
        let mut input = FallbackInput::new()
            .with(Box::new(Fixed(None)))
            .with(Box::new(Fixed(Some(0.5))))
            .with(Box::new(Fixed(Some(-1.0))));
        assert_eq!(input.axis(), 0.5);
    }

    #[test]
    fn test_fallback_defaults_to_zero() {
        let mut input = FallbackInput::new().with(Box::new(Fixed(None)));
        assert_eq!(input.axis(), 0.0);
        assert_eq!(FallbackInput::new().axis(), 0.0);
    }

    #[test]
    fn test_fallback_clamps_and_drops_nan() {
        let mut input = FallbackInput::new().with(Box::new(Fixed(Some(3.0))));
        assert_eq!(input.axis(), 1.0);
        let mut input = FallbackInput::new().with(Box::new(Fixed(Some(f32::NAN))));
        assert_eq!(input.axis(), 0.0);
    }

    #[test]
    fn test_fallback_skips_non_finite_source() {
        let mut input = FallbackInput::new()
            .with(Box::new(Fixed(Some(f32::NAN))))
            .with(Box::new(Fixed(Some(f32::INFINITY))))
            .with(Box::new(Fixed(Some(-0.75))));
        assert_eq!(input.axis(), -0.75);
    }

    #[test]
    fn test_fallback_fire_any_source() {
        let mut input = FallbackInput::new()
            .with(Box::new(Fixed(Some(0.0))))
            .with(Box::new(AlwaysFire));
        assert!(input.fire());
        assert!(!FallbackInput::new().with(Box::new(Fixed(None))).fire());
    }

    #[test]
    fn test_fixed_clock() {
        let mut clock = FixedClock(0.25);
        assert_eq!(clock.delta(), 0.25);
        assert_eq!(clock.delta(), 0.25);
    }
}
