//! Sound effects
//!
//! `SoundEffect` is the vocabulary the game loop speaks. On the web the
//! effects are synthesized with the Web Audio API from short oscillator
//! tones - no audio files to load.

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Player hit an obstacle
    Crash,
    /// Collectible picked up
    Collect,
    /// Projectile destroyed an obstacle
    Explosion,
    /// Projectile fired
    Shoot,
    /// Difficulty stepped up
    DifficultyUp,
    GameOver,
    Win,
    /// Finished run beat the stored best
    HighScore,
    /// Run started
    Start,
}

impl SoundEffect {
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::Crash => "crash",
            SoundEffect::Collect => "collect",
            SoundEffect::Explosion => "explosion",
            SoundEffect::Shoot => "shoot",
            SoundEffect::DifficultyUp => "difficulty-up",
            SoundEffect::GameOver => "game-over",
            SoundEffect::Win => "win",
            SoundEffect::HighScore => "high-score",
            SoundEffect::Start => "start",
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use glam::Vec3;
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::SoundEffect;
    use crate::platform::Effects;
    use crate::settings::Settings;

    /// One oscillator note with an exponential decay
    struct Tone {
        freq: f32,
        /// Frequency reached at the end of the note (sweep), if any
        sweep_to: Option<f32>,
        wave: OscillatorType,
        /// Start offset from "now" (seconds)
        delay: f64,
        decay: f64,
        gain: f32,
    }

    const fn tone(freq: f32, wave: OscillatorType, delay: f64, decay: f64, gain: f32) -> Tone {
        Tone {
            freq,
            sweep_to: None,
            wave,
            delay,
            decay,
            gain,
        }
    }

    const fn sweep(from: f32, to: f32, wave: OscillatorType, decay: f64, gain: f32) -> Tone {
        Tone {
            freq: from,
            sweep_to: Some(to),
            wave,
            delay: 0.0,
            decay,
            gain,
        }
    }

    /// Rising/falling arpeggio, `step` seconds apart
    fn arpeggio(freqs: &[f32], wave: OscillatorType, step: f64, decay: f64, gain: f32) -> Vec<Tone> {
        freqs
            .iter()
            .enumerate()
            .map(|(i, &f)| tone(f, wave, i as f64 * step, decay, gain))
            .collect()
    }

    fn score(effect: SoundEffect) -> Vec<Tone> {
        use OscillatorType::*;
        match effect {
            // Low thump plus a metallic clang
            SoundEffect::Crash => vec![
                sweep(150.0, 50.0, Sine, 0.2, 0.6),
                sweep(400.0, 200.0, Square, 0.15, 0.2),
            ],
            SoundEffect::Collect => arpeggio(&[600.0, 800.0, 1000.0], Sine, 0.06, 0.15, 0.25),
            SoundEffect::Explosion => vec![
                sweep(100.0, 30.0, Sawtooth, 0.4, 0.5),
                tone(1500.0, Square, 0.0, 0.1, 0.15),
            ],
            SoundEffect::Shoot => vec![sweep(900.0, 250.0, Square, 0.08, 0.15)],
            SoundEffect::DifficultyUp => {
                arpeggio(&[400.0, 500.0, 600.0, 800.0], Triangle, 0.1, 0.4, 0.3)
            }
            SoundEffect::GameOver => arpeggio(&[400.0, 350.0, 300.0, 200.0], Sine, 0.2, 0.3, 0.3),
            SoundEffect::Win => {
                arpeggio(&[400.0, 500.0, 600.0, 800.0, 1000.0, 1200.0], Triangle, 0.12, 0.5, 0.3)
            }
            SoundEffect::HighScore => {
                arpeggio(&[500.0, 600.0, 700.0, 800.0, 1000.0], Triangle, 0.08, 0.25, 0.25)
            }
            SoundEffect::Start => vec![sweep(200.0, 600.0, Triangle, 0.2, 0.3)],
        }
    }

    /// Web Audio synthesizer
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        volume: f32,
    }

    impl AudioManager {
        pub fn new(settings: &Settings) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                volume: settings.effective_volume(),
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn apply_settings(&mut self, settings: &Settings) {
            self.volume = settings.effective_volume();
        }

        pub fn play(&self, effect: SoundEffect) {
            if self.volume <= 0.0 {
                return;
            }
            let Some(ctx) = &self.ctx else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let now = ctx.current_time();
            for note in score(effect) {
                self.play_tone(ctx, &note, now);
            }
        }

        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            wave: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(wave);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn play_tone(&self, ctx: &AudioContext, note: &Tone, now: f64) {
            let Some((osc, gain)) = self.create_osc(ctx, note.freq, note.wave) else {
                return;
            };
            let t = now + note.delay;

            gain.gain().set_value_at_time(self.volume * note.gain, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + note.decay)
                .ok();
            if let Some(to) = note.sweep_to {
                osc.frequency().set_value_at_time(note.freq, t).ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(to, t + note.decay)
                    .ok();
            }

            osc.start_with_when(t).ok();
            osc.stop_with_when(t + note.decay + 0.05).ok();
        }
    }

    impl Effects for AudioManager {
        fn play_sound(&mut self, effect: SoundEffect) {
            self.play(effect);
        }

        fn spawn_visual_burst(&mut self, pos: Vec3) {
            // Particles are part of the session and drawn by the renderer
            log::debug!("burst at ({:.1}, {:.1}, {:.1})", pos.x, pos.y, pos.z);
        }
    }
}
