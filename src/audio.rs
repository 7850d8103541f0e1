//! Sound cues
//!
//! Procedurally generated tones, no sample files. The output context is only
//! opened on the first cue (browsers refuse to start audio before a user
//! gesture) and any failure just leaves the game silent.

use crate::settings::Settings;
use crate::sim::GameEvent;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Pumpkin leaves the sling
    Launch,
    /// Crate damaged but still standing
    Hit,
    /// Crate destroyed
    Break,
    /// Bullet fired
    Fire,
    Jump,
    /// Level cleared
    Win,
    /// Out of pumpkins
    Lose,
}

impl SoundEffect {
    /// Cue for a gameplay event, if it has one
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::Launched { .. } => Some(SoundEffect::Launch),
            GameEvent::TargetHit { .. } => Some(SoundEffect::Hit),
            GameEvent::TargetDestroyed { .. } => Some(SoundEffect::Break),
            GameEvent::Fired => Some(SoundEffect::Fire),
            GameEvent::Jumped => Some(SoundEffect::Jump),
            GameEvent::Won { .. } => Some(SoundEffect::Win),
            GameEvent::Lost { .. } => Some(SoundEffect::Lose),
            GameEvent::LevelLoaded { .. } | GameEvent::Armed => None,
        }
    }

    /// Oscillator voices making up this cue
    pub fn tones(&self) -> &'static [Tone] {
        match self {
            SoundEffect::Launch => LAUNCH,
            SoundEffect::Hit => HIT,
            SoundEffect::Break => BREAK,
            SoundEffect::Fire => FIRE,
            SoundEffect::Jump => JUMP,
            SoundEffect::Win => WIN,
            SoundEffect::Lose => LOSE,
        }
    }
}

const LAUNCH: &[Tone] = &[Tone::sweep(Wave::Sawtooth, 220.0, 520.0, 0.3, 0.0, 0.18)];
const HIT: &[Tone] = &[Tone::sweep(Wave::Square, 160.0, 90.0, 0.25, 0.0, 0.08)];
const BREAK: &[Tone] = &[
    Tone::sweep(Wave::Sawtooth, 120.0, 40.0, 0.4, 0.0, 0.25),
    Tone::sweep(Wave::Square, 900.0, 900.0, 0.15, 0.0, 0.06),
];
const FIRE: &[Tone] = &[Tone::sweep(Wave::Square, 700.0, 300.0, 0.15, 0.0, 0.07)];
const JUMP: &[Tone] = &[Tone::sweep(Wave::Triangle, 300.0, 600.0, 0.25, 0.0, 0.12)];
// Rising fifth
const WIN: &[Tone] = &[
    Tone::sweep(Wave::Triangle, 440.0, 440.0, 0.3, 0.0, 0.2),
    Tone::sweep(Wave::Triangle, 660.0, 660.0, 0.3, 0.15, 0.3),
];
const LOSE: &[Tone] = &[
    Tone::sweep(Wave::Sine, 330.0, 180.0, 0.3, 0.0, 0.5),
    Tone::sweep(Wave::Sine, 200.0, 120.0, 0.25, 0.25, 0.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One voice: frequency sweep with an exponential fade out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub wave: Wave,
    pub start_hz: f32,
    pub end_hz: f32,
    pub gain: f32,
    /// Seconds after the cue starts
    pub delay: f64,
    pub duration: f64,
}

impl Tone {
    const fn sweep(wave: Wave, start_hz: f32, end_hz: f32, gain: f32, delay: f64, duration: f64) -> Self {
        Self {
            wave,
            start_hz,
            end_hz,
            gain,
            delay,
            duration,
        }
    }
}

/// Lifecycle of the output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioStatus {
    /// Nothing opened yet
    Idle,
    Ready,
    /// Opening failed; stays silent for the rest of the session
    Unavailable,
    ShutDown,
}

/// Audio manager for the game
pub struct AudioManager {
    #[cfg(target_arch = "wasm32")]
    ctx: Option<web_sys::AudioContext>,
    status: AudioStatus,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    mute_on_blur: bool,
    focused: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self {
            #[cfg(target_arch = "wasm32")]
            ctx: None,
            status: AudioStatus::Idle,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            mute_on_blur: true,
            focused: true,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut audio = Self::new();
        audio.apply_settings(settings);
        audio
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_master_volume(settings.master_volume);
        self.set_sfx_volume(settings.sfx_volume);
        self.muted = settings.muted;
        self.mute_on_blur = settings.mute_on_blur;
    }

    pub fn status(&self) -> AudioStatus {
        self.status
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted || (self.mute_on_blur && !self.focused) {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Open the output context if that has not been tried yet
    pub fn ensure(&mut self) -> bool {
        if self.status == AudioStatus::Idle {
            self.status = if self.open() {
                AudioStatus::Ready
            } else {
                log::warn!("Audio output unavailable, continuing silently");
                AudioStatus::Unavailable
            };
        }
        self.status == AudioStatus::Ready
    }

    /// Play a cue. Returns whether anything was scheduled.
    pub fn play(&mut self, effect: SoundEffect) -> bool {
        let vol = self.effective_volume();
        if vol <= 0.0 || !self.ensure() {
            return false;
        }
        self.schedule(effect, vol)
    }

    /// Release the output context. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.status == AudioStatus::ShutDown {
            return;
        }
        self.close();
        self.status = AudioStatus::ShutDown;
        log::debug!("Audio shut down");
    }
}

#[cfg(target_arch = "wasm32")]
impl AudioManager {
    fn open(&mut self) -> bool {
        self.ctx = web_sys::AudioContext::new().ok();
        self.ctx.is_some()
    }

    fn close(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            let _ = ctx.close();
        }
    }

    fn schedule(&self, effect: SoundEffect, vol: f32) -> bool {
        let Some(ctx) = &self.ctx else { return false };

        // Browsers start contexts suspended until a user gesture
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let now = ctx.current_time();
        let mut scheduled = false;
        for tone in effect.tones() {
            scheduled |= Self::play_tone(ctx, tone, vol, now).is_some();
        }
        scheduled
    }

    fn play_tone(ctx: &web_sys::AudioContext, tone: &Tone, vol: f32, now: f64) -> Option<()> {
        use web_sys::OscillatorType;

        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;
        osc.set_type(match tone.wave {
            Wave::Sine => OscillatorType::Sine,
            Wave::Square => OscillatorType::Square,
            Wave::Sawtooth => OscillatorType::Sawtooth,
            Wave::Triangle => OscillatorType::Triangle,
        });
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        let t = now + tone.delay;
        let end = t + tone.duration;
        gain.gain().set_value_at_time(vol * tone.gain, t).ok()?;
        gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok()?;
        osc.frequency().set_value_at_time(tone.start_hz, t).ok()?;
        if tone.end_hz != tone.start_hz {
            osc.frequency()
                .exponential_ramp_to_value_at_time(tone.end_hz, end)
                .ok()?;
        }

        osc.start_with_when(t).ok()?;
        osc.stop_with_when(end + 0.05).ok()?;
        Some(())
    }
}

/// Native builds have no output device; cues are only logged
#[cfg(not(target_arch = "wasm32"))]
impl AudioManager {
    fn open(&mut self) -> bool {
        log::debug!("Audio: using null output");
        true
    }

    fn close(&mut self) {}

    fn schedule(&self, effect: SoundEffect, vol: f32) -> bool {
        log::debug!("Audio: {:?} at {:.2}", effect, vol);
        !effect.tones().is_empty()
    }
}
