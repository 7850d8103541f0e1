//! Pumpkin Smash - slingshot and shooter physics mini-game
//!
//! Core modules:
//! - `sim`: Gameplay rules (layout, damage, reload, win/loss, movement)
//! - `physics`: Rigid-body engine abstraction and the rapier2d backend
//! - `scores`: Best score per level, persisted through `storage`
//! - `storage`: Key-value backends (memory, JSON file, LocalStorage)
//! - `settings`: Player preferences
//! - `session`: One running game plus best-score bookkeeping
//! - `audio`: Procedural sound effects (Web Audio on wasm)

pub mod audio;
pub mod physics;
pub mod scores;
pub mod session;
pub mod settings;
pub mod sim;
pub mod storage;

pub use scores::{BestScores, ScoreStore};
pub use session::{HudState, Session};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Fixed timestep in milliseconds, used by the gameplay clock
    pub const SIM_DT_MS: f64 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default arena dimensions (world units, y grows downward)
    pub const ARENA_WIDTH: f32 = 1000.0;
    pub const ARENA_HEIGHT: f32 = 600.0;

    /// Gravity in world units per second squared
    pub const GRAVITY: f32 = 1000.0;
    /// World units per physics-engine meter
    pub const UNITS_PER_METER: f32 = 50.0;

    /// Crate dimensions
    pub const TARGET_WIDTH: f32 = 36.0;
    pub const TARGET_HEIGHT: f32 = 28.0;
    pub const TARGET_GAP_X: f32 = 4.0;
    pub const TARGET_GAP_Y: f32 = 3.0;
    pub const TARGET_HEALTH: u8 = 3;

    /// Pumpkin
    pub const PUMPKIN_RADIUS: f32 = 20.0;
    /// Maximum drag distance from the sling anchor
    pub const MAX_PULL: f32 = 90.0;
    /// Launch speed per unit of pull (units/s)
    pub const LAUNCH_POWER: f32 = 10.0;

    /// Relative speed a pumpkin needs to damage a crate (2.6 units per 60 Hz step)
    pub const HIT_SPEED_THRESHOLD: f32 = 2.6 * 60.0;
    /// Below this speed the pumpkin counts as resting (0.15 units per step)
    pub const REST_SPEED: f32 = 0.15 * 60.0;
    /// Consecutive resting steps before an automatic reload
    pub const REST_STEPS_BEFORE_RELOAD: u32 = 30;
    /// Margin around the arena before a pumpkin counts as gone
    pub const OUT_OF_BOUNDS_MARGIN: f32 = 60.0;

    /// Shooter player
    pub const PLAYER_WIDTH: f32 = 24.0;
    pub const PLAYER_HEIGHT: f32 = 36.0;
    pub const PLAYER_MAX_SPEED: f32 = 240.0;
    pub const JUMP_SPEED: f32 = 520.0;
    pub const COYOTE_STEPS: u32 = 8;
    /// Height of the ground check strip under the player's feet
    pub const GROUND_CHECK_DEPTH: f32 = 4.0;

    /// Shooter bullets
    pub const FIRE_COOLDOWN_MS: f64 = 220.0;
    pub const BULLET_RADIUS: f32 = 5.0;
    pub const BULLET_SPEED: f32 = 600.0;
    pub const BULLET_LIFETIME_MS: f64 = 3000.0;
    pub const BULLET_BOUNDS_MARGIN: f32 = 80.0;

    /// Explosion particles
    pub const PARTICLE_COUNT: usize = 8;
    pub const PARTICLE_RADIUS: f32 = 3.0;
    pub const PARTICLE_MIN_SPEED: f32 = 120.0;
    pub const PARTICLE_MAX_SPEED: f32 = 260.0;
    pub const PARTICLE_LIFETIME_MS: f64 = 400.0;
}
