//! Gameplay simulation module
//!
//! All gameplay rules live here. This module must stay deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - Physics only through the `PhysicsWorld` trait, no platform dependencies

pub mod layout;
pub mod rules;
pub mod state;
pub mod tick;

pub use layout::{
    Arena, columns_for_level, pyramid_layout, rows_for_level, shots_for_level, target_count,
};
pub use rules::{DamageTrigger, ProjectileLifetime, ReloadPolicy, RuleSet, Variant};
pub use state::{
    GameEvent, GamePhase, GameState, Player, Projectile, RoundOutcome, Sprite, SpriteKind,
    Target, Tint,
};
pub use tick::{TickInput, tick};
