//! Rule set parameters shared by every game variant
//!
//! The three variants differ only in how a hit is judged, how projectiles
//! come back, how much a crate is worth and how long shots live.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Playable variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Variant {
    /// Unlimited pumpkins, every touch damages, Space reloads
    #[default]
    Slingshot,
    /// Limited pumpkins per level, hits must be fast, reload is automatic
    Ammo,
    /// Run, jump and shoot bullets at the pyramid
    Shooter,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Slingshot => "Slingshot",
            Variant::Ammo => "Ammo",
            Variant::Shooter => "Shooter",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "slingshot" | "sling" => Some(Variant::Slingshot),
            "ammo" => Some(Variant::Ammo),
            "shooter" | "platformer" => Some(Variant::Shooter),
            _ => None,
        }
    }

    /// Whether the player aims and releases a pumpkin (vs. runs and fires)
    pub fn uses_slingshot(&self) -> bool {
        !matches!(self, Variant::Shooter)
    }
}

/// When a projectile touching a crate counts as a hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DamageTrigger {
    Always,
    /// Relative speed (units/s) must exceed the threshold
    MinRelativeSpeed(f32),
}

impl DamageTrigger {
    pub fn qualifies(&self, relative_speed: f32) -> bool {
        match *self {
            DamageTrigger::Always => true,
            DamageTrigger::MinRelativeSpeed(threshold) => relative_speed > threshold,
        }
    }
}

/// How a spent pumpkin gets back on the sling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReloadPolicy {
    /// Player reloads on demand, no shot limit
    Manual,
    /// Reload once the pumpkin settles or leaves the arena, limited shots per level
    Limited {
        rest_steps: u32,
        bounds_margin: f32,
    },
}

/// How long a fired projectile survives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectileLifetime {
    /// The same pumpkin is reused for every shot
    Persistent,
    /// Each shot expires after `lifetime_ms` or when it leaves the extended arena
    Timed { lifetime_ms: f64, bounds_margin: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub variant: Variant,
    pub damage: DamageTrigger,
    pub reload: ReloadPolicy,
    pub lifetime: ProjectileLifetime,
    pub score_per_target: u64,
    pub target_health: u8,
    /// Spawn explosion particles when a crate breaks
    pub particle_burst: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

impl RuleSet {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Slingshot => Self {
                variant,
                damage: DamageTrigger::Always,
                reload: ReloadPolicy::Manual,
                lifetime: ProjectileLifetime::Persistent,
                score_per_target: 100,
                target_health: TARGET_HEALTH,
                particle_burst: false,
            },
            Variant::Ammo => Self {
                variant,
                damage: DamageTrigger::MinRelativeSpeed(HIT_SPEED_THRESHOLD),
                reload: ReloadPolicy::Limited {
                    rest_steps: REST_STEPS_BEFORE_RELOAD,
                    bounds_margin: OUT_OF_BOUNDS_MARGIN,
                },
                lifetime: ProjectileLifetime::Persistent,
                score_per_target: 100,
                target_health: TARGET_HEALTH,
                particle_burst: false,
            },
            Variant::Shooter => Self {
                variant,
                damage: DamageTrigger::Always,
                reload: ReloadPolicy::Manual,
                lifetime: ProjectileLifetime::Timed {
                    lifetime_ms: BULLET_LIFETIME_MS,
                    bounds_margin: BULLET_BOUNDS_MARGIN,
                },
                score_per_target: 5,
                target_health: TARGET_HEALTH,
                particle_burst: true,
            },
        }
    }

    /// Override crate hit points (at least 1)
    pub fn with_target_health(mut self, health: u8) -> Self {
        self.target_health = health.max(1);
        self
    }

    pub fn has_limited_ammo(&self) -> bool {
        matches!(self.reload, ReloadPolicy::Limited { .. })
    }
}
