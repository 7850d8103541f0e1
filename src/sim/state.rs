//! Game state and core simulation types
//!
//! Per-body gameplay data (crate health, shot timestamps, particle expiry)
//! lives in side tables keyed by [`BodyId`]; the physics world only knows
//! about shapes and motion.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::layout::{Arena, pyramid_layout, shots_for_level};
use super::rules::RuleSet;
use crate::consts::*;
use crate::physics::{BodyDesc, BodyId, PhysicsWorld, Shape};

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Level built, nothing armed yet
    Ready,
    /// Pumpkin on the sling (or shooter waiting for the first shot)
    Armed,
    /// Projectiles in flight, rules being applied
    Resolving,
    /// Every crate destroyed
    Won,
    /// Out of pumpkins with crates left
    Lost,
}

/// Externally visible result of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    InProgress,
    Won,
    Lost,
}

impl RoundOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundOutcome::InProgress => "in-progress",
            RoundOutcome::Won => "won",
            RoundOutcome::Lost => "lost",
        }
    }
}

/// Crate color stage by remaining health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tint {
    Full,
    TwoThirds,
    OneThird,
}

impl Tint {
    pub fn for_health(health: u8, max_health: u8) -> Self {
        let max = max_health.max(1) as u32;
        let health = health as u32;
        if health * 3 > max * 2 {
            Tint::Full
        } else if health * 3 > max {
            Tint::TwoThirds
        } else {
            Tint::OneThird
        }
    }

    pub fn css(&self) -> &'static str {
        match self {
            Tint::Full => "#6b4f2a",
            Tint::TwoThirds => "#8a6a3e",
            Tint::OneThird => "#aa8d63",
        }
    }
}

/// Side-table record for a breakable crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub health: u8,
    pub max_health: u8,
    pub points: u64,
}

impl Target {
    pub fn tint(&self) -> Tint {
        Tint::for_health(self.health, self.max_health)
    }
}

/// The reusable slingshot pumpkin
#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub id: BodyId,
    /// Drag offset from the sling anchor while armed
    pub aim_offset: Vec2,
    /// Consecutive steps spent below the rest speed
    pub rest_steps: u32,
}

/// A fired bullet (shooter)
#[derive(Debug, Clone, Copy)]
pub struct Shot {
    pub id: BodyId,
    pub spawned_ms: f64,
}

/// Cosmetic explosion debris
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub id: BodyId,
    pub expires_ms: f64,
}

/// The shooter's avatar
#[derive(Debug, Clone, Copy)]
pub struct Player {
    pub id: BodyId,
    /// Steps left in which a jump is still honored
    pub coyote_steps: u32,
    /// +1.0 facing right, -1.0 facing left
    pub facing: f32,
}

/// Things the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LevelLoaded { level: u32, targets: usize },
    Armed,
    Launched { shot: u32 },
    TargetHit { target: BodyId, health: u8 },
    TargetDestroyed { target: BodyId, points: u64 },
    Fired,
    Jumped,
    Won { score: u64 },
    Lost { score: u64 },
}

/// What a drawable body is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpriteKind {
    Scenery,
    Target(Tint),
    Pumpkin,
    Player,
    Bullet,
    Particle,
}

/// A body as the renderer sees it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub kind: SpriteKind,
    pub shape: Shape,
    pub position: Vec2,
}

/// Complete state of one game, including the physics world it drives
pub struct GameState<W: PhysicsWorld> {
    pub world: W,
    pub rules: RuleSet,
    pub arena: Arena,
    pub level: u32,
    pub score: u64,
    pub phase: GamePhase,
    pub shots_taken: u32,
    /// Live crates, keyed by body
    pub targets: BTreeMap<BodyId, Target>,
    /// Crates generated for this level
    pub initial_targets: usize,
    pub projectile: Option<Projectile>,
    pub shots: Vec<Shot>,
    pub particles: Vec<Particle>,
    pub player: Option<Player>,
    pub scenery: Vec<(BodyId, Shape)>,
    pub last_fire_ms: Option<f64>,
    /// Gameplay clock in milliseconds since level load
    pub time_ms: f64,
    pub time_ticks: u64,
    /// Bumped on every level load; commands from older epochs are stale
    pub epoch: u64,
    pub seed: u64,
    pub(crate) rng: Pcg32,
    events: Vec<GameEvent>,
}

impl<W: PhysicsWorld> GameState<W> {
    /// Build a game on `world` and load `level`
    pub fn new(world: W, rules: RuleSet, arena: Arena, level: u32, seed: u64) -> Self {
        let mut state = Self {
            world,
            rules,
            arena,
            level: level.max(1),
            score: 0,
            phase: GamePhase::Ready,
            shots_taken: 0,
            targets: BTreeMap::new(),
            initial_targets: 0,
            projectile: None,
            shots: Vec::new(),
            particles: Vec::new(),
            player: None,
            scenery: Vec::new(),
            last_fire_ms: None,
            time_ms: 0.0,
            time_ticks: 0,
            epoch: 0,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        };
        state.load_level();
        state
    }

    /// Tear down whatever is in the world and build the current level from scratch
    pub fn load_level(&mut self) {
        self.world.clear();
        self.targets.clear();
        self.shots.clear();
        self.particles.clear();
        self.scenery.clear();
        self.projectile = None;
        self.player = None;
        self.last_fire_ms = None;
        self.score = 0;
        self.shots_taken = 0;
        self.time_ms = 0.0;
        self.time_ticks = 0;
        self.phase = GamePhase::Ready;
        self.epoch += 1;
        self.rng = Pcg32::seed_from_u64(self.seed ^ ((self.level as u64) << 32));

        self.spawn_scenery();
        for position in pyramid_layout(self.level, self.arena.target_base()) {
            let desc = BodyDesc::dynamic(Shape::rect(TARGET_WIDTH, TARGET_HEIGHT), position)
                .with_material(0.1, 0.6, 2.0);
            let id = self.world.create_body(desc);
            self.targets.insert(
                id,
                Target {
                    health: self.rules.target_health,
                    max_health: self.rules.target_health,
                    points: self.rules.score_per_target,
                },
            );
        }
        self.initial_targets = self.targets.len();
        self.push_event(GameEvent::LevelLoaded {
            level: self.level,
            targets: self.initial_targets,
        });
        log::info!(
            "Level {} loaded ({} crates, {})",
            self.level,
            self.initial_targets,
            self.rules.variant.as_str()
        );

        if self.rules.variant.uses_slingshot() {
            self.arm();
        } else {
            self.spawn_player();
            self.phase = GamePhase::Armed;
        }
    }

    fn spawn_scenery(&mut self) {
        let (w, h) = (self.arena.width, self.arena.height);
        let pieces = [
            (Shape::rect(w + 100.0, 40.0), Vec2::new(w / 2.0, h + 20.0)),
            (Shape::rect(40.0, h), Vec2::new(-20.0, h / 2.0)),
            (Shape::rect(40.0, h), Vec2::new(w + 20.0, h / 2.0)),
        ];
        for (shape, position) in pieces {
            let id = self.world.create_body(BodyDesc::fixed(shape, position));
            self.scenery.push((id, shape));
        }
        if self.rules.variant.uses_slingshot() {
            // Sensor, so a pumpkin pulled low flies through it
            let anchor = self.arena.sling_anchor();
            let shape = Shape::rect(40.0, 20.0);
            let position = Vec2::new(anchor.x - 10.0, anchor.y + PUMPKIN_RADIUS + 12.0);
            let id = self
                .world
                .create_body(BodyDesc::fixed(shape, position).as_sensor());
            self.scenery.push((id, shape));
        }
    }

    fn spawn_player(&mut self) {
        let desc = BodyDesc::dynamic(
            Shape::rect(PLAYER_WIDTH, PLAYER_HEIGHT),
            self.arena.player_spawn(),
        )
        .with_material(0.0, 0.0, 1.0)
        .with_locked_rotation();
        let id = self.world.create_body(desc);
        self.player = Some(Player {
            id,
            coyote_steps: 0,
            facing: 1.0,
        });
    }

    /// Put the pumpkin back on the sling (spawning it if needed)
    pub fn arm(&mut self) {
        let anchor = self.arena.sling_anchor();
        match self.projectile {
            Some(ref mut projectile) => {
                self.world.set_position(projectile.id, anchor);
                self.world.set_velocity(projectile.id, Vec2::ZERO);
                projectile.aim_offset = Vec2::ZERO;
                projectile.rest_steps = 0;
            }
            None => {
                let desc = BodyDesc::dynamic(Shape::Circle { radius: PUMPKIN_RADIUS }, anchor)
                    .with_material(0.4, 0.8, 4.0);
                let id = self.world.create_body(desc);
                self.projectile = Some(Projectile {
                    id,
                    aim_offset: Vec2::ZERO,
                    rest_steps: 0,
                });
            }
        }
        self.phase = GamePhase::Armed;
        self.push_event(GameEvent::Armed);
    }

    /// Replay the current level
    pub fn reset_level(&mut self) {
        self.load_level();
    }

    /// Try again after a loss
    pub fn retry(&mut self) {
        self.load_level();
    }

    /// Move to the next level. Only allowed once the round is won.
    pub fn advance_level(&mut self) -> bool {
        if self.phase != GamePhase::Won {
            log::debug!("Ignoring advance while {:?}", self.phase);
            return false;
        }
        self.level += 1;
        self.load_level();
        true
    }

    pub fn outcome(&self) -> RoundOutcome {
        match self.phase {
            GamePhase::Won => RoundOutcome::Won,
            GamePhase::Lost => RoundOutcome::Lost,
            _ => RoundOutcome::InProgress,
        }
    }

    pub fn targets_remaining(&self) -> usize {
        self.targets.len()
    }

    /// Shot allowance for this level, if ammo is limited
    pub fn shots_per_level(&self) -> Option<u32> {
        self.rules
            .has_limited_ammo()
            .then(|| shots_for_level(self.level))
    }

    pub fn shots_remaining(&self) -> Option<u32> {
        self.shots_per_level()
            .map(|limit| limit.saturating_sub(self.shots_taken))
    }

    pub fn is_armed(&self) -> bool {
        self.phase == GamePhase::Armed && self.projectile.is_some()
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Snapshot of everything drawable, scenery first
    pub fn sprites(&self) -> Vec<Sprite> {
        let mut sprites = Vec::new();
        let mut push = |kind, shape, id| {
            if let Some(position) = self.world.position(id) {
                sprites.push(Sprite {
                    kind,
                    shape,
                    position,
                });
            }
        };

        for &(id, shape) in &self.scenery {
            push(SpriteKind::Scenery, shape, id);
        }
        let crate_shape = Shape::rect(TARGET_WIDTH, TARGET_HEIGHT);
        for (&id, target) in &self.targets {
            push(SpriteKind::Target(target.tint()), crate_shape, id);
        }
        if let Some(projectile) = self.projectile {
            push(
                SpriteKind::Pumpkin,
                Shape::Circle { radius: PUMPKIN_RADIUS },
                projectile.id,
            );
        }
        if let Some(player) = self.player {
            push(
                SpriteKind::Player,
                Shape::rect(PLAYER_WIDTH, PLAYER_HEIGHT),
                player.id,
            );
        }
        for shot in &self.shots {
            push(SpriteKind::Bullet, Shape::Circle { radius: BULLET_RADIUS }, shot.id);
        }
        for particle in &self.particles {
            push(
                SpriteKind::Particle,
                Shape::Circle { radius: PARTICLE_RADIUS },
                particle.id,
            );
        }
        sprites
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::testing::TestWorld;
    use crate::sim::rules::Variant;

    fn slingshot(level: u32) -> GameState<TestWorld> {
        GameState::new(
            TestWorld::new(),
            RuleSet::for_variant(Variant::Slingshot),
            Arena::default(),
            level,
            7,
        )
    }

    #[test]
    fn test_new_level_is_armed() {
        let mut state = slingshot(1);
        assert_eq!(state.phase, GamePhase::Armed);
        assert_eq!(state.targets_remaining(), 8);
        assert_eq!(state.initial_targets, 8);
        assert_eq!(state.outcome(), RoundOutcome::InProgress);
        assert_eq!(state.shots_per_level(), None);

        let pumpkin = state.projectile.unwrap().id;
        assert_eq!(state.world.position(pumpkin), Some(state.arena.sling_anchor()));

        let events = state.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::LevelLoaded { level: 1, targets: 8 }, GameEvent::Armed]
        );
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_reload_releases_old_bodies() {
        let mut state = slingshot(2);
        let bodies_before = state.world.bodies.len();
        let old_epoch = state.epoch;
        let old_crate = *state.targets.keys().next().unwrap();

        state.reset_level();
        assert_eq!(state.world.bodies.len(), bodies_before);
        assert!(state.world.position(old_crate).is_none());
        assert_eq!(state.epoch, old_epoch + 1);
    }

    #[test]
    fn test_advance_requires_win() {
        let mut state = slingshot(1);
        assert!(!state.advance_level());
        assert_eq!(state.level, 1);

        state.phase = GamePhase::Won;
        assert!(state.advance_level());
        assert_eq!(state.level, 2);
        assert_eq!(state.phase, GamePhase::Armed);
        assert_eq!(state.targets_remaining(), 14);
    }

    #[test]
    fn test_tint_stages() {
        assert_eq!(Tint::for_health(3, 3), Tint::Full);
        assert_eq!(Tint::for_health(2, 3), Tint::TwoThirds);
        assert_eq!(Tint::for_health(1, 3), Tint::OneThird);
        assert_eq!(Tint::for_health(1, 1), Tint::Full);
    }

    #[test]
    fn test_shooter_spawns_player_not_pumpkin() {
        let state = GameState::new(
            TestWorld::new(),
            RuleSet::for_variant(Variant::Shooter),
            Arena::default(),
            1,
            7,
        );
        assert!(state.projectile.is_none());
        assert!(state.player.is_some());
        assert_eq!(state.phase, GamePhase::Armed);
        // Floor + two walls, no sling base
        assert_eq!(state.scenery.len(), 3);
        let sprites = state.sprites();
        assert_eq!(sprites.iter().filter(|s| s.kind == SpriteKind::Player).count(), 1);
    }
}
