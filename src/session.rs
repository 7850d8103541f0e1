//! One running game plus best-score bookkeeping
//!
//! The session is what a frontend talks to: it turns commands into tick
//! input, drives the fixed timestep, records each attempt's score exactly once
//! and hands back the events and HUD snapshot for the frame.

use glam::Vec2;
use serde::Serialize;

use crate::consts::*;
use crate::physics::PhysicsWorld;
use crate::scores::ScoreStore;
use crate::sim::{Arena, GameEvent, GameState, RoundOutcome, RuleSet, Sprite, TickInput, tick};
use crate::storage::KeyValueStore;

/// Player intent, as delivered by the frontend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Drag the sling toward a world point
    Aim(Vec2),
    Release,
    Reload,
    Fire,
    Jump,
    /// Held direction keys
    Move { left: bool, right: bool },
    /// Replay the current level from scratch
    Reset,
    /// Replay after a loss
    Retry,
    /// Next level, only once the current one is won
    Advance,
}

/// Everything the HUD shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HudState {
    pub level: u32,
    pub score: u64,
    pub best: u64,
    pub shots_taken: u32,
    /// `None` when ammo is unlimited
    pub shots_remaining: Option<u32>,
    pub targets_remaining: usize,
    pub outcome: RoundOutcome,
}

pub struct Session<W: PhysicsWorld, S: KeyValueStore> {
    state: GameState<W>,
    scores: ScoreStore<S>,
    input: TickInput,
    accumulator: f32,
    /// Whether this attempt's score has already gone to the score store
    attempt_settled: bool,
}

impl<W: PhysicsWorld, S: KeyValueStore> Session<W, S> {
    pub fn new(world: W, store: S, rules: RuleSet, arena: Arena, level: u32, seed: u64) -> Self {
        Self {
            state: GameState::new(world, rules, arena, level, seed),
            scores: ScoreStore::load(store),
            input: TickInput::default(),
            accumulator: 0.0,
            attempt_settled: false,
        }
    }

    pub fn state(&self) -> &GameState<W> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState<W> {
        &mut self.state
    }

    pub fn scores(&self) -> &ScoreStore<S> {
        &self.scores
    }

    /// Identifies the loaded level; changes on every reset, retry or advance
    pub fn epoch(&self) -> u64 {
        self.state.epoch
    }

    /// Apply a command issued against `epoch`. Commands from an older level are dropped.
    pub fn command(&mut self, epoch: u64, command: Command) -> bool {
        if epoch != self.state.epoch {
            log::debug!(
                "Dropping {:?} from epoch {} (current {})",
                command,
                epoch,
                self.state.epoch
            );
            return false;
        }
        self.apply(command)
    }

    /// Apply a command to the current level
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Aim(point) => self.input.aim = Some(point),
            Command::Release => self.input.release = true,
            Command::Reload => self.input.reload = true,
            Command::Fire => self.input.fire = true,
            Command::Jump => self.input.jump = true,
            Command::Move { left, right } => {
                self.input.left = left;
                self.input.right = right;
            }
            Command::Reset => {
                self.settle_attempt();
                self.state.reset_level();
                self.begin_attempt();
            }
            Command::Retry => {
                self.settle_attempt();
                self.state.retry();
                self.begin_attempt();
            }
            Command::Advance => {
                if !self.state.advance_level() {
                    return false;
                }
                self.begin_attempt();
            }
        }
        true
    }

    /// Run one fixed step and return what happened
    pub fn step(&mut self) -> Vec<GameEvent> {
        tick(&mut self.state, &self.input);
        if self.input.release {
            self.input.aim = None;
        }
        self.input.clear_one_shots();

        if self.state.outcome() != RoundOutcome::InProgress {
            self.settle_attempt();
        }
        self.state.drain_events()
    }

    /// Advance by `dt` seconds of wall time in fixed steps
    pub fn frame(&mut self, dt: f32) -> Vec<GameEvent> {
        self.accumulator += dt.min(0.1);

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            events.extend(self.step());
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        events
    }

    /// Rebuild the current level for a new playfield size. Starts a new epoch.
    pub fn resize(&mut self, arena: Arena) -> bool {
        if arena == self.state.arena {
            return false;
        }
        self.settle_attempt();
        self.state.arena = arena;
        self.state.load_level();
        self.begin_attempt();
        log::info!("Arena resized to {}x{}", arena.width, arena.height);
        true
    }

    pub fn hud(&self) -> HudState {
        HudState {
            level: self.state.level,
            score: self.state.score,
            best: self.scores.get(self.state.level),
            shots_taken: self.state.shots_taken,
            shots_remaining: self.state.shots_remaining(),
            targets_remaining: self.state.targets_remaining(),
            outcome: self.state.outcome(),
        }
    }

    pub fn sprites(&self) -> Vec<Sprite> {
        self.state.sprites()
    }

    fn settle_attempt(&mut self) {
        if self.attempt_settled {
            return;
        }
        self.attempt_settled = true;
        self.scores
            .record_attempt(self.state.level, self.state.score);
    }

    fn begin_attempt(&mut self) {
        self.attempt_settled = false;
        self.input = TickInput::default();
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BodyId;
    use crate::physics::testing::TestWorld;
    use crate::sim::Variant;
    use crate::storage::MemoryStore;

    type TestSession = Session<TestWorld, MemoryStore>;

    fn session(rules: RuleSet) -> TestSession {
        let mut session = Session::new(
            TestWorld::new(),
            MemoryStore::new(),
            rules,
            Arena::default(),
            1,
            7,
        );
        session.step();
        session
    }

    fn one_hit_rules() -> RuleSet {
        RuleSet::for_variant(Variant::Slingshot).with_target_health(1)
    }

    fn launch(session: &mut TestSession) -> BodyId {
        session.apply(Command::Aim(session.state().arena.sling_anchor() + Vec2::new(-60.0, 20.0)));
        session.step();
        session.apply(Command::Release);
        let events = session.step();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Launched { .. })));
        session.state().projectile.unwrap().id
    }

    fn smash(session: &mut TestSession, pumpkin: BodyId, target: BodyId) -> Vec<GameEvent> {
        session.state_mut().world.inject_collision(pumpkin, target);
        session.step()
    }

    #[test]
    fn test_level_one_clear_records_best_once() {
        let mut session = session(one_hit_rules());
        let pumpkin = launch(&mut session);

        let targets: Vec<BodyId> = session.state().targets.keys().copied().collect();
        let mut events = Vec::new();
        for target in targets {
            events.extend(smash(&mut session, pumpkin, target));
        }

        let hud = session.hud();
        assert_eq!(hud.score, 800);
        assert_eq!(hud.best, 800);
        assert_eq!(hud.targets_remaining, 0);
        assert_eq!(hud.outcome, RoundOutcome::Won);
        assert_eq!(
            events.iter().filter(|e| matches!(e, GameEvent::Won { .. })).count(),
            1
        );
        assert_eq!(session.scores().store().writes, 1);

        // Stray contacts after the win change nothing
        let floor = session.state().scenery[0].0;
        for _ in 0..10 {
            assert!(smash(&mut session, pumpkin, floor).is_empty());
        }
        assert_eq!(session.scores().store().writes, 1);
        assert_eq!(session.hud().best, 800);
    }

    #[test]
    fn test_stale_epoch_is_rejected() {
        let mut session = session(one_hit_rules());
        let old = session.epoch();

        assert!(session.command(old, Command::Reset));
        assert_eq!(session.epoch(), old + 1);

        assert!(!session.command(old, Command::Release));
        session.step();
        assert_eq!(session.state().shots_taken, 0);

        assert!(session.command(session.epoch(), Command::Release));
        session.step();
        assert_eq!(session.state().shots_taken, 1);
    }

    #[test]
    fn test_advance_needs_a_win() {
        let mut session = session(one_hit_rules());
        assert!(!session.apply(Command::Advance));
        assert_eq!(session.hud().level, 1);

        let pumpkin = launch(&mut session);
        let targets: Vec<BodyId> = session.state().targets.keys().copied().collect();
        for target in targets {
            smash(&mut session, pumpkin, target);
        }
        assert!(session.apply(Command::Advance));

        let hud = session.hud();
        assert_eq!(hud.level, 2);
        assert_eq!(hud.score, 0);
        assert_eq!(hud.best, 0);
        assert_eq!(hud.targets_remaining, 14);
        assert_eq!(hud.outcome, RoundOutcome::InProgress);
        assert_eq!(session.scores().get(1), 800);
    }

    #[test]
    fn test_abandoned_attempt_still_counts() {
        let mut session = session(one_hit_rules());
        let pumpkin = launch(&mut session);
        let target = *session.state().targets.keys().next().unwrap();
        smash(&mut session, pumpkin, target);
        assert_eq!(session.hud().score, 100);

        session.apply(Command::Reset);
        let hud = session.hud();
        assert_eq!(hud.score, 0);
        assert_eq!(hud.best, 100);
        assert_eq!(hud.targets_remaining, 8);
        assert_eq!(hud.shots_taken, 0);
        assert_eq!(session.scores().store().writes, 1);
    }

    #[test]
    fn test_ammo_loss_then_retry() {
        let mut session = session(RuleSet::for_variant(Variant::Ammo));
        assert_eq!(session.hud().shots_remaining, Some(3));

        let mut lost = 0;
        for _ in 0..3 {
            session.apply(Command::Release);
            for _ in 0..=REST_STEPS_BEFORE_RELOAD + 1 {
                lost += session
                    .step()
                    .iter()
                    .filter(|e| matches!(e, GameEvent::Lost { .. }))
                    .count();
            }
        }
        assert_eq!(lost, 1);
        let hud = session.hud();
        assert_eq!(hud.outcome, RoundOutcome::Lost);
        assert_eq!(hud.shots_remaining, Some(0));
        assert_eq!(hud.targets_remaining, 8);

        assert!(session.apply(Command::Retry));
        let hud = session.hud();
        assert_eq!(hud.outcome, RoundOutcome::InProgress);
        assert_eq!(hud.shots_remaining, Some(3));
    }

    #[test]
    fn test_resize_rebuilds_level() {
        let mut session = session(one_hit_rules());
        let pumpkin = launch(&mut session);
        let target = *session.state().targets.keys().next().unwrap();
        smash(&mut session, pumpkin, target);
        let old = session.epoch();

        assert!(!session.resize(Arena::default()));
        assert_eq!(session.epoch(), old);

        let small = Arena::for_container(500.0);
        assert!(session.resize(small));
        assert_eq!(session.epoch(), old + 1);
        assert_eq!(session.state().arena, small);
        assert!(session.state().is_armed());
        let anchor = small.sling_anchor();
        let pumpkin = session.state().projectile.unwrap().id;
        assert_eq!(session.state().world.position(pumpkin), Some(anchor));

        let hud = session.hud();
        assert_eq!(hud.score, 0);
        assert_eq!(hud.best, 100);
        assert_eq!(hud.targets_remaining, 8);

        // A drag from before the resize cannot fire into the new layout
        assert!(!session.command(old, Command::Release));
    }

    #[test]
    fn test_frame_runs_fixed_steps() {
        let mut session = session(one_hit_rules());
        let before = session.state().time_ticks;

        session.frame(0.06);
        assert_eq!(session.state().time_ticks, before + 3);

        // Long stalls are clamped instead of replayed in full
        session.frame(5.0);
        assert!(session.state().time_ticks <= before + 3 + MAX_SUBSTEPS as u64);
    }
}
