//! Fixed timestep simulation tick
//!
//! Applies one step of player input, advances the physics world and runs the
//! gameplay rules on the contacts it reports.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;

use super::rules::{ProjectileLifetime, ReloadPolicy};
use super::state::{GameEvent, GamePhase, GameState, Particle, RoundOutcome, Shot};
use crate::consts::*;
use crate::physics::{BodyDesc, BodyId, CollisionStart, PhysicsWorld, Region, Shape};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Drag point while aiming the sling (world units)
    pub aim: Option<Vec2>,
    /// Let go of the sling
    pub release: bool,
    /// Put the pumpkin back on the sling (manual reload rules only)
    pub reload: bool,
    /// Shoot a bullet (shooter)
    pub fire: bool,
    /// Jump (shooter)
    pub jump: bool,
    /// Held direction keys (shooter)
    pub left: bool,
    pub right: bool,
}

impl TickInput {
    /// Clear one-shot actions after they have been processed
    pub fn clear_one_shots(&mut self) {
        self.release = false;
        self.reload = false;
        self.fire = false;
        self.jump = false;
    }
}

/// Advance the game state by one fixed timestep
pub fn tick<W: PhysicsWorld>(state: &mut GameState<W>, input: &TickInput) {
    state.time_ticks += 1;
    state.time_ms += SIM_DT_MS;

    if state.outcome() == RoundOutcome::InProgress {
        if state.rules.variant.uses_slingshot() {
            apply_slingshot_input(state, input);
        } else {
            apply_shooter_input(state, input);
        }
    }
    hold_armed_projectile(state);

    // Contacts are judged on the approach velocities, not the post-solve ones
    let velocities = snapshot_velocities(state);
    let contacts = state.world.step(SIM_DT);
    handle_contacts(state, &contacts, &velocities);

    if state.rules.variant.uses_slingshot() {
        update_reload(state);
    } else {
        update_grounded(state);
    }
    expire_shots(state);
    expire_particles(state);
}

fn apply_slingshot_input<W: PhysicsWorld>(state: &mut GameState<W>, input: &TickInput) {
    let Some(mut projectile) = state.projectile else {
        return;
    };
    let anchor = state.arena.sling_anchor();

    match state.phase {
        GamePhase::Armed => {
            if let Some(point) = input.aim {
                projectile.aim_offset = (point - anchor).clamp_length_max(MAX_PULL);
            }
            if input.release {
                let launch_velocity = -projectile.aim_offset * LAUNCH_POWER;
                state
                    .world
                    .set_position(projectile.id, anchor + projectile.aim_offset);
                state.world.set_velocity(projectile.id, launch_velocity);
                projectile.rest_steps = 0;
                state.shots_taken += 1;
                state.phase = GamePhase::Resolving;
                state.projectile = Some(projectile);
                state.push_event(GameEvent::Launched {
                    shot: state.shots_taken,
                });
                return;
            }
            state.projectile = Some(projectile);
        }
        GamePhase::Resolving if input.reload => match state.rules.reload {
            ReloadPolicy::Manual => state.arm(),
            ReloadPolicy::Limited { .. } => log::debug!("Manual reload ignored, reload is automatic"),
        },
        _ => {
            if input.release {
                log::debug!("Release ignored while {:?}", state.phase);
            }
        }
    }
}

fn apply_shooter_input<W: PhysicsWorld>(state: &mut GameState<W>, input: &TickInput) {
    let Some(mut player) = state.player else {
        return;
    };

    let direction = input.right as i32 as f32 - input.left as i32 as f32;
    if direction != 0.0 {
        player.facing = direction;
    }

    let current = state.world.velocity(player.id).unwrap_or_default();
    let run = (direction * PLAYER_MAX_SPEED).clamp(-PLAYER_MAX_SPEED, PLAYER_MAX_SPEED);
    let mut velocity = Vec2::new(run, current.y);

    if input.jump {
        if player.coyote_steps > 0 {
            velocity.y = -JUMP_SPEED;
            player.coyote_steps = 0;
            state.push_event(GameEvent::Jumped);
        } else {
            log::debug!("Jump ignored, not grounded");
        }
    }
    state.world.set_velocity(player.id, velocity);
    state.player = Some(player);

    if input.fire {
        fire(state);
    }
}

/// Spawn a bullet in front of the player, subject to the cooldown
fn fire<W: PhysicsWorld>(state: &mut GameState<W>) {
    let Some(player) = state.player else {
        return;
    };
    let now = state.time_ms;
    if state
        .last_fire_ms
        .is_some_and(|last| now - last < FIRE_COOLDOWN_MS)
    {
        return;
    }
    let Some(origin) = state.world.position(player.id) else {
        return;
    };

    let muzzle = origin
        + Vec2::new(
            player.facing * (PLAYER_WIDTH / 2.0 + BULLET_RADIUS + 2.0),
            -PLAYER_HEIGHT * 0.15,
        );
    let desc = BodyDesc::dynamic(Shape::Circle { radius: BULLET_RADIUS }, muzzle)
        .with_velocity(Vec2::new(player.facing * BULLET_SPEED, 0.0))
        .with_material(0.2, 0.0, 1.0)
        .with_gravity_scale(0.0);
    let id = state.world.create_body(desc);

    state.shots.push(Shot {
        id,
        spawned_ms: now,
    });
    state.last_fire_ms = Some(now);
    state.shots_taken += 1;
    if state.phase == GamePhase::Armed {
        state.phase = GamePhase::Resolving;
    }
    state.push_event(GameEvent::Fired);
}

/// Keep an armed pumpkin pinned to the sling
fn hold_armed_projectile<W: PhysicsWorld>(state: &mut GameState<W>) {
    if state.phase != GamePhase::Armed {
        return;
    }
    if let Some(projectile) = state.projectile {
        let anchor = state.arena.sling_anchor();
        state
            .world
            .set_position(projectile.id, anchor + projectile.aim_offset);
        state.world.set_velocity(projectile.id, Vec2::ZERO);
    }
}

fn snapshot_velocities<W: PhysicsWorld>(state: &GameState<W>) -> BTreeMap<BodyId, Vec2> {
    let projectiles = state
        .projectile
        .map(|p| p.id)
        .into_iter()
        .chain(state.shots.iter().map(|s| s.id));
    projectiles
        .chain(state.targets.keys().copied())
        .filter_map(|id| state.world.velocity(id).map(|v| (id, v)))
        .collect()
}

fn relative_speed(velocities: &BTreeMap<BodyId, Vec2>, a: BodyId, b: BodyId) -> f32 {
    let va = velocities.get(&a).copied().unwrap_or_default();
    let vb = velocities.get(&b).copied().unwrap_or_default();
    (va - vb).length()
}

fn handle_contacts<W: PhysicsWorld>(
    state: &mut GameState<W>,
    contacts: &[CollisionStart],
    velocities: &BTreeMap<BodyId, Vec2>,
) {
    for contact in contacts {
        // Stray contacts after the round is decided change nothing
        if state.outcome() != RoundOutcome::InProgress {
            return;
        }

        if let Some(projectile) = state.projectile {
            if state.phase == GamePhase::Resolving {
                if let Some(other) = contact.other(projectile.id) {
                    if state.targets.contains_key(&other)
                        && state
                            .rules
                            .damage
                            .qualifies(relative_speed(velocities, projectile.id, other))
                    {
                        damage_target(state, other);
                    }
                    continue;
                }
            }
        }

        for (shot_id, target_id) in [(contact.a, contact.b), (contact.b, contact.a)] {
            if !state.targets.contains_key(&target_id) {
                continue;
            }
            let Some(index) = state.shots.iter().position(|s| s.id == shot_id) else {
                continue;
            };
            // Bullets are spent on whatever crate they touch
            state.shots.remove(index);
            state.world.remove_body(shot_id);
            if state
                .rules
                .damage
                .qualifies(relative_speed(velocities, shot_id, target_id))
            {
                damage_target(state, target_id);
            }
            break;
        }
    }
}

fn damage_target<W: PhysicsWorld>(state: &mut GameState<W>, id: BodyId) {
    let Some(target) = state.targets.get_mut(&id) else {
        return;
    };
    target.health = target.health.saturating_sub(1);
    if target.health > 0 {
        let health = target.health;
        state.push_event(GameEvent::TargetHit { target: id, health });
        return;
    }

    let points = target.points;
    let position = state.world.position(id);
    state.targets.remove(&id);
    state.world.remove_body(id);
    state.score += points;
    state.push_event(GameEvent::TargetDestroyed { target: id, points });

    if state.rules.particle_burst {
        if let Some(position) = position {
            spawn_burst(state, position);
        }
    }

    if state.targets.is_empty() {
        win(state);
    }
}

fn win<W: PhysicsWorld>(state: &mut GameState<W>) {
    if state.phase == GamePhase::Won {
        return;
    }
    state.phase = GamePhase::Won;
    state.push_event(GameEvent::Won { score: state.score });
    log::info!("Level {} cleared with {} points", state.level, state.score);
}

fn spawn_burst<W: PhysicsWorld>(state: &mut GameState<W>, position: Vec2) {
    let expires_ms = state.time_ms + PARTICLE_LIFETIME_MS;
    for _ in 0..PARTICLE_COUNT {
        let angle = state.rng.random_range(0.0..std::f32::consts::TAU);
        let speed = state
            .rng
            .random_range(PARTICLE_MIN_SPEED..PARTICLE_MAX_SPEED);
        let desc = BodyDesc::dynamic(Shape::Circle { radius: PARTICLE_RADIUS }, position)
            .with_velocity(Vec2::from_angle(angle) * speed)
            .with_material(0.0, 0.0, 0.1)
            .as_sensor();
        let id = state.world.create_body(desc);
        state.particles.push(Particle { id, expires_ms });
    }
}

/// Re-arm a spent pumpkin, or end the round when the ammo is gone
fn update_reload<W: PhysicsWorld>(state: &mut GameState<W>) {
    let ReloadPolicy::Limited {
        rest_steps,
        bounds_margin,
    } = state.rules.reload
    else {
        return;
    };
    if state.phase != GamePhase::Resolving {
        return;
    }
    let Some(mut projectile) = state.projectile else {
        return;
    };
    let Some(position) = state.world.position(projectile.id) else {
        return;
    };

    let speed = state
        .world
        .velocity(projectile.id)
        .unwrap_or_default()
        .length();
    if speed < REST_SPEED {
        projectile.rest_steps += 1;
    } else {
        projectile.rest_steps = 0;
    }
    state.projectile = Some(projectile);

    let gone = !state.arena.bounds().expanded(bounds_margin).contains(position);
    if !gone && projectile.rest_steps <= rest_steps {
        return;
    }

    if state.shots_remaining().unwrap_or(0) > 0 {
        state.arm();
    } else if !state.targets.is_empty() {
        state.phase = GamePhase::Lost;
        state.push_event(GameEvent::Lost { score: state.score });
        log::info!(
            "Level {} lost with {} crates standing",
            state.level,
            state.targets.len()
        );
    }
}

/// Refresh the coyote window from what is under the player's feet
fn update_grounded<W: PhysicsWorld>(state: &mut GameState<W>) {
    let Some(mut player) = state.player else {
        return;
    };
    let Some(position) = state.world.position(player.id) else {
        return;
    };

    let half_width = PLAYER_WIDTH / 2.0 - 1.0;
    let feet = position.y + PLAYER_HEIGHT / 2.0;
    let feet_strip = Region::new(
        Vec2::new(position.x - half_width, feet),
        Vec2::new(position.x + half_width, feet + GROUND_CHECK_DEPTH),
    );

    let grounded = state.world.query_region(feet_strip).into_iter().any(|id| {
        id != player.id
            && !state.shots.iter().any(|s| s.id == id)
            && !state.particles.iter().any(|p| p.id == id)
            && (state.world.is_static(id) || state.world.is_resting(id))
    });

    player.coyote_steps = if grounded {
        COYOTE_STEPS
    } else {
        player.coyote_steps.saturating_sub(1)
    };
    state.player = Some(player);
}

fn expire_shots<W: PhysicsWorld>(state: &mut GameState<W>) {
    let ProjectileLifetime::Timed {
        lifetime_ms,
        bounds_margin,
    } = state.rules.lifetime
    else {
        return;
    };
    let bounds = state.arena.bounds().expanded(bounds_margin);
    let now = state.time_ms;
    let world = &mut state.world;

    state.shots.retain(|shot| {
        let alive = now - shot.spawned_ms < lifetime_ms
            && world.position(shot.id).is_some_and(|p| bounds.contains(p));
        if !alive {
            world.remove_body(shot.id);
        }
        alive
    });
}

fn expire_particles<W: PhysicsWorld>(state: &mut GameState<W>) {
    let now = state.time_ms;
    let world = &mut state.world;
    state.particles.retain(|particle| {
        let alive = now < particle.expires_ms;
        if !alive {
            world.remove_body(particle.id);
        }
        alive
    });
}
