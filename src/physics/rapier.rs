//! [`PhysicsWorld`] backed by rapier2d
//!
//! World units (pixels, y down) are scaled to meters on the way in so the
//! solver's tolerances stay in their comfortable range.

use std::collections::BTreeMap;

use glam::Vec2;
use rapier2d::crossbeam::channel::{Receiver, unbounded};
use rapier2d::prelude::*;

use super::{BodyDesc, BodyId, BodyKind, CollisionStart, PhysicsWorld, Region, Shape};
use crate::consts::{GRAVITY, REST_SPEED, UNITS_PER_METER};

#[inline]
fn to_meters(v: Vec2) -> Vector<Real> {
    vector![v.x / UNITS_PER_METER, v.y / UNITS_PER_METER]
}

#[inline]
fn to_units(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x * UNITS_PER_METER, v.y * UNITS_PER_METER)
}

struct Entry {
    body: RigidBodyHandle,
}

pub struct RapierWorld {
    gravity: Vec2,
    physics_pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
    entries: BTreeMap<BodyId, Entry>,
    /// Never reset, so ids from a cleared world stay dead
    next_id: u32,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new(Vec2::new(0.0, GRAVITY))
    }
}

impl RapierWorld {
    /// Create an empty world with gravity in world units per second squared
    pub fn new(gravity: Vec2) -> Self {
        let (collision_send, collision_recv) = unbounded();
        let (contact_force_send, contact_force_recv) = unbounded();
        let event_handler = ChannelEventCollector::new(collision_send, contact_force_send);
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = crate::consts::SIM_DT;

        Self {
            gravity,
            physics_pipeline: PhysicsPipeline::new(),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collision_recv,
            contact_force_recv,
            event_handler,
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    fn rigid_body(&self, id: BodyId) -> Option<&RigidBody> {
        let entry = self.entries.get(&id)?;
        self.rigid_bodies.get(entry.body)
    }

    fn rigid_body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        let entry = self.entries.get(&id)?;
        self.rigid_bodies.get_mut(entry.body)
    }

    fn body_id_for(&self, collider: ColliderHandle) -> Option<BodyId> {
        self.colliders
            .get(collider)
            .map(|c| BodyId(c.user_data as u32))
            .filter(|id| self.entries.contains_key(id))
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;

        let translation = to_meters(desc.position);
        let mut builder = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .linvel(to_meters(desc.velocity))
                .gravity_scale(desc.gravity_scale),
        }
        .translation(translation);
        if desc.lock_rotation {
            builder = builder.lock_rotations();
        }

        let collider = match desc.shape {
            Shape::Circle { radius } => {
                if desc.kind == BodyKind::Dynamic {
                    builder = builder.ccd_enabled(true);
                }
                ColliderBuilder::ball(radius / UNITS_PER_METER)
            }
            Shape::Rect { half_extents } => ColliderBuilder::cuboid(
                half_extents.x / UNITS_PER_METER,
                half_extents.y / UNITS_PER_METER,
            ),
        }
        .restitution(desc.restitution)
        .friction(desc.friction)
        .density(desc.density)
        .sensor(desc.sensor)
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .user_data(id.0 as u128)
        .build();

        let body = self.rigid_bodies.insert(builder.build());
        self.colliders
            .insert_with_parent(collider, body, &mut self.rigid_bodies);
        self.entries.insert(id, Entry { body });
        id
    }

    fn remove_body(&mut self, id: BodyId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        self.rigid_bodies
            .remove(
                entry.body,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn position(&self, id: BodyId) -> Option<Vec2> {
        self.rigid_body(id).map(|b| to_units(b.translation()))
    }

    fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.rigid_body(id).map(|b| to_units(b.linvel()))
    }

    fn set_position(&mut self, id: BodyId, position: Vec2) {
        if let Some(body) = self.rigid_body_mut(id) {
            body.set_translation(to_meters(position), true);
        }
    }

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.rigid_body_mut(id) {
            body.set_linvel(to_meters(velocity), true);
        }
    }

    fn is_static(&self, id: BodyId) -> bool {
        self.rigid_body(id).is_some_and(|b| b.is_fixed())
    }

    fn is_resting(&self, id: BodyId) -> bool {
        self.rigid_body(id).is_some_and(|b| {
            b.is_dynamic() && (b.is_sleeping() || to_units(b.linvel()).length() < REST_SPEED)
        })
    }

    fn query_region(&self, region: Region) -> Vec<BodyId> {
        let mut hits = Vec::new();
        for (_, collider) in self.colliders.iter() {
            let aabb = collider.compute_aabb();
            let bounds = Region::new(
                Vec2::new(aabb.mins.x, aabb.mins.y) * UNITS_PER_METER,
                Vec2::new(aabb.maxs.x, aabb.maxs.y) * UNITS_PER_METER,
            );
            if bounds.intersects(&region) {
                let id = BodyId(collider.user_data as u32);
                if self.entries.contains_key(&id) {
                    hits.push(id);
                }
            }
        }
        hits.sort();
        hits
    }

    fn clear(&mut self) {
        let next_id = self.next_id;
        *self = Self::new(self.gravity);
        self.next_id = next_id;
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionStart> {
        self.integration_parameters.dt = dt;
        let gravity = to_meters(self.gravity);

        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.event_handler,
        );

        let mut started = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            if let CollisionEvent::Started(c1, c2, _) = event {
                if let (Some(a), Some(b)) = (self.body_id_for(c1), self.body_id_for(c2)) {
                    started.push(CollisionStart { a, b });
                }
            }
        }
        // Contact forces are not used by the rules
        while self.contact_force_recv.try_recv().is_ok() {}

        started
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn floor(world: &mut RapierWorld) -> BodyId {
        world.create_body(BodyDesc::fixed(Shape::rect(1000.0, 40.0), Vec2::new(500.0, 520.0)))
    }

    #[test]
    fn test_falling_ball_hits_floor() {
        let mut world = RapierWorld::default();
        let floor = floor(&mut world);
        let ball = world.create_body(BodyDesc::dynamic(
            Shape::Circle { radius: 10.0 },
            Vec2::new(500.0, 400.0),
        ));

        let mut touched = false;
        for _ in 0..120 {
            for contact in world.step(SIM_DT) {
                if contact.other(ball) == Some(floor) {
                    touched = true;
                }
            }
        }

        assert!(touched, "Ball should land on the floor");
        let y = world.position(ball).unwrap().y;
        assert!(y > 400.0 && y < 510.0, "Ball should rest on the floor, y = {}", y);
        assert!(world.is_static(floor));
        assert!(!world.is_static(ball));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut world = RapierWorld::default();
        let floor = floor(&mut world);
        assert_eq!(world.body_count(), 1);

        assert!(world.remove_body(floor));
        assert!(!world.remove_body(floor));
        assert!(world.position(floor).is_none());

        let a = world.create_body(BodyDesc::fixed(Shape::rect(10.0, 10.0), Vec2::ZERO));
        world.clear();
        assert_eq!(world.body_count(), 0);
        assert!(world.position(a).is_none());

        let b = world.create_body(BodyDesc::fixed(Shape::rect(10.0, 10.0), Vec2::ZERO));
        assert_ne!(a, b, "Ids must not be reused after clear");
    }

    #[test]
    fn test_query_region_and_velocity() {
        let mut world = RapierWorld::new(Vec2::ZERO);
        let crate_id = world.create_body(BodyDesc::dynamic(
            Shape::rect(36.0, 28.0),
            Vec2::new(100.0, 100.0),
        ));

        let hits = world.query_region(Region::around(Vec2::new(100.0, 100.0), Vec2::splat(5.0)));
        assert_eq!(hits, vec![crate_id]);
        assert!(world
            .query_region(Region::around(Vec2::new(300.0, 300.0), Vec2::splat(5.0)))
            .is_empty());

        world.set_velocity(crate_id, Vec2::new(120.0, 0.0));
        let vel = world.velocity(crate_id).unwrap();
        assert!((vel.x - 120.0).abs() < 0.01);
        assert!(!world.is_resting(crate_id));
    }
}
