//! Deterministic physics double for rule tests
//!
//! Bodies move in straight lines with no gravity or collision response; contacts only happen
//! when a test injects them with [`TestWorld::inject_collision`].

use std::collections::BTreeMap;

use glam::Vec2;

use super::{BodyDesc, BodyId, BodyKind, CollisionStart, PhysicsWorld, Region};
use crate::consts::REST_SPEED;

#[derive(Debug, Clone)]
pub struct TestBody {
    pub desc: BodyDesc,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Default)]
pub struct TestWorld {
    pub bodies: BTreeMap<BodyId, TestBody>,
    pending: Vec<CollisionStart>,
    next_id: u32,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Queue a contact to be reported by the next step
    pub fn inject_collision(&mut self, a: BodyId, b: BodyId) {
        self.pending.push(CollisionStart { a, b });
    }
}

impl PhysicsWorld for TestWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.bodies.insert(
            id,
            TestBody {
                desc,
                position: desc.position,
                velocity: desc.velocity,
            },
        );
        id
    }

    fn remove_body(&mut self, id: BodyId) -> bool {
        self.bodies.remove(&id).is_some()
    }

    fn position(&self, id: BodyId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.position)
    }

    fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.bodies.get(&id).map(|b| b.velocity)
    }

    fn set_position(&mut self, id: BodyId, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position = position;
        }
    }

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.velocity = velocity;
        }
    }

    fn is_static(&self, id: BodyId) -> bool {
        self.bodies
            .get(&id)
            .is_some_and(|b| b.desc.kind == BodyKind::Static)
    }

    fn is_resting(&self, id: BodyId) -> bool {
        self.bodies
            .get(&id)
            .is_some_and(|b| b.desc.kind == BodyKind::Dynamic && b.velocity.length() < REST_SPEED)
    }

    fn query_region(&self, region: Region) -> Vec<BodyId> {
        self.bodies
            .iter()
            .filter(|(_, b)| {
                Region::around(b.position, b.desc.shape.half_extents()).intersects(&region)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.pending.clear();
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionStart> {
        for body in self.bodies.values_mut() {
            if body.desc.kind == BodyKind::Dynamic {
                body.position += body.velocity * dt;
            }
        }
        let bodies = &self.bodies;
        self.pending
            .drain(..)
            .filter(|c| bodies.contains_key(&c.a) && bodies.contains_key(&c.b))
            .collect()
    }
}
