//! Rigid-body engine abstraction
//!
//! Gameplay code only talks to [`PhysicsWorld`]. Integration, broad/narrow
//! phase and constraint solving are the backend's job; the rules layer only
//! creates/removes bodies, nudges positions and velocities, asks what sits in
//! a region and reacts to the collision-start events returned by each step.

pub mod rapier;
#[cfg(test)]
pub(crate) mod testing;

pub use rapier::RapierWorld;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque body identifier handed out by a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves (floor, walls, sling base)
    Static,
    /// Fully simulated
    Dynamic,
}

/// Collision shape, sized in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

impl Shape {
    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            half_extents: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    /// Half size of the shape's axis-aligned bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Circle { radius } => Vec2::splat(radius),
            Shape::Rect { half_extents } => half_extents,
        }
    }
}

/// Everything needed to spawn a body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    /// 0.0 disables gravity for this body
    pub gravity_scale: f32,
    /// Sensors report overlaps but never push anything
    pub sensor: bool,
    pub lock_rotation: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, shape: Shape, position: Vec2) -> Self {
        Self {
            kind,
            shape,
            position,
            velocity: Vec2::ZERO,
            restitution: 0.1,
            friction: 0.6,
            density: 1.0,
            gravity_scale: 1.0,
            sensor: false,
            lock_rotation: false,
        }
    }

    pub fn fixed(shape: Shape, position: Vec2) -> Self {
        Self::new(BodyKind::Static, shape, position)
    }

    pub fn dynamic(shape: Shape, position: Vec2) -> Self {
        Self::new(BodyKind::Dynamic, shape, position)
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_material(mut self, restitution: f32, friction: f32, density: f32) -> Self {
        self.restitution = restitution;
        self.friction = friction;
        self.density = density;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn as_sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    pub fn with_locked_rotation(mut self) -> Self {
        self.lock_rotation = true;
        self
    }
}

/// Axis-aligned rectangle in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min: Vec2,
    pub max: Vec2,
}

impl Region {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn around(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Grow the region by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Two bodies started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionStart {
    pub a: BodyId,
    pub b: BodyId,
}

impl CollisionStart {
    /// The other body of the pair, if `id` is part of it
    pub fn other(&self, id: BodyId) -> Option<BodyId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Minimal rigid-body engine surface the gameplay rules are written against.
///
/// Lookups on removed bodies return `None`/`false` and setters on them are
/// ignored.
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyId;
    /// Returns false when the body was already gone
    fn remove_body(&mut self, id: BodyId) -> bool;
    fn position(&self, id: BodyId) -> Option<Vec2>;
    fn velocity(&self, id: BodyId) -> Option<Vec2>;
    fn set_position(&mut self, id: BodyId, position: Vec2);
    fn set_velocity(&mut self, id: BodyId, velocity: Vec2);
    fn is_static(&self, id: BodyId) -> bool;
    /// Dynamic body that has come to rest
    fn is_resting(&self, id: BodyId) -> bool;
    /// Bodies whose bounding box intersects `region`
    fn query_region(&self, region: Region) -> Vec<BodyId>;
    /// Remove every body
    fn clear(&mut self);
    /// Advance by `dt` seconds, returning the contacts that began this step
    fn step(&mut self, dt: f32) -> Vec<CollisionStart>;
}
