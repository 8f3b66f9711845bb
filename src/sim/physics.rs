//! Physics world
//!
//! `PhysicsWorld` is everything the germ simulation needs from a rigid-body
//! engine. `Space` implements it with circles and axis-aligned boxes,
//! gravity, and iterative overlap resolution:
//! - Fixed timestep only
//! - Bodies don't rotate
//! - Stable iteration order (by handle)

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionResult, circle_box_collision, circle_circle_collision, sd_box, sd_circle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeHandle(pub u64);

/// Collision geometry, centred on its body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

impl Geometry {
    /// Signed distance from `p` to this geometry placed at `center`
    pub fn signed_distance(&self, p: Vec2, center: Vec2) -> f32 {
        match *self {
            Geometry::Circle { radius } => sd_circle(p, center, radius),
            Geometry::Rect { half_extents } => sd_box(p, center, half_extents),
        }
    }
}

/// Rigid-body engine consumed by the simulation
pub trait PhysicsWorld {
    /// Immovable body (walls)
    fn add_static_body(&mut self, pos: Vec2) -> BodyHandle;
    /// Body moved by gravity and contacts
    fn add_dynamic_body(&mut self, pos: Vec2, mass: f32) -> BodyHandle;
    /// Remove a body and any shapes still attached. False if unknown.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// None if the body doesn't exist
    fn add_circle_shape(&mut self, body: BodyHandle, radius: f32) -> Option<ShapeHandle>;
    /// None if the body doesn't exist
    fn add_box_shape(&mut self, body: BodyHandle, width: f32, height: f32) -> Option<ShapeHandle>;
    fn remove_shape(&mut self, shape: ShapeHandle) -> bool;

    /// Stash caller data on a shape. False if the shape doesn't exist.
    fn set_user_data(&mut self, shape: ShapeHandle, data: u32) -> bool;
    fn user_data(&self, shape: ShapeHandle) -> Option<u32>;

    fn body_position(&self, body: BodyHandle) -> Option<Vec2>;
    fn shape_geometry(&self, shape: ShapeHandle) -> Option<Geometry>;

    /// Integrate forces and resolve contacts over `dt` seconds
    fn step(&mut self, dt: f32);

    /// The shape containing `point` whose surface is furthest from it
    fn point_query(&self, point: Vec2) -> Option<ShapeHandle>;
}

#[derive(Debug, Clone, Copy)]
struct Body {
    pos: Vec2,
    vel: Vec2,
    /// 0 for static bodies
    inv_mass: f32,
}

impl Body {
    #[inline]
    fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }
}

#[derive(Debug, Clone)]
struct Shape {
    body: BodyHandle,
    geometry: Geometry,
    user_data: Option<u32>,
}

/// Contact between two shapes; the normal points toward the first
fn shape_contact(pos_a: Vec2, geom_a: Geometry, pos_b: Vec2, geom_b: Geometry) -> CollisionResult {
    match (geom_a, geom_b) {
        (Geometry::Circle { radius: ra }, Geometry::Circle { radius: rb }) => {
            circle_circle_collision(pos_a, ra, pos_b, rb)
        }
        (Geometry::Circle { radius }, Geometry::Rect { half_extents }) => {
            circle_box_collision(pos_a, radius, pos_b, half_extents)
        }
        (Geometry::Rect { half_extents }, Geometry::Circle { radius }) => {
            circle_box_collision(pos_b, radius, pos_a, half_extents).flipped()
        }
        // Boxes are only used for static walls
        (Geometry::Rect { .. }, Geometry::Rect { .. }) => CollisionResult::miss(),
    }
}

/// Built-in 2D world
#[derive(Debug, Clone)]
pub struct Space {
    /// Acceleration applied to dynamic bodies (pixels/s²)
    pub gravity: Vec2,
    /// Contact resolution passes per step
    pub iterations: u32,
    /// Bounciness of contacts (0 = none)
    pub restitution: f32,
    bodies: BTreeMap<BodyHandle, Body>,
    shapes: BTreeMap<ShapeHandle, Shape>,
    /// Handles are never reused; u64 can't run out in any real session
    next_id: u64,
}

impl Default for Space {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 10)
    }
}

impl Space {
    pub fn new(gravity: Vec2, iterations: u32) -> Self {
        Self {
            gravity,
            iterations,
            restitution: 0.0,
            bodies: BTreeMap::new(),
            shapes: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_body(&mut self, pos: Vec2, inv_mass: f32) -> BodyHandle {
        let handle = BodyHandle(self.next_handle());
        self.bodies.insert(
            handle,
            Body {
                pos,
                vel: Vec2::ZERO,
                inv_mass,
            },
        );
        handle
    }

    fn insert_shape(&mut self, body: BodyHandle, geometry: Geometry) -> Option<ShapeHandle> {
        if !self.bodies.contains_key(&body) {
            return None;
        }
        let handle = ShapeHandle(self.next_handle());
        self.shapes.insert(
            handle,
            Shape {
                body,
                geometry,
                user_data: None,
            },
        );
        Some(handle)
    }

    pub fn body_velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.vel)
    }

    pub fn set_body_velocity(&mut self, body: BodyHandle, vel: Vec2) -> bool {
        match self.bodies.get_mut(&body) {
            Some(b) if b.is_dynamic() => {
                b.vel = vel;
                true
            }
            _ => false,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// One pass over every shape pair. Returns true if anything overlapped.
    fn resolve_contacts(&mut self) -> bool {
        let shapes: Vec<(BodyHandle, Geometry)> =
            self.shapes.values().map(|s| (s.body, s.geometry)).collect();
        let mut touched = false;

        for i in 0..shapes.len() {
            for j in (i + 1)..shapes.len() {
                let (handle_a, geom_a) = shapes[i];
                let (handle_b, geom_b) = shapes[j];
                if handle_a == handle_b {
                    continue;
                }
                let (Some(&a), Some(&b)) = (self.bodies.get(&handle_a), self.bodies.get(&handle_b))
                else {
                    continue;
                };
                let total_inv = a.inv_mass + b.inv_mass;
                if total_inv == 0.0 {
                    continue;
                }

                let contact = shape_contact(a.pos, geom_a, b.pos, geom_b);
                if !contact.hit {
                    continue;
                }
                touched = true;

                let n = contact.normal;
                let correction = n * (contact.penetration / total_inv);
                let approach = (a.vel - b.vel).dot(n);
                let impulse = if approach < 0.0 {
                    -(1.0 + self.restitution) * approach / total_inv
                } else {
                    0.0
                };

                if let Some(body) = self.bodies.get_mut(&handle_a) {
                    body.pos += correction * a.inv_mass;
                    body.vel += n * impulse * a.inv_mass;
                }
                if let Some(body) = self.bodies.get_mut(&handle_b) {
                    body.pos -= correction * b.inv_mass;
                    body.vel -= n * impulse * b.inv_mass;
                }
            }
        }

        touched
    }
}

impl PhysicsWorld for Space {
    fn add_static_body(&mut self, pos: Vec2) -> BodyHandle {
        self.insert_body(pos, 0.0)
    }

    fn add_dynamic_body(&mut self, pos: Vec2, mass: f32) -> BodyHandle {
        let inv_mass = if mass > 0.0 { 1.0 / mass } else { 1.0 };
        self.insert_body(pos, inv_mass)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        if self.bodies.remove(&body).is_none() {
            return false;
        }
        self.shapes.retain(|_, s| s.body != body);
        true
    }

    fn add_circle_shape(&mut self, body: BodyHandle, radius: f32) -> Option<ShapeHandle> {
        self.insert_shape(body, Geometry::Circle { radius })
    }

    fn add_box_shape(&mut self, body: BodyHandle, width: f32, height: f32) -> Option<ShapeHandle> {
        self.insert_shape(
            body,
            Geometry::Rect {
                half_extents: Vec2::new(width, height) / 2.0,
            },
        )
    }

    fn remove_shape(&mut self, shape: ShapeHandle) -> bool {
        self.shapes.remove(&shape).is_some()
    }

    fn set_user_data(&mut self, shape: ShapeHandle, data: u32) -> bool {
        match self.shapes.get_mut(&shape) {
            Some(s) => {
                s.user_data = Some(data);
                true
            }
            None => false,
        }
    }

    fn user_data(&self, shape: ShapeHandle) -> Option<u32> {
        self.shapes.get(&shape).and_then(|s| s.user_data)
    }

    fn body_position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&body).map(|b| b.pos)
    }

    fn shape_geometry(&self, shape: ShapeHandle) -> Option<Geometry> {
        self.shapes.get(&shape).map(|s| s.geometry)
    }

    fn step(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            body.vel += gravity * dt;
            body.pos += body.vel * dt;
        }

        for _ in 0..self.iterations {
            if !self.resolve_contacts() {
                break;
            }
        }
    }

    fn point_query(&self, point: Vec2) -> Option<ShapeHandle> {
        self.shapes
            .iter()
            .filter_map(|(&handle, shape)| {
                let center = self.bodies.get(&shape.body)?.pos;
                let distance = shape.geometry.signed_distance(point, center);
                (distance <= 0.0).then_some((handle, distance))
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(handle, _)| handle)
    }
}
