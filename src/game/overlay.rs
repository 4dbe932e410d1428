//! Body Overlay
//!
//! Optional cosmetic layer that follows actors with a soft body. It is fed
//! authoritative positions once per tick and never feeds anything back, so
//! it may use floating point freely.

use std::collections::BTreeMap;

use crate::game::movement::ActorId;

/// Cosmetic body simulation attached to the world.
pub trait BodyOverlay {
    /// Start following an actor at a position.
    fn attach(&mut self, id: ActorId, pos: (f32, f32));

    /// Stop following an actor.
    fn detach(&mut self, id: ActorId);

    /// Authoritative position (plus cosmetic offsets) for this tick.
    fn set_target(&mut self, id: ActorId, target: (f32, f32));

    /// Advance by one tick.
    fn step(&mut self);

    /// Current body position.
    fn position(&self, id: ActorId) -> Option<(f32, f32)>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Body {
    pos: (f32, f32),
    vel: (f32, f32),
    target: (f32, f32),
}

/// Damped spring towards the target.
#[derive(Clone, Debug)]
pub struct SpringOverlay {
    bodies: BTreeMap<ActorId, Body>,
    stiffness: f32,
    damping: f32,
}

impl Default for SpringOverlay {
    fn default() -> Self {
        Self::new(0.3, 0.6)
    }
}

impl SpringOverlay {
    /// `stiffness` pulls towards the target, `damping` keeps that much of the velocity each tick.
    pub fn new(stiffness: f32, damping: f32) -> Self {
        Self {
            bodies: BTreeMap::new(),
            stiffness: stiffness.clamp(0.0, 1.0),
            damping: damping.clamp(0.0, 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl BodyOverlay for SpringOverlay {
    fn attach(&mut self, id: ActorId, pos: (f32, f32)) {
        self.bodies.insert(id, Body { pos, vel: (0.0, 0.0), target: pos });
    }

    fn detach(&mut self, id: ActorId) {
        self.bodies.remove(&id);
    }

    fn set_target(&mut self, id: ActorId, target: (f32, f32)) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.target = target;
        }
    }

    fn step(&mut self) {
        for body in self.bodies.values_mut() {
            let dx = body.target.0 - body.pos.0;
            let dy = body.target.1 - body.pos.1;
            body.vel.0 = body.vel.0 * self.damping + dx * self.stiffness;
            body.vel.1 = body.vel.1 * self.damping + dy * self.stiffness;
            body.pos.0 += body.vel.0;
            body.pos.1 += body.vel.1;
        }
    }

    fn position(&self, id: ActorId) -> Option<(f32, f32)> {
        self.bodies.get(&id).map(|body| body.pos)
    }
}
