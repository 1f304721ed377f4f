use std::collections::BTreeSet;

use glam::Vec3;

use crate::model::Aabb;

/// Gap within which a kinematic body counts as touching a solid it was stopped by.
const CONTACT_SKIN: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves.
    Fixed,
    /// Moved by game code through `move_kinematic`.
    Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: Vec3 },
    /// Vertical capsule; `half_height` excludes the caps.
    Capsule { half_height: f32, radius: f32 },
}

impl ColliderShape {
    pub fn aabb(&self, center: Vec3) -> Aabb {
        let half = match *self {
            ColliderShape::Cuboid { half_extents } => half_extents,
            ColliderShape::Capsule { half_height, radius } => Vec3::new(radius, half_height + radius, radius),
        };
        Aabb::from_center_half_extents(center, half)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColliderDesc {
    pub shape: ColliderShape,
    /// Offset from the body translation.
    pub offset: Vec3,
    /// Sensors report intersections and never block.
    pub sensor: bool,
}

impl ColliderDesc {
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self { shape: ColliderShape::Cuboid { half_extents }, offset: Vec3::ZERO, sensor: false }
    }

    pub fn capsule(half_height: f32, radius: f32) -> Self {
        Self { shape: ColliderShape::Capsule { half_height, radius }, offset: Vec3::ZERO, sensor: false }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// Contact changes between a kinematic body's collider and anything else.
/// `sensor` pairs are intersections, the others are collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Started { kinematic: ColliderHandle, other: ColliderHandle, sensor: bool },
    Stopped { kinematic: ColliderHandle, other: ColliderHandle, sensor: bool },
}

impl ContactEvent {
    pub fn other(&self) -> ColliderHandle {
        match *self {
            ContactEvent::Started { other, .. } | ContactEvent::Stopped { other, .. } => other,
        }
    }
}

struct RigidBody {
    kind: BodyKind,
    translation: Vec3,
}

struct Collider {
    body: BodyHandle,
    desc: ColliderDesc,
}

/// Minimal rigid-body world: fixed and kinematic bodies with box/capsule
/// colliders, axis-separated blocking against solids, and enter/exit events.
#[derive(Default)]
pub struct PhysicsWorld {
    bodies: Vec<RigidBody>,
    colliders: Vec<Collider>,
    contacts: BTreeSet<(ColliderHandle, ColliderHandle, bool)>,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_body(&mut self, kind: BodyKind, translation: Vec3) -> BodyHandle {
        self.bodies.push(RigidBody { kind, translation });
        BodyHandle(self.bodies.len() as u32 - 1)
    }

    pub fn attach_collider(&mut self, body: BodyHandle, desc: ColliderDesc) -> ColliderHandle {
        self.colliders.push(Collider { body, desc });
        ColliderHandle(self.colliders.len() as u32 - 1)
    }

    pub fn translation(&self, body: BodyHandle) -> Option<Vec3> {
        self.bodies.get(body.0 as usize).map(|b| b.translation)
    }

    /// Teleport a body, ignoring solids.
    pub fn set_translation(&mut self, body: BodyHandle, translation: Vec3) {
        if let Some(b) = self.bodies.get_mut(body.0 as usize) {
            b.translation = translation;
        }
    }

    pub fn set_collider_shape(&mut self, collider: ColliderHandle, shape: ColliderShape) {
        if let Some(c) = self.colliders.get_mut(collider.0 as usize) {
            c.desc.shape = shape;
        }
    }

    pub fn collider_aabb(&self, collider: ColliderHandle) -> Option<Aabb> {
        let c = self.colliders.get(collider.0 as usize)?;
        let body = self.bodies.get(c.body.0 as usize)?;
        Some(c.desc.shape.aabb(body.translation + c.desc.offset))
    }

    fn colliders_of(&self, body: BodyHandle) -> impl Iterator<Item = ColliderHandle> + '_ {
        self.colliders
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.body == body)
            .map(|(i, _)| ColliderHandle(i as u32))
    }

    fn aabbs_at(&self, body: BodyHandle, translation: Vec3) -> Vec<Aabb> {
        self.colliders
            .iter()
            .filter(|c| c.body == body && !c.desc.sensor)
            .map(|c| c.desc.shape.aabb(translation + c.desc.offset))
            .collect()
    }

    fn solids_except(&self, body: BodyHandle) -> impl Iterator<Item = Aabb> + '_ {
        self.colliders
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.body != body && !c.desc.sensor)
            .filter_map(|(i, _)| self.collider_aabb(ColliderHandle(i as u32)))
    }

    /// True if `body` placed at `to` overlaps a solid it did not already overlap at `from`.
    fn blocked(&self, body: BodyHandle, from: Vec3, to: Vec3) -> bool {
        let now = self.aabbs_at(body, from);
        let next = self.aabbs_at(body, to);
        self.solids_except(body).any(|solid| {
            next.iter().any(|a| a.overlaps(&solid)) && !now.iter().any(|a| a.overlaps(&solid))
        })
    }

    /// Move a kinematic body toward `desired`, resolving X and Z separately so
    /// it slides along solids. Y is taken from `desired` unchanged.
    /// Returns the resulting translation.
    pub fn move_kinematic(&mut self, body: BodyHandle, desired: Vec3) -> Option<Vec3> {
        let current = self.bodies.get(body.0 as usize)?;
        if current.kind != BodyKind::Kinematic {
            return Some(current.translation);
        }
        let mut pos = Vec3::new(current.translation.x, desired.y, current.translation.z);

        let x_next = Vec3::new(desired.x, pos.y, pos.z);
        if !self.blocked(body, pos, x_next) {
            pos = x_next;
        }
        let z_next = Vec3::new(pos.x, pos.y, desired.z);
        if !self.blocked(body, pos, z_next) {
            pos = z_next;
        }

        self.set_translation(body, pos);
        Some(pos)
    }

    /// Recompute contacts of kinematic bodies and report what changed since the last step.
    pub fn step(&mut self) -> Vec<ContactEvent> {
        let mut current = BTreeSet::new();

        for (b, body) in self.bodies.iter().enumerate() {
            if body.kind != BodyKind::Kinematic {
                continue;
            }
            let handle = BodyHandle(b as u32);
            for mine in self.colliders_of(handle) {
                let Some(my_aabb) = self.collider_aabb(mine) else { continue };
                let skinned = Aabb { min: my_aabb.min - Vec3::splat(CONTACT_SKIN), max: my_aabb.max + Vec3::splat(CONTACT_SKIN) };
                for (o, other) in self.colliders.iter().enumerate() {
                    if other.body == handle {
                        continue;
                    }
                    let other_handle = ColliderHandle(o as u32);
                    let Some(other_aabb) = self.collider_aabb(other_handle) else { continue };
                    let sensor = other.desc.sensor;
                    let touching = if sensor { my_aabb.overlaps(&other_aabb) } else { skinned.overlaps(&other_aabb) };
                    if touching {
                        current.insert((mine, other_handle, sensor));
                    }
                }
            }
        }

        let mut events = Vec::new();
        for &(kinematic, other, sensor) in self.contacts.difference(&current) {
            events.push(ContactEvent::Stopped { kinematic, other, sensor });
        }
        for &(kinematic, other, sensor) in current.difference(&self.contacts) {
            events.push(ContactEvent::Started { kinematic, other, sensor });
        }
        for event in &events {
            tracing::debug!(?event, "contact");
        }
        self.contacts = current;
        events
    }
}
