use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use super::physics::{BodyHandle, BodyKind, ColliderDesc, ColliderHandle, ColliderShape, ContactEvent, PhysicsWorld};
use crate::config::{HitboxSizing, Tuning};
use crate::model::scene::ROOT_NAME;
use crate::model::{Interactable, InteractableId, InteractableKind, MeshKind, NodeId, SceneGraph, WindowSide};

/// What the load-time classification pass produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub walls: usize,
    pub furniture: usize,
    pub doors: usize,
    pub windows: usize,
    /// Meshes left without collider or interaction for lack of geometry.
    pub skipped: Vec<String>,
}

struct Hitboxes {
    door_closed: HitboxSizing,
    door_open: HitboxSizing,
    window_closed: HitboxSizing,
    window_open: HitboxSizing,
}

impl Hitboxes {
    fn sizing(&self, kind: InteractableKind, open: bool) -> HitboxSizing {
        match (kind, open) {
            (InteractableKind::Door, false) => self.door_closed,
            (InteractableKind::Door, true) => self.door_open,
            (InteractableKind::Window(_), false) => self.window_closed,
            (InteractableKind::Window(_), true) => self.window_open,
        }
    }
}

/// Doors and windows of the scene, their open state, proximity and sensors.
pub struct InteractableRegistry {
    items: BTreeMap<InteractableId, Interactable>,
    sensors: HashMap<InteractableId, (BodyHandle, ColliderHandle)>,
    by_collider: HashMap<ColliderHandle, InteractableId>,
    active_door: Option<InteractableId>,
    active_window: Option<InteractableId>,

    door_open_angle: f32,
    window_slide_distance: f32,
    hitboxes: Hitboxes,
}

impl InteractableRegistry {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            items: BTreeMap::new(),
            sensors: HashMap::new(),
            by_collider: HashMap::new(),
            active_door: None,
            active_window: None,
            door_open_angle: tuning.door_open_angle,
            window_slide_distance: tuning.window_slide_distance,
            hitboxes: Hitboxes {
                door_closed: tuning.door_closed_hitbox,
                door_open: tuning.door_open_hitbox,
                window_closed: tuning.window_closed_hitbox,
                window_open: tuning.window_open_hitbox,
            },
        }
    }

    /// Classify every mesh once, create its collider, and register doors and windows.
    pub fn load(scene: &SceneGraph, physics: &mut PhysicsWorld, tuning: &Tuning) -> (Self, LoadReport) {
        let mut registry = Self::new(tuning);
        let mut report = LoadReport::default();
        let structure_center = scene.bounds().map(|b| b.center()).unwrap_or(Vec3::ZERO);

        for node in scene.meshes() {
            let kind = MeshKind::classify(&node.name);
            let Some(bounds) = scene.world_aabb(node.id) else {
                tracing::warn!(mesh = %node.name, ?kind, "no bounding box, skipping collider");
                report.skipped.push(node.name.clone());
                continue;
            };

            match kind {
                MeshKind::Wall | MeshKind::Furniture => {
                    let body = physics.create_body(BodyKind::Fixed, bounds.center());
                    physics.attach_collider(body, ColliderDesc::cuboid(bounds.size() * 0.5));
                    if kind == MeshKind::Wall {
                        report.walls += 1;
                    } else {
                        report.furniture += 1;
                    }
                }
                MeshKind::Door | MeshKind::Window => {
                    let (interactable_kind, target) = if kind == MeshKind::Door {
                        report.doors += 1;
                        (InteractableKind::Door, door_pivot(scene, node.id))
                    } else {
                        report.windows += 1;
                        let side = WindowSide::from_name(&node.name)
                            .unwrap_or_else(|| WindowSide::from_position(bounds.center(), structure_center));
                        (InteractableKind::Window(side), node.id)
                    };

                    let id = InteractableId(registry.items.len() as u32);
                    let half = registry.hitboxes.sizing(interactable_kind, false).half_extents(bounds.size());
                    let body = physics.create_body(BodyKind::Fixed, bounds.center());
                    let collider = physics.attach_collider(body, ColliderDesc::cuboid(half).sensor());

                    registry.sensors.insert(id, (body, collider));
                    registry.by_collider.insert(collider, id);
                    registry.items.insert(
                        id,
                        Interactable {
                            id,
                            kind: interactable_kind,
                            name: node.name.clone(),
                            mesh: node.id,
                            target,
                            open: false,
                            in_proximity: false,
                            bounds,
                        },
                    );
                }
            }
        }

        tracing::info!(?report, "interactables loaded");
        (registry, report)
    }

    pub fn get(&self, id: InteractableId) -> Option<&Interactable> {
        self.items.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interactable> {
        self.items.values()
    }

    pub fn active_door(&self) -> Option<InteractableId> {
        self.active_door
    }

    pub fn active_window(&self) -> Option<InteractableId> {
        self.active_window
    }

    pub fn collider_of(&self, id: InteractableId) -> Option<ColliderHandle> {
        self.sensors.get(&id).map(|(_, c)| *c)
    }

    pub fn any_in_proximity(&self) -> bool {
        self.items.values().any(|i| i.in_proximity)
    }

    /// React to sensor enter/exit between the player and an interactable.
    pub fn handle_contact(&mut self, event: &ContactEvent) {
        let Some(&id) = self.by_collider.get(&event.other()) else { return };
        let Some(item) = self.items.get_mut(&id) else { return };
        let is_door = item.kind == InteractableKind::Door;

        match event {
            ContactEvent::Started { .. } => {
                item.in_proximity = true;
                tracing::debug!(name = %item.name, "entered interaction range");
                if is_door {
                    self.active_door = Some(id);
                } else {
                    self.active_window = Some(id);
                }
            }
            ContactEvent::Stopped { .. } => {
                item.in_proximity = false;
                tracing::debug!(name = %item.name, "left interaction range");
                let slot = if is_door { &mut self.active_door } else { &mut self.active_window };
                if *slot == Some(id) {
                    // hand over to another one of the same kind still in range
                    *slot = self
                        .items
                        .values()
                        .find(|i| i.in_proximity && (i.kind == InteractableKind::Door) == is_door)
                        .map(|i| i.id);
                }
            }
        }
    }

    /// Toggle the active interactable on a press. Doors win over windows.
    /// Returns the toggled interactable, if any.
    pub fn interact(&mut self, pressed: bool, scene: &mut SceneGraph, physics: &mut PhysicsWorld) -> Option<InteractableId> {
        if !pressed {
            return None;
        }
        let id = self.active_door.or(self.active_window)?;
        self.toggle(id, scene, physics);
        Some(id)
    }

    fn toggle(&mut self, id: InteractableId, scene: &mut SceneGraph, physics: &mut PhysicsWorld) {
        let Some(item) = self.items.get_mut(&id) else { return };
        item.open = !item.open;
        let Some(target) = scene.node_mut(item.target) else { return };

        match item.kind {
            InteractableKind::Door => {
                target.yaw = if item.open { self.door_open_angle } else { 0.0 };
            }
            InteractableKind::Window(side) => {
                let sense = if item.open { 1.0 } else { -1.0 };
                target.translation.x += side.open_direction() * sense * self.window_slide_distance;
            }
        }
        tracing::info!(name = %item.name, open = item.open, "toggled");

        self.refresh_sensor(id, scene, physics);
    }

    /// Re-fit the sensor to the mesh's current bounds and open state.
    fn refresh_sensor(&mut self, id: InteractableId, scene: &SceneGraph, physics: &mut PhysicsWorld) {
        let (Some(item), Some(&(body, collider))) = (self.items.get_mut(&id), self.sensors.get(&id)) else {
            return;
        };
        let Some(bounds) = scene.world_aabb(item.mesh) else { return };
        item.bounds = bounds;
        let half_extents = self.hitboxes.sizing(item.kind, item.open).half_extents(bounds.size());
        physics.set_translation(body, bounds.center());
        physics.set_collider_shape(collider, ColliderShape::Cuboid { half_extents });
    }
}

/// A door swings with its parent group (leaf plus handle). Doors hung
/// directly under the scene root rotate on their own.
fn door_pivot(scene: &SceneGraph, mesh: NodeId) -> NodeId {
    scene
        .node(mesh)
        .and_then(|n| n.parent)
        .filter(|p| scene.node(*p).is_some_and(|n| n.name != ROOT_NAME))
        .unwrap_or(mesh)
}
