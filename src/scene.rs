//! Entity hierarchy consumed by the physics world
//!
//! Just enough of a scene graph for physics: an arena of entities with
//! parent/child links, local transforms composed into global ones, and a list
//! of contact listeners per entity. Entities are never removed, so handles
//! stay valid for the lifetime of the scene.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::rotate;
use crate::sim::{ColliderId, ContactContext, ContactEvent, ContactListener};

/// Handle to an entity in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Local transform of an entity, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Radians, counter-clockwise
    pub rotation: f32,
    pub scale: Vec2,
    /// Static transforms never move and are excluded from dynamic registries
    pub is_static: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            is_static: false,
        }
    }
}

impl Transform {
    /// Movable transform at `position`
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Static (immovable) transform at `position`
    pub fn fixed(position: Vec2) -> Self {
        Self {
            position,
            is_static: true,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Map a point from this transform's local space into its parent's space
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        self.position + rotate(p * self.scale, self.rotation)
    }
}

/// World-space transform, the composition of an entity's ancestor chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub is_static: bool,
}

impl GlobalTransform {
    const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
        is_static: false,
    };

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        self.position + rotate(p * self.scale, self.rotation)
    }

    /// Inverse of [`Self::transform_point`] for directions (no translation)
    fn inverse_transform_vector(&self, v: Vec2) -> Vec2 {
        rotate(v, -self.rotation) / self.scale
    }

    fn then(&self, local: &Transform) -> Self {
        Self {
            position: self.transform_point(local.position),
            rotation: self.rotation + local.rotation,
            scale: self.scale * local.scale,
            // A static ancestor pins its whole sub-tree
            is_static: self.is_static || local.is_static,
        }
    }
}

struct Node {
    name: String,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    transform: Transform,
    listeners: Vec<Box<dyn ContactListener>>,
}

/// Arena-backed entity hierarchy
#[derive(Default)]
pub struct Scene {
    nodes: Vec<Node>,
    /// Bumped on every reparent so cached ancestor lookups can be invalidated
    hierarchy_version: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a root entity
    pub fn spawn(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        let id = EntityId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform,
            listeners: Vec::new(),
        });
        id
    }

    /// Spawn an entity under `parent`
    pub fn spawn_child(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
        transform: Transform,
    ) -> Result<EntityId> {
        self.node(parent)?;
        let id = self.spawn(name, transform);
        self.nodes[id.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(id);
        self.hierarchy_version += 1;
        Ok(id)
    }

    /// Move `child` under `parent` (or to the root with `None`)
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<()> {
        self.node(child)?;
        if let Some(parent) = parent {
            self.node(parent)?;
            if self.ancestors(parent).any(|a| a == child) {
                return Err(PhysicsError::HierarchyCycle { child, parent });
            }
        }

        if let Some(old) = self.nodes[child.index()].parent.take() {
            self.nodes[old.index()].children.retain(|&c| c != child);
        }
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(child);
        }
        self.nodes[child.index()].parent = parent;
        self.hierarchy_version += 1;
        log::debug!("Reparented {:?} under {:?}", child, parent);
        Ok(())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_str())
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(id.index())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// `id` followed by its parent, grandparent, ... up to the root
    pub fn ancestors(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        let start = self.contains(id).then_some(id);
        std::iter::successors(start, move |&e| self.parent(e))
    }

    pub fn hierarchy_version(&self) -> u64 {
        self.hierarchy_version
    }

    pub fn transform(&self, id: EntityId) -> Option<&Transform> {
        self.nodes.get(id.index()).map(|n| &n.transform)
    }

    /// Compose local transforms from the root down to `id`
    pub fn global_transform(&self, id: EntityId) -> GlobalTransform {
        let chain: Vec<EntityId> = self.ancestors(id).collect();
        chain
            .iter()
            .rev()
            .fold(GlobalTransform::IDENTITY, |acc, e| {
                acc.then(&self.nodes[e.index()].transform)
            })
    }

    /// Static when the entity or any ancestor is flagged static
    pub fn is_static(&self, id: EntityId) -> bool {
        self.ancestors(id).any(|e| self.nodes[e.index()].transform.is_static)
    }

    /// Replace the local position of a movable entity
    pub fn set_position(&mut self, id: EntityId, position: Vec2) -> Result<()> {
        if self.is_static(id) {
            return Err(PhysicsError::StaticTransform(id));
        }
        self.node_mut(id)?.transform.position = position;
        Ok(())
    }

    /// Replace the local scale of an entity (static ones included)
    pub fn set_scale(&mut self, id: EntityId, scale: Vec2) -> Result<()> {
        self.node_mut(id)?.transform.scale = scale;
        Ok(())
    }

    /// Move an entity by a world-space offset
    pub fn translate(&mut self, id: EntityId, world_delta: Vec2) -> Result<()> {
        let local_delta = match self.parent(id) {
            Some(parent) => self.global_transform(parent).inverse_transform_vector(world_delta),
            None => world_delta,
        };
        let position = self.node(id)?.transform.position + local_delta;
        self.set_position(id, position)
    }

    /// Attach a contact listener to an entity
    pub fn add_listener(&mut self, id: EntityId, listener: Box<dyn ContactListener>) -> Result<()> {
        self.node_mut(id)?.listeners.push(listener);
        Ok(())
    }

    /// Deliver `event` to every listener on `id`; entities without listeners are skipped
    pub fn call_listeners(
        &mut self,
        id: EntityId,
        event: ContactEvent,
        other: ColliderId,
        ctx: &mut ContactContext,
    ) {
        let Some(node) = self.nodes.get_mut(id.index()) else {
            return;
        };
        for listener in node.listeners.iter_mut() {
            match event {
                ContactEvent::CollisionEnter => listener.on_collision_enter(other, ctx),
                ContactEvent::CollisionExit => listener.on_collision_exit(other, ctx),
                ContactEvent::TriggerEnter => listener.on_trigger_enter(other, ctx),
                ContactEvent::TriggerExit => listener.on_trigger_exit(other, ctx),
            }
        }
    }

    fn node(&self, id: EntityId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(PhysicsError::UnknownEntity(id))
    }

    fn node_mut(&mut self, id: EntityId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(PhysicsError::UnknownEntity(id))
    }
}
