//! Document model: idea nodes, sticky notes, and the client-side store.
//!
//! This module defines the entity records exactly as they travel on the wire
//! (`IdeaNode`, `StickyNote`), the drafts sent to the store before an
//! identifier exists (`NewIdeaNode`, `NewStickyNote`), a kind-erased
//! `Entity` for code that handles both, and `EntityStore`, which owns the
//! ordered collections for the active container.
//!
//! Records flow in from the remote store (JSON) and from the engine
//! (optimistic mutations). The renderer reads them back in insertion order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::camera::Point;

/// Store-issued identifier for an entity.
pub type EntityId = i64;

/// Identifier of a container (board).
pub type ContainerId = i64;

/// Identifier of a user.
pub type UserId = i64;

/// Which collection an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Note,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Note => f.write_str("note"),
        }
    }
}

/// A typed reference to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    #[must_use]
    pub fn node(id: EntityId) -> Self {
        Self { kind: EntityKind::Node, id }
    }

    #[must_use]
    pub fn note(id: EntityId) -> Self {
        Self { kind: EntityKind::Note, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Type tag carried by idea nodes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    #[default]
    Idea,
}

/// An idea node as stored in the document and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaNode {
    pub id: EntityId,
    #[serde(rename = "fileId")]
    pub container_id: ContainerId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    #[serde(default)]
    pub node_type: NodeType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-text tags in display order. Never contains duplicates.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "posX")]
    pub x: f64,
    #[serde(rename = "posY")]
    pub y: f64,
    /// Other idea nodes this one is associated with. The association is symmetric.
    #[serde(default)]
    pub related_idea_ids: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl IdeaNode {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether any of this node's tags is in `tags`.
    #[must_use]
    pub fn has_any_tag(&self, tags: &HashSet<String>) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// A sticky note as stored in the document and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyNote {
    pub id: EntityId,
    #[serde(rename = "fileId")]
    pub container_id: ContainerId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "posX")]
    pub x: f64,
    #[serde(rename = "posY")]
    pub y: f64,
}

impl StickyNote {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Idea node draft sent to the store's create operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdeaNode {
    #[serde(rename = "fileId")]
    pub container_id: ContainerId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub node_type: NodeType,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(rename = "posX")]
    pub x: f64,
    #[serde(rename = "posY")]
    pub y: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Sticky note draft sent to the store's create operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStickyNote {
    #[serde(rename = "fileId")]
    pub container_id: ContainerId,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub text: String,
    #[serde(rename = "posX")]
    pub x: f64,
    #[serde(rename = "posY")]
    pub y: f64,
}

/// Either kind of entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(IdeaNode),
    Note(StickyNote),
}

impl Entity {
    #[must_use]
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Self::Node(n) => EntityRef::node(n.id),
            Self::Note(n) => EntityRef::note(n.id),
        }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        match self {
            Self::Node(n) => n.position(),
            Self::Note(n) => n.position(),
        }
    }
}

/// Current wall-clock time as an RFC 3339 string, for `createdAt`/`updatedAt`.
#[must_use]
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// In-memory store of the active container's entities.
///
/// Both collections keep the order the remote store returned them in;
/// locally created records are appended.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    nodes: Vec<IdeaNode>,
    notes: Vec<StickyNote>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both collections with a full snapshot.
    pub fn load_snapshot(&mut self, nodes: Vec<IdeaNode>, notes: Vec<StickyNote>) {
        self.nodes = nodes;
        self.notes = notes;
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.notes.clear();
    }

    /// Insert or replace an entity. A record whose id is already present is
    /// replaced in place; otherwise it is appended.
    pub fn upsert_local(&mut self, entity: Entity) {
        match entity {
            Entity::Node(node) => match self.nodes.iter_mut().find(|n| n.id == node.id) {
                Some(slot) => *slot = node,
                None => self.nodes.push(node),
            },
            Entity::Note(note) => match self.notes.iter_mut().find(|n| n.id == note.id) {
                Some(slot) => *slot = note,
                None => self.notes.push(note),
            },
        }
    }

    /// Remove an entity, returning it if it was present.
    pub fn remove_local(&mut self, id: EntityId, kind: EntityKind) -> Option<Entity> {
        match kind {
            EntityKind::Node => {
                let idx = self.nodes.iter().position(|n| n.id == id)?;
                Some(Entity::Node(self.nodes.remove(idx)))
            }
            EntityKind::Note => {
                let idx = self.notes.iter().position(|n| n.id == id)?;
                Some(Entity::Note(self.notes.remove(idx)))
            }
        }
    }

    #[must_use]
    pub fn node(&self, id: EntityId) -> Option<&IdeaNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn note(&self, id: EntityId) -> Option<&StickyNote> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Clone out the entity behind `target`.
    #[must_use]
    pub fn entity(&self, target: EntityRef) -> Option<Entity> {
        match target.kind {
            EntityKind::Node => self.node(target.id).cloned().map(Entity::Node),
            EntityKind::Note => self.note(target.id).cloned().map(Entity::Note),
        }
    }

    #[must_use]
    pub fn contains(&self, target: EntityRef) -> bool {
        self.position(target).is_some()
    }

    /// Stored (board-local) position of an entity.
    #[must_use]
    pub fn position(&self, target: EntityRef) -> Option<Point> {
        match target.kind {
            EntityKind::Node => self.node(target.id).map(IdeaNode::position),
            EntityKind::Note => self.note(target.id).map(StickyNote::position),
        }
    }

    /// Move an entity. Returns false if it doesn't exist.
    pub fn set_position(&mut self, target: EntityRef, pos: Point) -> bool {
        match target.kind {
            EntityKind::Node => {
                let Some(node) = self.nodes.iter_mut().find(|n| n.id == target.id) else {
                    return false;
                };
                node.x = pos.x;
                node.y = pos.y;
            }
            EntityKind::Note => {
                let Some(note) = self.notes.iter_mut().find(|n| n.id == target.id) else {
                    return false;
                };
                note.x = pos.x;
                note.y = pos.y;
            }
        }
        true
    }

    /// All idea nodes in store order.
    #[must_use]
    pub fn nodes(&self) -> &[IdeaNode] {
        &self.nodes
    }

    /// All sticky notes in store order.
    #[must_use]
    pub fn notes(&self) -> &[StickyNote] {
        &self.notes
    }

    /// Every distinct tag used by any node, in first-seen order.
    #[must_use]
    pub fn tag_universe(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .flat_map(|n| n.tags.iter())
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect()
    }

    /// Total number of entities of both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() + self.notes.len()
    }

    /// Returns `true` if the store holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.notes.is_empty()
    }
}
