//! Scene projection for the host renderer.
//!
//! `build_scene` flattens engine state into draw-ready views: filtered
//! nodes and all notes at their rendered positions, the selection flags,
//! the cursor hint, and the relation-line overlay. Nothing here is cached;
//! the host rebuilds the scene after every `RenderNeeded`, so relation
//! lines always follow the latest positions and relation lists.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::{HashMap, HashSet};

use crate::camera::{Point, Viewport};
use crate::doc::{EntityId, IdeaNode};
use crate::engine::{Cursor, EngineCore};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    /// Rendered top-left on the board surface.
    pub position: Point,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteView {
    pub id: EntityId,
    pub text: String,
    pub position: Point,
    pub selected: bool,
}

/// A line between two related idea nodes, in board-surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationLine {
    /// Lower of the two node ids.
    pub from: EntityId,
    /// Higher of the two node ids.
    pub to: EntityId,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub nodes: Vec<NodeView>,
    pub notes: Vec<NoteView>,
    pub relations: Vec<RelationLine>,
    /// Every tag in use, for the filter bar.
    pub tags: Vec<String>,
    pub cursor: Cursor,
    pub editing: Option<EntityId>,
}

/// Build the frame for the current engine state.
#[must_use]
pub fn build_scene(core: &EngineCore) -> Scene {
    let selection = core.selection();
    let visible = core.visible_nodes();
    let nodes = visible
        .iter()
        .map(|n| NodeView {
            id: n.id,
            title: n.title.clone(),
            description: n.description.clone(),
            tags: n.tags.clone(),
            position: core.viewport.apply_offset(n.position()),
            selected: selection.node == Some(n.id),
        })
        .collect();
    let notes = core
        .doc
        .notes()
        .iter()
        .map(|n| NoteView {
            id: n.id,
            text: n.text.clone(),
            position: core.viewport.apply_offset(n.position()),
            selected: selection.note == Some(n.id),
        })
        .collect();

    Scene {
        nodes,
        notes,
        relations: relation_lines(&visible, &core.viewport),
        tags: core.doc.tag_universe(),
        cursor: core.cursor(),
        editing: core.editor().map(|e| e.id),
    }
}

/// Lines between related nodes among `nodes`.
///
/// Relations are symmetric, so a pair listed on either or both sides yields
/// one line. References to nodes not in `nodes` (deleted, or hidden by the
/// tag filter) and self-references are skipped.
#[must_use]
pub fn relation_lines(nodes: &[&IdeaNode], viewport: &Viewport) -> Vec<RelationLine> {
    let positions: HashMap<EntityId, Point> = nodes.iter().map(|n| (n.id, n.position())).collect();
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for node in nodes {
        for &other in &node.related_idea_ids {
            if other == node.id {
                continue;
            }
            let (from, to) = if node.id < other { (node.id, other) } else { (other, node.id) };
            if !seen.insert((from, to)) {
                continue;
            }
            let (Some(&a), Some(&b)) = (positions.get(&from), positions.get(&to)) else {
                continue;
            };
            lines.push(RelationLine { from, to, start: viewport.apply_offset(a), end: viewport.apply_offset(b) });
        }
    }
    lines
}
