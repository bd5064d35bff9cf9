//! Synchronous interaction core.
//!
//! `EngineCore` consumes pointer, touch, and keyboard events, mutates the
//! local entity store immediately, and returns [`Action`]s describing what
//! the host must do next: persist a record, ask the user to confirm a
//! delete, arm a timer, re-render. It never performs I/O itself, so every
//! gesture can be driven and checked in plain unit tests. The sync layer in
//! [`crate::session`] executes the actions and feeds outcomes back through
//! `apply_created` / `apply_deleted` / `restore`.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::cell::Cell;
use std::rc::Rc;

use rand::Rng;
use tracing::{debug, warn};

use crate::camera::{Point, Viewport};
use crate::consts::{
    COMPAT_MOUSE_SUPPRESS_MS, DEFAULT_NODE_DESCRIPTION, DEFAULT_NODE_TITLE, DEFAULT_NOTE_TEXT, NOTE_SCATTER_RANGE,
};
use crate::doc::{
    ContainerId, Entity, EntityId, EntityKind, EntityRef, EntityStore, IdeaNode, NewIdeaNode, NewStickyNote, NodeType,
    StickyNote, UserId, now_timestamp,
};
use crate::editor::NodeEditor;
use crate::error::ValidationError;
use crate::input::{
    GestureThresholds, InputState, InputSubscription, Key, KeyFocus, LongPressToken, PointerSource, PointerTarget,
    Press, Selection, Tap, Tool, UiState,
};
use crate::render::{self, Scene};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Local state changed; redraw.
    RenderNeeded,
    /// Ask the store to create an idea node.
    CreateNode(NewIdeaNode),
    /// Ask the store to create a sticky note.
    CreateNote(NewStickyNote),
    /// Persist a node already updated locally. `previous` is the record
    /// before the change, for rollback.
    PersistNode { node: IdeaNode, previous: IdeaNode },
    /// Persist a note already updated locally.
    PersistNote { note: StickyNote, previous: StickyNote },
    /// Ask the user to confirm deleting an entity.
    ConfirmDelete(EntityRef),
    /// The node edit modal opened.
    OpenEditor(EntityId),
    /// Start a long-press timer; call `on_long_press_elapsed(token)` when it fires.
    ArmLongPress { token: LongPressToken, delay_ms: u64 },
    /// Stop a previously armed long-press timer.
    CancelLongPress(LongPressToken),
}

/// Board cursor hint for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Crosshair,
    Grab,
    Grabbing,
}

/// Container and actor that newly created entities belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardContext {
    pub container_id: ContainerId,
    pub owner_id: UserId,
}

/// Core engine state.
#[derive(Debug)]
pub struct EngineCore {
    pub doc: EntityStore,
    pub viewport: Viewport,
    pub ui: UiState,
    pub input: InputState,
    /// Client-space position of the board's top-left corner.
    pub origin: Point,
    pub thresholds: GestureThresholds,
    context: Option<BoardContext>,
    last_tap: Option<Tap>,
    /// Source of the pointer that is currently down.
    down_source: Option<PointerSource>,
    last_touch_end_ms: Option<u64>,
    long_press_seq: u64,
    keys: Option<Rc<Cell<bool>>>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_thresholds(GestureThresholds::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_thresholds(thresholds: GestureThresholds) -> Self {
        Self {
            doc: EntityStore::new(),
            viewport: Viewport::default(),
            ui: UiState::default(),
            input: InputState::Idle,
            origin: Point::default(),
            thresholds,
            context: None,
            last_tap: None,
            down_source: None,
            last_touch_end_ms: None,
            long_press_seq: 0,
            keys: None,
        }
    }

    // --- Lifecycle ---

    /// Register the keyboard listener for the mounted board view.
    ///
    /// Keys are ignored until this is called and again once the returned
    /// subscription is dropped. Subscribing again detaches any earlier one.
    pub fn subscribe(&mut self) -> InputSubscription {
        if let Some(old) = self.keys.take() {
            old.set(false);
        }
        let (subscription, live) = InputSubscription::new();
        self.keys = Some(live);
        subscription
    }

    /// Whether a live keyboard subscription exists.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.keys.as_ref().is_some_and(|k| k.get())
    }

    /// Tear down for unmount: close any open gesture session and detach the
    /// keyboard listener.
    pub fn dispose(&mut self) -> Vec<Action> {
        if let Some(keys) = self.keys.take() {
            keys.set(false);
        }
        self.release_sessions()
    }

    /// Switch to a different container. Clears entities, view, selection,
    /// filter, and any gesture in progress.
    pub fn open_container(&mut self, context: BoardContext) {
        self.context = Some(context);
        self.reset_board();
    }

    /// Close the open board without committing anything in progress.
    pub fn close_container(&mut self) {
        self.context = None;
        self.reset_board();
    }

    fn reset_board(&mut self) {
        self.doc.clear();
        self.viewport.reset();
        self.ui.selection.clear();
        self.ui.tags.clear();
        self.ui.editor = None;
        self.input = InputState::Idle;
        self.last_tap = None;
    }

    #[must_use]
    pub fn context(&self) -> Option<BoardContext> {
        self.context
    }

    // --- Data inputs ---

    /// Hydrate the store from the remote lists.
    pub fn load_snapshot(&mut self, nodes: Vec<IdeaNode>, notes: Vec<StickyNote>) {
        self.doc.load_snapshot(nodes, notes);
    }

    /// A create request succeeded: append the stored record and leave the
    /// matching create tool.
    pub fn apply_created(&mut self, entity: Entity) -> Vec<Action> {
        let kind = entity.entity_ref().kind;
        self.doc.upsert_local(entity);
        let done = match kind {
            EntityKind::Node => Tool::CreateNode,
            EntityKind::Note => Tool::CreateNote,
        };
        if self.ui.tool == done {
            self.ui.tool = Tool::Select;
        }
        vec![Action::RenderNeeded]
    }

    /// A delete request succeeded: drop the entity and any reference to it.
    pub fn apply_deleted(&mut self, target: EntityRef) -> Vec<Action> {
        self.doc.remove_local(target.id, target.kind);
        self.ui.selection.remove(target);
        if target.kind == EntityKind::Node && self.ui.editor.as_ref().is_some_and(|e| e.id == target.id) {
            self.ui.editor = None;
        }
        if self.input.press().is_some_and(|p| p.target == target) {
            self.input = InputState::Idle;
        }
        vec![Action::RenderNeeded]
    }

    /// Put a previous record back, used when a failed update is reverted.
    pub fn restore(&mut self, entity: Entity) -> Vec<Action> {
        if self.doc.contains(entity.entity_ref()) {
            self.doc.upsert_local(entity);
        }
        vec![Action::RenderNeeded]
    }

    // --- Tools / filter ---

    /// Handle a toolbar button press.
    pub fn press_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = self.release_sessions();
        let next = self.ui.tool.toggled(tool);
        self.ui.tool = next;
        if next != Tool::Select {
            self.ui.selection.clear();
        }
        self.last_tap = None;
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn toggle_tag(&mut self, tag: &str) -> Vec<Action> {
        self.ui.tags.toggle(tag);
        vec![Action::RenderNeeded]
    }

    /// Quick-note button: create a note at a random spot near the board origin.
    pub fn create_note_scattered<R: Rng>(&mut self, rng: &mut R) -> Vec<Action> {
        let local = Point::new(rng.random_range(0.0..NOTE_SCATTER_RANGE), rng.random_range(0.0..NOTE_SCATTER_RANGE));
        self.create_action(Tool::CreateNote, local).into_iter().collect()
    }

    // --- Pointer / touch ---

    pub fn on_pointer_down(
        &mut self,
        target: PointerTarget,
        source: PointerSource,
        screen: Point,
        now_ms: u64,
    ) -> Vec<Action> {
        if source == PointerSource::Mouse
            && self.last_touch_end_ms.is_some_and(|t| now_ms.saturating_sub(t) < COMPAT_MOUSE_SUPPRESS_MS)
        {
            return Vec::new();
        }
        self.down_source = Some(source);
        // A down without a matching up (lost pointer capture) closes the stale session.
        let mut actions = self.release_sessions();
        match target {
            PointerTarget::Entity(entity) if self.ui.tool == Tool::Select && self.doc.contains(entity) => {
                self.begin_press(entity, source, screen, now_ms, &mut actions);
            }
            _ => self.board_down(screen, &mut actions),
        }
        actions
    }

    pub fn on_pointer_move(&mut self, screen: Point) -> Vec<Action> {
        let state = self.input;
        match state {
            InputState::Idle => Vec::new(),
            InputState::Panning { last_screen } => {
                self.viewport.update_offset(screen - last_screen);
                self.input = InputState::Panning { last_screen: screen };
                vec![Action::RenderNeeded]
            }
            InputState::Pressed(mut press) | InputState::Dragging(mut press) => {
                let mut actions = Vec::new();
                let travel = screen.distance(press.origin);
                let dragging = matches!(state, InputState::Dragging(_)) || travel > self.thresholds.tap_slop_px;
                if dragging || travel > self.thresholds.long_press_slop_px {
                    if let Some(token) = press.long_press.take() {
                        actions.push(Action::CancelLongPress(token));
                    }
                }
                if dragging {
                    self.drag_to(&press, screen);
                    self.input = InputState::Dragging(press);
                    actions.push(Action::RenderNeeded);
                } else {
                    self.input = InputState::Pressed(press);
                }
                actions
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen: Point, now_ms: u64) -> Vec<Action> {
        self.end_pointer(now_ms);
        let state = std::mem::take(&mut self.input);
        match state {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => vec![Action::RenderNeeded],
            InputState::Dragging(press) => {
                let mut actions = cancel_long_press(&press);
                self.drag_to(&press, screen);
                actions.extend(self.commit_position(&press));
                actions.push(Action::RenderNeeded);
                actions
            }
            InputState::Pressed(press) => {
                let mut actions = cancel_long_press(&press);
                if press.long_pressed {
                    return actions;
                }
                if screen.distance(press.origin) > self.thresholds.tap_slop_px {
                    // Released far from the press with no intermediate move: a drag.
                    self.drag_to(&press, screen);
                    actions.extend(self.commit_position(&press));
                    actions.push(Action::RenderNeeded);
                    return actions;
                }
                let held_ms = now_ms.saturating_sub(press.started_ms);
                if press.source == PointerSource::Touch && held_ms >= self.thresholds.tap_max_ms {
                    return actions;
                }
                actions.extend(self.tap(press.target, now_ms));
                actions
            }
        }
    }

    /// The platform cancelled the gesture (e.g. touchcancel).
    pub fn on_pointer_cancel(&mut self, now_ms: u64) -> Vec<Action> {
        self.end_pointer(now_ms);
        self.release_sessions()
    }

    /// A long-press timer fired. Fires the delete request at most once per
    /// press; cancelled or superseded tokens are ignored.
    pub fn on_long_press_elapsed(&mut self, token: LongPressToken) -> Vec<Action> {
        let Some(press) = self.press_mut() else {
            return Vec::new();
        };
        if press.long_press != Some(token) {
            debug!(token = token.0, "stale long-press ignored");
            return Vec::new();
        }
        press.long_press = None;
        press.long_pressed = true;
        vec![Action::ConfirmDelete(press.target)]
    }

    // --- Keyboard ---

    pub fn on_key_down(&mut self, key: &Key, focus: KeyFocus) -> Vec<Action> {
        if !self.is_listening() || self.ui.editor.is_some() || focus == KeyFocus::TextField || !key.is_delete() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let Some(id) = self.ui.selection.node {
            actions.push(Action::ConfirmDelete(EntityRef::node(id)));
        }
        if let Some(id) = self.ui.selection.note {
            actions.push(Action::ConfirmDelete(EntityRef::note(id)));
        }
        actions
    }

    // --- Editing ---

    /// Open the edit modal for a node.
    pub fn open_editor(&mut self, id: EntityId) -> Vec<Action> {
        let Some(node) = self.doc.node(id) else {
            return Vec::new();
        };
        self.ui.editor = Some(NodeEditor::open(node));
        vec![Action::OpenEditor(id), Action::RenderNeeded]
    }

    #[must_use]
    pub fn editor(&self) -> Option<&NodeEditor> {
        self.ui.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut NodeEditor> {
        self.ui.editor.as_mut()
    }

    pub fn cancel_editor(&mut self) -> Vec<Action> {
        if self.ui.editor.take().is_some() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Validate the open draft, apply it locally, and close the modal.
    ///
    /// # Errors
    ///
    /// Returns the draft's [`ValidationError`]; the modal stays open and
    /// nothing is sent.
    pub fn submit_editor(&mut self) -> Result<Vec<Action>, ValidationError> {
        let Some(editor) = self.ui.editor.as_ref() else {
            return Ok(Vec::new());
        };
        editor.validate()?;
        let Some(previous) = self.doc.node(editor.id).cloned() else {
            self.ui.editor = None;
            return Ok(vec![Action::RenderNeeded]);
        };
        let mut node = previous.clone();
        editor.apply_to(&mut node);
        node.updated_at = Some(now_timestamp());
        self.doc.upsert_local(Entity::Node(node.clone()));
        self.ui.editor = None;
        Ok(vec![Action::PersistNode { node, previous }, Action::RenderNeeded])
    }

    /// Inline note text edit.
    pub fn set_note_text(&mut self, id: EntityId, text: impl Into<String>) -> Vec<Action> {
        if self.ui.tool == Tool::Pan {
            return Vec::new();
        }
        let Some(previous) = self.doc.note(id).cloned() else {
            return Vec::new();
        };
        let mut note = previous.clone();
        note.text = text.into();
        self.doc.upsert_local(Entity::Note(note.clone()));
        vec![Action::PersistNote { note, previous }, Action::RenderNeeded]
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.ui.selection
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Where an entity is drawn on the board surface.
    #[must_use]
    pub fn rendered_position(&self, target: EntityRef) -> Option<Point> {
        self.doc.position(target).map(|p| self.viewport.apply_offset(p))
    }

    /// Nodes that pass the tag filter, in store order.
    #[must_use]
    pub fn visible_nodes(&self) -> Vec<&IdeaNode> {
        self.ui.tags.apply(self.doc.nodes())
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        match self.input {
            InputState::Panning { .. } | InputState::Dragging(_) => Cursor::Grabbing,
            InputState::Idle | InputState::Pressed(_) => match self.ui.tool {
                Tool::Pan => Cursor::Grab,
                Tool::CreateNode | Tool::CreateNote => Cursor::Crosshair,
                Tool::Select => Cursor::Default,
            },
        }
    }

    /// Everything the host needs to draw one frame.
    #[must_use]
    pub fn scene(&self) -> Scene {
        render::build_scene(self)
    }

    // --- Internals ---

    fn begin_press(
        &mut self,
        target: EntityRef,
        source: PointerSource,
        screen: Point,
        now_ms: u64,
        actions: &mut Vec<Action>,
    ) {
        let Some(stored) = self.doc.position(target) else {
            return;
        };
        let top_left = self.viewport.local_to_screen(stored, self.origin);
        let long_press = if source == PointerSource::Touch {
            self.long_press_seq += 1;
            let token = LongPressToken(self.long_press_seq);
            actions.push(Action::ArmLongPress { token, delay_ms: self.thresholds.long_press_ms });
            Some(token)
        } else {
            None
        };
        self.input = InputState::Pressed(Press {
            target,
            source,
            origin: screen,
            grab_offset: screen - top_left,
            start_position: stored,
            started_ms: now_ms,
            long_press,
            long_pressed: false,
        });
    }

    fn board_down(&mut self, screen: Point, actions: &mut Vec<Action>) {
        match self.ui.tool {
            Tool::Select => {
                if self.ui.selection.clear() {
                    actions.push(Action::RenderNeeded);
                }
            }
            Tool::Pan => {
                self.input = InputState::Panning { last_screen: screen };
                actions.push(Action::RenderNeeded);
            }
            tool @ (Tool::CreateNode | Tool::CreateNote) => {
                let local = self.viewport.screen_to_local(screen, self.origin);
                actions.extend(self.create_action(tool, local));
            }
        }
    }

    fn create_action(&self, tool: Tool, local: Point) -> Option<Action> {
        let Some(ctx) = self.context else {
            warn!("create ignored: no board open");
            return None;
        };
        match tool {
            Tool::CreateNode => {
                let now = now_timestamp();
                Some(Action::CreateNode(NewIdeaNode {
                    container_id: ctx.container_id,
                    owner_id: ctx.owner_id,
                    node_type: NodeType::Idea,
                    title: DEFAULT_NODE_TITLE.to_owned(),
                    description: DEFAULT_NODE_DESCRIPTION.to_owned(),
                    tags: Vec::new(),
                    x: local.x,
                    y: local.y,
                    created_at: now.clone(),
                    updated_at: now,
                }))
            }
            Tool::CreateNote => Some(Action::CreateNote(NewStickyNote {
                container_id: ctx.container_id,
                owner_id: ctx.owner_id,
                text: DEFAULT_NOTE_TEXT.to_owned(),
                x: local.x,
                y: local.y,
            })),
            Tool::Select | Tool::Pan => None,
        }
    }

    fn tap(&mut self, target: EntityRef, now_ms: u64) -> Vec<Action> {
        let window = self.thresholds.double_tap_window_ms;
        let double = self
            .last_tap
            .is_some_and(|t| t.target == target && now_ms.saturating_sub(t.at_ms) <= window);
        if double && target.kind == EntityKind::Node {
            self.last_tap = None;
            self.ui.selection = Selection { node: Some(target.id), note: None };
            return self.open_editor(target.id);
        }
        self.ui.selection.toggle(target);
        self.last_tap = Some(Tap { target, at_ms: now_ms });
        vec![Action::RenderNeeded]
    }

    fn drag_to(&mut self, press: &Press, screen: Point) {
        let local = self.viewport.screen_to_local(screen, self.origin) - press.grab_offset;
        self.doc.set_position(press.target, local);
    }

    fn commit_position(&mut self, press: &Press) -> Vec<Action> {
        let start = press.start_position;
        let action = match press.target.kind {
            EntityKind::Node => {
                let Some(node) = self.doc.node(press.target.id).cloned() else {
                    return Vec::new();
                };
                let mut previous = node.clone();
                previous.x = start.x;
                previous.y = start.y;
                let mut node = node;
                node.updated_at = Some(now_timestamp());
                self.doc.upsert_local(Entity::Node(node.clone()));
                Action::PersistNode { node, previous }
            }
            EntityKind::Note => {
                let Some(note) = self.doc.note(press.target.id).cloned() else {
                    return Vec::new();
                };
                let mut previous = note.clone();
                previous.x = start.x;
                previous.y = start.y;
                Action::PersistNote { note, previous }
            }
        };
        debug!(entity = %press.target, "drag committed");
        vec![action]
    }

    /// Close whatever session is open. A drag that moved commits its
    /// position; a pending long-press is cancelled.
    fn release_sessions(&mut self) -> Vec<Action> {
        let state = std::mem::take(&mut self.input);
        match state {
            InputState::Idle | InputState::Panning { .. } => Vec::new(),
            InputState::Pressed(press) => cancel_long_press(&press),
            InputState::Dragging(press) => {
                let mut actions = cancel_long_press(&press);
                actions.extend(self.commit_position(&press));
                actions
            }
        }
    }

    /// Start the compat-mouse window when a touch lifts, whatever it touched.
    fn end_pointer(&mut self, now_ms: u64) {
        if self.down_source.take() == Some(PointerSource::Touch) {
            self.last_touch_end_ms = Some(now_ms);
        }
    }

    fn press_mut(&mut self) -> Option<&mut Press> {
        match &mut self.input {
            InputState::Pressed(p) | InputState::Dragging(p) => Some(p),
            InputState::Idle | InputState::Panning { .. } => None,
        }
    }
}

fn cancel_long_press(press: &Press) -> Vec<Action> {
    press.long_press.map(Action::CancelLongPress).into_iter().collect()
}
