//! Input model: tools, selection, keys, and the gesture state machine.
//!
//! `Tool` and `Selection` are the persistent interaction state the renderer
//! sees. `InputState` is the gesture being tracked between pointer-down and
//! pointer-up, for mouse and touch alike, carrying everything needed to
//! compute incremental deltas and emit the final mutation on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::cell::Cell;
use std::rc::Rc;

use crate::camera::Point;
use crate::consts::{DOUBLE_TAP_WINDOW_MS, LONG_PRESS_MS, LONG_PRESS_SLOP_PX, TAP_MAX_MS, TAP_SLOP_PX};
use crate::doc::{EntityId, EntityKind, EntityRef};
use crate::editor::NodeEditor;
use crate::filter::TagFilter;

/// What a pointer-down on the board surface does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Select, drag, and edit entities (default).
    #[default]
    Select,
    /// Drag the board itself.
    Pan,
    /// The next board press creates an idea node.
    CreateNode,
    /// The next board press creates a sticky note.
    CreateNote,
}

impl Tool {
    /// Tool that results from pressing `pressed`'s toolbar button while `self` is active.
    #[must_use]
    pub fn toggled(self, pressed: Tool) -> Tool {
        if self == pressed { Tool::Select } else { pressed }
    }

    /// Whether this tool creates an entity on the next board press.
    #[must_use]
    pub fn is_create(self) -> bool {
        matches!(self, Self::CreateNode | Self::CreateNote)
    }
}

/// Device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// What the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty board surface.
    Board,
    /// A rendered entity.
    Entity(EntityRef),
}

/// A keyboard key, as named by the host (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    /// Whether this key requests deletion of the selection.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self.0.as_str(), "Delete" | "Backspace")
    }
}

/// Where keyboard focus was when a key event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFocus {
    /// The board or page chrome.
    Board,
    /// A text input or text area; keys belong to the field.
    TextField,
}

/// At most one selected node and at most one selected note.
///
/// Selecting an entity of one kind clears the other, so in practice at
/// most one of the two is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub node: Option<EntityId>,
    pub note: Option<EntityId>,
}

impl Selection {
    /// Toggle `target` and clear the other kind. Returns whether `target`
    /// is selected afterwards.
    pub fn toggle(&mut self, target: EntityRef) -> bool {
        let (mine, other) = match target.kind {
            EntityKind::Node => (&mut self.node, &mut self.note),
            EntityKind::Note => (&mut self.note, &mut self.node),
        };
        *other = None;
        if *mine == Some(target.id) {
            *mine = None;
            false
        } else {
            *mine = Some(target.id);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, target: EntityRef) -> bool {
        match target.kind {
            EntityKind::Node => self.node == Some(target.id),
            EntityKind::Note => self.note == Some(target.id),
        }
    }

    /// Drop `target` from the selection if present.
    pub fn remove(&mut self, target: EntityRef) {
        if self.contains(target) {
            match target.kind {
                EntityKind::Node => self.node = None,
                EntityKind::Note => self.note = None,
            }
        }
    }

    /// Clear both kinds. Returns whether anything was selected.
    pub fn clear(&mut self) -> bool {
        let had = !self.is_empty();
        *self = Self::default();
        had
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node.is_none() && self.note.is_none()
    }
}

/// Distance and timing thresholds for gesture classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureThresholds {
    pub tap_slop_px: f64,
    pub tap_max_ms: u64,
    pub double_tap_window_ms: u64,
    pub long_press_ms: u64,
    pub long_press_slop_px: f64,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            tap_slop_px: TAP_SLOP_PX,
            tap_max_ms: TAP_MAX_MS,
            double_tap_window_ms: DOUBLE_TAP_WINDOW_MS,
            long_press_ms: LONG_PRESS_MS,
            long_press_slop_px: LONG_PRESS_SLOP_PX,
        }
    }
}

/// Identifies one armed long-press timer. A timer that fires with a token
/// the engine no longer holds is stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongPressToken(pub u64);

/// Context captured when a press lands on an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Press {
    /// Entity under the pointer.
    pub target: EntityRef,
    /// Device that started the gesture.
    pub source: PointerSource,
    /// Client-space pointer position at press time.
    pub origin: Point,
    /// Pointer position relative to the entity's client-space top-left.
    pub grab_offset: Point,
    /// Stored position at press time, restored when a failed commit is reverted.
    pub start_position: Point,
    /// Host timestamp of the press, in milliseconds.
    pub started_ms: u64,
    /// Pending long-press timer, if one is armed.
    pub long_press: Option<LongPressToken>,
    /// Set once the long-press has fired for this press.
    pub long_pressed: bool,
}

/// Gesture state machine shared by mouse and touch input.
///
/// `Pressed` and `Dragging` together form the drag session; `Panning` is the
/// pan session. Only one variant is ever active, so a drag and a pan cannot
/// overlap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// The user is dragging the board surface.
    Panning {
        /// Client-space position of the previous pointer event.
        last_screen: Point,
    },
    /// A press on an entity that has not yet travelled beyond tap slop.
    Pressed(Press),
    /// A press on an entity that has become a drag.
    Dragging(Press),
}

impl InputState {
    /// The press behind the open drag session, if any.
    #[must_use]
    pub fn press(&self) -> Option<&Press> {
        match self {
            Self::Pressed(p) | Self::Dragging(p) => Some(p),
            Self::Idle | Self::Panning { .. } => None,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// A completed tap, remembered for double-tap detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tap {
    pub target: EntityRef,
    pub at_ms: u64,
}

/// Persistent interaction state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// Selected node and/or note.
    pub selection: Selection,
    /// Active tag filter.
    pub tags: TagFilter,
    /// Open node edit modal, if any.
    pub editor: Option<NodeEditor>,
}

/// Keyboard subscription held by the mounted board view.
///
/// The engine only reacts to keys while a subscription is alive. Dropping
/// the subscription (unmounting the view) detaches the listener.
#[derive(Debug)]
pub struct InputSubscription {
    live: Rc<Cell<bool>>,
}

impl InputSubscription {
    pub(crate) fn new() -> (Self, Rc<Cell<bool>>) {
        let live = Rc::new(Cell::new(true));
        (Self { live: Rc::clone(&live) }, live)
    }

    /// Whether the engine is still listening through this subscription.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.get()
    }
}

impl Drop for InputSubscription {
    fn drop(&mut self) {
        self.live.set(false);
    }
}
