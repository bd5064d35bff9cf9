//! Shared numeric constants and entity defaults.

// ── Gestures ────────────────────────────────────────────────────

/// Maximum pointer travel, in screen pixels, for a press to still count as a tap.
/// Travel beyond this promotes a press on an entity into a drag.
pub const TAP_SLOP_PX: f64 = 10.0;

/// Maximum touch duration for a tap, in milliseconds.
pub const TAP_MAX_MS: u64 = 300;

/// Window after a tap in which a second tap on the same entity is a double-tap.
pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;

/// Hold duration that turns a touch on an entity into a delete request.
pub const LONG_PRESS_MS: u64 = 800;

/// Travel, in screen pixels, that cancels a pending long-press.
pub const LONG_PRESS_SLOP_PX: f64 = 5.0;

/// After a touch ends, mouse presses arriving within this window are the
/// browser's compatibility events for that touch and are ignored.
pub const COMPAT_MOUSE_SUPPRESS_MS: u64 = 500;

// ── Entities ────────────────────────────────────────────────────

/// Maximum title length for an idea node, in characters.
pub const TITLE_MAX_CHARS: usize = 255;

/// Title given to a freshly created idea node.
pub const DEFAULT_NODE_TITLE: &str = "New idea";

/// Description given to a freshly created idea node.
pub const DEFAULT_NODE_DESCRIPTION: &str = "Click to edit";

/// Text given to a freshly created sticky note.
pub const DEFAULT_NOTE_TEXT: &str = "Sticky note";

/// Side of the square, anchored at the board origin, in which quick notes land.
pub const NOTE_SCATTER_RANGE: f64 = 200.0;

/// Name of the board created for a user who has none.
pub const DEFAULT_BOARD_NAME: &str = "My First Canvas";
