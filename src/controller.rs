//! Input state machine that turns pointer, keyboard and control events into edit-state mutations.
//!
//! Snapshot policy: discrete actions (rotate, zoom, filter/background/blend changes, a fresh arrow
//! press) record one history step each. A drag records one step on release. Auto-repeated arrow
//! presses are batched into a single step, flushed by the key release or by the next command of any
//! other kind.

use crate::config::EditorConfig;
use crate::edit::history::History;
use crate::edit::state::{BlendMode, EditState, FilterSettings};
use crate::foundation::core::{Canvas, Position, Rgb8};
use crate::geometry::{normalize_degrees, screen_to_model, snap_to_center};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self, step: f64) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -step),
            Direction::Down => (0.0, step),
            Direction::Left => (-step, 0.0),
            Direction::Right => (step, 0.0),
        }
    }
}

/// One user intent. Pointer coordinates are in canvas (screen) pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    PointerDown {
        x: f64,
        y: f64,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp,
    PointerLeave,
    RotateLeft,
    RotateRight,
    ZoomIn,
    ZoomOut,
    Nudge {
        direction: Direction,
        #[serde(default)]
        repeat: bool,
    },
    NudgeEnd,
    SetFilters {
        filters: FilterSettings,
    },
    SetBackground {
        color: Rgb8,
    },
    SetBlendMode {
        mode: BlendMode,
    },
    Undo,
    Redo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Char(char),
    Other,
}

/// A key event as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    /// Cmd on macOS.
    pub meta: bool,
    pub shift: bool,
    /// Auto-repeat from a held key.
    pub repeat: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
            repeat: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }
}

fn arrow_direction(key: Key) -> Option<Direction> {
    match key {
        Key::ArrowUp => Some(Direction::Up),
        Key::ArrowDown => Some(Direction::Down),
        Key::ArrowLeft => Some(Direction::Left),
        Key::ArrowRight => Some(Direction::Right),
        Key::Char(_) | Key::Other => None,
    }
}

/// Keyboard shortcuts on key press.
pub fn command_for_key(input: KeyInput) -> Option<Command> {
    let cmd_key = input.ctrl || input.meta;
    match input.key {
        Key::Char(c) if cmd_key => match c.to_ascii_lowercase() {
            'z' if input.shift => Some(Command::Redo),
            'z' => Some(Command::Undo),
            'y' => Some(Command::Redo),
            _ => None,
        },
        key => arrow_direction(key).map(|direction| Command::Nudge {
            direction,
            repeat: input.repeat,
        }),
    }
}

/// Keyboard shortcuts on key release.
pub fn command_for_key_release(input: KeyInput) -> Option<Command> {
    arrow_direction(input.key).map(|_| Command::NudgeEnd)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Grab point minus photo position, in model space.
        offset: Position,
        /// Photo position when the drag began.
        origin: Position,
    },
}

/// Applies [`Command`]s to an [`EditState`] and decides when history is recorded.
#[derive(Clone, Debug)]
pub struct Controller {
    canvas: Canvas,
    snap_threshold_px: f64,
    nudge_step_px: f64,
    rotate_step_deg: f64,
    zoom_step: f64,
    min_scale: f64,
    max_scale: f64,
    drag: DragState,
    pending_nudge: bool,
}

impl Controller {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            canvas: config.canvas,
            snap_threshold_px: config.snap_threshold_px,
            nudge_step_px: config.nudge_step_px,
            rotate_step_deg: config.rotate_step_deg,
            zoom_step: config.zoom_step,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            drag: DragState::Idle,
            pending_nudge: false,
        }
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Record the step owed to a run of auto-repeated nudges, if any. Returns whether it snapshotted.
    pub fn flush_pending(&mut self, state: &EditState, history: &mut History) -> bool {
        if !self.pending_nudge {
            return false;
        }
        self.pending_nudge = false;
        history.snapshot(state);
        true
    }

    /// Forget any drag or batched nudge without touching history.
    pub fn reset(&mut self) {
        self.drag = DragState::Idle;
        self.pending_nudge = false;
    }

    /// Apply one command. Returns `true` when `state` changed and the canvas needs repainting.
    ///
    /// `fallback` is what undoing the oldest history entry restores.
    pub fn apply(
        &mut self,
        cmd: Command,
        state: &mut EditState,
        history: &mut History,
        fallback: &EditState,
    ) -> bool {
        if !matches!(cmd, Command::Nudge { repeat: true, .. }) {
            self.flush_pending(state, history);
        }

        match cmd {
            Command::PointerDown { x, y } => {
                let model = screen_to_model(Position::new(x, y), state.rotation_deg, self.canvas);
                let offset = Position::new(model.x - state.position.x, model.y - state.position.y);
                self.drag = DragState::Dragging {
                    offset,
                    origin: state.position,
                };
                tracing::debug!(x, y, "drag start");
                false
            }
            Command::PointerMove { x, y } => {
                let DragState::Dragging { offset, .. } = self.drag else {
                    return false;
                };
                let model = screen_to_model(Position::new(x, y), state.rotation_deg, self.canvas);
                let candidate = Position::new(model.x - offset.x, model.y - offset.y);
                let next = snap_to_center(candidate, self.canvas, self.snap_threshold_px);
                if next == state.position {
                    return false;
                }
                state.position = next;
                true
            }
            Command::PointerUp | Command::PointerLeave => {
                let DragState::Dragging { origin, .. } = self.drag else {
                    return false;
                };
                self.drag = DragState::Idle;
                if state.position != origin {
                    history.snapshot(state);
                }
                tracing::debug!(x = state.position.x, y = state.position.y, "drag end");
                false
            }
            Command::RotateLeft => self.rotate(state, history, -self.rotate_step_deg),
            Command::RotateRight => self.rotate(state, history, self.rotate_step_deg),
            Command::ZoomIn => self.zoom(state, history, self.zoom_step),
            Command::ZoomOut => self.zoom(state, history, -self.zoom_step),
            Command::Nudge { direction, repeat } => {
                let (dx, dy) = direction.delta(self.nudge_step_px);
                state.position = state.position.offset(dx, dy);
                if repeat {
                    self.pending_nudge = true;
                } else {
                    history.snapshot(state);
                }
                true
            }
            Command::NudgeEnd => false,
            Command::SetFilters { filters } => {
                let filters = filters.clamped();
                if filters == state.filters {
                    return false;
                }
                state.filters = filters;
                history.snapshot(state);
                true
            }
            Command::SetBackground { color } => {
                if color == state.background {
                    return false;
                }
                state.background = color;
                history.snapshot(state);
                true
            }
            Command::SetBlendMode { mode } => {
                if mode == state.blend {
                    return false;
                }
                state.blend = mode;
                history.snapshot(state);
                true
            }
            Command::Undo => {
                self.drag = DragState::Idle;
                match history.undo(fallback) {
                    Some(prev) => {
                        *state = prev;
                        true
                    }
                    None => false,
                }
            }
            Command::Redo => {
                self.drag = DragState::Idle;
                match history.redo() {
                    Some(next) => {
                        *state = next;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    fn rotate(&self, state: &mut EditState, history: &mut History, delta: f64) -> bool {
        state.rotation_deg = normalize_degrees(state.rotation_deg + delta);
        history.snapshot(state);
        true
    }

    fn zoom(&self, state: &mut EditState, history: &mut History, delta: f64) -> bool {
        let next = snap_scale(state.scale + delta).clamp(self.min_scale, self.max_scale);
        if next == state.scale {
            return false;
        }
        state.scale = next;
        history.snapshot(state);
        true
    }
}

/// Zoom steps land on a fixed decimal grid so that in/out sequences cancel exactly.
fn snap_scale(scale: f64) -> f64 {
    const GRID: f64 = 1e6;
    (scale * GRID).round() / GRID
}
