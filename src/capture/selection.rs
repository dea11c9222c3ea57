//! Selection frame: the draggable, resizable capture rectangle.
//!
//! Pure state machine: pointer events in, geometry out. The page-side
//! overlay renders whatever `SelectionFrame` reports and forwards raw
//! pointer coordinates back into it.

use serde::{Deserialize, Serialize};

/// Smallest width or height the frame may shrink to, in pixels.
pub const MIN_DIM: i32 = 50;

/// Frame size on activation.
pub const DEFAULT_WIDTH: i32 = 500;
pub const DEFAULT_HEIGHT: i32 = 400;

/// Side length of the square hit box around each handle.
pub const HANDLE_SIZE: i32 = 10;

/// Capture rectangle in viewport pixels. Position is not clamped to the
/// viewport; size never drops below `MIN_DIM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SelectionRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(MIN_DIM),
            height: height.max(MIN_DIM),
        }
    }

    /// A `width × height` rectangle centered in the viewport.
    pub fn centered(viewport_width: i32, viewport_height: i32, width: i32, height: i32) -> Self {
        let width = width.max(MIN_DIM);
        let height = height.max(MIN_DIM);
        Self {
            x: (viewport_width - width) / 2,
            y: (viewport_height - height) / 2,
            width,
            height,
        }
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    fn clamp_size(&mut self) {
        self.width = self.width.max(MIN_DIM);
        self.height = self.height.max(MIN_DIM);
    }
}

/// One of the eight resize handles, named by compass position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    /// Center point of this handle on the given rectangle.
    pub fn anchor(&self, rect: &SelectionRect) -> (i32, i32) {
        let left = rect.x;
        let right = rect.x + rect.width;
        let top = rect.y;
        let bottom = rect.y + rect.height;
        let mid_x = rect.x + rect.width / 2;
        let mid_y = rect.y + rect.height / 2;

        match self {
            Handle::TopLeft => (left, top),
            Handle::Top => (mid_x, top),
            Handle::TopRight => (right, top),
            Handle::Right => (right, mid_y),
            Handle::BottomRight => (right, bottom),
            Handle::Bottom => (mid_x, bottom),
            Handle::BottomLeft => (left, bottom),
            Handle::Left => (left, mid_y),
        }
    }

    /// Apply a pointer delta to `rect` according to this handle's rule.
    fn apply(&self, rect: &mut SelectionRect, dx: i32, dy: i32) {
        match self {
            Handle::TopLeft => {
                rect.x += dx;
                rect.y += dy;
                rect.width -= dx;
                rect.height -= dy;
            }
            Handle::Top => {
                rect.y += dy;
                rect.height -= dy;
            }
            Handle::TopRight => {
                rect.y += dy;
                rect.width += dx;
                rect.height -= dy;
            }
            Handle::Right => {
                rect.width += dx;
            }
            Handle::BottomRight => {
                rect.width += dx;
                rect.height += dy;
            }
            Handle::Bottom => {
                rect.height += dy;
            }
            Handle::BottomLeft => {
                rect.x += dx;
                rect.width -= dx;
                rect.height += dy;
            }
            Handle::Left => {
                rect.x += dx;
                rect.width -= dx;
            }
        }
        rect.clamp_size();
    }
}

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Body,
    Handle(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interaction {
    Idle,
    Dragging { last: (i32, i32) },
    Resizing { handle: Handle, last: (i32, i32) },
}

/// Text shown in the width/height number inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInputs {
    pub width: String,
    pub height: String,
}

/// Selection frame controller. Lives for one capture session.
#[derive(Debug, Clone)]
pub struct SelectionFrame {
    rect: SelectionRect,
    interaction: Interaction,
    inputs: FrameInputs,
    visible: bool,
}

impl SelectionFrame {
    pub fn new(rect: SelectionRect) -> Self {
        Self {
            inputs: inputs_for(&rect),
            rect,
            interaction: Interaction::Idle,
            visible: true,
        }
    }

    /// Default-sized frame centered in the viewport.
    pub fn centered(viewport_width: i32, viewport_height: i32) -> Self {
        Self::new(SelectionRect::centered(
            viewport_width,
            viewport_height,
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
        ))
    }

    pub fn rect(&self) -> SelectionRect {
        self.rect
    }

    pub fn inputs(&self) -> &FrameInputs {
        &self.inputs
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.interaction, Interaction::Dragging { .. })
    }

    pub fn active_handle(&self) -> Option<Handle> {
        match self.interaction {
            Interaction::Resizing { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Hide the frame and its controls so they stay out of the capture.
    pub fn hide(&mut self) {
        self.visible = false;
        self.interaction = Interaction::Idle;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Which part of the frame sits under the pointer. Handles win over the body.
    pub fn hit_test(&self, px: i32, py: i32) -> Option<PointerTarget> {
        let half = HANDLE_SIZE / 2;
        Handle::ALL
            .iter()
            .find(|h| {
                let (ax, ay) = h.anchor(&self.rect);
                (px - ax).abs() <= half && (py - ay).abs() <= half
            })
            .map(|h| PointerTarget::Handle(*h))
            .or_else(|| self.rect.contains(px, py).then_some(PointerTarget::Body))
    }

    pub fn pointer_down(&mut self, target: PointerTarget, px: i32, py: i32) {
        if !self.visible {
            return;
        }
        self.interaction = match target {
            PointerTarget::Body => Interaction::Dragging { last: (px, py) },
            PointerTarget::Handle(handle) => Interaction::Resizing {
                handle,
                last: (px, py),
            },
        };
    }

    /// Apply the delta since the previous move. Returns true if the geometry changed.
    pub fn pointer_move(&mut self, px: i32, py: i32) -> bool {
        let before = self.rect;
        match &mut self.interaction {
            Interaction::Idle => return false,
            Interaction::Dragging { last } => {
                let (dx, dy) = (px - last.0, py - last.1);
                *last = (px, py);
                self.rect.x += dx;
                self.rect.y += dy;
            }
            Interaction::Resizing { handle, last } => {
                let (dx, dy) = (px - last.0, py - last.1);
                *last = (px, py);
                handle.apply(&mut self.rect, dx, dy);
            }
        }
        let changed = self.rect != before;
        if changed {
            self.sync_inputs();
        }
        changed
    }

    /// Ends any drag or resize, wherever the pointer is.
    pub fn pointer_up(&mut self) {
        self.interaction = Interaction::Idle;
    }

    /// Move the frame by a fixed offset.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.rect.x += dx;
        self.rect.y += dy;
    }

    /// Width field edited. Non-positive or non-numeric text is ignored.
    pub fn set_width_text(&mut self, text: &str) -> bool {
        match parse_dimension(text) {
            Some(width) => {
                self.rect.width = width.max(MIN_DIM);
                self.sync_inputs();
                true
            }
            None => {
                self.sync_inputs();
                false
            }
        }
    }

    /// Height field edited. Non-positive or non-numeric text is ignored.
    pub fn set_height_text(&mut self, text: &str) -> bool {
        match parse_dimension(text) {
            Some(height) => {
                self.rect.height = height.max(MIN_DIM);
                self.sync_inputs();
                true
            }
            None => {
                self.sync_inputs();
                false
            }
        }
    }

    fn sync_inputs(&mut self) {
        self.inputs = inputs_for(&self.rect);
    }
}

fn inputs_for(rect: &SelectionRect) -> FrameInputs {
    FrameInputs {
        width: rect.width.to_string(),
        height: rect.height.to_string(),
    }
}

fn parse_dimension(text: &str) -> Option<i32> {
    text.trim().parse::<i32>().ok().filter(|v| *v > 0)
}
