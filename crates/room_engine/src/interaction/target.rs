use thiserror::Error;

use super::propagation::InteractionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u64);

/// Axis-aligned screen rectangle in pixels, `(x, y)` being the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    pub fn max(&self) -> [f32; 2] {
        [self.x + self.width, self.y + self.height]
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub x: f32,
    pub y: f32,
    pub button: PointerButton,
}

impl PointerInput {
    pub fn primary(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    pub fn secondary(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            button: PointerButton::Secondary,
        }
    }
}

/// Something on screen that can be hit by the pointer. Bounding rectangles
/// are pushed separately through the dispatcher; `hits` is the precise test
/// run after the rectangle matched.
pub trait HitTarget {
    fn group(&self) -> GroupId;
    fn z_order(&self) -> f32;
    fn hits(&self, x: f32, y: f32) -> bool;

    fn on_click(&mut self, _event: &mut InteractionEvent) {}
    fn on_pointer_down(&mut self, _event: &mut InteractionEvent) {}
    fn on_pointer_up(&mut self, _event: &mut InteractionEvent) {}
    fn on_pointer_over(&mut self, _event: &mut InteractionEvent) {}
    fn on_pointer_out(&mut self, _event: &mut InteractionEvent) {}
    /// Pointer left this target for another member of the same group.
    fn on_pointer_target_changed(&mut self, _event: &mut InteractionEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitNode {
    pub target: TargetId,
    pub group: GroupId,
    pub z_order: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("hit target {0:?} is not registered")]
    UnknownTarget(TargetId),
    #[error("hit target {0:?} is already registered")]
    DuplicateTarget(TargetId),
}
