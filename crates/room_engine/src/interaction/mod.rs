mod dispatcher;
mod propagation;
mod spatial;
mod target;

pub use dispatcher::{HitDispatcher, HitTestResult};
pub use propagation::{propagate, InteractionEvent, PointerEventKind};
pub use spatial::SpatialIndex;
pub use target::{
    GroupId, HitNode, HitTarget, InteractionError, PointerButton, PointerInput, Rect, TargetId,
};
