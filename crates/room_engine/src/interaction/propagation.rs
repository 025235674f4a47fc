use std::collections::{HashMap, HashSet};

use super::target::{GroupId, HitNode, PointerInput, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    Click,
    PointerDown,
    PointerUp,
    PointerOver,
    PointerOut,
    PointerTargetChanged,
}

/// One input event as seen by every target it is delivered to. Targets can
/// narrow delivery for the targets that come after them.
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    kind: PointerEventKind,
    input: PointerInput,
    groups: HashMap<GroupId, TargetId>,
    stopped: bool,
    skipped: HashSet<GroupId>,
    allowed: HashSet<GroupId>,
}

impl InteractionEvent {
    pub fn new(
        kind: PointerEventKind,
        input: PointerInput,
        groups: HashMap<GroupId, TargetId>,
    ) -> Self {
        Self {
            kind,
            input,
            groups,
            stopped: false,
            skipped: HashSet::new(),
            allowed: HashSet::new(),
        }
    }

    pub fn kind(&self) -> PointerEventKind {
        self.kind
    }

    pub fn input(&self) -> PointerInput {
        self.input
    }

    /// Topmost target hit for `group` in the hit-test behind this event.
    pub fn group_target(&self, group: GroupId) -> Option<TargetId> {
        self.groups.get(&group).copied()
    }

    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }

    pub fn skip(&mut self, groups: impl IntoIterator<Item = GroupId>) {
        self.skipped.extend(groups);
    }

    /// Restricts the rest of the walk to `groups`; overrides `skip`.
    pub fn skip_except(&mut self, groups: impl IntoIterator<Item = GroupId>) {
        self.allowed.extend(groups);
    }

    fn admits(&self, group: GroupId) -> bool {
        if !self.allowed.is_empty() {
            return self.allowed.contains(&group);
        }
        !self.skipped.contains(&group)
    }
}

/// Walks `nodes` in order, handing `event` to `visit` for each admitted
/// node. Filters are re-checked per node, so changes only affect nodes not
/// yet reached. Returns how many nodes were visited.
pub fn propagate<F>(event: &mut InteractionEvent, nodes: &[HitNode], mut visit: F) -> usize
where
    F: FnMut(TargetId, &mut InteractionEvent),
{
    let mut visited = 0usize;
    for node in nodes {
        if event.is_propagation_stopped() {
            break;
        }
        if !event.admits(node.group) {
            continue;
        }
        visit(node.target, event);
        visited = visited.saturating_add(1);
    }
    visited
}
