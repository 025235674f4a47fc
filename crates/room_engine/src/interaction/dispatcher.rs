use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::propagation::{propagate, InteractionEvent, PointerEventKind};
use super::spatial::SpatialIndex;
use super::target::{
    GroupId, HitNode, HitTarget, InteractionError, PointerInput, Rect, TargetId,
};
use crate::config::InteractionConfig;

type BackgroundClickHandler = Box<dyn FnMut(&PointerInput)>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitTestResult {
    /// Topmost node per group, highest z first.
    pub active: Vec<HitNode>,
    /// Which target represents each group that was hit.
    pub groups: HashMap<GroupId, TargetId>,
}

impl HitTestResult {
    pub fn targets(&self) -> Vec<TargetId> {
        self.active.iter().map(|node| node.target).collect()
    }
}

pub struct HitDispatcher {
    config: InteractionConfig,
    index: SpatialIndex,
    targets: HashMap<TargetId, Box<dyn HitTarget>>,
    hovered: Vec<HitNode>,
    pressed: Vec<TargetId>,
    background_click: Option<BackgroundClickHandler>,
}

impl std::fmt::Debug for HitDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HitDispatcher")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("hovered", &self.hovered)
            .field("pressed", &self.pressed)
            .finish_non_exhaustive()
    }
}

impl Default for HitDispatcher {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl HitDispatcher {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            index: SpatialIndex::new(),
            targets: HashMap::new(),
            hovered: Vec::new(),
            pressed: Vec::new(),
            background_click: None,
        }
    }

    pub fn register(
        &mut self,
        id: TargetId,
        target: Box<dyn HitTarget>,
    ) -> Result<(), InteractionError> {
        self.index.register(id)?;
        self.targets.insert(id, target);
        Ok(())
    }

    pub fn unregister(&mut self, id: TargetId) -> Result<Box<dyn HitTarget>, InteractionError> {
        self.index.remove(id)?;
        self.hovered.retain(|node| node.target != id);
        self.pressed.retain(|target| *target != id);
        self.targets
            .remove(&id)
            .ok_or(InteractionError::UnknownTarget(id))
    }

    /// Feeds a bounding-rectangle change for `id` into the spatial index.
    pub fn set_rectangle(
        &mut self,
        id: TargetId,
        rect: Option<Rect>,
    ) -> Result<bool, InteractionError> {
        self.index.update_rectangle(id, rect)
    }

    pub fn set_background_click_handler(&mut self, handler: impl FnMut(&PointerInput) + 'static) {
        self.background_click = Some(Box::new(handler));
    }

    pub fn clear_background_click_handler(&mut self) {
        self.background_click = None;
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn target(&self, id: TargetId) -> Option<&dyn HitTarget> {
        self.targets.get(&id).map(|target| target.as_ref())
    }

    pub fn hovered(&self) -> Vec<TargetId> {
        self.hovered.iter().map(|node| node.target).collect()
    }

    pub fn hit_test(&self, x: f32, y: f32) -> HitTestResult {
        let mut hits: Vec<HitNode> = self
            .index
            .query_point(x, y)
            .into_iter()
            .filter_map(|id| {
                let target = self.targets.get(&id)?;
                target.hits(x, y).then(|| HitNode {
                    target: id,
                    group: target.group(),
                    z_order: target.z_order(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.z_order.total_cmp(&a.z_order));

        let mut result = HitTestResult::default();
        for node in hits {
            if let Entry::Vacant(slot) = result.groups.entry(node.group) {
                slot.insert(node.target);
                result.active.push(node);
            }
        }
        result
    }

    pub fn click(&mut self, input: PointerInput) {
        let hit = self.hit_test(input.x, input.y);
        self.dispatch(PointerEventKind::Click, input, &hit.active, &hit.groups);
    }

    pub fn pointer_down(&mut self, input: PointerInput) {
        let hit = self.hit_test(input.x, input.y);
        self.pressed = hit.targets();
        self.dispatch(PointerEventKind::PointerDown, input, &hit.active, &hit.groups);
    }

    /// Delivers pointer-up, then a click to the targets that were both
    /// pressed and released. The pressed set is the one captured by the most
    /// recent `pointer_down`. The background handler runs only when both the
    /// press and the release landed on nothing.
    pub fn pointer_up(&mut self, input: PointerInput) {
        let hit = self.hit_test(input.x, input.y);
        let pressed: HashSet<TargetId> = self.pressed.iter().copied().collect();
        let released: Vec<HitNode> = hit
            .active
            .iter()
            .filter(|node| pressed.contains(&node.target))
            .copied()
            .collect();

        self.dispatch(PointerEventKind::PointerUp, input, &hit.active, &hit.groups);
        if !released.is_empty() {
            self.dispatch(PointerEventKind::Click, input, &released, &hit.groups);
        }

        if hit.active.is_empty() && pressed.is_empty() {
            if let Some(handler) = self.background_click.as_mut() {
                debug!(x = input.x, y = input.y, "background_click");
                handler(&input);
            }
        }
    }

    /// Updates hover state. Only the topmost node, plus anything in the
    /// cursor group, counts as hovered. A node replaced by another member of
    /// its own group gets `PointerTargetChanged` rather than `PointerOut`.
    pub fn pointer_move(&mut self, input: PointerInput) {
        let hit = self.hit_test(input.x, input.y);
        let cursor_group = self.config.cursor_group;
        let current: Vec<HitNode> = hit
            .active
            .iter()
            .enumerate()
            .filter(|(index, node)| *index == 0 || Some(node.group) == cursor_group)
            .map(|(_, node)| *node)
            .collect();

        let current_ids: HashSet<TargetId> = current.iter().map(|node| node.target).collect();
        let previous_ids: HashSet<TargetId> =
            self.hovered.iter().map(|node| node.target).collect();
        let entered: Vec<HitNode> = current
            .iter()
            .filter(|node| !previous_ids.contains(&node.target))
            .copied()
            .collect();
        let exited: Vec<HitNode> = self
            .hovered
            .iter()
            .filter(|node| !current_ids.contains(&node.target))
            .copied()
            .collect();

        let entered_groups: HashSet<GroupId> = entered.iter().map(|node| node.group).collect();
        let (changed, left): (Vec<HitNode>, Vec<HitNode>) = exited
            .into_iter()
            .partition(|node| entered_groups.contains(&node.group));

        self.hovered = current;

        if !changed.is_empty() {
            self.dispatch(
                PointerEventKind::PointerTargetChanged,
                input,
                &changed,
                &hit.groups,
            );
        }
        if !left.is_empty() {
            self.dispatch(PointerEventKind::PointerOut, input, &left, &hit.groups);
        }
        if !entered.is_empty() {
            self.dispatch(PointerEventKind::PointerOver, input, &entered, &hit.groups);
        }
    }

    fn dispatch(
        &mut self,
        kind: PointerEventKind,
        input: PointerInput,
        nodes: &[HitNode],
        groups: &HashMap<GroupId, TargetId>,
    ) {
        let mut event = InteractionEvent::new(kind, input, groups.clone());
        let targets = &mut self.targets;
        let visited = propagate(&mut event, nodes, |id, event| {
            if let Some(target) = targets.get_mut(&id) {
                deliver(target.as_mut(), event);
            }
        });
        debug!(kind = ?kind, candidates = nodes.len(), visited, "pointer_event_dispatched");
    }
}

fn deliver(target: &mut dyn HitTarget, event: &mut InteractionEvent) {
    match event.kind() {
        PointerEventKind::Click => target.on_click(event),
        PointerEventKind::PointerDown => target.on_pointer_down(event),
        PointerEventKind::PointerUp => target.on_pointer_up(event),
        PointerEventKind::PointerOver => target.on_pointer_over(event),
        PointerEventKind::PointerOut => target.on_pointer_out(event),
        PointerEventKind::PointerTargetChanged => target.on_pointer_target_changed(event),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Log = Rc<RefCell<Vec<(PointerEventKind, TargetId)>>>;

    struct Probe {
        id: TargetId,
        group: GroupId,
        z: f32,
        solid: bool,
        log: Log,
        on_visit: Option<fn(&mut InteractionEvent)>,
    }

    impl Probe {
        fn record(&mut self, event: &mut InteractionEvent) {
            self.log.borrow_mut().push((event.kind(), self.id));
            if let Some(hook) = self.on_visit {
                hook(event);
            }
        }
    }

    impl HitTarget for Probe {
        fn group(&self) -> GroupId {
            self.group
        }

        fn z_order(&self) -> f32 {
            self.z
        }

        fn hits(&self, _x: f32, _y: f32) -> bool {
            self.solid
        }

        fn on_click(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }

        fn on_pointer_down(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }

        fn on_pointer_up(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }

        fn on_pointer_over(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }

        fn on_pointer_out(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }

        fn on_pointer_target_changed(&mut self, event: &mut InteractionEvent) {
            self.record(event);
        }
    }

    struct Fixture {
        dispatcher: HitDispatcher,
        log: Log,
    }

    impl Fixture {
        fn new(config: InteractionConfig) -> Self {
            Self {
                dispatcher: HitDispatcher::new(config),
                log: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn add(&mut self, id: u64, group: u64, z: f32, rect: Rect) {
            self.add_with(id, group, z, rect, true, None);
        }

        fn add_with(
            &mut self,
            id: u64,
            group: u64,
            z: f32,
            rect: Rect,
            solid: bool,
            on_visit: Option<fn(&mut InteractionEvent)>,
        ) {
            let probe = Probe {
                id: TargetId(id),
                group: GroupId(group),
                z,
                solid,
                log: Rc::clone(&self.log),
                on_visit,
            };
            self.dispatcher
                .register(TargetId(id), Box::new(probe))
                .expect("register");
            self.dispatcher
                .set_rectangle(TargetId(id), Some(rect))
                .expect("rect");
        }

        fn take_log(&self) -> Vec<(PointerEventKind, TargetId)> {
            std::mem::take(&mut *self.log.borrow_mut())
        }
    }

    fn stop_here(event: &mut InteractionEvent) {
        event.stop_propagation();
    }

    fn only_group_three(event: &mut InteractionEvent) {
        event.skip_except([GroupId(3)]);
    }

    fn square(x: f32, y: f32) -> Rect {
        Rect::new(x, y, 10.0, 10.0)
    }

    #[test]
    fn hit_test_orders_by_descending_z() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture.add(2, 2, 5.0, square(0.0, 0.0));
        fixture.add(3, 3, 3.0, square(0.0, 0.0));

        let result = fixture.dispatcher.hit_test(5.0, 5.0);

        assert_eq!(result.targets(), vec![TargetId(2), TargetId(3), TargetId(1)]);
    }

    #[test]
    fn hit_test_collapses_group_to_topmost_member() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 7, 2.0, square(0.0, 0.0));
        fixture.add(2, 7, 1.0, square(0.0, 0.0));

        let result = fixture.dispatcher.hit_test(5.0, 5.0);

        assert_eq!(result.targets(), vec![TargetId(1)]);
        assert_eq!(result.groups.get(&GroupId(7)), Some(&TargetId(1)));
    }

    #[test]
    fn hit_test_uses_precise_check_after_rectangle_match() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add_with(1, 1, 9.0, square(0.0, 0.0), false, None);
        fixture.add(2, 2, 1.0, square(0.0, 0.0));

        assert_eq!(fixture.dispatcher.hit_test(5.0, 5.0).targets(), vec![TargetId(2)]);
    }

    #[test]
    fn hidden_rectangle_is_not_hit() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture
            .dispatcher
            .set_rectangle(TargetId(1), None)
            .expect("hide");

        assert!(fixture.dispatcher.hit_test(5.0, 5.0).active.is_empty());
    }

    #[test]
    fn click_propagates_top_down_and_honors_stop() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 3.0, square(0.0, 0.0));
        fixture.add_with(
            2,
            2,
            2.0,
            square(0.0, 0.0),
            true,
            Some(stop_here),
        );
        fixture.add(3, 3, 1.0, square(0.0, 0.0));

        fixture.dispatcher.click(PointerInput::primary(5.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::Click, TargetId(1)),
                (PointerEventKind::Click, TargetId(2)),
            ]
        );
    }

    #[test]
    fn skip_except_from_top_target_limits_delivery() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add_with(
            1,
            1,
            3.0,
            square(0.0, 0.0),
            true,
            Some(only_group_three),
        );
        fixture.add(2, 2, 2.0, square(0.0, 0.0));
        fixture.add(3, 3, 1.0, square(0.0, 0.0));

        fixture.dispatcher.click(PointerInput::primary(5.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::Click, TargetId(1)),
                (PointerEventKind::Click, TargetId(3)),
            ]
        );
    }

    #[test]
    fn press_and_release_on_same_target_synthesizes_click() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));

        fixture.dispatcher.pointer_down(PointerInput::primary(2.0, 2.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(8.0, 8.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerDown, TargetId(1)),
                (PointerEventKind::PointerUp, TargetId(1)),
                (PointerEventKind::Click, TargetId(1)),
            ]
        );
    }

    #[test]
    fn release_on_other_target_does_not_click() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture.add(2, 2, 1.0, square(50.0, 0.0));

        fixture.dispatcher.pointer_down(PointerInput::primary(5.0, 5.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(55.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerDown, TargetId(1)),
                (PointerEventKind::PointerUp, TargetId(2)),
            ]
        );
    }

    #[test]
    fn background_click_fires_once_for_empty_press_and_release() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        let fired = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&fired);
        fixture
            .dispatcher
            .set_background_click_handler(move |_| *counter.borrow_mut() += 1);

        fixture.dispatcher.pointer_down(PointerInput::primary(100.0, 100.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(100.0, 100.0));

        assert_eq!(*fired.borrow(), 1);
        assert!(fixture.take_log().is_empty());
    }

    #[test]
    fn background_click_skipped_when_press_landed_on_target() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        let fired = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&fired);
        fixture
            .dispatcher
            .set_background_click_handler(move |_| *counter.borrow_mut() += 1);

        fixture.dispatcher.pointer_down(PointerInput::primary(5.0, 5.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(500.0, 500.0));

        assert_eq!(*fired.borrow(), 0);
        assert_eq!(
            fixture.take_log(),
            vec![(PointerEventKind::PointerDown, TargetId(1))]
        );
    }

    #[test]
    fn pressed_set_persists_until_next_pointer_down() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture.add(2, 2, 1.0, square(50.0, 0.0));

        fixture.dispatcher.pointer_down(PointerInput::primary(5.0, 5.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(5.0, 5.0));
        fixture.take_log();

        fixture.dispatcher.pointer_up(PointerInput::primary(5.0, 5.0));
        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerUp, TargetId(1)),
                (PointerEventKind::Click, TargetId(1)),
            ]
        );

        fixture.dispatcher.pointer_down(PointerInput::primary(55.0, 5.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(5.0, 5.0));
        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerDown, TargetId(2)),
                (PointerEventKind::PointerUp, TargetId(1)),
            ]
        );
    }

    #[test]
    fn equal_z_hits_keep_spatial_query_order() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 2.0, square(0.0, 0.0));
        fixture.add(2, 2, 2.0, square(2.0, 2.0));
        fixture.add(3, 3, 2.0, square(4.0, 4.0));
        fixture.add(4, 4, 5.0, square(0.0, 0.0));

        let queried: Vec<TargetId> = fixture
            .dispatcher
            .index
            .query_point(6.0, 6.0)
            .into_iter()
            .filter(|id| *id != TargetId(4))
            .collect();
        let result = fixture.dispatcher.hit_test(6.0, 6.0);

        assert_eq!(result.active[0].target, TargetId(4));
        assert_eq!(result.targets()[1..].to_vec(), queried);
    }

    #[test]
    fn background_click_skipped_when_release_lands_on_target() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        let fired = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&fired);
        fixture
            .dispatcher
            .set_background_click_handler(move |_| *counter.borrow_mut() += 1);

        fixture.dispatcher.pointer_down(PointerInput::primary(100.0, 100.0));
        fixture.dispatcher.pointer_up(PointerInput::primary(5.0, 5.0));

        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn moving_between_groups_fires_out_then_over() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture.add(2, 2, 1.0, square(20.0, 0.0));

        fixture.dispatcher.pointer_move(PointerInput::primary(5.0, 5.0));
        fixture.take_log();
        fixture.dispatcher.pointer_move(PointerInput::primary(25.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerOut, TargetId(1)),
                (PointerEventKind::PointerOver, TargetId(2)),
            ]
        );
        assert_eq!(fixture.dispatcher.hovered(), vec![TargetId(2)]);
    }

    #[test]
    fn moving_within_group_fires_target_changed_instead_of_out() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 4, 1.0, square(0.0, 0.0));
        fixture.add(2, 4, 1.0, square(20.0, 0.0));

        fixture.dispatcher.pointer_move(PointerInput::primary(5.0, 5.0));
        fixture.take_log();
        fixture.dispatcher.pointer_move(PointerInput::primary(25.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerTargetChanged, TargetId(1)),
                (PointerEventKind::PointerOver, TargetId(2)),
            ]
        );
    }

    #[test]
    fn staying_on_target_fires_nothing() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));

        fixture.dispatcher.pointer_move(PointerInput::primary(2.0, 2.0));
        fixture.take_log();
        fixture.dispatcher.pointer_move(PointerInput::primary(3.0, 3.0));

        assert!(fixture.take_log().is_empty());
    }

    #[test]
    fn only_topmost_target_is_hovered_without_cursor_group() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 2.0, square(0.0, 0.0));
        fixture.add(2, 2, 1.0, square(0.0, 0.0));

        fixture.dispatcher.pointer_move(PointerInput::primary(5.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![(PointerEventKind::PointerOver, TargetId(1))]
        );
    }

    #[test]
    fn cursor_group_members_are_hovered_below_the_top() {
        let mut fixture = Fixture::new(InteractionConfig {
            cursor_group: Some(GroupId(99)),
        });
        fixture.add(1, 1, 2.0, square(0.0, 0.0));
        fixture.add(2, 99, 1.0, square(0.0, 0.0));
        fixture.add(3, 3, 0.5, square(0.0, 0.0));

        fixture.dispatcher.pointer_move(PointerInput::primary(5.0, 5.0));

        assert_eq!(
            fixture.take_log(),
            vec![
                (PointerEventKind::PointerOver, TargetId(1)),
                (PointerEventKind::PointerOver, TargetId(2)),
            ]
        );
    }

    #[test]
    fn unregister_clears_hover_and_rejects_unknown_ids() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        fixture.dispatcher.pointer_move(PointerInput::primary(5.0, 5.0));

        fixture.dispatcher.unregister(TargetId(1)).expect("unregister");

        assert!(fixture.dispatcher.hovered().is_empty());
        assert_eq!(fixture.dispatcher.target_count(), 0);
        assert!(matches!(
            fixture.dispatcher.unregister(TargetId(1)),
            Err(InteractionError::UnknownTarget(TargetId(1)))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut fixture = Fixture::new(InteractionConfig::default());
        fixture.add(1, 1, 1.0, square(0.0, 0.0));
        let duplicate = Probe {
            id: TargetId(1),
            group: GroupId(1),
            z: 0.0,
            solid: true,
            log: Rc::clone(&fixture.log),
            on_visit: None,
        };
        assert!(matches!(
            fixture.dispatcher.register(TargetId(1), Box::new(duplicate)),
            Err(InteractionError::DuplicateTarget(TargetId(1)))
        ));
        assert_eq!(fixture.dispatcher.target_count(), 1);
    }
}
