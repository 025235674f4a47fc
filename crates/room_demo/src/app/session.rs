use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use futures::executor::block_on;
use room_engine::{
    FloorFurniture, GroupId, HitDispatcher, HitTarget, InteractionConfig, InteractionEvent,
    NavigationConfig, NavigationGrid, OccupancyHandle, PathResolver, PathStep, PointerButton,
    PointerInput, Rect,
    RoomObject, RoomPosition, TargetId, TileMap, TileOccupancy,
};
use tracing::{debug, info};

use super::bootstrap::RoomLayout;

pub(crate) const FLOOR_GROUP: GroupId = GroupId(1);
pub(crate) const FURNITURE_GROUP: GroupId = GroupId(2);

const TILE_HALF_WIDTH: f32 = 32.0;
const TILE_HALF_HEIGHT: f32 = 16.0;
const SPRITE_HEIGHT: f32 = 32.0;

type WalkRequests = Rc<RefCell<Vec<RoomPosition>>>;

/// Screen position of the top corner of a tile's diamond.
pub(crate) fn tile_to_screen(x: i32, y: i32, z: f32) -> (f32, f32) {
    (
        (x - y) as f32 * TILE_HALF_WIDTH,
        (x + y) as f32 * TILE_HALF_HEIGHT - z * TILE_HALF_HEIGHT * 2.0,
    )
}

pub(crate) fn tile_center(x: i32, y: i32, z: f32) -> (f32, f32) {
    let (screen_x, screen_y) = tile_to_screen(x, y, z);
    (screen_x, screen_y + TILE_HALF_HEIGHT)
}

fn tile_bounds(position: RoomPosition) -> Rect {
    let (screen_x, screen_y) = tile_to_screen(position.room_x, position.room_y, position.room_z);
    Rect::new(
        screen_x - TILE_HALF_WIDTH,
        screen_y,
        TILE_HALF_WIDTH * 2.0,
        TILE_HALF_HEIGHT * 2.0,
    )
}

/// Box around every tile of a footprint, extended upwards by the sprite height.
fn sprite_bounds(origin: RoomPosition, (width, depth): (u32, u32)) -> Rect {
    let far_x = origin.room_x + width.max(1) as i32 - 1;
    let far_y = origin.room_y + depth.max(1) as i32 - 1;
    let (left, _) = tile_to_screen(origin.room_x, far_y, origin.room_z);
    let (right, _) = tile_to_screen(far_x, origin.room_y, origin.room_z);
    let (_, top) = tile_to_screen(origin.room_x, origin.room_y, origin.room_z);
    let (_, bottom) = tile_to_screen(far_x, far_y, origin.room_z);
    let top = top - SPRITE_HEIGHT;
    Rect::new(
        left - TILE_HALF_WIDTH,
        top,
        right - left + TILE_HALF_WIDTH * 2.0,
        bottom + TILE_HALF_HEIGHT * 2.0 - top,
    )
}

struct FloorTile {
    position: RoomPosition,
    requests: WalkRequests,
}

impl HitTarget for FloorTile {
    fn group(&self) -> GroupId {
        FLOOR_GROUP
    }

    fn z_order(&self) -> f32 {
        (self.position.room_x + self.position.room_y) as f32
    }

    fn hits(&self, x: f32, y: f32) -> bool {
        let (center_x, center_y) = tile_center(
            self.position.room_x,
            self.position.room_y,
            self.position.room_z,
        );
        (x - center_x).abs() / TILE_HALF_WIDTH + (y - center_y).abs() / TILE_HALF_HEIGHT <= 1.0
    }

    fn on_click(&mut self, _event: &mut InteractionEvent) {
        self.requests.borrow_mut().push(self.position);
    }

    fn on_pointer_over(&mut self, _event: &mut InteractionEvent) {
        debug!(
            x = self.position.room_x,
            y = self.position.room_y,
            "floor_tile_hovered"
        );
    }
}

struct FurnitureSprite {
    placement: FloorFurniture,
    bounds: Rect,
    requests: WalkRequests,
}

impl HitTarget for FurnitureSprite {
    fn group(&self) -> GroupId {
        FURNITURE_GROUP
    }

    fn z_order(&self) -> f32 {
        (self.placement.position.room_x + self.placement.position.room_y) as f32 + 0.5
    }

    fn hits(&self, x: f32, y: f32) -> bool {
        self.bounds.contains(x, y)
    }

    fn on_click(&mut self, event: &mut InteractionEvent) {
        match event.input().button {
            PointerButton::Primary => {
                self.requests.borrow_mut().push(self.placement.position);
                event.skip([FLOOR_GROUP]);
            }
            PointerButton::Secondary => {
                info!(
                    furniture = %self.placement.furniture,
                    x = self.placement.position.room_x,
                    y = self.placement.position.room_y,
                    direction = self.placement.direction,
                    "furniture_inspected"
                );
                event.stop_propagation();
            }
        }
    }

    fn on_pointer_over(&mut self, _event: &mut InteractionEvent) {
        info!(furniture = %self.placement.furniture, "furniture_hovered");
    }

    fn on_pointer_out(&mut self, _event: &mut InteractionEvent) {
        info!(furniture = %self.placement.furniture, "furniture_unhovered");
    }
}

/// A single room: navigation state plus the hit targets drawn for it.
pub(crate) struct RoomSession {
    occupancy: OccupancyHandle,
    resolver: PathResolver,
    dispatcher: HitDispatcher,
    requests: WalkRequests,
    door: Option<RoomPosition>,
    next_target: u64,
}

impl RoomSession {
    pub(crate) fn new(
        tilemap: TileMap,
        navigation: NavigationConfig,
        interaction: InteractionConfig,
    ) -> Result<Self, String> {
        let tilemap = Arc::new(tilemap);
        let base = NavigationGrid::from_tilemap(&tilemap);
        let door = base.locate_door();
        let occupancy = OccupancyHandle::new(base);
        let resolver = PathResolver::new(Arc::clone(&tilemap), occupancy.clone(), navigation);

        let mut dispatcher = HitDispatcher::new(interaction);
        dispatcher.set_background_click_handler(|input: &PointerInput| {
            info!(x = input.x, y = input.y, "background_clicked");
        });

        let mut session = Self {
            occupancy,
            resolver,
            dispatcher,
            requests: Rc::new(RefCell::new(Vec::new())),
            door,
            next_target: 0,
        };
        session.register_floor(&tilemap)?;
        Ok(session)
    }

    fn allocate_target(&mut self) -> TargetId {
        self.next_target = self.next_target.saturating_add(1);
        TargetId(self.next_target)
    }

    fn register_floor(&mut self, tilemap: &TileMap) -> Result<(), String> {
        for y in 0..tilemap.height() as i32 {
            for x in 0..tilemap.width() as i32 {
                let Some(tile) = tilemap.tile_at(x, y).filter(|tile| tile.is_walkable()) else {
                    continue;
                };
                let position = RoomPosition::new(x, y, tile.z as f32);
                let id = self.allocate_target();
                let floor = FloorTile {
                    position,
                    requests: Rc::clone(&self.requests),
                };
                self.dispatcher
                    .register(id, Box::new(floor))
                    .map_err(|error| error.to_string())?;
                self.dispatcher
                    .set_rectangle(id, Some(tile_bounds(position)))
                    .map_err(|error| error.to_string())?;
            }
        }
        Ok(())
    }

    /// Recomputes occupancy for `layout` and gives every known piece a sprite.
    /// Returns whether the recomputed grid was committed.
    pub(crate) fn furnish(&mut self, layout: &RoomLayout) -> Result<bool, String> {
        let data = layout.furniture_data();
        let objects: Vec<RoomObject> = layout
            .placements
            .iter()
            .cloned()
            .map(RoomObject::FloorFurniture)
            .collect();
        let committed = block_on(self.occupancy.recompute(&objects, &data));

        let mut sprites = 0usize;
        for placement in &layout.placements {
            let Some(info) = data.get(&placement.furniture) else {
                continue;
            };
            let bounds = sprite_bounds(placement.position, info.footprint(placement.direction));
            let id = self.allocate_target();
            let sprite = FurnitureSprite {
                placement: placement.clone(),
                bounds,
                requests: Rc::clone(&self.requests),
            };
            self.dispatcher
                .register(id, Box::new(sprite))
                .map_err(|error| error.to_string())?;
            self.dispatcher
                .set_rectangle(id, Some(bounds))
                .map_err(|error| error.to_string())?;
            sprites += 1;
        }
        info!(
            sprites,
            committed,
            targets = self.dispatcher.target_count(),
            "room_furnished"
        );
        Ok(committed)
    }

    pub(crate) fn door(&self) -> Option<RoomPosition> {
        self.door
    }

    pub(crate) fn tile_state(&self, x: i32, y: i32) -> Option<TileOccupancy> {
        self.occupancy.snapshot().state_at(x, y)
    }

    pub(crate) fn hover(&mut self, x: f32, y: f32) {
        self.dispatcher.pointer_move(PointerInput::primary(x, y));
    }

    pub(crate) fn hovered(&self) -> Vec<TargetId> {
        self.dispatcher.hovered()
    }

    pub(crate) fn tap(&mut self, x: f32, y: f32) {
        self.press_and_release(PointerInput::primary(x, y));
    }

    /// Secondary-button tap: furniture reports itself instead of queuing a walk.
    pub(crate) fn inspect(&mut self, x: f32, y: f32) {
        self.press_and_release(PointerInput::secondary(x, y));
    }

    fn press_and_release(&mut self, input: PointerInput) {
        self.dispatcher.pointer_down(input);
        self.dispatcher.pointer_up(input);
    }

    pub(crate) fn take_walk_requests(&self) -> Vec<RoomPosition> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }

    pub(crate) fn route_from_door(&self, target: RoomPosition) -> Result<Vec<PathStep>, String> {
        let door = self.door.ok_or_else(|| "room has no door tile".to_string())?;
        self.resolver
            .find_path(door, target)
            .map_err(|error| error.to_string())
    }
}
