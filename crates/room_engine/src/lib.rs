pub mod config;
pub mod interaction;
pub mod navigation;
pub mod tilemap;

pub use config::{InteractionConfig, NavigationConfig, DEFAULT_ACCEPTABLE_TILES};
pub use interaction::{
    GroupId, HitDispatcher, HitNode, HitTarget, HitTestResult, InteractionError,
    InteractionEvent, PointerButton, PointerEventKind, PointerInput, Rect, TargetId,
};
pub use navigation::{
    direction_between, find_tile_path, recompute_occupancy, FloorFurniture, FurnitureGrid,
    FurnitureInfo, FurnitureInfoError, FurnitureInfoProvider, FurnitureRef, JsonFurnitureData,
    NavigationGrid, OccupancyHandle, OccupancyOverlay, OccupancySnapshot, PathError,
    PathResolver, PathStep, RoomObject, RoomPosition, TileCoord, TileOccupancy,
};
pub use tilemap::{Tile, TileKind, TileMap, TileMapError};
