mod furniture_data;
mod grid;
mod occupancy;
mod path;
mod search;

pub use furniture_data::{FurnitureDataError, JsonFurnitureData};
pub use grid::{NavigationGrid, RoomPosition, IMPASSABLE};
pub use occupancy::{
    recompute_occupancy, FloorFurniture, FurnitureGrid, FurnitureInfo, FurnitureInfoError,
    FurnitureInfoProvider, FurnitureOccupancyEntry, FurnitureRef, OccupancyHandle,
    OccupancyOverlay, OccupancySnapshot, RecomputeToken, RoomObject, TileOccupancy,
    OCCUPIED_BLOCKED, OCCUPIED_LAYABLE, OCCUPIED_SITTABLE, OCCUPIED_STANDABLE,
};
pub use path::{direction_between, PathError, PathResolver, PathStep};
pub use search::{find_tile_path, SearchOptions, TileCoord};
