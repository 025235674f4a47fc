use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::grid::RoomPosition;
use super::occupancy::OccupancyHandle;
use super::search::{find_tile_path, SearchOptions, TileCoord};
use crate::config::NavigationConfig;
use crate::tilemap::TileMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub position: RoomPosition,
    /// Compass index 0-7, clockwise from north (0 = y-1, 2 = x+1).
    pub direction: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("no compass direction for step delta ({dx}, {dy})")]
    UnknownDirection { dx: i32, dy: i32 },
}

/// Compass direction of a single step, from the sign of each axis delta.
pub fn direction_between(from: TileCoord, to: TileCoord) -> Result<u8, PathError> {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    match (dx, dy) {
        (0, -1) => Ok(0),
        (1, -1) => Ok(1),
        (1, 0) => Ok(2),
        (1, 1) => Ok(3),
        (0, 1) => Ok(4),
        (-1, 1) => Ok(5),
        (-1, 0) => Ok(6),
        (-1, -1) => Ok(7),
        _ => Err(PathError::UnknownDirection { dx, dy }),
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    tilemap: Arc<TileMap>,
    occupancy: OccupancyHandle,
    config: NavigationConfig,
}

impl PathResolver {
    pub fn new(tilemap: Arc<TileMap>, occupancy: OccupancyHandle, config: NavigationConfig) -> Self {
        Self {
            tilemap,
            occupancy,
            config,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Routes from `origin` to `target` over the latest committed occupancy
    /// grid. An empty path means there is nowhere to go; errors are reserved
    /// for search results that cannot be turned into compass steps.
    pub fn find_path(
        &self,
        origin: RoomPosition,
        target: RoomPosition,
    ) -> Result<Vec<PathStep>, PathError> {
        let snapshot = self.occupancy.snapshot();
        let Some(target_value) = snapshot.grid.get(target.room_x, target.room_y) else {
            debug!(
                target_x = target.room_x,
                target_y = target.room_y,
                "path_target_out_of_bounds"
            );
            return Ok(Vec::new());
        };

        // Furniture you can sit, lay or stand on is a valid destination.
        let grid = if target_value < -1 {
            let mut patched = snapshot.grid.clone();
            patched.set(target.room_x, target.room_y, 0);
            Cow::Owned(patched)
        } else {
            Cow::Borrowed(&snapshot.grid)
        };

        let start = TileCoord {
            x: origin.room_x,
            y: origin.room_y,
        };
        let goal = TileCoord {
            x: target.room_x,
            y: target.room_y,
        };
        let options = SearchOptions {
            acceptable_tiles: &self.config.acceptable_tiles,
            allow_diagonal: self.config.allow_diagonal,
        };
        let Some(waypoints) = find_tile_path(&grid, start, goal, options) else {
            debug!(
                origin_x = origin.room_x,
                origin_y = origin.room_y,
                target_x = target.room_x,
                target_y = target.room_y,
                "path_not_found"
            );
            return Ok(Vec::new());
        };

        let mut steps = Vec::with_capacity(waypoints.len().saturating_sub(1));
        for pair in waypoints.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            steps.push(PathStep {
                position: RoomPosition::new(current.x, current.y, self.standing_height(current)),
                direction: direction_between(previous, current)?,
            });
        }
        debug!(
            version = snapshot.version,
            step_count = steps.len(),
            "path_resolved"
        );
        Ok(steps)
    }

    fn standing_height(&self, coord: TileCoord) -> f32 {
        self.tilemap
            .tile_at(coord.x, coord.y)
            .map(|tile| tile.standing_height())
            .unwrap_or(0.0)
    }
}
