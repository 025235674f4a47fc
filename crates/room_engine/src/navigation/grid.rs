use serde::{Deserialize, Serialize};

use crate::tilemap::TileMap;

pub const IMPASSABLE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomPosition {
    pub room_x: i32,
    pub room_y: i32,
    pub room_z: f32,
}

impl RoomPosition {
    pub fn new(room_x: i32, room_y: i32, room_z: f32) -> Self {
        Self {
            room_x,
            room_y,
            room_z,
        }
    }
}

/// Row-major grid of walkable heights; `IMPASSABLE` marks tiles nobody can
/// stand on. Also used for the furniture overlay, which adds more negative
/// sentinels on top of the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationGrid {
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl NavigationGrid {
    pub fn from_tilemap(tilemap: &TileMap) -> Self {
        let cells = tilemap
            .tiles()
            .iter()
            .map(|tile| if tile.is_walkable() { tile.z } else { IMPASSABLE })
            .collect();
        Self {
            width: tilemap.width(),
            height: tilemap.height(),
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.index_of(x, y).is_some()
    }

    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<i32> {
        self.index_of(x, y).and_then(|index| self.cells.get(index).copied())
    }

    pub fn set(&mut self, x: i32, y: i32, value: i32) -> bool {
        match self.index_of(x, y) {
            Some(index) => {
                self.cells[index] = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Picks the entrance tile: the walkable tile on row 0 or column 0 that
    /// comes last in row-major order. With several edge openings this is
    /// not necessarily the intended door.
    pub fn locate_door(&self) -> Option<RoomPosition> {
        let mut door = None;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if x != 0 && y != 0 {
                    continue;
                }
                match self.get(x, y) {
                    Some(z) if z >= 0 => door = Some(RoomPosition::new(x, y, z as f32)),
                    _ => {}
                }
            }
        }
        door
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_marks_holes_impassable_and_keeps_heights() {
        let tilemap = TileMap::parse("x01\n0x2\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.get(0, 0), Some(IMPASSABLE));
        assert_eq!(grid.get(1, 0), Some(0));
        assert_eq!(grid.get(2, 0), Some(1));
        assert_eq!(grid.get(1, 1), Some(IMPASSABLE));
        assert_eq!(grid.get(2, 1), Some(2));
    }

    #[test]
    fn build_is_deterministic() {
        let tilemap = TileMap::parse("xx00\n0000\n0110\nx00x\n").expect("tilemap");
        let first = NavigationGrid::from_tilemap(&tilemap);
        let second = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(first, second);
    }

    #[test]
    fn stairs_tiles_stay_walkable_at_their_base_height() {
        let tilemap = TileMap::parse("11\n00\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.get(0, 1), Some(0));
    }

    #[test]
    fn get_out_of_bounds_is_none() {
        let tilemap = TileMap::parse("00\n00\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.get(0, -1), None);
        assert!(!grid.contains(-1, 0));
    }

    #[test]
    fn locate_door_finds_single_edge_opening() {
        let tilemap = TileMap::parse("xxxx\nx000\n0000\nx000\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.locate_door(), Some(RoomPosition::new(0, 2, 0.0)));
    }

    #[test]
    fn locate_door_keeps_last_edge_tile_in_row_major_order() {
        let tilemap = TileMap::parse("x0xx\nx000\n1000\nx000\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.locate_door(), Some(RoomPosition::new(0, 2, 1.0)));
    }

    #[test]
    fn locate_door_is_none_when_edges_are_closed() {
        let tilemap = TileMap::parse("xxx\nx0x\nxxx\n").expect("tilemap");
        let grid = NavigationGrid::from_tilemap(&tilemap);
        assert_eq!(grid.locate_door(), None);
    }
}
