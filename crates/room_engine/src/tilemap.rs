use thiserror::Error;

const HOLE_CHARS: [char; 2] = ['x', 'X'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Floor,
    Stairs,
    Hole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub kind: TileKind,
    pub z: i32,
}

impl Tile {
    pub const HOLE: Tile = Tile {
        kind: TileKind::Hole,
        z: 0,
    };

    pub fn floor(z: i32) -> Self {
        Self {
            kind: TileKind::Floor,
            z,
        }
    }

    pub fn stairs(z: i32) -> Self {
        Self {
            kind: TileKind::Stairs,
            z,
        }
    }

    pub fn is_walkable(&self) -> bool {
        matches!(self.kind, TileKind::Floor | TileKind::Stairs)
    }

    /// Height an avatar stands at on this tile. Stairs sit half a level up.
    pub fn standing_height(&self) -> f32 {
        match self.kind {
            TileKind::Floor => self.z as f32,
            TileKind::Stairs => self.z as f32 + 0.5,
            TileKind::Hole => 0.0,
        }
    }
}

/// Tile map layout convention:
/// - Rows run along `y` (row 0 is the top of the text), columns along `x`.
/// - Tile (x, y) is stored at `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileMapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("invalid tile character {character:?} at row {row}, column {column}")]
    InvalidTile {
        row: usize,
        column: usize,
        character: char,
    },
    #[error("tile map has no rows")]
    Empty,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self, TileMapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TileMapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Parses the textual room layout: one row per line, `0`-`9` and `a`-`z`
    /// for heights 0-35, `x` for holes. Short rows are padded with holes.
    pub fn parse(raw: &str) -> Result<Self, TileMapError> {
        let rows: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.is_empty() {
            return Err(TileMapError::Empty);
        }

        let width = rows
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0);
        let height = rows.len();

        let mut heights: Vec<Option<i32>> = Vec::with_capacity(width * height);
        for (row_index, row) in rows.iter().enumerate() {
            let mut column_count = 0usize;
            for (column, character) in row.chars().enumerate() {
                heights.push(parse_tile_char(character).ok_or(TileMapError::InvalidTile {
                    row: row_index,
                    column,
                    character,
                })?);
                column_count += 1;
            }
            for _ in column_count..width {
                heights.push(None);
            }
        }

        let height_at = |x: usize, y: usize| heights[y * width + x];
        let mut tiles = Vec::with_capacity(heights.len());
        for y in 0..height {
            for x in 0..width {
                let tile = match height_at(x, y) {
                    None => Tile::HOLE,
                    Some(z) => {
                        let north = if y > 0 { height_at(x, y - 1) } else { None };
                        let west = if x > 0 { height_at(x - 1, y) } else { None };
                        if north == Some(z + 1) || west == Some(z + 1) {
                            Tile::stairs(z)
                        } else {
                            Tile::floor(z)
                        }
                    }
                };
                tiles.push(tile);
            }
        }

        Self::new(width as u32, height as u32, tiles)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<Tile> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

fn parse_tile_char(character: char) -> Option<Option<i32>> {
    if HOLE_CHARS.contains(&character) {
        return Some(None);
    }
    match character {
        '0'..='9' | 'a'..='w' | 'y' | 'z' => character.to_digit(36).map(|z| Some(z as i32)),
        _ => None,
    }
}
