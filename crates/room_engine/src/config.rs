use crate::interaction::GroupId;

pub const DEFAULT_ACCEPTABLE_TILES: [i32; 2] = [0, 1];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationConfig {
    /// Grid values a path may enter. Floors above height 1 are unreachable
    /// unless their height is listed here.
    pub acceptable_tiles: Vec<i32>,
    pub allow_diagonal: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            acceptable_tiles: DEFAULT_ACCEPTABLE_TILES.to_vec(),
            allow_diagonal: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionConfig {
    /// Group whose members receive hover events even when not topmost.
    pub cursor_group: Option<GroupId>,
}
