use super::grid::NavigationGrid;

const ORTHOGONAL_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions<'a> {
    pub acceptable_tiles: &'a [i32],
    pub allow_diagonal: bool,
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    coord: TileCoord,
    h_cost: u32,
    f_cost: u32,
    insertion_order: u64,
}

impl OpenNode {
    /// Cheapest node first; equal costs go to the upper-left tile, then to
    /// whichever was pushed earlier.
    fn expansion_key(&self) -> (u32, u32, i32, i32, u64) {
        (
            self.f_cost,
            self.h_cost,
            self.coord.y,
            self.coord.x,
            self.insertion_order,
        )
    }
}

/// A* over grid values. Only tiles whose value is in `acceptable_tiles` can
/// be entered; the start tile is exempt so a search can leave a seat.
/// Returns the waypoints from `start` to `goal` inclusive.
pub fn find_tile_path(
    grid: &NavigationGrid,
    start: TileCoord,
    goal: TileCoord,
    options: SearchOptions<'_>,
) -> Option<Vec<TileCoord>> {
    let start_index = grid.index_of(start.x, start.y)?;
    if !is_acceptable(grid, goal, options) {
        return None;
    }

    if start == goal {
        return Some(vec![start]);
    }

    let node_count = grid.cells().len();
    let mut closed = vec![false; node_count];
    let mut best_g = vec![u32::MAX; node_count];
    let mut came_from: Vec<Option<TileCoord>> = vec![None; node_count];
    let mut open = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = heuristic(start, goal, options.allow_diagonal);
    open.push(OpenNode {
        coord: start,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion = next_insertion.saturating_add(1);
    best_g[start_index] = 0;

    while let Some(slot) = open
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| node.expansion_key())
        .map(|(slot, _)| slot)
    {
        let current = open.swap_remove(slot);
        let Some(current_index) = grid.index_of(current.coord.x, current.coord.y) else {
            continue;
        };
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if current.coord == goal {
            return walk_back(grid, &came_from, start, goal);
        }

        let current_g = best_g[current_index];
        for (neighbor, step_cost) in neighbors(grid, current.coord, options) {
            let Some(neighbor_index) = grid.index_of(neighbor.x, neighbor.y) else {
                continue;
            };
            if closed[neighbor_index] {
                continue;
            }

            let tentative_g = current_g.saturating_add(step_cost);
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            came_from[neighbor_index] = Some(current.coord);
            let h_cost = heuristic(neighbor, goal, options.allow_diagonal);
            open.push(OpenNode {
                coord: neighbor,
                h_cost,
                f_cost: tentative_g.saturating_add(h_cost),
                insertion_order: next_insertion,
            });
            next_insertion = next_insertion.saturating_add(1);
        }
    }

    None
}

fn is_acceptable(grid: &NavigationGrid, coord: TileCoord, options: SearchOptions<'_>) -> bool {
    grid.get(coord.x, coord.y)
        .map(|value| options.acceptable_tiles.contains(&value))
        .unwrap_or(false)
}

fn neighbors(
    grid: &NavigationGrid,
    coord: TileCoord,
    options: SearchOptions<'_>,
) -> Vec<(TileCoord, u32)> {
    let offset = |dx: i32, dy: i32| TileCoord {
        x: coord.x + dx,
        y: coord.y + dy,
    };
    let mut result = Vec::with_capacity(8);
    for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
        let next = offset(dx, dy);
        if is_acceptable(grid, next, options) {
            result.push((next, ORTHOGONAL_COST));
        }
    }
    if options.allow_diagonal {
        for (dx, dy) in [(1, -1), (1, 1), (-1, 1), (-1, -1)] {
            let next = offset(dx, dy);
            let corners_open = is_acceptable(grid, offset(dx, 0), options)
                && is_acceptable(grid, offset(0, dy), options);
            if corners_open && is_acceptable(grid, next, options) {
                result.push((next, DIAGONAL_COST));
            }
        }
    }
    result
}

/// Follows `came_from` links from `goal` back to `start`.
fn walk_back(
    grid: &NavigationGrid,
    came_from: &[Option<TileCoord>],
    start: TileCoord,
    goal: TileCoord,
) -> Option<Vec<TileCoord>> {
    let mut route: Vec<TileCoord> = std::iter::successors(Some(goal), |coord| {
        if *coord == start {
            return None;
        }
        grid.index_of(coord.x, coord.y)
            .and_then(|index| came_from.get(index).copied().flatten())
    })
    .collect();
    if route.last() != Some(&start) {
        return None;
    }
    route.reverse();
    Some(route)
}

fn heuristic(a: TileCoord, b: TileCoord, allow_diagonal: bool) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    if allow_diagonal {
        let (long, short) = (dx.max(dy), dx.min(dy));
        ORTHOGONAL_COST
            .saturating_mul(long)
            .saturating_add((DIAGONAL_COST - ORTHOGONAL_COST).saturating_mul(short))
    } else {
        ORTHOGONAL_COST.saturating_mul(dx.saturating_add(dy))
    }
}
