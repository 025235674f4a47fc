use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::grid::{NavigationGrid, RoomPosition, IMPASSABLE};

pub const OCCUPIED_BLOCKED: i32 = IMPASSABLE;
pub const OCCUPIED_LAYABLE: i32 = -2;
pub const OCCUPIED_SITTABLE: i32 = -3;
pub const OCCUPIED_STANDABLE: i32 = -4;

static OCCUPANCY_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_occupancy_lock_poison_once(operation: &'static str) {
    if OCCUPANCY_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "occupancy lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FurnitureRef {
    Type(String),
    Id(u32),
}

impl fmt::Display for FurnitureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FurnitureRef::Type(name) => write!(f, "type:{name}"),
            FurnitureRef::Id(id) => write!(f, "id:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureInfo {
    pub xdim: u32,
    pub ydim: u32,
    #[serde(default)]
    pub defaultdir: u8,
    #[serde(default)]
    pub canstandon: bool,
    #[serde(default)]
    pub cansiton: bool,
    #[serde(default)]
    pub canlayon: bool,
}

impl FurnitureInfo {
    /// Grid value written under this piece. Lay beats sit beats stand.
    pub fn occupancy_sentinel(&self) -> i32 {
        if self.canlayon {
            OCCUPIED_LAYABLE
        } else if self.cansiton {
            OCCUPIED_SITTABLE
        } else if self.canstandon {
            OCCUPIED_STANDABLE
        } else {
            OCCUPIED_BLOCKED
        }
    }

    /// Footprint `(width, depth)` along x/y for a piece placed at `direction`.
    pub fn footprint(&self, direction: u8) -> (u32, u32) {
        let (mut width, mut depth) = (self.xdim, self.ydim);
        if is_sideways(self.defaultdir) {
            std::mem::swap(&mut width, &mut depth);
        }
        if is_sideways(direction) {
            std::mem::swap(&mut width, &mut depth);
        }
        (width, depth)
    }
}

fn is_sideways(direction: u8) -> bool {
    matches!(direction % 8, 2 | 6)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorFurniture {
    pub furniture: FurnitureRef,
    pub position: RoomPosition,
    pub direction: u8,
}

/// Everything placed in a room, classified once when it is added.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomObject {
    Avatar { position: RoomPosition, direction: u8 },
    FloorFurniture(FloorFurniture),
    WallFurniture { furniture: FurnitureRef },
}

#[derive(Debug, Error)]
pub enum FurnitureInfoError {
    #[error("furniture info unavailable for {furniture}: {reason}")]
    Unavailable {
        furniture: FurnitureRef,
        reason: String,
    },
}

#[async_trait]
pub trait FurnitureInfoProvider: Send + Sync {
    async fn furniture_info(
        &self,
        furniture: &FurnitureRef,
    ) -> Result<Option<FurnitureInfo>, FurnitureInfoError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FurnitureOccupancyEntry {
    pub furniture: FloorFurniture,
    pub info: FurnitureInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOccupancy {
    Walkable(i32),
    Blocked,
    Layable,
    Sittable,
    Standable,
}

impl TileOccupancy {
    pub fn from_grid_value(value: i32) -> Self {
        match value {
            OCCUPIED_LAYABLE => TileOccupancy::Layable,
            OCCUPIED_SITTABLE => TileOccupancy::Sittable,
            OCCUPIED_STANDABLE => TileOccupancy::Standable,
            height if height >= 0 => TileOccupancy::Walkable(height),
            _ => TileOccupancy::Blocked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FurnitureGrid {
    width: u32,
    height: u32,
    cells: Vec<Vec<FurnitureOccupancyEntry>>,
}

impl FurnitureGrid {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Vec::new(); width as usize * height as usize],
        }
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn at(&self, x: i32, y: i32) -> &[FurnitureOccupancyEntry] {
        self.index_of(x, y)
            .and_then(|index| self.cells.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn push(&mut self, x: i32, y: i32, entry: FurnitureOccupancyEntry) {
        if let Some(index) = self.index_of(x, y) {
            self.cells[index].push(entry);
        }
    }
}

/// Grid and furniture registry computed together from one furniture layout.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyOverlay {
    pub grid: NavigationGrid,
    pub furniture: FurnitureGrid,
}

impl OccupancyOverlay {
    pub fn unoccupied(base: &NavigationGrid) -> Self {
        Self {
            grid: base.clone(),
            furniture: FurnitureGrid::empty(base.width(), base.height()),
        }
    }
}

/// Rebuilds the overlay from scratch. Lookups run concurrently; the overlay
/// is assembled only once every lookup has settled. Failed lookups are
/// logged and the piece is left out.
pub async fn recompute_occupancy<P>(
    base: &NavigationGrid,
    objects: &[RoomObject],
    provider: &P,
) -> OccupancyOverlay
where
    P: FurnitureInfoProvider + ?Sized,
{
    let placed: Vec<&FloorFurniture> = objects
        .iter()
        .filter_map(|object| match object {
            RoomObject::FloorFurniture(furniture) => Some(furniture),
            RoomObject::Avatar { .. } | RoomObject::WallFurniture { .. } => None,
        })
        .collect();

    let lookups = placed.iter().map(|furniture| async move {
        let result = provider.furniture_info(&furniture.furniture).await;
        (*furniture, result)
    });
    let resolved = join_all(lookups).await;

    let mut overlay = OccupancyOverlay::unoccupied(base);
    for (furniture, result) in resolved {
        let info = match result {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug!(furniture = %furniture.furniture, "furniture_info_missing");
                continue;
            }
            Err(error) => {
                warn!(
                    furniture = %furniture.furniture,
                    error = %error,
                    "furniture_info_lookup_failed"
                );
                continue;
            }
        };
        apply_furniture(&mut overlay, furniture, info);
    }
    overlay
}

fn apply_furniture(overlay: &mut OccupancyOverlay, furniture: &FloorFurniture, info: FurnitureInfo) {
    let (width, depth) = info.footprint(furniture.direction);
    let sentinel = info.occupancy_sentinel();
    for dy in 0..depth as i32 {
        for dx in 0..width as i32 {
            let x = furniture.position.room_x + dx;
            let y = furniture.position.room_y + dy;
            if !overlay.grid.contains(x, y) {
                continue;
            }
            if !info.canstandon {
                overlay.grid.set(x, y, sentinel);
            }
            overlay.furniture.push(
                x,
                y,
                FurnitureOccupancyEntry {
                    furniture: furniture.clone(),
                    info,
                },
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancySnapshot {
    pub version: u64,
    pub grid: NavigationGrid,
    pub furniture: FurnitureGrid,
}

impl OccupancySnapshot {
    pub fn state_at(&self, x: i32, y: i32) -> Option<TileOccupancy> {
        self.grid.get(x, y).map(TileOccupancy::from_grid_value)
    }

    pub fn furniture_at(&self, x: i32, y: i32) -> &[FurnitureOccupancyEntry] {
        self.furniture.at(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecomputeToken(u64);

#[derive(Debug)]
struct OccupancyState {
    committed: Arc<OccupancySnapshot>,
    latest_token: u64,
}

/// Shared, swap-by-reference holder of the latest committed overlay.
#[derive(Clone, Debug)]
pub struct OccupancyHandle {
    base: Arc<NavigationGrid>,
    state: Arc<RwLock<OccupancyState>>,
}

impl OccupancyHandle {
    pub fn new(base: NavigationGrid) -> Self {
        let overlay = OccupancyOverlay::unoccupied(&base);
        Self {
            base: Arc::new(base),
            state: Arc::new(RwLock::new(OccupancyState {
                committed: Arc::new(OccupancySnapshot {
                    version: 0,
                    grid: overlay.grid,
                    furniture: overlay.furniture,
                }),
                latest_token: 0,
            })),
        }
    }

    pub fn base(&self) -> &NavigationGrid {
        &self.base
    }

    pub fn snapshot(&self) -> Arc<OccupancySnapshot> {
        match self.state.read() {
            Ok(guard) => Arc::clone(&guard.committed),
            Err(poisoned) => {
                warn_occupancy_lock_poison_once("read");
                Arc::clone(&poisoned.into_inner().committed)
            }
        }
    }

    pub fn begin_recompute(&self) -> RecomputeToken {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_occupancy_lock_poison_once("begin");
                poisoned.into_inner()
            }
        };
        guard.latest_token = guard.latest_token.saturating_add(1);
        RecomputeToken(guard.latest_token)
    }

    /// Publishes `overlay` if `token` is still the newest request. Results
    /// from superseded requests are dropped.
    pub fn commit(&self, token: RecomputeToken, overlay: OccupancyOverlay) -> bool {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_occupancy_lock_poison_once("commit");
                poisoned.into_inner()
            }
        };
        if token.0 != guard.latest_token {
            warn!(
                token = token.0,
                latest_token = guard.latest_token,
                "occupancy_recompute_discarded"
            );
            return false;
        }
        guard.committed = Arc::new(OccupancySnapshot {
            version: token.0,
            grid: overlay.grid,
            furniture: overlay.furniture,
        });
        info!(version = token.0, "occupancy_committed");
        true
    }

    pub async fn recompute<P>(&self, objects: &[RoomObject], provider: &P) -> bool
    where
        P: FurnitureInfoProvider + ?Sized,
    {
        let token = self.begin_recompute();
        let overlay = recompute_occupancy(&self.base, objects, provider).await;
        self.commit(token, overlay)
    }
}
