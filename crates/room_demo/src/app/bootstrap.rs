use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use room_engine::{
    FloorFurniture, FurnitureInfo, InteractionConfig, JsonFurnitureData, NavigationConfig, TileMap,
};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::session::FURNITURE_GROUP;

const TILEMAP_ENV_VAR: &str = "ROOM_DEMO_TILEMAP";
const FURNITURE_ENV_VAR: &str = "ROOM_DEMO_FURNITURE";

const DEFAULT_TILEMAP: &str = "\
xxxxxxxx
00000000
x0000000
x0000011
x0000011
x0000000
";

const DEFAULT_LAYOUT: &str = r#"{
    "definitions": {
        "table": { "xdim": 2, "ydim": 1 },
        "chair": { "xdim": 1, "ydim": 1, "cansiton": true },
        "bed": { "xdim": 1, "ydim": 2, "canlayon": true },
        "rug": { "xdim": 2, "ydim": 2, "canstandon": true }
    },
    "placements": [
        { "furniture": { "Type": "table" }, "position": { "room_x": 3, "room_y": 2, "room_z": 0.0 }, "direction": 0 },
        { "furniture": { "Type": "chair" }, "position": { "room_x": 3, "room_y": 3, "room_z": 0.0 }, "direction": 0 },
        { "furniture": { "Type": "bed" }, "position": { "room_x": 1, "room_y": 4, "room_z": 0.0 }, "direction": 2 },
        { "furniture": { "Type": "rug" }, "position": { "room_x": 5, "room_y": 1, "room_z": 0.0 }, "direction": 0 }
    ]
}"#;

/// Furniture definitions plus where each piece stands in the room.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RoomLayout {
    #[serde(default)]
    pub(crate) definitions: HashMap<String, FurnitureInfo>,
    #[serde(default)]
    pub(crate) placements: Vec<FloorFurniture>,
}

impl RoomLayout {
    pub(crate) fn furniture_data(&self) -> JsonFurnitureData {
        let mut data = JsonFurnitureData::default();
        for (type_name, info) in &self.definitions {
            data.insert(type_name.clone(), *info);
        }
        data
    }
}

pub(crate) struct DemoWiring {
    pub(crate) tilemap: TileMap,
    pub(crate) layout: RoomLayout,
    pub(crate) navigation: NavigationConfig,
    pub(crate) interaction: InteractionConfig,
}

pub(crate) fn build_demo() -> Result<DemoWiring, String> {
    init_tracing();
    info!("=== Room Demo Startup ===");

    let tilemap = load_tilemap(path_from_env(TILEMAP_ENV_VAR).as_deref())?;
    let layout = load_layout(path_from_env(FURNITURE_ENV_VAR).as_deref())?;
    info!(
        width = tilemap.width(),
        height = tilemap.height(),
        definitions = layout.definitions.len(),
        placements = layout.placements.len(),
        "room_loaded"
    );

    Ok(DemoWiring {
        tilemap,
        layout,
        navigation: NavigationConfig::default(),
        interaction: InteractionConfig {
            cursor_group: Some(FURNITURE_GROUP),
        },
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn path_from_env(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn load_tilemap(path: Option<&Path>) -> Result<TileMap, String> {
    let raw = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|error| format!("read tilemap '{}': {error}", path.display()))?,
        None => DEFAULT_TILEMAP.to_string(),
    };
    TileMap::parse(&raw).map_err(|error| format!("parse tilemap: {error}"))
}

fn load_layout(path: Option<&Path>) -> Result<RoomLayout, String> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|error| format!("read furniture '{}': {error}", path.display()))?;
            parse_layout_json(&raw)
        }
        None => parse_layout_json(DEFAULT_LAYOUT),
    }
}

pub(crate) fn parse_layout_json(raw: &str) -> Result<RoomLayout, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, RoomLayout>(&mut deserializer) {
        Ok(layout) => Ok(layout),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse furniture json: {source}"))
            } else {
                Err(format!("parse furniture json at {path}: {source}"))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn default_wiring() -> DemoWiring {
    DemoWiring {
        tilemap: TileMap::parse(DEFAULT_TILEMAP).expect("default tilemap"),
        layout: parse_layout_json(DEFAULT_LAYOUT).expect("default layout"),
        navigation: NavigationConfig::default(),
        interaction: InteractionConfig {
            cursor_group: Some(FURNITURE_GROUP),
        },
    }
}
