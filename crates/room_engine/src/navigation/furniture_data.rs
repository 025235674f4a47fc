use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::occupancy::{FurnitureInfo, FurnitureInfoError, FurnitureInfoProvider, FurnitureRef};

#[derive(Debug, Error)]
pub enum FurnitureDataError {
    #[error("failed to read furniture data at {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse furniture data at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Furniture info keyed by type name, loaded from a JSON object of
/// `{ "<type>": { "xdim": .., "ydim": .., ... } }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonFurnitureData {
    by_type: HashMap<String, FurnitureInfo>,
    by_id: HashMap<u32, String>,
}

impl JsonFurnitureData {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let by_type = serde_json::from_str::<HashMap<String, FurnitureInfo>>(raw)?;
        Ok(Self {
            by_type,
            by_id: HashMap::new(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, FurnitureDataError> {
        let raw = fs::read_to_string(path).map_err(|source| FurnitureDataError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| FurnitureDataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn insert(&mut self, type_name: impl Into<String>, info: FurnitureInfo) {
        self.by_type.insert(type_name.into(), info);
    }

    /// Lets `FurnitureRef::Id` references resolve to a type entry.
    pub fn alias_id(&mut self, id: u32, type_name: impl Into<String>) {
        self.by_id.insert(id, type_name.into());
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn get(&self, furniture: &FurnitureRef) -> Option<FurnitureInfo> {
        let type_name = match furniture {
            FurnitureRef::Type(name) => name.as_str(),
            FurnitureRef::Id(id) => self.by_id.get(id)?.as_str(),
        };
        self.by_type.get(type_name).copied()
    }
}

#[async_trait]
impl FurnitureInfoProvider for JsonFurnitureData {
    async fn furniture_info(
        &self,
        furniture: &FurnitureRef,
    ) -> Result<Option<FurnitureInfo>, FurnitureInfoError> {
        Ok(self.get(furniture))
    }
}
