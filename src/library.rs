use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::{MatchError, Result};
use crate::model::{Collection, Item};

pub const DEFAULT_COLLECTION_ID: &str = "default-class";

/// Built-in class used until a caregiver authors their own.
pub fn default_collection() -> Collection {
    let item = |id: &str, name: &str, pic: u32, hint: &str| Item {
        image: format!("https://picsum.photos/id/{pic}/300/300"),
        ..Item::new(id, name, hint)
    };
    Collection {
        id: DEFAULT_COLLECTION_ID.to_string(),
        name: "認識班上同學".to_string(),
        items: vec![
            item("1", "小明", 1, "戴著藍色眼鏡的男生"),
            item("2", "美美", 64, "綁著馬尾的女生"),
            item("3", "阿豪", 103, "笑得很開心的男生"),
        ],
    }
}

/// Rejects collections the engine cannot play: no items, an empty name
/// (zero slots) or two items sharing an id.
pub fn validate_collection(collection: &Collection) -> Result<()> {
    if collection.items.is_empty() {
        return Err(MatchError::InvalidCollection(format!(
            "collection '{}' has no items",
            collection.id
        )));
    }
    let mut seen = HashSet::new();
    for item in &collection.items {
        if item.name.is_empty() {
            return Err(MatchError::InvalidCollection(format!(
                "item '{}' has an empty name",
                item.id
            )));
        }
        if !seen.insert(item.id.as_str()) {
            return Err(MatchError::InvalidCollection(format!(
                "duplicate item id '{}'",
                item.id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct LibraryFile {
    #[serde(default)]
    active_collection_id: Option<String>,
    #[serde(default)]
    collections: Vec<Collection>,
}

pub trait CollectionStore {
    fn load_collections(&self) -> Vec<Collection>;
    fn save_collections(&self, collections: &[Collection]) -> Result<()>;
    fn active_collection_id(&self) -> String;
    fn set_active_collection_id(&self, id: &str) -> Result<()>;

    fn active_collection(&self) -> Result<Collection> {
        let id = self.active_collection_id();
        self.load_collections()
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(MatchError::UnknownCollection(id))
    }
}

#[derive(Debug, Clone)]
pub struct FileCollectionStore {
    path: PathBuf,
}

impl FileCollectionStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_file("collections.json")
            .unwrap_or_else(|| PathBuf::from("matchking_collections.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Option<LibraryFile> {
        let bytes = fs::read(&self.path).ok()?;
        match serde_json::from_slice::<LibraryFile>(&bytes) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt collections file");
                None
            }
        }
    }

    fn write(&self, file: &LibraryFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(file)?)?;
        Ok(())
    }

    /// Reads a collection authored elsewhere and adds it to the library,
    /// replacing any collection with the same id.
    pub fn import<P: AsRef<Path>>(&self, source: P) -> Result<Collection> {
        let collection: Collection = serde_json::from_slice(&fs::read(source)?)?;
        validate_collection(&collection)?;
        let mut collections = self.load_collections();
        collections.retain(|c| c.id != collection.id);
        collections.push(collection.clone());
        self.save_collections(&collections)?;
        Ok(collection)
    }
}

impl Default for FileCollectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionStore for FileCollectionStore {
    fn load_collections(&self) -> Vec<Collection> {
        match self.read() {
            Some(file) if !file.collections.is_empty() => file.collections,
            _ => vec![default_collection()],
        }
    }

    fn save_collections(&self, collections: &[Collection]) -> Result<()> {
        let mut file = self.read().unwrap_or_default();
        file.collections = collections.to_vec();
        self.write(&file)
    }

    fn active_collection_id(&self) -> String {
        self.read()
            .and_then(|f| f.active_collection_id)
            .unwrap_or_else(|| DEFAULT_COLLECTION_ID.to_string())
    }

    fn set_active_collection_id(&self, id: &str) -> Result<()> {
        let mut file = self.read().unwrap_or_default();
        if file.collections.is_empty() {
            file.collections = vec![default_collection()];
        }
        file.active_collection_id = Some(id.to_string());
        self.write(&file)
    }
}
