use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CatalogError, WallsError};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (width, height) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid resolution {}", s))?;
        let width: u32 = width
            .parse()
            .map_err(|_| format!("invalid resolution width in {}", s))?;
        let height: u32 = height
            .parse()
            .map_err(|_| format!("invalid resolution height in {}", s))?;
        if width == 0 || height == 0 {
            return Err(format!("resolution must be positive, got {}", s));
        }
        Ok(Self { width, height })
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallpaper {
    /// Unique identifier within the catalog
    pub id: String,
    /// Canonical copy of the image inside the sources directory
    #[serde(rename = "path")]
    pub source_path: PathBuf,
    /// File name the image had when it was added
    #[serde(rename = "original")]
    pub original_filename: String,
    pub resolution: Resolution,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Whether the wallpaper can be picked by random selection
    pub enabled: bool,
    /// An empty value marks a presence-only tag
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default, rename = "wallpaper")]
    wallpapers: Vec<Wallpaper>,
}

/// Ordered collection of wallpapers, unique by id.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    wallpapers: Vec<Wallpaper>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store_file: &Path) -> Result<Self> {
        let content = match fs::read_to_string(store_file) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No catalog store at {:?}, starting empty", store_file);
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(WallsError::Catalog(CatalogError::StoreRead {
                    path: store_file.to_path_buf(),
                    source,
                }))
            }
        };

        let store: StoreFile = toml::from_str(&content).map_err(|e| {
            WallsError::Catalog(CatalogError::Corrupted {
                path: store_file.to_path_buf(),
                message: e.to_string(),
            })
        })?;

        let mut catalog = Self::new();
        for wallpaper in store.wallpapers {
            if catalog.get(&wallpaper.id).is_some() {
                return Err(WallsError::Catalog(CatalogError::Corrupted {
                    path: store_file.to_path_buf(),
                    message: format!("duplicate wallpaper id {}", wallpaper.id),
                }));
            }
            catalog.wallpapers.push(wallpaper);
        }

        log::debug!(
            "Catalog loaded from {:?}, {} wallpapers defined",
            store_file,
            catalog.len()
        );
        Ok(catalog)
    }

    pub fn save(&self, store_file: &Path) -> Result<()> {
        if let Some(parent) = store_file.parent() {
            crate::storage::create_dir(parent)?;
        }

        let store = StoreFile {
            wallpapers: self.wallpapers.clone(),
        };
        let content = toml::to_string_pretty(&store).map_err(|e| {
            WallsError::Catalog(CatalogError::Serialization {
                message: e.to_string(),
            })
        })?;

        fs::write(store_file, content).map_err(|source| {
            WallsError::Catalog(CatalogError::StoreWrite {
                path: store_file.to_path_buf(),
                source,
            })
        })?;

        log::debug!(
            "Catalog with {} wallpapers written to {:?}",
            self.len(),
            store_file
        );
        Ok(())
    }

    pub fn wallpapers(&self) -> &[Wallpaper] {
        &self.wallpapers
    }

    pub fn len(&self) -> usize {
        self.wallpapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallpapers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Wallpaper> {
        self.wallpapers.iter().find(|wp| wp.id == id)
    }

    pub fn find(&self, id: &str) -> Result<&Wallpaper> {
        self.get(id).ok_or_else(|| {
            WallsError::Catalog(CatalogError::NotFound { id: id.to_string() })
        })
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Wallpaper> {
        self.wallpapers.iter_mut().find(|wp| wp.id == id)
    }

    /// Appends a wallpaper; a duplicate id leaves the catalog untouched.
    pub fn insert(&mut self, wallpaper: Wallpaper) -> Result<()> {
        if self.get(&wallpaper.id).is_some() {
            return Err(WallsError::Catalog(CatalogError::AlreadyExists {
                id: wallpaper.id,
            }));
        }
        self.wallpapers.push(wallpaper);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Wallpaper> {
        let position = self
            .wallpapers
            .iter()
            .position(|wp| wp.id == id)
            .ok_or_else(|| WallsError::Catalog(CatalogError::NotFound { id: id.to_string() }))?;
        Ok(self.wallpapers.remove(position))
    }

    /// Uniform pick among enabled wallpapers.
    ///
    /// `exclude` is skipped only while another enabled wallpaper remains, so a
    /// single enabled wallpaper is still returned.
    pub fn random_enabled(&self, exclude: Option<&str>) -> Option<&Wallpaper> {
        let enabled: Vec<&Wallpaper> = self.wallpapers.iter().filter(|wp| wp.enabled).collect();

        let candidates: Vec<&Wallpaper> = match exclude {
            Some(id) if enabled.iter().any(|wp| wp.id != id) => {
                enabled.iter().copied().filter(|wp| wp.id != id).collect()
            }
            _ => enabled,
        };

        let mut rng = rand::thread_rng();
        candidates.choose(&mut rng).copied()
    }
}
