use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::catalog::Wallpaper;
use crate::error::{StorageError, WallsError};
use crate::Result;

const STORE_FILE: &str = "store.toml";
const SOURCES_SUBDIR: &str = "sources";
const CURRENT_FILE: &str = "current";

/// On-disk roots for canonical images, effect artifacts and runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub sources: PathBuf,
    pub cache: PathBuf,
    pub runtime: PathBuf,
}

impl StorageLayout {
    pub fn new(sources: PathBuf, cache: PathBuf, runtime: PathBuf) -> Self {
        Self {
            sources,
            cache,
            runtime,
        }
    }

    pub fn create_dirs(&self) -> Result<()> {
        for dir in [
            self.sources.clone(),
            self.images_dir(),
            self.cache.clone(),
            self.runtime.clone(),
        ] {
            create_dir(&dir)?;
        }
        Ok(())
    }

    /// Directory holding the canonical copy of every wallpaper.
    pub fn images_dir(&self) -> PathBuf {
        self.sources.join(SOURCES_SUBDIR)
    }

    pub fn store_file(&self) -> PathBuf {
        self.sources.join(STORE_FILE)
    }

    pub fn image_path(&self, id: &str, extension: &str) -> PathBuf {
        self.images_dir().join(format!("{}.{}", id, extension))
    }

    pub fn artifact_path(&self, effect: &str, wallpaper: &Wallpaper) -> PathBuf {
        artifact_path(&self.cache, effect, &wallpaper.source_path)
    }

    pub fn current_file(&self) -> PathBuf {
        self.runtime.join(CURRENT_FILE)
    }

    /// Id of the wallpaper most recently set, if one was recorded.
    pub fn read_current(&self) -> Option<String> {
        let path = self.current_file();
        match fs::read_to_string(&path) {
            Ok(content) => {
                let id = content.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("Failed to read {:?}: {}", path, e);
                }
                None
            }
        }
    }

    pub fn write_current(&self, id: &str) -> Result<()> {
        let path = self.current_file();
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        fs::write(&path, id).map_err(|source| {
            WallsError::Storage(StorageError::Write {
                path: path.clone(),
                source,
            })
        })?;
        log::debug!("Recorded current wallpaper {} in {:?}", id, path);
        Ok(())
    }
}

/// `cache/<effect>/<basename of source>`
pub fn artifact_path(cache_dir: &Path, effect: &str, source_path: &Path) -> PathBuf {
    let mut path = cache_dir.join(effect);
    if let Some(name) = source_path.file_name() {
        path.push(name);
    }
    path
}

pub(crate) fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| {
        WallsError::Storage(StorageError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    })
}

/// Stat-based existence check that only treats "not found" as absence.
pub(crate) fn artifact_exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(WallsError::Storage(StorageError::Stat {
            path: path.to_path_buf(),
            source,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn layout(root: &Path) -> StorageLayout {
        StorageLayout::new(root.join("data"), root.join("cache"), root.join("run"))
    }

    #[test]
    fn test_artifact_path_uses_source_basename() {
        let path = artifact_path(
            Path::new("/home/me/.cache/walls"),
            "blur",
            Path::new("/home/me/.local/share/walls/sources/beach.jpg"),
        );
        assert_eq!(path, PathBuf::from("/home/me/.cache/walls/blur/beach.jpg"));
    }

    #[test]
    fn test_create_dirs() {
        let temp_dir = tempdir().unwrap();
        let layout = layout(temp_dir.path());

        layout.create_dirs().unwrap();

        assert!(layout.images_dir().is_dir());
        assert!(layout.cache.is_dir());
        assert!(layout.runtime.is_dir());
        assert_eq!(layout.store_file(), temp_dir.path().join("data").join("store.toml"));
    }

    #[test]
    fn test_current_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let layout = layout(temp_dir.path());

        assert_eq!(layout.read_current(), None);
        layout.write_current("beach").unwrap();
        assert_eq!(layout.read_current(), Some("beach".to_string()));
    }

    #[test]
    fn test_artifact_exists() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("a.jpg");

        assert!(!artifact_exists(&file).unwrap());
        fs::write(&file, "x").unwrap();
        assert!(artifact_exists(&file).unwrap());
    }
}
