//! Adding and deleting wallpapers: catalog mutation plus the files that go with it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::catalog::{Catalog, Resolution, Wallpaper};
use crate::effects::EffectRegistry;
use crate::error::{CatalogError, ErrorReporting, StorageError, ValidationError, WallsError};
use crate::image_probe::{discover_images, ImageProbe};
use crate::storage::StorageLayout;
use crate::Result;

/// Id derived from a file name: the stem with spaces replaced by underscores.
pub fn id_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.replace(' ', "_");
    (!id.is_empty()).then_some(id)
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id == "." || id == ".." {
        return Err(WallsError::Validation(ValidationError::InvalidId { id: id.to_string() }));
    }
    Ok(())
}

/// Copies `path` into the sources directory and appends it to the catalog.
///
/// A duplicate id fails before anything is written.
pub fn add_wallpaper(
    catalog: &mut Catalog,
    layout: &StorageLayout,
    probe: &dyn ImageProbe,
    path: &Path,
    id: Option<&str>,
) -> Result<Wallpaper> {
    log::debug!("adding wallpaper {:?}", path);

    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let derived = id_from_path(path).ok_or_else(|| {
                WallsError::Validation(ValidationError::InvalidId {
                    id: path.display().to_string(),
                })
            })?;
            log::debug!("using id {} from filename", derived);
            derived
        }
    };
    validate_id(&id)?;

    if catalog.get(&id).is_some() {
        return Err(WallsError::Catalog(CatalogError::AlreadyExists { id }));
    }

    let info = probe.probe(path)?;
    let destination = layout.image_path(&id, &info.extension);

    crate::storage::create_dir(&layout.images_dir())?;
    log::debug!("writing wallpaper to store at {:?}", destination);
    fs::copy(path, &destination).map_err(|source| {
        WallsError::Storage(StorageError::Copy {
            from: path.to_path_buf(),
            to: destination.clone(),
            source,
        })
    })?;

    let wallpaper = Wallpaper {
        id,
        source_path: destination,
        original_filename: path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
        resolution: Resolution {
            width: info.width,
            height: info.height,
        },
        mime_type: info.mime_type,
        enabled: true,
        tags: BTreeMap::new(),
    };

    catalog.insert(wallpaper.clone())?;
    Ok(wallpaper)
}

/// Adds every supported image under `dir`, ids derived from file names.
///
/// A file that fails to add is logged and skipped.
pub fn add_directory(
    catalog: &mut Catalog,
    layout: &StorageLayout,
    probe: &dyn ImageProbe,
    dir: &Path,
) -> Result<Vec<Wallpaper>> {
    let images = discover_images(dir)?;
    log::info!("adding {} images from {:?}", images.len(), dir);

    let mut added = Vec::with_capacity(images.len());
    for image in images {
        match add_wallpaper(catalog, layout, probe, &image, None) {
            Ok(wallpaper) => added.push(wallpaper),
            Err(e) => e.log_error(&format!("adding {:?}", image)),
        }
    }
    Ok(added)
}

fn remove_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(WallsError::Storage(StorageError::Remove {
            path: path.to_path_buf(),
            source,
        })),
    }
}

/// Removes wallpaper `id` from the catalog, then every effect artifact and
/// finally its source image, so a failure leaves the source in place.
///
/// Missing artifacts are never an error. With `force`, an unknown id or a
/// source that cannot be removed is logged as a warning and `Ok(None)` /
/// `Ok(Some(_))` is returned instead of failing.
pub fn delete_wallpaper(
    catalog: &mut Catalog,
    layout: &StorageLayout,
    registry: &EffectRegistry,
    id: &str,
    force: bool,
) -> Result<Option<Wallpaper>> {
    let wallpaper = match catalog.remove(id) {
        Ok(wallpaper) => wallpaper,
        Err(e) if force => {
            log::warn!("error deleting wallpaper {}: {}", id, e.user_friendly_message());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    for effect in registry.names() {
        let artifact = layout.artifact_path(effect, &wallpaper);
        log::debug!(
            "deleting effect {} for wallpaper {}: deleting {:?}",
            effect,
            id,
            artifact
        );
        if let Err(e) = remove_file(&artifact) {
            if !force {
                return Err(e);
            }
            log::warn!("error deleting wallpaper {}: {}", id, e.user_friendly_message());
        }
    }

    log::debug!("deleting wallpaper {}: deleting {:?}", id, wallpaper.source_path);
    let source_result = match fs::remove_file(&wallpaper.source_path) {
        Ok(()) => Ok(()),
        Err(source) => Err(WallsError::Storage(StorageError::Remove {
            path: wallpaper.source_path.clone(),
            source,
        })),
    };
    if let Err(e) = source_result {
        if !force {
            return Err(e);
        }
        log::warn!("error deleting wallpaper {}: {}", id, e.user_friendly_message());
    }

    Ok(Some(wallpaper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_probe::{HeaderProbe, ImageInfo};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    struct FixedProbe;

    impl ImageProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> Result<ImageInfo> {
            Ok(ImageInfo {
                width: 1920,
                height: 1080,
                extension: "jpeg".to_string(),
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    fn layout(dir: &TempDir) -> StorageLayout {
        let layout = StorageLayout::new(
            dir.path().join("data"),
            dir.path().join("cache"),
            dir.path().join("run"),
        );
        layout.create_dirs().unwrap();
        layout
    }

    fn registry() -> EffectRegistry {
        let mut effects = BTreeMap::new();
        for name in ["blur", "dim"] {
            effects.insert(
                name.to_string(),
                vec!["convert".to_string(), "%i".to_string(), "%o".to_string()],
            );
        }
        EffectRegistry::new(effects, None).unwrap()
    }

    fn input(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "pixels").unwrap();
        path
    }

    #[test]
    fn test_id_from_path() {
        assert_eq!(id_from_path(Path::new("/tmp/my beach.jpg")), Some("my_beach".to_string()));
        assert_eq!(id_from_path(Path::new("forest.png")), Some("forest".to_string()));
    }

    #[test]
    fn test_add_wallpaper_copies_into_sources() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let original = input(&dir, "Sunny Beach.jpg");

        let wallpaper = add_wallpaper(&mut catalog, &layout, &FixedProbe, &original, None).unwrap();

        assert_eq!(wallpaper.id, "Sunny_Beach");
        assert_eq!(wallpaper.source_path, layout.images_dir().join("Sunny_Beach.jpeg"));
        assert_eq!(wallpaper.original_filename, "Sunny Beach.jpg");
        assert_eq!(wallpaper.resolution.to_string(), "1920x1080");
        assert!(wallpaper.enabled);
        assert_eq!(fs::read_to_string(&wallpaper.source_path).unwrap(), "pixels");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_add_real_image_with_explicit_id() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let original = dir.path().join("tiny.png");
        image::RgbImage::new(8, 6).save(&original).unwrap();

        let wallpaper =
            add_wallpaper(&mut catalog, &layout, &HeaderProbe, &original, Some("tiny-one")).unwrap();

        assert_eq!(wallpaper.source_path, layout.images_dir().join("tiny-one.png"));
        assert_eq!(wallpaper.mime_type, "image/png");
        assert_eq!(wallpaper.resolution.width, 8);
        assert_eq!(wallpaper.resolution.height, 6);
    }

    #[test]
    fn test_add_duplicate_id_changes_nothing() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let first = input(&dir, "beach.jpg");
        add_wallpaper(&mut catalog, &layout, &FixedProbe, &first, None).unwrap();
        let stored = fs::read_dir(layout.images_dir()).unwrap().count();

        let other = input(&dir, "other.jpg");
        let result = add_wallpaper(&mut catalog, &layout, &FixedProbe, &other, Some("beach"));

        assert!(matches!(
            result,
            Err(WallsError::Catalog(CatalogError::AlreadyExists { .. }))
        ));
        assert_eq!(catalog.len(), 1);
        assert_eq!(fs::read_dir(layout.images_dir()).unwrap().count(), stored);
    }

    #[test]
    fn test_add_rejects_path_like_id() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let original = input(&dir, "beach.jpg");

        let result = add_wallpaper(&mut catalog, &layout, &FixedProbe, &original, Some("../escape"));
        assert!(matches!(
            result,
            Err(WallsError::Validation(ValidationError::InvalidId { .. }))
        ));
    }

    #[test]
    fn test_add_directory_skips_failures() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let images = dir.path().join("incoming");
        fs::create_dir_all(&images).unwrap();
        image::RgbImage::new(4, 4).save(images.join("a.png")).unwrap();
        image::RgbImage::new(4, 4).save(images.join("b.png")).unwrap();
        // supported extension but not an image
        fs::write(images.join("c.png"), "not a png").unwrap();
        fs::write(images.join("notes.txt"), "ignored").unwrap();

        let added = add_directory(&mut catalog, &layout, &HeaderProbe, &images).unwrap();

        let ids: Vec<&str> = added.iter().map(|wp| wp.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_delete_removes_record_and_artifacts() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let registry = registry();
        let mut catalog = Catalog::new();
        let wallpaper =
            add_wallpaper(&mut catalog, &layout, &FixedProbe, &input(&dir, "beach.jpg"), None).unwrap();
        // only one of the two effects was ever precached
        let blur = layout.artifact_path("blur", &wallpaper);
        fs::create_dir_all(blur.parent().unwrap()).unwrap();
        fs::write(&blur, "blurred").unwrap();

        let deleted = delete_wallpaper(&mut catalog, &layout, &registry, "beach", false).unwrap();

        assert_eq!(deleted.map(|wp| wp.id), Some("beach".to_string()));
        assert!(catalog.is_empty());
        assert!(!wallpaper.source_path.exists());
        assert!(!blur.exists());
    }

    #[test]
    fn test_failed_artifact_removal_keeps_source() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let wallpaper =
            add_wallpaper(&mut catalog, &layout, &FixedProbe, &input(&dir, "beach.jpg"), None).unwrap();
        // a directory where the artifact should be cannot be removed as a file
        let blur = layout.artifact_path("blur", &wallpaper);
        fs::create_dir_all(blur.join("nested")).unwrap();

        let result = delete_wallpaper(&mut catalog, &layout, &registry(), "beach", false);

        assert!(matches!(
            result,
            Err(WallsError::Storage(StorageError::Remove { .. }))
        ));
        assert!(wallpaper.source_path.exists());
    }

    #[test]
    fn test_delete_unknown_id() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();

        let result = delete_wallpaper(&mut catalog, &layout, &registry(), "missing-id", false);
        assert!(matches!(
            result,
            Err(WallsError::Catalog(CatalogError::NotFound { .. }))
        ));

        let forced = delete_wallpaper(&mut catalog, &layout, &registry(), "missing-id", true).unwrap();
        assert!(forced.is_none());
    }

    #[test]
    fn test_delete_missing_source() {
        let dir = tempdir().unwrap();
        let layout = layout(&dir);
        let mut catalog = Catalog::new();
        let wallpaper =
            add_wallpaper(&mut catalog, &layout, &FixedProbe, &input(&dir, "beach.jpg"), None).unwrap();
        fs::remove_file(&wallpaper.source_path).unwrap();
        let mut forced_catalog = catalog.clone();

        let result = delete_wallpaper(&mut catalog, &layout, &registry(), "beach", false);
        assert!(matches!(
            result,
            Err(WallsError::Storage(StorageError::Remove { .. }))
        ));
        // the record is gone even though the file removal failed
        assert!(catalog.is_empty());

        let forced = delete_wallpaper(&mut forced_catalog, &layout, &registry(), "beach", true).unwrap();
        assert!(forced.is_some());
        assert!(forced_catalog.is_empty());
    }
}
