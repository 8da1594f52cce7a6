pub mod catalog;
pub mod command;
pub mod effects;
pub mod error;
pub mod image_probe;
pub mod library;
pub mod precache;
pub mod process;
pub mod setter;
pub mod storage;

pub use catalog::{Catalog, Resolution, Wallpaper};
pub use effects::{EffectRegistry, SetRule};
pub use error::{ErrorReporting, Result, WallsError};
pub use image_probe::{HeaderProbe, ImageInfo, ImageProbe};
pub use library::{add_directory, add_wallpaper, delete_wallpaper};
pub use precache::{EffectOutcome, EffectRunner, PrecacheReport};
pub use process::{ProcessEntry, ProcessMatcher, SystemProcesses, Termination};
pub use setter::{SetOutcome, WallpaperSetter, SETTLE_DELAY};
pub use storage::StorageLayout;
