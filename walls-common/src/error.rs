use std::path::PathBuf;
use thiserror::Error;

/// Main error type for walls operations
#[derive(Error, Debug)]
pub enum WallsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("External command error: {0}")]
    Command(#[from] CommandError),

    #[error("Precache error: {0}")]
    Precache(#[from] PrecacheError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse TOML configuration: {message}")]
    TomlParse { message: String },

    #[error("Configuration validation failed at {field}: {source}")]
    Validation { field: String, source: ValidationError },

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Catalog identity and persistence errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Wallpaper with id {id} not found")]
    NotFound { id: String },

    #[error("A wallpaper with the id {id} already exists")]
    AlreadyExists { id: String },

    #[error("Failed to read catalog store: {path:?}")]
    StoreRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to write catalog store: {path:?}")]
    StoreWrite { path: PathBuf, source: std::io::Error },

    #[error("Catalog store {path:?} is corrupted: {message}")]
    Corrupted { path: PathBuf, message: String },

    #[error("Failed to serialize catalog: {message}")]
    Serialization { message: String },
}

/// Filesystem errors on sources and cache artifacts
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory: {path:?}")]
    CreateDir { path: PathBuf, source: std::io::Error },

    #[error("Failed to remove file: {path:?}")]
    Remove { path: PathBuf, source: std::io::Error },

    #[error("Failed to check file: {path:?}")]
    Stat { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file: {path:?}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Failed to copy {from:?} to {to:?}")]
    Copy { from: PathBuf, to: PathBuf, source: std::io::Error },

    #[error("Failed to read directory: {path:?}")]
    DirectoryRead { path: PathBuf, source: std::io::Error },
}

/// Image probing errors
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Failed to open image file: {path:?}")]
    Open { path: PathBuf, source: std::io::Error },

    #[error("Unsupported image format: {path:?}")]
    UnsupportedFormat { path: PathBuf },

    #[error("Image file is corrupted or invalid: {path:?}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("No images found in directory: {path:?}")]
    NoImagesFound { path: PathBuf },
}

/// External command errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Program not found: {program} ({message})")]
    ProgramNotFound { program: String, message: String },

    #[error("Command execution failed: {command}")]
    Spawn { command: String, source: std::io::Error },

    #[error("Command returned non-zero exit code {code}: {command}")]
    NonZeroExit { command: String, code: i32 },

    #[error("Command was terminated by a signal: {command}")]
    Terminated { command: String },
}

/// Aggregated precache failures
#[derive(Error, Debug)]
pub enum PrecacheError {
    #[error("Applying effects to {id} failed for {failed} of {total} effects, see above for details")]
    EffectsFailed { id: String, failed: usize, total: usize },
}

/// Process listing and signalling errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Listing processes is not supported on this system")]
    Unsupported,

    #[error("Invalid process id: {pid}")]
    InvalidPid { pid: u32 },

    #[error("Failed to send signal to process {pid}")]
    Signal { pid: u32, source: std::io::Error },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Command for {context} is missing the {placeholder} placeholder")]
    MissingPlaceholder { context: String, placeholder: &'static str },

    #[error("Unknown effect {name}")]
    UnknownEffect { name: String },

    #[error("No wallpaper set behaviors configured")]
    NoSetRules,

    #[error("Command for {context} is empty")]
    EmptyCommand { context: String },

    #[error("Invalid wallpaper id: {id:?}")]
    InvalidId { id: String },
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, WallsError>;

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse {
            message: err.to_string(),
        }
    }
}

// Error reporting utilities
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for WallsError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {}", context, self.user_friendly_message());
        log::debug!("{}: {:?}", context, self);
    }

    fn user_friendly_message(&self) -> String {
        match self {
            WallsError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Could not read configuration file: {:?}", path)
            }
            WallsError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            WallsError::Catalog(CatalogError::AlreadyExists { id }) => {
                format!(
                    "A wallpaper with the id {} already exists (specify a different id with --id or rename the file)",
                    id
                )
            }
            WallsError::Command(CommandError::ProgramNotFound { program, .. }) => {
                format!("{} is not installed or not in PATH", program)
            }
            WallsError::Validation(ValidationError::NoSetRules) => {
                "No wallpaper set behaviors configured. Add a [[behavior.set]] entry to your config.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
