//! Error types for halocat
//!
//! All modules use `HalocatResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for halocat operations
pub type HalocatResult<T> = Result<T, HalocatError>;

/// All errors that can occur in halocat
#[derive(Error, Debug)]
pub enum HalocatError {
    // Catalog construction errors
    #[error("The halo catalog requires a ``{0}`` argument.")]
    MissingRequiredArgument(String),

    #[error("{0}")]
    TypeValidation(String),

    #[error("The ``{field}`` argument must be a positive finite number, got {value}.")]
    InvalidScalar { field: String, value: f64 },

    #[error("The halo catalog requires a ``{0}`` column.")]
    MissingRequiredColumn(String),

    #[error("Column ``{column}`` has length {actual}, but the catalog has {expected} halos.")]
    InconsistentColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("The ``halo_id`` column must be unique, but {value} appears more than once.")]
    DuplicateHaloId { value: i64 },

    #[error("Halo position ``halo_{axis}`` at index {index} is {value}, outside [0, {lbox}).")]
    PositionOutOfBounds {
        axis: char,
        index: usize,
        value: f64,
        lbox: f64,
    },

    #[error("The particle table has {actual} rows, but at least {minimum} particles are required.")]
    InsufficientParticleCount { actual: usize, minimum: usize },

    // Cache registration errors
    #[error("The directory you are trying to store the file does not exist. Directory: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("File {} already exists. Either choose a different fname or set ``overwrite`` to True.", .0.display())]
    FileExistsConflict(PathBuf),

    #[error("The fname must end with an ``{expected}`` extension. Got: {}", path.display())]
    InvalidFileExtension { path: PathBuf, expected: String },

    #[error("{0}")]
    MetadataType(String),

    // Cache log errors
    #[error("No cache log entry matches {0}")]
    EntryNotFound(String),

    #[error("Invalid cache log entry: {0}")]
    InvalidCacheLogEntry(String),

    #[error("Cache log {} is corrupt at line {line}: {reason}", path.display())]
    CacheLogCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid catalog file {}: {reason}", path.display())]
    CatalogFileInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {}: {source}", path.display())]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl HalocatError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a type validation error
    pub fn type_validation(message: impl Into<String>) -> Self {
        Self::TypeValidation(message.into())
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::FileExistsConflict(_) => {
                Some("Set `overwrite` on the cache request or pick a new file name")
            }
            Self::InvalidFileExtension { .. } => Some("Catalog files must use the .hdf5 extension"),
            Self::CacheLogCorrupt { .. } => {
                Some("Inspect the cache log by hand, or move it aside to start a fresh log")
            }
            Self::EntryNotFound(_) => Some("Run: halocat list"),
            _ => None,
        }
    }
}
