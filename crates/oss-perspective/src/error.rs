use oss_types::Version;

/// Errors produced by perspective operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PerspectiveError {
    /// The object has never been recorded in this perspective.
    #[error("object does not exist: {0}")]
    NoSuchObject(String),

    /// The object exists but not at the requested version.
    #[error("object {object_key} has no version {version}")]
    NoSuchVersion { object_key: String, version: Version },

    /// Versions start at 1.
    #[error("version should be greater than 0, got {version} for {object_key}")]
    InvalidVersion { object_key: String, version: Version },

    /// The update would not advance the object's history.
    #[error("version rollback for {object_key}: {version} is not above latest {latest}")]
    VersionRollback {
        object_key: String,
        version: Version,
        latest: Version,
    },

    /// A snapshot decoded but violates the history rules.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unsupported snapshot format {0}")]
    UnsupportedFormat(u32),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for perspective operations.
pub type PerspectiveResult<T> = Result<T, PerspectiveError>;
