/// Alias for `Result<T, AxError>`.
pub type AxResult<T> = Result<T, AxError>;

/// Errors raised while reading an export or building the object database.
///
/// Runtime lookups and package lifecycle calls never return these; they
/// report absence through `Option`/`bool` and log instead.
#[derive(Debug, thiserror::Error)]
pub enum AxError {
    /// A file could not be read from the archive or export directory.
    #[error("cannot read \"{name}\": {source}")]
    Io {
        /// The file name inside the archive.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The archive has no file with this name.
    #[error("archive has no file named \"{0}\"")]
    MissingFile(String),

    /// A JSON payload failed to parse.
    #[error("invalid JSON in \"{name}\": {source}")]
    Json {
        /// The file the payload came from.
        name: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A required field is missing or has the wrong shape.
    #[error("malformed export: {0}")]
    Malformed(String),

    /// A string could not be parsed as an object id.
    #[error("invalid object id: \"{0}\"")]
    InvalidId(String),

    /// The named package is not part of the imported set.
    #[error("unknown package: \"{0}\"")]
    UnknownPackage(String),
}
