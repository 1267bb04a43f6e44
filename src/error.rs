use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bencode: {0}")]
    Bencode(#[from] bencode::Error),
    #[error("invalid torrent: {0}")]
    Structural(String),
    #[error("consistency check failed: pieces length {0} isn't a multiple of 20")]
    Consistency(usize),
    #[error("invalid field {field:?}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("io: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no files found")]
    NoFiles,
    #[error("invalid piece size: {0}")]
    InvalidPieceSize(usize),
    #[error("magnet: missing \"magnet:?\" prefix")]
    MagnetPrefix,
    #[error("magnet: not a BitTorrent info hash: {0:?}")]
    MagnetScheme(String),
    #[error("magnet: invalid {key} parameter {value:?}")]
    MagnetParse { key: &'static str, value: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
