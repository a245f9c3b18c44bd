use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("section '{0}' not found")]
    MissingSection(String),
}

pub type Result<T> = std::result::Result<T, HalError>;
