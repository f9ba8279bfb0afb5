use std::path::PathBuf;
use thiserror::Error;

use crate::dimension::QuantityError;
use crate::integrations::nml_file::ParseError;

pub type Result<T> = std::result::Result<T, AssemblyError>;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("segment {index} is listed in both the {first} and {second} tables")]
    OverlappingTables {
        index: u32,
        first: String,
        second: String,
    },

    #[error("unknown segment group: {0}")]
    UnknownSegmentGroup(String),

    #[error("segment group {0} includes itself")]
    IncludeCycle(String),

    #[error("duplicate id in cell: {0}")]
    DuplicateId(String),

    #[error("invalid value for {context}: {source}")]
    InvalidQuantity {
        context: String,
        #[source]
        source: QuantityError,
    },

    #[error("document contains no cell")]
    NoCell,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("analysis failed: {0}")]
    Analysis(String),
}
