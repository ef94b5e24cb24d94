use std::io;

use camino::Utf8PathBuf;

/// Failures raised by parsing or materializing a structure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("structure is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("creating directory {path}: {source}")]
    Filesystem {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported {found} in structure at {path}")]
    UnsupportedNode { path: Utf8PathBuf, found: String },

    #[error("folder name {name:?} under {parent} is not a single path segment")]
    InvalidName { parent: Utf8PathBuf, name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
