//! Loader failure taxonomy. Everything here is user-visible: the sidebar
//! shows the `Display` text as the diagnostic for the failed load.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error("transfer failed: server answered {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("could not read {}: {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),

    #[error("not a valid boundary archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive has no boundary file (.shp)")]
    MissingBoundaryFile,

    #[error("archive has no attribute table (.dbf)")]
    MissingAttributeTable,

    #[error("attribute table has no '{0}' field")]
    MissingNameField(String),

    #[error("unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    #[error("archive contains no usable regions")]
    EmptyCollection,

    #[error("could not parse boundary file: {0}")]
    Malformed(String),
}

impl From<shapefile::Error> for LoadError {
    fn from(e: shapefile::Error) -> Self {
        LoadError::Malformed(e.to_string())
    }
}

impl From<shapefile::dbase::Error> for LoadError {
    fn from(e: shapefile::dbase::Error) -> Self {
        LoadError::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
