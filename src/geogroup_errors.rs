use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeogroupError {
    #[error("location time-series checksum failure")]
    LocationSeriesChecksum,

    #[error("invalid location database frame: {0}")]
    InvalidSeriesFrame(String),

    #[error("unsupported location database version: ({0})")]
    UnsupportedSeriesVersion(u16),

    #[error("either location data paths or an existing location database must be given")]
    NoLocationSources,

    #[error("unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("location series encoding error: {0}")]
    SeriesEncoding(#[from] bincode::Error),

    #[error("invalid list-file row at line ({line}): {reason}")]
    ListfileRow { line: usize, reason: String },

    #[error("list-file names an unknown city: source [{source_name}] id [{id}]")]
    ListfileUnknownCity { source_name: String, id: String },

    #[error("location-match strategy [{0}] not valid")]
    InvalidMatchStrategy(String),
}
