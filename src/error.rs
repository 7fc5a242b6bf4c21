use thiserror::Error;

/// A specialized [`Result`] type for tile inspection.
pub type InspectResult<T> = Result<T, InspectError>;

/// Errors that can occur while loading a tileset or inspecting a tile.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Layer '{0}' is not defined in the tileset")]
    UnknownLayer(String),
    #[error("Invalid tile coordinate '{0}', expected zoom/x/y such as 10/4/8")]
    InvalidCoordinate(String),
    #[error("{0}")]
    ColumnNotFound(String),
    #[error("IO Error {0}")]
    Reading(#[from] std::io::Error),
    #[error("Invalid tileset definition: {0}")]
    TilesetFormat(#[from] serde_yaml::Error),
    #[error("Data source error: {0}")]
    DataSource(String),
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
    #[error("Invalid hex encoded value: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(&'static str),
    #[error("Unable to convert geometry to WKT: {0}")]
    Wkt(#[from] geozero::error::GeozeroError),
    #[error("Invalid MVT data: {0}")]
    InvalidMvt(String),
}

impl InspectError {
    /// Returns `false` for errors that only affect a single layer and should not abort the run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ColumnNotFound(_))
    }
}
