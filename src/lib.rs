#![forbid(unsafe_code)]
//! Inspect a single vector tile layer by layer.
//!
//! The tile is described by an OpenMapTiles-style tileset. For every selected layer
//! two queries are generated: one returning each feature with its source columns,
//! encoded geometry and validity checks, and one returning the complete encoded layer.
//!
//! ```no_run
//! # #[cfg(feature = "postgres")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use mvt_inspect::postgres::{ConnectionConfig, PgSource};
//! use mvt_inspect::{DisplayOptions, Inspector, LayerSelection, TilesetDefinition};
//!
//! let tileset = TilesetDefinition::load("openmaptiles.yaml")?;
//! let source = PgSource::connect(&ConnectionConfig::default()).await?;
//! let inspector = Inspector::new(&source, &tileset, DisplayOptions::default());
//! for outcome in inspector.inspect("10/4/8".parse()?, &LayerSelection::all()).await? {
//!     print!("{}", mvt_inspect::report::render_outcome(&outcome));
//! }
//! # Ok(())
//! # }
//! ```

mod tile;
pub use tile::TileCoord;

mod error;
pub use error::{InspectError, InspectResult};

pub mod tileset;
pub use tileset::{LayerDefinition, LayerSelection, TilesetDefinition};

pub mod query;
pub use query::{LayerQueries, QueryBuilder};

pub mod source;
pub use source::{DataSource, Record, Warning, WarningBuffer};

#[cfg(feature = "postgres")]
pub mod postgres;

pub mod format;
pub mod geometry;
pub mod mvt;

pub mod inspect;
pub use inspect::{CellValue, DisplayOptions, InspectionRow, Inspector, LayerOutcome, LayerReport};

pub mod report;
