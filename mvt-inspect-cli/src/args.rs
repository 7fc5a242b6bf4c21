//! Arguments shared by several subcommands.

use std::path::PathBuf;

use mvt_inspect::postgres::ConnectionConfig;
use mvt_inspect::{DisplayOptions, InspectResult, LayerSelection, TileCoord};

#[derive(clap::Args, Debug)]
pub struct TargetArgs {
    /// Tileset definition yaml file
    #[arg(value_name = "TILESET")]
    pub tileset: PathBuf,

    /// Tile ID, e.g. "10/4/8" for zoom=10, x=4, y=8
    #[arg(value_name = "ZOOM/X/Y")]
    pub tile: TileCoord,

    /// Limit to a specific layer (could be more than one)
    #[arg(short, long = "layer", value_name = "LAYER")]
    pub layers: Vec<String>,

    /// Use all layers except the ones listed with --layer
    #[arg(short = 'x', long)]
    pub exclude_layers: bool,
}

impl TargetArgs {
    pub fn selection(&self) -> InspectResult<LayerSelection> {
        LayerSelection::new(self.layers.clone(), self.exclude_layers)
    }
}

#[derive(clap::Args, Debug)]
pub struct DisplayArgs {
    /// Limit to a specific column (could be more than one)
    #[arg(short, long = "column", value_name = "COLUMN")]
    pub columns: Vec<String>,

    /// Include all localized names
    #[arg(short = 'n', long)]
    pub show_names: bool,

    /// Show geometry and mvtgeometry as text instead of type and size
    #[arg(short = 'g', long)]
    pub show_geometry: bool,

    /// Do not include the resulting MVT geometry in the output
    #[arg(short = 'm', long)]
    pub no_mvtgeometry: bool,

    /// Do not validate the geometries with ST_IsValid
    #[arg(short = 't', long)]
    pub no_geom_test: bool,

    /// Show nulls for all values (by default only for key and geometry columns)
    #[arg(short = 'N', long)]
    pub null: bool,
}

impl DisplayArgs {
    pub fn options(&self) -> DisplayOptions {
        // a column named twice would be queried twice but shown once
        let mut columns: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        DisplayOptions {
            show_names: self.show_names,
            show_geometry: self.show_geometry,
            include_encoded_geometry: !self.no_mvtgeometry,
            validate_geometry: !self.no_geom_test,
            show_nulls: self.null,
            columns: (!columns.is_empty()).then_some(columns),
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ConnectionArgs {
    /// Postgres hostname
    #[arg(long, env = "PGHOST", default_value = "localhost")]
    pub pghost: String,

    /// Postgres port
    #[arg(short = 'P', long, env = "PGPORT", default_value_t = 5432)]
    pub pgport: u16,

    /// Postgres database name
    #[arg(short, long, env = "POSTGRES_DB", default_value = "openmaptiles")]
    pub dbname: String,

    /// Postgres user
    #[arg(short = 'U', long, env = "POSTGRES_USER", default_value = "openmaptiles")]
    pub user: String,

    /// Postgres password
    #[arg(
        long,
        env = "POSTGRES_PASSWORD",
        default_value = "openmaptiles",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: String,
}

impl ConnectionArgs {
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.pghost.clone(),
            port: self.pgport,
            dbname: self.dbname.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}
