//! Sql subcommand
//!
//! Prints the generated queries without connecting to a database.

use clap::Parser;
use mvt_inspect::query::DEFAULT_EXTENT;
use mvt_inspect::{QueryBuilder, TilesetDefinition};

use crate::args::{DisplayArgs, TargetArgs};

#[derive(Parser, Debug)]
#[command(about = "Print the SQL used to inspect a tile without running it")]
pub struct Args {
    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    display: DisplayArgs,

    /// Tile extent used when encoding geometries
    #[arg(long, default_value_t = DEFAULT_EXTENT)]
    extent: u32,
}

pub fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let tileset = TilesetDefinition::load(&args.target.tileset)?;
    let layers = tileset.select_layers(&args.target.selection()?)?;
    let builder = QueryBuilder::new(&tileset).with_extent(args.extent);
    let options = args.display.options();

    for layer in layers {
        let queries = builder.layer_queries(layer, args.target.tile, &options);
        println!("-- Layer {}: rows", layer.id);
        println!("{};", queries.rows);
        println!();
        println!("-- Layer {}: encoded layer", layer.id);
        println!("{};", queries.layer_bytes);
        println!();
    }

    Ok(())
}
