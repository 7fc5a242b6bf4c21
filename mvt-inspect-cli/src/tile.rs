//! Tile subcommand
//!
//! Shows the content of a single tile as one table per layer.

use clap::{Parser, ValueEnum};
use mvt_inspect::postgres::PgSource;
use mvt_inspect::{Inspector, TilesetDefinition, report};

use crate::args::{ConnectionArgs, DisplayArgs, TargetArgs};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(about = "Show the content of a single tile as layer tables")]
pub struct Args {
    #[command(flatten)]
    target: TargetArgs,

    #[command(flatten)]
    display: DisplayArgs,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Resolve everything that can fail before connecting
    let tileset = TilesetDefinition::load(&args.target.tileset)?;
    let selection = args.target.selection()?;
    let layers = tileset.select_layers(&selection)?;

    let source = PgSource::connect(&args.connection.config()).await?;
    let inspector = Inspector::new(&source, &tileset, args.display.options());

    let mut outcomes = Vec::new();
    for layer in layers {
        let outcome = inspector.inspect_layer(args.target.tile, layer).await?;
        match args.format {
            // printed as soon as the layer is done, warnings included
            Format::Table => print!("{}", report::render_outcome(&outcome)),
            Format::Json => outcomes.push(outcome),
        }
    }

    if args.format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    Ok(())
}
