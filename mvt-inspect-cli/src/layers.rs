//! Layers subcommand

use std::path::PathBuf;

use clap::Parser;
use mvt_inspect::TilesetDefinition;
use mvt_inspect::report::Table;

#[derive(Parser, Debug)]
#[command(about = "List the layers of a tileset")]
pub struct Args {
    /// Tileset definition yaml file
    #[arg(value_name = "TILESET")]
    tileset: PathBuf,
}

pub fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let tileset = TilesetDefinition::load(&args.tileset)?;

    match &tileset.version {
        Some(version) => println!("{} {version}", tileset.name),
        None => println!("{}", tileset.name),
    }

    let mut table = Table::new([
        "layer", "zoom", "buffer", "key", "geometry", "names", "fields",
    ]);
    for layer in &tileset.layers {
        table.push_row([
            layer.id.clone(),
            format!(
                "{}-{}",
                layer.min_zoom.unwrap_or(tileset.min_zoom),
                layer.max_zoom.unwrap_or(tileset.max_zoom)
            ),
            layer.buffer_size.to_string(),
            layer.key_field.clone().unwrap_or_default(),
            layer.geometry_field.clone(),
            if layer.has_localized_names() { "yes" } else { "no" }.to_string(),
            layer.fields.join(", "),
        ]);
    }
    print!("{}", table.render());

    Ok(())
}
