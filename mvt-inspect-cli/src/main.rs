mod args;
mod layers;
mod sql;
mod tile;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mvt-inspect", version)]
#[command(about = "Inspect vector tiles generated by PostGIS", long_about = None)]
struct Cli {
    /// Print additional debugging information, including the generated SQL
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the content of a single tile as layer tables
    Tile(tile::Args),
    /// Print the SQL used to inspect a tile without running it
    Sql(sql::Args),
    /// List the layers of a tileset
    Layers(layers::Args),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG is honoured, --verbose forces debug output
    // Example: RUST_LOG=mvt_inspect=debug mvt-inspect tile ...
    let mut logger = env_logger::Builder::from_default_env();
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let result = match cli.command {
        Commands::Tile(args) => tile::run(args).await,
        Commands::Sql(args) => sql::run(&args),
        Commands::Layers(args) => layers::run(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
