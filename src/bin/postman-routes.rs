// Route coverage check: compares the backend's route list with the
// requests in the Postman collection and prints what is missing or extra.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use postman_sync::routes::{load_collection_routes, load_route_list, RouteReport};
use postman_sync::ui;

/// Compare backend routes with the endpoints in a Postman collection.
#[derive(Parser, Debug)]
#[command(name = "postman-routes", version, about)]
struct Cli {
    /// Route list: JSON array of {"method", "path"} or one `METHOD path` per line
    #[arg(long, short = 'r')]
    routes: PathBuf,

    /// Postman collection to check
    #[arg(long, short = 'c', default_value = "syllaby-api-collection.json")]
    collection: PathBuf,

    /// Exit 1 when backend routes are missing from the collection
    #[arg(long)]
    fail_on_missing: bool,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn analyze(cli: &Cli) -> Result<RouteReport> {
    let expected = load_route_list(&cli.routes)?;
    let documented = load_collection_routes(&cli.collection)?;
    Ok(RouteReport::compare(&expected, &documented))
}

fn main() {
    let cli = Cli::parse();
    let default = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();

    match analyze(&cli) {
        Ok(report) => {
            ui::route_report(&report);
            if cli.fail_on_missing && !report.is_complete() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
