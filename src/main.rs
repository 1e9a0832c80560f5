// Entrypoint for the CLI.
// - Parses arguments, sets up logging and resolves the API key.
// - Exits 1 on a missing key or any error that ends the run early;
//   per-resource failures still exit 0.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use postman_sync::api::{ApiClient, DEFAULT_API_URL};
use postman_sync::config::{resolve_credential, FetchFailureMode, SyncConfig, API_KEY_VAR};
use postman_sync::{run, ui};

/// Sync a local Postman collection and environments to the Postman API.
#[derive(Parser, Debug)]
#[command(name = "postman-sync", version, about)]
struct Cli {
    /// Postman API key (falls back to POSTMAN_API_KEY, then .env)
    api_key: Option<String>,

    /// Directory holding the definition files and .env
    #[arg(long, short = 'd', default_value = ".")]
    dir: PathBuf,

    /// JSON file mapping local files to remote names (defaults to the built-in mapping)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Base URL of the Postman API
    #[arg(long, env = "POSTMAN_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// What to do when existing items cannot be listed
    #[arg(long, env = "POSTMAN_SYNC_ON_FETCH_FAILURE", value_enum, default_value_t = FetchFailureMode::Open)]
    on_fetch_failure: FetchFailureMode,

    /// Give up on a request after this many seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn sync(cli: Cli, client: ApiClient) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };

    let mut console = ui::Console::new();
    console.banner();
    let report = run::run(&client, &config, &cli.dir, cli.on_fetch_failure, &mut console)?;
    console.summary(&report);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env_key = std::env::var(API_KEY_VAR).ok();
    let Some(credential) = resolve_credential(cli.api_key.as_deref(), env_key.as_deref(), &cli.dir)
    else {
        ui::missing_credential();
        std::process::exit(1);
    };

    let timeout = cli.timeout.map(Duration::from_secs);
    let result = ApiClient::with_timeout(&cli.api_url, credential, timeout)
        .and_then(|client| sync(cli, client));
    if let Err(e) = result {
        ui::fatal(&e);
        std::process::exit(1);
    }
}
