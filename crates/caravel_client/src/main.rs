//! Caravel console client.
//!
//! Opens a local store, attaches a replication session to a remote
//! endpoint, and drives an interactive menu for inspecting and mutating
//! data.
//!
//! # Usage
//!
//! ```text
//! caravel --config caravel.toml
//! caravel --config caravel.toml --username userdb1 --password 'Password1!'
//! ```

mod client;
mod error;
mod logging;
mod menu;
mod menus;
mod properties;

use crate::client::Client;
use crate::error::ClientResult;
use crate::menu::Console;
use crate::properties::Properties;
use caravel_store::{runtime, Store};
use caravel_sync::{resolve_collections, Coordinator, LoopbackSession, SyncSession};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Interactive console client for a Caravel store.
#[derive(Parser)]
#[command(name = "caravel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML properties file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override the configured username
    #[arg(long)]
    username: Option<String>,

    /// Override the configured password
    #[arg(long)]
    password: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("caravel: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ClientResult<()> {
    let mut props = match &cli.config {
        Some(path) => Properties::load(path)?,
        None => Properties::default(),
    };
    if let Some(username) = cli.username {
        props.remote.authenticator.username = username;
    }
    if let Some(password) = cli.password {
        props.remote.authenticator.password = password;
    }
    props.validate()?;

    logging::init(cli.verbose, &props.log_dir(), &props.log)?;
    tracing::info!(
        endpoint = %props.remote.endpoint_url,
        continuous = props.remote.continuous,
        user = %props.remote.authenticator.username,
        "starting caravel client"
    );

    // The runtime pair is owned here and invoked exactly once.
    runtime::initialize();
    let result = run_client(&props);
    runtime::shutdown();
    result
}

fn run_client(props: &Properties) -> ClientResult<()> {
    let store = Store::open(props.store_config())?;
    let scope = props.local.scope.name.clone();
    for name in props.scope_collections() {
        store.create_collection(&scope, &name)?;
    }

    let available: Vec<String> = store
        .collections_in_scope(&scope)?
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let resolved = resolve_collections(&props.partition_filters(), &available)?;
    tracing::info!(
        collections = resolved.len(),
        "collections resolved for replication"
    );

    let session_config = props.session_config()?.with_collections(resolved);
    let session = Arc::new(LoopbackSession::new(session_config));
    let coordinator = Coordinator::new(session as Arc<dyn SyncSession>, props.stop_policy());

    let mut client = Client::new(store, coordinator, scope)?;
    let mut console = Console::stdin();
    menus::main_menu().show(&mut client, &mut console);

    client.close()?;
    tracing::info!("goodbye");
    Ok(())
}
