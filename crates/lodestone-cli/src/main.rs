use std::{env, sync::Arc};

use clap::Parser;
use cli::{Args, Commands};
use download::{download_icon, download_package};
use logging::setup_logging;
use lodestone_config::{
    config::{self, generate_default_config, get_config, set_config_path, Config},
    store::JsonFileStore,
};
use lodestone_core::{ManagerSettings, RepositoryManager};
use lodestone_dl::http_client::configure_http_client;
use lodestone_registry::{CacheStore, HttpRepositoryClient};
use lodestone_utils::path::resolve_path;
use miette::IntoDiagnostic;
use repo::handle_repo;
use search::{query_package, search_packages};
use sync::sync_repositories;
use tracing::{debug, info, warn};
use ureq::{
    http::{HeaderName, HeaderValue},
    Proxy,
};
use utils::{blocking, set_flag, COLOR, JSON, PROGRESS};

mod cli;
mod download;
mod logging;
mod progress;
mod repo;
mod search;
mod sync;
mod utils;

fn create_manager(config: &Config) -> miette::Result<Arc<RepositoryManager>> {
    let state_path = config.get_state_path()?;
    let cache_path = config.get_cache_path()?;
    debug!(
        "Using state {} and cache {}",
        state_path.display(),
        cache_path.display()
    );

    let store = JsonFileStore::open(&state_path)?;
    let remote = HttpRepositoryClient::new(config.request_timeout());
    let manager = RepositoryManager::load(
        Box::new(store),
        CacheStore::new(cache_path),
        Arc::new(remote),
        ManagerSettings::from_config(config),
    )?;

    Ok(Arc::new(manager))
}

fn configure_http(args: &Args) -> miette::Result<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .into_diagnostic()?;
    let user_agent = args.user_agent.clone();

    let headers = args.header.as_ref().map(|headers| {
        headers
            .iter()
            .filter_map(|header| {
                let Some((key, value)) = header.split_once(':') else {
                    warn!("Ignoring malformed header '{}'", header);
                    return None;
                };
                match (
                    HeaderName::try_from(key.trim()),
                    HeaderValue::try_from(value.trim()),
                ) {
                    (Ok(key), Ok(value)) => Some((key, value)),
                    _ => {
                        warn!("Ignoring invalid header '{}'", header);
                        None
                    }
                }
            })
            .collect()
    });

    configure_http_client(|config| {
        if proxy.is_some() {
            config.proxy = proxy;
        }
        if let Some(user_agent) = user_agent {
            config.user_agent = Some(user_agent);
        }
        if headers.is_some() {
            config.headers = headers;
        }
    });

    Ok(())
}

async fn handle_cli() -> miette::Result<()> {
    let args = Args::parse();

    setup_logging(&args);
    set_flag(&COLOR, !args.no_color);
    set_flag(&PROGRESS, !args.no_progress);
    set_flag(&JSON, args.json);

    if let Some(ref c) = args.config {
        let path = resolve_path(c).into_diagnostic()?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir().into_diagnostic()?.join(path)
        };
        set_config_path(path);
    }

    configure_http(&args)?;

    match args.command {
        Commands::DefConfig => {
            generate_default_config()?;
        }
        command => {
            config::init()?;
            let config = get_config();
            let downloads_dir = config.get_downloads_path()?;
            let manager = {
                let config = config.clone();
                tokio::task::spawn_blocking(move || create_manager(&config))
                    .await
                    .into_diagnostic()??
            };

            match command {
                Commands::Repo {
                    action,
                } => handle_repo(manager, action).await?,
                Commands::Sync {
                    id,
                    stale,
                } => sync_repositories(manager, id, stale).await?,
                Commands::Search {
                    query,
                    mc_version,
                    limit,
                } => search_packages(&manager, &query, mc_version.as_deref(), limit),
                Commands::Info {
                    repo,
                    package,
                } => query_package(manager, repo, package).await?,
                Commands::Download {
                    repo,
                    package,
                    output,
                } => download_package(manager, repo, package, output, downloads_dir).await?,
                Commands::Icon {
                    repo,
                    package,
                    output,
                } => download_icon(manager, repo, package, output, downloads_dir).await?,
                Commands::Clean => {
                    let removed = blocking(move || manager.prune_cache()).await?;
                    if removed == 0 {
                        info!("No orphaned cache snapshots");
                    }
                }
                Commands::DefConfig => unreachable!(),
            }

            progress::stop();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        progress::stop();
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}
