use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use url::Url;

use tripkit::config::{AppConfig, CLOUD_KEY_ENV, CLOUD_URL_ENV};
use tripkit::core::address::Address;
use tripkit::core::logging::{self, print_success, print_warning, CliError};
use tripkit::core::mirror::{build_shareable_link, LinkOptions, PersistenceMirror};
use tripkit::core::remote::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use tripkit::core::remote::{HttpJsonFetcher, RestTripService, SaveOptions};
use tripkit::core::resolver::{Resolution, TripResolver};
use tripkit::core::session::{SessionError, TripSession};
use tripkit::core::storage::{open_store, DraftStore};
use tripkit::core::trip::{self, codec, templates, ImportError, Validation};

mod cli;

use cli::{Cli, Command};

type CliResult<T> = Result<T, CliError>;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_filter());
    log::debug!("tripkit v{} starting", tripkit::VERSION);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    run(cli.command, &config).await?;
    Ok(())
}

async fn run(command: Command, config: &AppConfig) -> CliResult<()> {
    match command {
        Command::Encode { input } => {
            let text = read_input(input.as_deref())?;
            let value = parse_json(&text)?;
            let token = codec::encode(&value)
                .ok_or_else(|| CliError::new("Document could not be encoded"))?;
            println!("{token}");
        }

        Command::Decode { token, raw } => {
            let value = if raw {
                codec::decode(&token)
            } else {
                codec::decode_document(&token, &config.palette).map(|doc| doc.to_value())
            };
            let value = value.ok_or_else(|| {
                CliError::new("Token could not be decoded")
                    .with_help("Tokens are the text after `trip=` in a shared link")
            })?;
            print_json(&value)?;
        }

        Command::Validate { input } => {
            let text = read_input(input.as_deref())?;
            let value = parse_json(&text)?;
            let validation = trip::validate(&value);
            print_json(&validation)?;
            if let Validation::Invalid { error } = validation {
                return Err(CliError::new(error));
            }
        }

        Command::Normalize { input } => {
            let text = read_input(input.as_deref())?;
            let doc = trip::import_json(&text, &config.palette).map_err(|e| import_error(&text, e))?;
            print_json(&doc)?;
        }

        Command::Resolve { address, summary } => resolve(&address, summary, config).await?,

        Command::Link {
            input,
            source,
            view,
            base,
        } => {
            let text = read_input(input.as_deref())?;
            let doc = trip::import_json(&text, &config.palette).map_err(|e| import_error(&text, e))?;
            let base = base.unwrap_or_else(|| config.share.app_url.clone());
            let base = Url::parse(&base)
                .map_err(|e| CliError::new(format!("Invalid page address {base}: {e}")))?;

            let options = LinkOptions {
                source_url: source,
                view_only: view,
                itineraries_base: config.share.itineraries_base.clone(),
            };
            let link = build_shareable_link(&base, &doc, &options)
                .ok_or_else(|| CliError::new("No link could be built for this document"))?;
            println!("{link}");
        }

        Command::Publish { input, view } => publish(input.as_deref(), view, config).await?,
    }
    Ok(())
}

type Store = Arc<dyn DraftStore>;

/// Resolver over the configured draft store and an HTTP fetcher.
async fn open_resolver(
    config: &AppConfig,
) -> CliResult<(TripResolver<Store>, Arc<PersistenceMirror<Store>>)> {
    let store = open_store(config)
        .await
        .map_err(|e| CliError::new(format!("Could not open draft store: {e}")))?;
    let mirror = Arc::new(PersistenceMirror::new(store, config.mirror.storage_key.clone()));
    let fetcher = HttpJsonFetcher::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
        .map_err(|e| CliError::new(e.to_string()))?;

    let resolver = TripResolver::new(Arc::new(fetcher), mirror.clone(), config.palette.clone())
        .with_itineraries_base(config.share.itineraries_base.clone());
    Ok((resolver, mirror))
}

async fn resolve(address: &str, summary: bool, config: &AppConfig) -> CliResult<()> {
    let address = Address::parse(address)
        .map_err(|e| CliError::new(format!("Invalid address: {e}")))?;

    let (mut resolver, _) = open_resolver(config).await?;
    match RestTripService::from_config(&config.cloud) {
        Ok(Some(service)) => resolver = resolver.with_cloud(Arc::new(service)),
        Ok(None) => {}
        Err(e) => print_warning(&format!("Cloud service unavailable: {e}")),
    }

    match resolver.resolve(&address).await {
        Resolution::Loaded(loaded) => {
            print_success(&format!(
                "{} ({:?}{})",
                loaded.trip.trip_config.title,
                loaded.mode,
                if loaded.view_only { ", view only" } else { "" }
            ));
            if !summary {
                print_json(&loaded.trip)?;
            }
            Ok(())
        }
        Resolution::Onboarding { error: Some(error) } => Err(CliError::new(error.to_string())),
        Resolution::Onboarding { error: None } => {
            print_warning("No trip found at this address");
            Err(CliError::new("Nothing to load").with_help(format!(
                "Start from a template ({}) or import a JSON file",
                templates::names().join(", ")
            )))
        }
    }
}

async fn publish(input: Option<&Path>, view: bool, config: &AppConfig) -> CliResult<()> {
    let text = read_input(input)?;
    let service = RestTripService::require(&config.cloud).map_err(|e| {
        CliError::new(e.to_string()).with_help(format!(
            "Set {CLOUD_URL_ENV} and {CLOUD_KEY_ENV}, or fill [cloud] in the config file"
        ))
    })?;
    let address = Address::parse(&config.share.app_url).map_err(|e| {
        CliError::new(format!("Invalid page address {}: {e}", config.share.app_url))
    })?;

    let (resolver, mirror) = open_resolver(config).await?;
    let mut session = TripSession::from_config(resolver, mirror, address, config);
    session.import_json(&text).map_err(|e| match e {
        SessionError::Import(e) => import_error(&text, e),
        other => CliError::new(other.to_string()),
    })?;

    let saved = session
        .save_to_cloud(&service, &SaveOptions::from(&config.cloud))
        .await
        .map_err(|e| CliError::new(e.to_string()));
    let link = session.cloud_link(view);
    session.shutdown().await;

    let row = saved?;
    print_success(&format!("Saved \"{}\" as {}", row.title, row.slug));
    if let Some(link) = link {
        println!("{link}");
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| CliError::new(format!("Could not read {}: {e}", path.display()))),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| CliError::new(format!("Could not read stdin: {e}")))?;
            Ok(text)
        }
    }
}

fn parse_json(text: &str) -> CliResult<Value> {
    serde_json::from_str(text).map_err(|e| CliError::json(text, &e))
}

fn import_error(text: &str, err: ImportError) -> CliError {
    match err {
        ImportError::Parse(e) => CliError::json(text, &e),
        ImportError::Invalid(e) => CliError::new(e.to_string()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(format!("Could not format output: {e}")))?;
    println!("{text}");
    Ok(())
}
