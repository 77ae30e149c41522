//! CLI for resolving a single property
//!
//! Prints the fetch response as JSON. Ctrl-C cancels an in-flight resolve.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use property_resolver::engines::{default_engines, SiteClient};
use property_resolver::validation::FileStatusSource;
use property_resolver::{
    AddressInputType, EngineRegistry, FetchPropertyResponse, HttpMediaSource, MemoryBlobStore, MemoryCache,
    PropertyResolver, ResolveRequest, StatusValidator,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "resolve")]
#[command(about = "Resolve property addresses into listing records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one address or listing title
    Resolve {
        #[arg(long, default_value = "")]
        address: String,

        /// Tenant id; defaults to DEFAULT_TENANT
        #[arg(long)]
        tenant: Option<String>,

        /// AutoComplete, FreeForm, ExactPlaceId or PropertyTitle
        #[arg(long = "type", default_value = "AutoComplete")]
        input_type: AddressInputType,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        force_refresh: bool,

        #[arg(long)]
        debug: bool,

        /// Also download accepted media into the in-memory blob store
        #[arg(long)]
        archive_media: bool,
    },

    /// Show the engine chain for each configured tenant
    Tenants,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,property_resolver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let client = SiteClient::with_timeout(config.resolver.attempt_timeout());
    let engines = default_engines(client.clone(), &config.resolver, config.corcoran_api_key.clone());
    let registry = EngineRegistry::new(engines).context("Failed to build engine registry")?;

    match cli.command {
        Commands::Tenants => {
            let summaries: Vec<_> = registry
                .configured_tenants()
                .iter()
                .map(|tenant| registry.tenant_summary(tenant))
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Resolve {
            address,
            tenant,
            input_type,
            title,
            force_refresh,
            debug,
            archive_media,
        } => {
            let statuses = match &config.status_config_path {
                Some(path) => StatusValidator::from_source(&FileStatusSource::new(path)),
                None => StatusValidator::embedded(),
            };

            let mut resolver = PropertyResolver::new(
                Arc::new(registry),
                Arc::new(statuses),
                MemoryCache::new(),
                MemoryBlobStore::new(),
                config.resolver.clone(),
            );
            if archive_media {
                resolver = resolver.with_media_source(Arc::new(HttpMediaSource::new(client)));
            }

            let tenant = tenant.unwrap_or_else(|| config.default_tenant.clone());
            let mut request = ResolveRequest::new(tenant, address)
                .with_input_type(input_type)
                .with_force_refresh(force_refresh)
                .with_debug(debug);
            if let Some(title) = title {
                request = request.with_title(title);
            }

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling");
                    on_ctrl_c.cancel();
                }
            });

            let result = resolver
                .resolve_with_cancel(&request, &cancel)
                .await
                .context("Resolution failed")?;
            let response = FetchPropertyResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
