//! CLI runner - executes commands

use crate::catalog::{build_catalog, discover_streams, resolve_selection, SelectedStream};
use crate::cli::commands::{Cli, Commands};
use crate::config::TapConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::messages::MessageWriter;
use crate::state::State;
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Discover => self.discover().await,
            Commands::Sync { catalog, state } => {
                self.sync(catalog.as_deref(), state.as_deref()).await
            }
            Commands::About => self.about(),
        }
    }

    /// Load and validate the configuration file
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use --config)"))?;
        TapConfig::load(path)
    }

    /// Test credentials with one cheap authenticated call
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = ApiClient::new(&config)?;

        let mut body = serde_json::Map::new();
        body.insert("limit".to_string(), json!(1));
        client.call("roles.list", body).await?;

        println!("{}", json!({ "connected": true }));
        Ok(())
    }

    /// Discover streams and print the catalog document
    async fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = ApiClient::new(&config)?;

        let streams = discover_streams(&client).await?;
        let catalog = build_catalog(&streams);

        println!("{}", catalog.to_json_pretty()?);
        Ok(())
    }

    /// Run a sync: extract selected streams, emitting messages on stdout
    async fn sync(&self, catalog_path: Option<&Path>, state_path: Option<&Path>) -> Result<()> {
        let config = self.load_config()?;
        let client = ApiClient::new(&config)?;

        let descriptors = discover_streams(&client).await?;

        let selected: Vec<SelectedStream> = match catalog_path {
            Some(path) => {
                let catalog = crate::catalog::Catalog::from_file(path)?;
                resolve_selection(&descriptors, &catalog)?
            }
            None => {
                // No catalog: extract everything with all fields.
                info!("No catalog supplied; syncing all discovered streams");
                descriptors
                    .into_iter()
                    .map(SelectedStream::all_fields)
                    .collect()
            }
        };

        if selected.is_empty() {
            warn!("Catalog selects no streams; nothing to do");
            return Ok(());
        }

        let initial_state = match state_path {
            Some(path) => State::from_file(path)?,
            None => State::new(),
        };

        let writer = MessageWriter::new(std::io::stdout().lock());
        let mut engine = SyncEngine::new(&client, &config, writer, initial_state);
        let summary = engine.sync_all(&selected).await;
        engine.into_writer().flush()?;

        if !summary.success() {
            for (stream, error) in &summary.failures {
                warn!(stream, "Stream did not complete: {error}");
            }
            return Err(Error::Other(format!(
                "{} stream(s) failed",
                summary.failures.len()
            )));
        }

        Ok(())
    }

    /// Print connector metadata and the settings it accepts
    fn about(&self) -> Result<()> {
        let about = json!({
            "name": crate::NAME,
            "version": crate::VERSION,
            "description": "Extracts roles, users, lines of business, and form responses from the KPA EHS API",
            "capabilities": ["catalog", "discover", "state"],
            "settings": [
                { "name": "access_token", "required": true, "description": "The token to authenticate against the API service" },
                { "name": "start_date", "required": false, "description": "The earliest record date to sync" },
                { "name": "page_size", "required": false, "description": "Records requested per page" },
                { "name": "user_agent", "required": false, "description": "Override the User-Agent header" }
            ]
        });

        println!("{}", serde_json::to_string_pretty(&about)?);
        Ok(())
    }
}
