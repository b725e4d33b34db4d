use crate::auth::Credentials;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub firmware_dir: String,
    pub credentials: Option<Credentials>,
    pub edit_path: String,
    pub update_path: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Flash file store and firmware update server")]
pub struct Args {
    /// Host to bind to (overrides FLASHWEB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FLASHWEB_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory backing the flat file store (overrides FLASHWEB_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Directory holding the staged and installed firmware image
    /// (overrides FLASHWEB_FIRMWARE_DIR)
    #[arg(long)]
    pub firmware_dir: Option<String>,

    /// Management username (overrides FLASHWEB_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// Management password (overrides FLASHWEB_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// Route serving the editor UI and file CRUD (overrides FLASHWEB_EDIT_PATH)
    #[arg(long)]
    pub edit_path: Option<String>,

    /// Route accepting firmware images (overrides FLASHWEB_UPDATE_PATH)
    #[arg(long)]
    pub update_path: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::merge(Args::parse())
    }

    fn merge(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("FLASHWEB_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FLASHWEB_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FLASHWEB_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading FLASHWEB_PORT"),
        };
        let env_storage =
            env::var("FLASHWEB_STORAGE_DIR").unwrap_or_else(|_| "./data/files".into());
        let env_firmware =
            env::var("FLASHWEB_FIRMWARE_DIR").unwrap_or_else(|_| "./data/firmware".into());
        let env_edit = env::var("FLASHWEB_EDIT_PATH").unwrap_or_else(|_| "/edit".into());
        let env_update = env::var("FLASHWEB_UPDATE_PATH").unwrap_or_else(|_| "/update".into());

        // --- Merge ---
        let username = args.username.or_else(|| env::var("FLASHWEB_USERNAME").ok());
        let password = args.password.or_else(|| env::var("FLASHWEB_PASSWORD").ok());
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => bail!("username and password must be set together or not at all"),
        };

        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            firmware_dir: args.firmware_dir.unwrap_or(env_firmware),
            credentials,
            edit_path: ensure_route(args.edit_path.unwrap_or(env_edit))?,
            update_path: ensure_route(args.update_path.unwrap_or(env_update))?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn ensure_route(path: String) -> Result<String> {
    if !path.starts_with('/') || path == "/" {
        bail!("route `{path}` must start with `/` and not be the root");
    }
    Ok(path)
}
