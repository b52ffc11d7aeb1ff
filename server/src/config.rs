//! Process configuration: CLI flags (via `clap`) layered over environment
//! variables layered over an optional JSON config file, matching the
//! precedence the relay server's `GameConfig.json` + env-var pattern
//! generalizes to.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "arena-server", about = "Real-time multiplayer arena game server")]
pub struct Cli {
    /// TCP port to listen on.
    #[arg(long)]
    pub port: Option<u16>,
    /// Root directory the static web client is served from.
    #[arg(long)]
    pub web_dir: Option<PathBuf>,
    /// Optional JSON file with base configuration values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seconds an empty room is kept alive before being reaped.
    #[arg(long)]
    pub idle_room_timeout_secs: Option<u64>,
}

/// The on-disk shape of an optional config file; every field is optional so
/// a partial file only overrides what it mentions.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    port: Option<u16>,
    web_dir: Option<PathBuf>,
    idle_room_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub web_dir: PathBuf,
    pub idle_room_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080, web_dir: PathBuf::from("./web"), idle_room_timeout_secs: 60 }
    }
}

impl ServerConfig {
    /// Resolves the effective configuration: file values overridden by
    /// environment variables, overridden in turn by explicit CLI flags.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();

        if let Some(path) = &cli.config {
            let file = Self::read_file(path)?;
            if let Some(v) = file.port {
                config.port = v;
            }
            if let Some(v) = file.web_dir {
                config.web_dir = v;
            }
            if let Some(v) = file.idle_room_timeout_secs {
                config.idle_room_timeout_secs = v;
            }
        }

        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                config.port = port;
            }
        }
        if let Ok(v) = std::env::var("WEB_DIR") {
            config.web_dir = PathBuf::from(v);
        }

        if let Some(v) = cli.port {
            config.port = v;
        }
        if let Some(v) = &cli.web_dir {
            config.web_dir = v.clone();
        }
        if let Some(v) = cli.idle_room_timeout_secs {
            config.idle_room_timeout_secs = v;
        }

        Ok(config)
    }

    fn read_file(path: &std::path::Path) -> Result<ConfigFile, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }
}
