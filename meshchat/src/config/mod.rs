//! Configuration system for the `MeshChat` client.
//!
//! Supports layered configuration with the following priority (highest
//! first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attributes)
//! 3. TOML config file (`~/.config/meshchat/config.toml`)
//! 4. Compiled defaults
//!
//! A missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use crate::chat::{DEFAULT_ROOM, GUEST_USERNAME, RoomConfig};
use crate::dispatcher::DispatcherConfig;

use meshchat_proto::chunk::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    chat: ChatFileConfig,
    files: FilesFileConfig,
    ui: UiFileConfig,
}

/// `[chat]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    username: Option<String>,
    room: Option<String>,
    channel_capacity: Option<usize>,
    settle_delay_ms: Option<u64>,
}

/// `[files]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FilesFileConfig {
    download_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    max_file_size: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    peer_refresh_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Initial display name.
    pub username: String,
    /// Initial room name.
    pub room: String,
    /// Capacity of room and dispatcher channels.
    pub channel_capacity: usize,
    /// Wait between activating a new room and leaving the old one.
    pub settle_delay: Duration,
    /// Directory where received files are written.
    pub download_dir: PathBuf,
    /// File transfer chunk size in bytes.
    pub chunk_size: usize,
    /// Sender-enforced ceiling on file size in bytes.
    pub max_file_size: usize,
    /// Interval between peer list refreshes.
    pub peer_refresh: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: GUEST_USERNAME.to_string(),
            room: DEFAULT_ROOM.to_string(),
            channel_capacity: 64,
            settle_delay: Duration::from_secs(1),
            download_dir: dirs::download_dir().unwrap_or_else(std::env::temp_dir),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            peer_refresh: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// CLI args and env vars are parsed via `clap`. If `--config` is given
    /// and the file does not exist, returns an error. Without `--config`,
    /// the default path (`~/.config/meshchat/config.toml`) is tried and
    /// silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or any config file cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without touching the filesystem.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            username: cli
                .username
                .clone()
                .or_else(|| file.chat.username.clone())
                .unwrap_or(defaults.username),
            room: cli
                .room
                .clone()
                .or_else(|| file.chat.room.clone())
                .unwrap_or(defaults.room),
            channel_capacity: file
                .chat
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            settle_delay: file
                .chat
                .settle_delay_ms
                .map_or(defaults.settle_delay, Duration::from_millis),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.files.download_dir.clone())
                .unwrap_or(defaults.download_dir),
            chunk_size: file.files.chunk_size.unwrap_or(defaults.chunk_size),
            max_file_size: file
                .files
                .max_file_size
                .unwrap_or(defaults.max_file_size),
            peer_refresh: file
                .ui
                .peer_refresh_secs
                .map_or(defaults.peer_refresh, Duration::from_secs),
        }
    }

    /// Build the per-room configuration from this config.
    #[must_use]
    pub const fn to_room_config(&self) -> RoomConfig {
        RoomConfig {
            channel_capacity: self.channel_capacity,
            chunk_size: self.chunk_size,
            max_file_size: self.max_file_size,
        }
    }

    /// Build the dispatcher configuration from this config.
    #[must_use]
    pub fn to_dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            peer_refresh: self.peer_refresh,
            settle_delay: self.settle_delay,
            download_dir: self.download_dir.clone(),
            channel_capacity: self.channel_capacity,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Decentralized terminal group chat over pubsub rooms")]
pub struct CliArgs {
    /// Display name to chat as.
    #[arg(long, env = "MESHCHAT_USERNAME")]
    pub username: Option<String>,

    /// Room to join at startup.
    #[arg(long, env = "MESHCHAT_ROOM")]
    pub room: Option<String>,

    /// Path to config file (default: `~/.config/meshchat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory where received files are written.
    #[arg(long, env = "MESHCHAT_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "MESHCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/meshchat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("meshchat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
