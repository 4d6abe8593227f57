/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_PUSH_PORT: u16 = 5001;
const DEFAULT_PLATFORM: &str = "WhatsApp";
const DEFAULT_LOG_FILE: &str = "chatdesk.log";

/// Viewports at or below this width (logical pixels) get the compact layout
pub const COMPACT_BREAKPOINT: u32 = 768;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend serving `/messages`
    pub server_url: String,

    /// Address of the push channel
    pub push_addr: SocketAddr,

    /// Platform label for conversations whose records carry none
    pub default_platform: String,

    /// Timeout for one history request
    pub request_timeout: Duration,

    /// Logical pixels per terminal column, used for the responsive breakpoint
    pub cell_width: u32,

    /// Log destination for the terminal front-end
    pub log_file: PathBuf,

    /// Arguments that are not flags (CLI command and its operands)
    pub positional: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            push_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PUSH_PORT)),
            default_platform: DEFAULT_PLATFORM.to_string(),
            request_timeout: Duration::from_secs(10),
            cell_width: 8,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            positional: Vec::new(),
        }
    }
}

impl Config {
    /// Create config from command line arguments (`args[0]` is the binary name)
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Config::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--server" => {
                    config.server_url = flag_value(args, i, "--server", "a URL")?
                        .trim_end_matches('/')
                        .to_string();
                    i += 2;
                }
                "--push" => {
                    let v = flag_value(args, i, "--push", "an address")?;
                    config.push_addr = parse_push_addr(v)?;
                    i += 2;
                }
                "--platform" => {
                    config.default_platform =
                        flag_value(args, i, "--platform", "a name")?.to_string();
                    i += 2;
                }
                "--log-file" => {
                    config.log_file = PathBuf::from(flag_value(args, i, "--log-file", "a path")?);
                    i += 2;
                }
                "--cell-width" => {
                    let v = flag_value(args, i, "--cell-width", "a number")?;
                    config.cell_width = v.parse::<u32>().ok().filter(|w| *w > 0).ok_or_else(|| {
                        ChatError::Config("--cell-width must be a positive number".to_string())
                    })?;
                    i += 2;
                }
                "--timeout-ms" => {
                    let v = flag_value(args, i, "--timeout-ms", "a number")?;
                    let ms = v.parse::<u64>().map_err(|_| {
                        ChatError::Config("--timeout-ms must be a valid number".to_string())
                    })?;
                    config.request_timeout = Duration::from_millis(ms);
                    i += 2;
                }
                other if other.starts_with("--") => {
                    return Err(ChatError::Config(format!("Unknown flag: {}", other)));
                }
                other => {
                    config.positional.push(other.to_string());
                    i += 1;
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(url) = std::env::var("CHATDESK_SERVER") {
            config.server_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(addr) = std::env::var("CHATDESK_PUSH_ADDR") {
            config.push_addr = parse_push_addr(&addr)?;
        }
        if let Ok(path) = std::env::var("CHATDESK_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }

        if !config.server_url.starts_with("http://") {
            return Err(ChatError::Config(format!(
                "Server URL must start with http:// (got {})",
                config.server_url
            )));
        }

        Ok(config)
    }

    /// URL of the full-history endpoint
    pub fn history_url(&self) -> String {
        format!("{}/messages", self.server_url)
    }

    /// Convert a terminal width in columns to logical pixels
    pub fn viewport_width(&self, columns: u16) -> u32 {
        u32::from(columns) * self.cell_width
    }
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(|s| s.as_str())
        .ok_or_else(|| ChatError::Config(format!("{} requires {} argument", flag, what)))
}

fn parse_push_addr(s: &str) -> Result<SocketAddr> {
    s.parse::<SocketAddr>()
        .map_err(|_| ChatError::Config(format!("Invalid push channel address: {}", s)))
}
