//! Configuration loading for autodial services
//!
//! Bootstrap configuration comes from a TOML file. Resolution order for the
//! file itself:
//! 1. Explicit path (command-line argument)
//! 2. `AUTODIAL_CONFIG` environment variable
//! 3. `<config_dir>/autodial/config.toml` (only if it exists)
//!
//! A missing file is never fatal: the service warns and runs on compiled
//! defaults. A file that exists but does not parse is a configuration error.
//! Twilio credentials may additionally be supplied through the environment
//! (`TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_PHONE_NUMBER`), which
//! take priority over the TOML values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "AUTODIAL_CONFIG";

pub const TWILIO_ACCOUNT_SID_ENV: &str = "TWILIO_ACCOUNT_SID";
pub const TWILIO_AUTH_TOKEN_ENV: &str = "TWILIO_AUTH_TOKEN";
pub const TWILIO_PHONE_NUMBER_ENV: &str = "TWILIO_PHONE_NUMBER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database for call logs. In-memory log store when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub dialer: DialerSettings,

    #[serde(default)]
    pub interpreter: InterpreterSettings,

    #[serde(default)]
    pub transport: TransportSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Dialing loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerSettings {
    /// Number of calls allowed in flight at once (1 = strict FIFO completion)
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Pause after each attempt before starting the next one
    #[serde(default)]
    pub inter_call_delay_ms: u64,

    /// Country calling code applied to bare national numbers (e.g. "91")
    #[serde(default)]
    pub default_country_code: Option<String>,
}

/// Tie-break applied when a command contains several distinct numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// First occurrence wins
    #[default]
    First,
    /// Refuse the command
    Reject,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterpreterSettings {
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,
}

/// Which call transport the service drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Simulated,
    Twilio,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default)]
    pub kind: TransportKind,

    #[serde(default)]
    pub simulated: SimulatedTransportSettings,

    #[serde(default)]
    pub twilio: TwilioSettings,
}

/// Timing and outcome mix for the simulated transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedTransportSettings {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Probability (0.0 - 1.0) that a simulated call connects
    #[serde(default = "default_connect_ratio")]
    pub connect_ratio: f64,
}

/// Twilio REST credentials and call content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioSettings {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Caller ID the calls are placed from
    #[serde(default)]
    pub from_number: Option<String>,

    /// Text read out when the voice preference is on
    #[serde(default = "default_voice_message")]
    pub voice_message: String,

    /// TwiML document fetched when the voice preference is off
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_concurrent_calls() -> usize {
    1
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    4000
}

fn default_connect_ratio() -> f64 {
    0.5
}

fn default_voice_message() -> String {
    "Hello! This is an automated call. Thank you for your attention. Goodbye!".to_string()
}

fn default_fallback_url() -> String {
    "http://demo.twilio.com/docs/voice.xml".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            database_path: None,
            logging: LoggingConfig::default(),
            dialer: DialerSettings::default(),
            interpreter: InterpreterSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DialerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            inter_call_delay_ms: 0,
            default_country_code: None,
        }
    }
}

impl Default for SimulatedTransportSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            connect_ratio: default_connect_ratio(),
        }
    }
}

impl Default for TwilioSettings {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            voice_message: default_voice_message(),
            fallback_url: default_fallback_url(),
        }
    }
}

impl TwilioSettings {
    /// True when every credential needed to place a call is present and non-blank
    pub fn is_complete(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from_number]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Overlay environment-provided values (environment beats TOML)
    pub fn apply_env_overrides(&mut self) {
        let twilio = &mut self.transport.twilio;
        for (var, slot) in [
            (TWILIO_ACCOUNT_SID_ENV, &mut twilio.account_sid),
            (TWILIO_AUTH_TOKEN_ENV, &mut twilio.auth_token),
            (TWILIO_PHONE_NUMBER_ENV, &mut twilio.from_number),
        ] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    *slot = Some(value);
                }
            }
        }
    }

    /// Clamp values that would otherwise stall the dialer
    pub fn normalized(mut self) -> Self {
        if self.dialer.max_concurrent_calls == 0 {
            warn!("dialer.max_concurrent_calls = 0 is invalid, using 1");
            self.dialer.max_concurrent_calls = 1;
        }
        let sim = &mut self.transport.simulated;
        if sim.max_delay_ms < sim.min_delay_ms {
            warn!(
                "transport.simulated.max_delay_ms ({}) < min_delay_ms ({}), swapping",
                sim.max_delay_ms, sim.min_delay_ms
            );
            std::mem::swap(&mut sim.min_delay_ms, &mut sim.max_delay_ms);
        }
        sim.connect_ratio = sim.connect_ratio.clamp(0.0, 1.0);
        self
    }
}

/// Locate the configuration file following the documented priority order
///
/// Returns `None` when no explicit path was given and no default file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("autodial").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load configuration from `path`, falling back to defaults when absent
///
/// Environment overrides are applied after the file is read.
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match path {
        None => {
            info!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
        Some(path) if !path.exists() => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            TomlConfig::default()
        }
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            let config = TomlConfig::from_toml_str(&content)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
    };

    config.apply_env_overrides();
    Ok(config.normalized())
}
