//! Configuration management for radiopulse
//!
//! This module handles loading and validating configuration from environment
//! variables and an optional TOML file. Malformed numeric values are a
//! startup error, never a silent fallback: the scheduler must not start with
//! a half-parsed configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP/WebSocket server configuration
    pub server: ServerConfig,

    /// Scrape and push cadence configuration
    pub scrape: ScrapeConfig,

    /// Playlist log and audit log storage
    pub storage: StorageConfig,

    /// Listener estimator tuning
    pub estimator: EstimatorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind_address: SocketAddr,

    /// Enable permissive CORS on all routes
    pub enable_cors: bool,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

/// Scrape source and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// URL of the station playlist page
    pub playlist_url: String,

    /// User agent sent with every fetch
    pub user_agent: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Interval between scheduled scrapes in seconds
    pub scrape_interval_secs: u64,

    /// Push ticker cadence in seconds (listeners topic)
    pub push_interval_secs: u64,

    /// Periodic song re-broadcast interval in seconds
    pub song_refresh_secs: u64,

    /// Station name used when the page does not carry one
    pub station: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Playlist log file path (ordered JSON array, newest first)
    pub playlist_path: PathBuf,

    /// Connection audit log path
    pub audit_path: PathBuf,

    /// Maximum playlist length, 0 = uncapped
    pub playlist_limit: usize,
}

/// Listener estimator tuning
///
/// Loaded once at startup and never mutated afterwards, so it is safe to
/// share across all estimator invocations without synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Weekday peak listener level
    pub weekday_peak: f64,

    /// Weekend peak listener level
    pub weekend_peak: f64,

    /// Night floor, the estimate never goes below this
    pub night_min: f64,

    /// Slow jitter standard deviation (fraction of the above-floor level)
    pub slow_sigma: f64,

    /// Slow jitter clip bound
    pub slow_clip: f64,

    /// Fast jitter standard deviation
    pub fast_sigma: f64,

    /// Fast jitter clip bound
    pub fast_clip: f64,

    /// Seconds a slow-jitter seed stays stable
    pub slow_bucket_secs: u64,

    /// Curve floor fraction, keeps the base level off exact zero
    pub base_floor: f64,

    /// Absolute low-end wiggle amplitude, fades out towards the peak
    pub night_wiggle: f64,

    /// Night volatility multiplier applied to both jitters near the floor
    pub night_volatility: f64,

    /// Dither reseed frequency in Hz (independent of the fast-jitter cadence)
    pub dither_hz: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables on top of defaults
    ///
    /// # Errors
    ///
    /// Returns an error when any recognized numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing or malformed, or when any
    /// recognized environment variable fails to parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `RADIOPULSE_*` environment overrides, the top configuration
    /// layer (defaults < TOML file < environment)
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(addr) = env_parse::<SocketAddr>("RADIOPULSE_BIND_ADDRESS")? {
            self.server.bind_address = addr;
        }
        if let Some(v) = env_parse::<bool>("RADIOPULSE_ENABLE_CORS")? {
            self.server.enable_cors = v;
        }

        if let Ok(url) = std::env::var("RADIOPULSE_PLAYLIST_URL") {
            self.scrape.playlist_url = url;
        }
        if let Ok(ua) = std::env::var("RADIOPULSE_USER_AGENT") {
            self.scrape.user_agent = ua;
        }
        if let Ok(station) = std::env::var("RADIOPULSE_STATION") {
            self.scrape.station = station;
        }
        if let Some(v) = env_parse::<u64>("RADIOPULSE_REQUEST_TIMEOUT")? {
            self.scrape.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>("RADIOPULSE_SCRAPE_EVERY_S")? {
            self.scrape.scrape_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("RADIOPULSE_PUSH_INTERVAL_S")? {
            self.scrape.push_interval_secs = v;
        }
        if let Some(v) = env_parse::<u64>("RADIOPULSE_SONG_REFRESH_S")? {
            self.scrape.song_refresh_secs = v;
        }

        if let Ok(path) = std::env::var("RADIOPULSE_PLAYLIST_PATH") {
            self.storage.playlist_path = path.into();
        }
        if let Ok(path) = std::env::var("RADIOPULSE_AUDIT_PATH") {
            self.storage.audit_path = path.into();
        }
        if let Some(v) = env_parse::<usize>("RADIOPULSE_PLAYLIST_LIMIT")? {
            self.storage.playlist_limit = v;
        }

        if let Some(v) = env_parse::<f64>("RADIOPULSE_WEEKDAY_PEAK")? {
            self.estimator.weekday_peak = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_WEEKEND_PEAK")? {
            self.estimator.weekend_peak = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_NIGHT_MIN")? {
            self.estimator.night_min = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_SLOW_SIGMA")? {
            self.estimator.slow_sigma = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_SLOW_CLIP")? {
            self.estimator.slow_clip = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_FAST_SIGMA")? {
            self.estimator.fast_sigma = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_FAST_CLIP")? {
            self.estimator.fast_clip = v;
        }
        if let Some(v) = env_parse::<u64>("RADIOPULSE_SLOW_BUCKET_S")? {
            self.estimator.slow_bucket_secs = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_BASE_FLOOR")? {
            self.estimator.base_floor = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_NIGHT_WIGGLE")? {
            self.estimator.night_wiggle = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_NIGHT_VOLATILITY")? {
            self.estimator.night_volatility = v;
        }
        if let Some(v) = env_parse::<f64>("RADIOPULSE_DITHER_HZ")? {
            self.estimator.dither_hz = v;
        }

        if let Ok(level) = std::env::var("RADIOPULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("RADIOPULSE_LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found. Called
    /// before any scheduling begins; an invalid configuration is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.scrape.playlist_url.is_empty() {
            bail!("playlist_url must not be empty");
        }
        if self.scrape.scrape_interval_secs == 0 {
            bail!("scrape_interval_secs must be greater than 0");
        }
        if self.scrape.push_interval_secs == 0 {
            bail!("push_interval_secs must be greater than 0");
        }
        if self.scrape.song_refresh_secs == 0 {
            bail!("song_refresh_secs must be greater than 0");
        }
        if self.scrape.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than 0");
        }

        let est = &self.estimator;
        if est.night_min <= 0.0 {
            bail!("night_min must be positive");
        }
        if est.weekday_peak <= est.night_min || est.weekend_peak <= est.night_min {
            bail!("peak levels must be greater than night_min");
        }
        if est.slow_sigma < 0.0 || est.fast_sigma < 0.0 {
            bail!("jitter sigma values must not be negative");
        }
        if est.slow_clip < 0.0 || est.fast_clip < 0.0 {
            bail!("jitter clip values must not be negative");
        }
        if !(0.0..1.0).contains(&est.base_floor) {
            bail!("base_floor must be in [0, 1)");
        }
        if est.night_volatility < 0.0 {
            bail!("night_volatility must not be negative");
        }
        if est.dither_hz <= 0.0 {
            bail!("dither_hz must be positive");
        }
        if est.slow_bucket_secs == 0 {
            bail!("slow_bucket_secs must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape.request_timeout_secs)
    }

    /// Get scrape interval as Duration
    #[must_use]
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape.scrape_interval_secs)
    }

    /// Get push interval as Duration
    #[must_use]
    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.scrape.push_interval_secs)
    }
}

/// Parse an environment variable, treating a malformed value as an error
/// rather than falling back to the default.
fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => {
            let value = raw
                .parse::<T>()
                .map_err(|_| anyhow::anyhow!("Invalid value for {key}: {raw:?}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scrape: ScrapeConfig::default(),
            storage: StorageConfig::default(),
            estimator: EstimatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".parse().expect("valid default bind address"),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            playlist_url: String::from("https://www.radia.sk/radia/melody/playlist"),
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/129.0 Safari/537.36",
            ),
            request_timeout_secs: 20,
            scrape_interval_secs: 120,
            push_interval_secs: 10,
            song_refresh_secs: 60,
            station: String::from("Rádio Melody"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            playlist_path: PathBuf::from("data/playlist.json"),
            audit_path: PathBuf::from("data/ws_connections.log"),
            playlist_limit: 0,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            weekday_peak: 3200.0,
            weekend_peak: 2000.0,
            night_min: 180.0,
            slow_sigma: 0.04,
            slow_clip: 0.08,
            fast_sigma: 0.02,
            fast_clip: 0.04,
            slow_bucket_secs: 30,
            base_floor: 0.01,
            night_wiggle: 12.0,
            night_volatility: 1.8,
            dither_hz: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_scrape_interval_rejected() {
        let mut config = Config::default();
        config.scrape.scrape_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_peak_below_floor_rejected() {
        let mut config = Config::default();
        config.estimator.weekend_peak = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_dither_rejected() {
        let mut config = Config::default();
        config.estimator.dither_hz = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.scrape.scrape_interval_secs, 120);
        assert_eq!(parsed.estimator.weekday_peak, 3200.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str("[scrape]\nscrape_interval_secs = 60\n").unwrap();
        assert_eq!(parsed.scrape.scrape_interval_secs, 60);
        assert_eq!(parsed.storage.playlist_limit, 0);
    }

    // env vars are process-global, so every env scenario lives in this one
    // test and runs sequentially
    #[test]
    fn test_env_override_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[scrape]\nscrape_interval_secs = 60\nstation = \"File FM\"\n",
        )
        .unwrap();

        // env wins over the file, file values survive where no var is set
        std::env::set_var("RADIOPULSE_STATION", "Env FM");
        let config = Config::from_file(&path).unwrap();
        std::env::remove_var("RADIOPULSE_STATION");
        assert_eq!(config.scrape.scrape_interval_secs, 60);
        assert_eq!(config.scrape.station, "Env FM");

        // a malformed numeric variable is an error, not a silent fallback
        std::env::set_var("RADIOPULSE_SLOW_BUCKET_S", "soon");
        let from_env = Config::from_env();
        let from_file = Config::from_file(&path);
        std::env::remove_var("RADIOPULSE_SLOW_BUCKET_S");
        assert!(from_env.is_err());
        assert!(from_file.is_err());
    }
}
