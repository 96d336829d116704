//! Watchdog configuration – reads `~/.crawlguard/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one watchdog process.  Every field has a default, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prometheus text-exposition endpoint scraped every cycle.
    pub metrics_url: String,
    pub poll_interval_secs: f64,
    /// Applies to both the metrics scrape and alert delivery.
    pub http_timeout_secs: f64,
    /// Rule files, or directories of `*.yaml` / `*.yml` files.
    pub rule_sources: Vec<PathBuf>,
    /// Simulate every enforcement action.  Only this file or `--enforce`
    /// can turn it off.
    pub dry_run: bool,

    /// Webhook receiving operator alerts.  Unset: alerts are only logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_webhook_url: Option<String>,
    pub alert_rate_limit_secs: u64,
    pub alert_retries: u32,
    pub alert_backoff_secs: f64,
    /// Where the last-alert timestamp survives restarts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_state_path: Option<PathBuf>,

    /// systemd unit stopped when no motion controller can be halted.
    pub motion_service: String,
    pub default_restart_agent: String,
    pub throttle_flag_path: PathBuf,
    pub upload_block_flag_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_url: "http://127.0.0.1:8000/metrics".to_string(),
            poll_interval_secs: 5.0,
            http_timeout_secs: 5.0,
            rule_sources: vec![PathBuf::from("config/rules")],
            dry_run: true,
            alert_webhook_url: None,
            alert_rate_limit_secs: 10,
            alert_retries: 3,
            alert_backoff_secs: 1.0,
            alert_state_path: None,
            motion_service: "picrawler.service".to_string(),
            default_restart_agent: "picrawler.service".to_string(),
            throttle_flag_path: PathBuf::from("/tmp/crawlguard_throttle_enabled"),
            upload_block_flag_path: PathBuf::from("/tmp/crawlguard_upload_blocked"),
        }
    }
}

impl Config {
    /// Reject values the watchdog cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if seconds("poll_interval_secs", self.poll_interval_secs)?.is_zero() {
            return Err(format!(
                "poll_interval_secs must be > 0, got {}",
                self.poll_interval_secs
            ));
        }
        if seconds("http_timeout_secs", self.http_timeout_secs)?.is_zero() {
            return Err(format!(
                "http_timeout_secs must be > 0, got {}",
                self.http_timeout_secs
            ));
        }
        if self.alert_retries < 1 {
            return Err("alert_retries must be at least 1".to_string());
        }
        seconds("alert_backoff_secs", self.alert_backoff_secs)?;
        if self.rule_sources.is_empty() {
            return Err("rule_sources must name at least one file or directory".to_string());
        }
        Ok(())
    }

    // An invalid value falls back to the default so an unvalidated config
    // still yields a usable duration.

    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or(Duration::from_secs(5))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.http_timeout_secs).unwrap_or(Duration::from_secs(5))
    }

    pub fn alert_backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.alert_backoff_secs).unwrap_or(Duration::from_secs(1))
    }

    pub fn alert_rate_limit(&self) -> Duration {
        Duration::from_secs(self.alert_rate_limit_secs)
    }
}

/// Convert a seconds field, naming the field when the value is negative,
/// not finite, or too large for a `Duration`.
fn seconds(field: &str, value: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| format!("{field} must be a non-negative number of seconds, got {value}: {e}"))
}

/// Return the path to `~/.crawlguard/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".crawlguard").join("config.toml")
}

/// Resolve the effective configuration.
///
/// An explicit path must exist.  The default path may be absent, in which
/// case built-in defaults apply.  Environment overrides are applied either
/// way, then the result is validated.
pub fn resolve(explicit: Option<&Path>) -> Result<Config, String> {
    let cfg = match explicit {
        Some(path) => load_from(path)?
            .ok_or_else(|| format!("Config file {} does not exist", path.display()))?,
        None => match load_from(&config_path())? {
            Some(cfg) => cfg,
            None => {
                let mut cfg = Config::default();
                apply_env_overrides(&mut cfg);
                cfg
            }
        },
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `CRAWLGUARD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `CRAWLGUARD_METRICS_URL` | `metrics_url` |
/// | `CRAWLGUARD_POLL_INTERVAL` | `poll_interval_secs` |
/// | `CRAWLGUARD_ALERT_RATE_LIMIT` | `alert_rate_limit_secs` |
/// | `CRAWLGUARD_ALERT_WEBHOOK` | `alert_webhook_url` |
///
/// Unparseable numbers are ignored.  `dry_run` has no variable.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CRAWLGUARD_METRICS_URL") {
        cfg.metrics_url = v;
    }
    if let Some(v) = lookup("CRAWLGUARD_POLL_INTERVAL")
        && let Ok(secs) = v.trim().parse::<f64>()
    {
        cfg.poll_interval_secs = secs;
    }
    if let Some(v) = lookup("CRAWLGUARD_ALERT_RATE_LIMIT")
        && let Ok(secs) = v.trim().parse::<u64>()
    {
        cfg.alert_rate_limit_secs = secs;
    }
    if let Some(v) = lookup("CRAWLGUARD_ALERT_WEBHOOK") {
        cfg.alert_webhook_url = (!v.trim().is_empty()).then_some(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_safe() {
        let cfg = Config::default();
        assert!(cfg.dry_run);
        assert_eq!(cfg.metrics_url, "http://127.0.0.1:8000/metrics");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.alert_rate_limit(), Duration::from_secs(10));
        assert!(cfg.alert_webhook_url.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "metrics_url = \"http://robot:9100/metrics\"\ndry_run = false\nrule_sources = [\"/etc/crawlguard/rules\"]\n",
        )
        .unwrap();

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.metrics_url, "http://robot:9100/metrics");
        assert!(!cfg.dry_run);
        assert_eq!(cfg.rule_sources, vec![PathBuf::from("/etc/crawlguard/rules")]);
        assert_eq!(cfg.alert_retries, 3);
        assert_eq!(cfg.motion_service, "picrawler.service");
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut cfg = Config::default();
        cfg.alert_webhook_url = Some("https://ops.example/hook".to_string());
        cfg.alert_state_path = Some(PathBuf::from("/var/lib/crawlguard/last_alert"));
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = \"often\"").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn explicit_missing_config_is_fatal() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = resolve(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn explicit_config_is_validated() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "alert_retries = 0\n").unwrap();
        let err = resolve(Some(&path)).unwrap_err();
        assert!(err.contains("alert_retries"));
    }

    #[test]
    fn config_path_points_to_crawlguard_dir() {
        let p = config_path_for_home("/home/robot");
        assert_eq!(p, PathBuf::from("/home/robot/.crawlguard/config.toml"));
    }

    #[test]
    fn validation_rejects_non_positive_intervals() {
        let mut cfg = Config::default();
        cfg.poll_interval_secs = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.http_timeout_secs = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.alert_backoff_secs = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.rule_sources.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_unrepresentable_durations() {
        let mut cfg = Config::default();
        cfg.poll_interval_secs = 1e20;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("poll_interval_secs"), "{err}");

        let mut cfg = Config::default();
        cfg.alert_backoff_secs = f64::INFINITY;
        assert!(cfg.validate().unwrap_err().contains("alert_backoff_secs"));
    }

    #[test]
    fn huge_interval_in_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "poll_interval_secs = 1e20\n").unwrap();
        let err = resolve(Some(&path)).unwrap_err();
        assert!(err.contains("poll_interval_secs"), "{err}");
    }

    #[test]
    fn accessors_fall_back_on_unvalidated_values() {
        let mut cfg = Config::default();
        cfg.poll_interval_secs = 1e20;
        cfg.http_timeout_secs = f64::NAN;
        cfg.alert_backoff_secs = -3.0;
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.http_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.alert_backoff(), Duration::from_secs(1));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            env(&[
                ("CRAWLGUARD_METRICS_URL", "http://10.0.0.2:8000/metrics"),
                ("CRAWLGUARD_POLL_INTERVAL", "0.5"),
                ("CRAWLGUARD_ALERT_RATE_LIMIT", "60"),
                ("CRAWLGUARD_ALERT_WEBHOOK", "https://ops.example/hook"),
            ]),
        );
        assert_eq!(cfg.metrics_url, "http://10.0.0.2:8000/metrics");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.alert_rate_limit_secs, 60);
        assert_eq!(cfg.alert_webhook_url.as_deref(), Some("https://ops.example/hook"));
    }

    #[test]
    fn env_overrides_ignore_invalid_numbers() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            env(&[
                ("CRAWLGUARD_POLL_INTERVAL", "soon"),
                ("CRAWLGUARD_ALERT_RATE_LIMIT", "-5"),
            ]),
        );
        assert_eq!(cfg.poll_interval_secs, 5.0);
        assert_eq!(cfg.alert_rate_limit_secs, 10);
    }

    #[test]
    fn empty_webhook_override_clears_sink() {
        let mut cfg = Config::default();
        cfg.alert_webhook_url = Some("https://ops.example/hook".to_string());
        apply_overrides(&mut cfg, env(&[("CRAWLGUARD_ALERT_WEBHOOK", "")]));
        assert!(cfg.alert_webhook_url.is_none());
    }

    #[test]
    fn environment_cannot_disable_dry_run() {
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, env(&[("CRAWLGUARD_DRY_RUN", "false")]));
        assert!(cfg.dry_run);
    }
}
