use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Headless monitor for pile/anchor load-settlement logger dumps
#[derive(Parser, Debug, Clone)]
#[command(
    name = "loadtest-monitor",
    about = "Headless monitor for pile/anchor load-settlement logger dumps",
    version
)]
pub struct Settings {
    /// Full-resolution logger dump
    #[arg(long, default_value = "assets/LT2312_LT2312.dat")]
    pub primary_file: PathBuf,

    /// Coarse summary logger dump (one row per load stage)
    #[arg(long, default_value = "assets/LT2312_Sum.dat")]
    pub summary_file: PathBuf,

    /// Test identifier used to name exported tables
    #[arg(long, default_value = "LT2312")]
    pub test_id: String,

    /// Run mode
    #[arg(long, default_value = "watch", value_parser = ["watch", "once", "export"])]
    pub mode: String,

    /// Data refresh interval in seconds (1-3600)
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=3600))]
    pub refresh_interval: u32,

    /// Clock tick interval in seconds (1-60)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=60))]
    pub clock_interval: u32,

    /// Reject the whole dump on the first malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Directory exported tables are written to
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Print snapshots as JSON
    #[arg(long)]
    pub json: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

impl Settings {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval))
    }

    pub fn clock_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.clock_interval))
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.loadtest-monitor/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".loadtest-monitor").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; clap stores arg ids under the field name.
        if !is_arg_explicitly_set(&matches, "primary_file") {
            if let Some(v) = last.primary_file {
                settings.primary_file = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "summary_file") {
            if let Some(v) = last.summary_file {
                settings.summary_file = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "test_id") {
            if let Some(v) = last.test_id {
                settings.test_id = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "refresh_interval") {
            if let Some(v) = last.refresh_interval.filter(|v| (1..=3600).contains(v)) {
                settings.refresh_interval = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "export_dir") {
            if let Some(v) = last.export_dir {
                settings.export_dir = v;
            }
        }

        settings = Self::apply_debug(settings);

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist last-used settings");
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            primary_file: Some(s.primary_file.clone()),
            summary_file: Some(s.summary_file.clone()),
            test_id: Some(s.test_id.clone()),
            refresh_interval: Some(s.refresh_interval),
            export_dir: Some(s.export_dir.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
