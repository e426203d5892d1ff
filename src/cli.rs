use std::path::PathBuf;
use clap::{Parser, ValueEnum};

use crate::config::{ConfigError, DashboardConfig};
use crate::core::{parse_timestamp, DateRange, FilterKey, Preset, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "kpiboard")]
#[command(version)]
#[command(about = "Terminal KPI dashboard for session processing")]
#[command(long_about = "kpiboard shows session-processing KPIs filtered by one of three exclusive date ranges (visit, created, modified). Applying a range or a quick preset to one filter clears the others, and every filter change refreshes the metrics.")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "tui", help = "Output format")]
    pub output: OutputFormat,

    /// Quick preset to apply at startup
    #[arg(long, value_name = "PRESET", help = "Preset to apply, e.g. today, last-1-week")]
    pub preset: Option<Preset>,

    /// Filter the preset or range lands on
    #[arg(long, value_name = "FILTER", default_value = "visit", help = "Target filter: visit, created or modified")]
    pub target: FilterKey,

    /// Range start
    #[arg(long, value_name = "WHEN", value_parser = parse_timestamp, help = "Range start, YYYY-MM-DD [HH:MM]")]
    pub from: Option<Timestamp>,

    /// Range end
    #[arg(long, value_name = "WHEN", value_parser = parse_timestamp, help = "Range end, YYYY-MM-DD [HH:MM]")]
    pub to: Option<Timestamp>,

    /// Override the simulated metrics latency
    #[arg(long, help = "Simulated metrics latency in ms")]
    pub latency_ms: Option<u64>,

    /// Override the simulated failure probability
    #[arg(long, help = "Probability (0-1) that a refresh fails")]
    pub failure_rate: Option<f64>,

    /// Override the background refresh interval
    #[arg(long, help = "Auto-refresh interval in seconds, 0 disables")]
    pub auto_refresh_secs: Option<u64>,

    /// Directory for downloaded KPI files
    #[arg(long, value_name = "DIR", help = "Directory for KPI exports")]
    pub export_dir: Option<PathBuf>,

    /// Keep printing metrics on every scheduled refresh (json/text only)
    #[arg(short, long, help = "Keep refreshing until Ctrl+C")]
    pub watch: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colors in output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Terminal user interface (default)
    Tui,
    /// JSON snapshot for scripting
    Json,
    /// Plain text KPI listing
    Text,
}

impl Cli {
    pub fn setup_logging(&self) {
        let level = match (self.verbose, self.output) {
            (true, _) => tracing::Level::DEBUG,
            // Keep the alternate screen clean
            (false, OutputFormat::Tui) => tracing::Level::ERROR,
            (false, _) => tracing::Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_ansi(!self.no_color)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.preset.is_some() && (self.from.is_some() || self.to.is_some()) {
            return Err("--preset cannot be combined with --from/--to".to_string());
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err("--from must not be after --to".to_string());
            }
        }

        if let Some(rate) = self.failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err("Failure rate must be between 0 and 1".to_string());
            }
        }

        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(format!("Config file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Explicit range from `--from`/`--to`, if either was given
    pub fn range(&self) -> Option<DateRange> {
        if self.from.is_none() && self.to.is_none() {
            None
        } else {
            Some(DateRange::new(self.from, self.to))
        }
    }

    /// File config, then environment, then command-line overrides
    pub fn load_config(&self) -> Result<DashboardConfig, ConfigError> {
        let mut config = DashboardConfig::load_or_default(self.config.as_deref())?;

        if let Some(ms) = self.latency_ms {
            config.refresh.simulated_latency_ms = ms;
        }
        if let Some(rate) = self.failure_rate {
            config.refresh.failure_rate = rate;
        }
        if let Some(secs) = self.auto_refresh_secs {
            config.refresh.auto_refresh_secs = secs;
        }
        if let Some(dir) = &self.export_dir {
            config.export.directory = dir.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: None,
            output: OutputFormat::Tui,
            preset: None,
            target: FilterKey::Visit,
            from: None,
            to: None,
            latency_ms: None,
            failure_rate: None,
            auto_refresh_secs: None,
            export_dir: None,
            watch: false,
            verbose: false,
            no_color: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preset_and_target() {
        let cli = Cli::try_parse_from([
            "kpiboard", "--output", "json", "--preset", "last-1-week", "--target", "created",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.preset, Some(Preset::LastWeek));
        assert_eq!(cli.target, FilterKey::Created);
        assert!(cli.validate().is_ok());
        assert!(cli.range().is_none());
    }

    #[test]
    fn test_parse_explicit_range() {
        let cli = Cli::try_parse_from(["kpiboard", "--from", "2024-01-01", "--to", "2024-01-02 18:30"]).unwrap();

        let range = cli.range().unwrap();
        assert_eq!(range.from.unwrap().to_string(), "2024-01-01 00:00:00");
        assert_eq!(range.to.unwrap().to_string(), "2024-01-02 18:30:00");
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(Cli::try_parse_from(["kpiboard", "--from", "yesterday-ish"]).is_err());
    }

    #[test]
    fn test_validate_rejects_conflicts() {
        let cli = Cli::try_parse_from(["kpiboard", "--preset", "today", "--from", "2024-01-01"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["kpiboard", "--from", "2024-01-02", "--to", "2024-01-01"]).unwrap();
        assert!(cli.validate().is_err());

        let cli = Cli { failure_rate: Some(1.5), ..Default::default() };
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_overrides_applied_to_config() {
        let cli = Cli {
            latency_ms: Some(5),
            auto_refresh_secs: Some(0),
            export_dir: Some(PathBuf::from("/tmp/kpi")),
            ..Default::default()
        };

        let config = cli.load_config().unwrap();

        assert_eq!(config.refresh.simulated_latency_ms, 5);
        assert!(config.refresh.auto_refresh_interval().is_none());
        assert_eq!(config.export.directory, PathBuf::from("/tmp/kpi"));
    }
}
