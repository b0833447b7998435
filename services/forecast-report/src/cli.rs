//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use grid_fetcher::SourceKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "forecast-report")]
#[command(about = "Hourly KMA grid forecast report for one or more locations")]
pub struct Args {
    /// YAML report configuration; flags given here override it
    #[arg(long, env = "REPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Location lookup table (JSON object of name -> {x, y})
    #[arg(long, env = "LOCATIONS_FILE")]
    pub locations_file: Option<PathBuf>,

    /// Location key to report (repeatable)
    #[arg(long = "location")]
    pub locations: Vec<String>,

    /// Latitude of an ad-hoc point (requires --lon)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of an ad-hoc point (requires --lat)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Provider: apihub or portal [default: apihub]
    #[arg(long, env = "GRID_SOURCE")]
    pub source: Option<SourceKind>,

    /// Which forecast hours to report [default: rolling]
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Rolling window length in hours [default: 24]
    #[arg(long)]
    pub hours: Option<u32>,

    /// Morning window switches to tomorrow at this hour [default: 7]
    #[arg(long)]
    pub cutoff_hour: Option<u32>,

    /// Output path; `{location}` is replaced per location [default: weather_data.json]
    #[arg(long)]
    pub output: Option<String>,

    /// Concurrent provider requests (at most 4)
    #[arg(long, default_value = "4")]
    pub max_concurrent: usize,

    /// Attempts per (hour, variable)
    #[arg(long, default_value = "5")]
    pub max_retries: u32,

    /// Run once and exit (vs repeating every interval)
    #[arg(long)]
    pub once: bool,

    /// Seconds between runs in continuous mode [default: 3600]
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Consecutive hours from now
    Rolling,
    /// 04:00-08:00 of the coming morning
    Morning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["forecast-report", "--location", "A"]);
        assert_eq!(args.locations, vec!["A".to_string()]);
        assert_eq!(args.max_concurrent, 4);
        assert_eq!(args.max_retries, 5);
        assert!(!args.once);
        assert!(args.policy.is_none());
    }

    #[test]
    fn test_repeatable_location_and_source() {
        let args = Args::parse_from([
            "forecast-report",
            "--location",
            "A",
            "--location",
            "B",
            "--source",
            "portal",
            "--policy",
            "morning",
            "--once",
        ]);
        assert_eq!(args.locations.len(), 2);
        assert_eq!(args.source, Some(SourceKind::DataPortal));
        assert_eq!(args.policy, Some(PolicyArg::Morning));
        assert!(args.once);
    }

    #[test]
    fn test_lat_requires_lon() {
        assert!(Args::try_parse_from(["forecast-report", "--lat", "37.5"]).is_err());
        let args = Args::try_parse_from(["forecast-report", "--lat", "37.5", "--lon", "127.0"]).unwrap();
        assert_eq!(args.lat, Some(37.5));
    }
}
