//! Report configuration: optional YAML file merged with command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Duration as ChronoDuration;
use grid_fetcher::SourceKind;
use kma_common::{EffectivePolicy, ForecastClock, Variable};
use serde::Deserialize;
use tracing::debug;

use crate::cli::{Args, PolicyArg};

pub const LOCATION_PLACEHOLDER: &str = "{location}";
pub const DEFAULT_OUTPUT: &str = "weather_data.json";
pub const DEFAULT_LOCATIONS_FILE: &str = "weather_code.json";
const DEFAULT_HOURS: u32 = 24;
const DEFAULT_CUTOFF_HOUR: u32 = 7;
const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// The portal publishes a run about ten minutes after its nominal hour.
const PORTAL_DELAY_MINUTES: i64 = 10;

/// Report configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub locations_file: Option<PathBuf>,
    #[serde(default)]
    pub source: Option<SourceKind>,
    #[serde(default)]
    pub policy: Option<EffectivePolicy>,
    #[serde(default = "default_variables")]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub availability_delay_minutes: Option<i64>,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

/// Variables behind the report columns.
pub fn default_variables() -> Vec<Variable> {
    vec![
        Variable::Tmp,
        Variable::Sky,
        Variable::Pty,
        Variable::Wsd,
        Variable::Pop,
    ]
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            locations_file: None,
            source: None,
            policy: None,
            variables: default_variables(),
            output: None,
            availability_delay_minutes: None,
            interval_secs: None,
        }
    }
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ReportConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!(path = %path.display(), locations = config.locations.len(), "Loaded report config");
        Ok(config)
    }
}

/// What to report on.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A key of the location table
    Named(String),
    /// A point projected onto the grid
    Coordinate { lat: f64, lon: f64 },
}

impl Target {
    pub fn label(&self) -> String {
        match self {
            Target::Named(name) => name.clone(),
            Target::Coordinate { lat, lon } => format!("{:.4},{:.4}", lat, lon),
        }
    }
}

/// Effective settings for a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub targets: Vec<Target>,
    pub locations_file: PathBuf,
    pub source: SourceKind,
    pub policy: EffectivePolicy,
    pub variables: Vec<Variable>,
    pub output: String,
    pub clock: ForecastClock,
    pub interval: Duration,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub once: bool,
}

impl Settings {
    /// Merge flags over the file config. Flags win.
    pub fn resolve(args: &Args, file: ReportConfig) -> Result<Self> {
        let mut targets: Vec<Target> = if args.locations.is_empty() {
            file.locations.into_iter().map(Target::Named).collect()
        } else {
            args.locations.iter().cloned().map(Target::Named).collect()
        };
        if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
            targets.push(Target::Coordinate { lat, lon });
        }
        if targets.is_empty() {
            bail!("no locations given; use --location, --lat/--lon or `locations` in the config file");
        }

        let source = args.source.or(file.source).unwrap_or_default();
        let policy = resolve_policy(args, file.policy);

        let output = args
            .output
            .clone()
            .or(file.output)
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        if targets.len() > 1 && !output.contains(LOCATION_PLACEHOLDER) {
            bail!(
                "{} locations share output '{}'; include {} in the output path",
                targets.len(),
                output,
                LOCATION_PLACEHOLDER
            );
        }

        if file.variables.is_empty() {
            bail!("`variables` must not be empty");
        }

        let delay_minutes = file.availability_delay_minutes.unwrap_or(match source {
            SourceKind::ApiHub => 0,
            SourceKind::DataPortal => PORTAL_DELAY_MINUTES,
        });

        Ok(Self {
            targets,
            locations_file: args
                .locations_file
                .clone()
                .or(file.locations_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCATIONS_FILE)),
            source,
            policy,
            variables: file.variables,
            output,
            clock: ForecastClock::new(ChronoDuration::minutes(delay_minutes)),
            interval: Duration::from_secs(
                args.interval_secs
                    .or(file.interval_secs)
                    .unwrap_or(DEFAULT_INTERVAL_SECS),
            ),
            max_concurrent: args.max_concurrent,
            max_retries: args.max_retries,
            once: args.once,
        })
    }

    /// Output path for one target.
    pub fn output_path(&self, target: &Target) -> PathBuf {
        PathBuf::from(self.output.replace(LOCATION_PLACEHOLDER, &file_safe(&target.label())))
    }

    pub fn needs_location_table(&self) -> bool {
        self.targets.iter().any(|t| matches!(t, Target::Named(_)))
    }
}

fn resolve_policy(args: &Args, file: Option<EffectivePolicy>) -> EffectivePolicy {
    let kind = args.policy.or(match file {
        Some(EffectivePolicy::Morning { .. }) => Some(PolicyArg::Morning),
        Some(EffectivePolicy::Rolling { .. }) => Some(PolicyArg::Rolling),
        None => None,
    });

    match kind.unwrap_or(PolicyArg::Rolling) {
        PolicyArg::Rolling => {
            let file_hours = match file {
                Some(EffectivePolicy::Rolling { hours }) => Some(hours),
                _ => None,
            };
            EffectivePolicy::Rolling {
                hours: args.hours.or(file_hours).unwrap_or(DEFAULT_HOURS),
            }
        }
        PolicyArg::Morning => {
            let file_cutoff = match file {
                Some(EffectivePolicy::Morning { cutoff_hour }) => Some(cutoff_hour),
                _ => None,
            };
            EffectivePolicy::Morning {
                cutoff_hour: args.cutoff_hour.or(file_cutoff).unwrap_or(DEFAULT_CUTOFF_HOUR),
            }
        }
    }
}

/// Replace characters that do not belong in a file name.
fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
