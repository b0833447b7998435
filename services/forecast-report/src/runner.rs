//! One report cycle over every target, and the repeating loop around it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use kma_common::{format_tm, kst_now, ForecastWindow, GeoPoint, GridCell, LocationTable};
use projection::LambertConformal;
use timeseries::{
    markdown_summary, rows_from_series, write_json, LocationSummary, Progress, ProgressSink,
    SeriesAggregator,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{Settings, Target};

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub summaries: Vec<LocationSummary>,
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_failed(&self) -> bool {
        !self.summaries.is_empty() && self.failed == self.summaries.len()
    }

    pub fn markdown(&self) -> String {
        markdown_summary(&self.summaries)
    }
}

pub struct Runner {
    settings: Settings,
    aggregator: SeriesAggregator,
    table: Option<LocationTable>,
    projector: LambertConformal,
}

impl Runner {
    pub fn new(settings: Settings, aggregator: SeriesAggregator, table: Option<LocationTable>) -> Self {
        Self {
            settings,
            aggregator,
            table,
            projector: LambertConformal::kma(),
        }
    }

    /// Load the location table if any target needs it.
    pub fn load_table(settings: &Settings) -> Result<Option<LocationTable>> {
        if !settings.needs_location_table() {
            return Ok(None);
        }
        let table = LocationTable::load(&settings.locations_file).with_context(|| {
            format!("Failed to load locations from {}", settings.locations_file.display())
        })?;
        info!(
            path = %settings.locations_file.display(),
            entries = table.len(),
            "Loaded location table"
        );
        Ok(Some(table))
    }

    pub fn resolve_cell(&self, target: &Target) -> Result<GridCell> {
        match target {
            Target::Named(name) => {
                let table = self
                    .table
                    .as_ref()
                    .context("location table not loaded")?;
                Ok(table.lookup(name)?)
            }
            Target::Coordinate { lat, lon } => {
                let point = GeoPoint::new(*lat, *lon)?;
                Ok(self.projector.to_grid(point)?)
            }
        }
    }

    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_at(kst_now(), CancellationToken::new()).await
    }

    /// Run one cycle as if the KST wall clock read `now`.
    #[instrument(skip_all, fields(now = %format_tm(now)))]
    pub async fn run_at(&self, now: NaiveDateTime, cancel: CancellationToken) -> Result<RunSummary> {
        let window = ForecastWindow::resolve(now, &self.settings.policy, &self.settings.clock)?;
        info!(
            base = %format_tm(window.base_time()),
            first = %window.effective_times().first().map(|t| format_tm(*t)).unwrap_or_default(),
            hours = window.len(),
            targets = self.settings.targets.len(),
            "Starting report cycle"
        );

        let mut summary = RunSummary {
            summaries: Vec::with_capacity(self.settings.targets.len()),
            written: Vec::new(),
            failed: 0,
        };

        for target in &self.settings.targets {
            let label = target.label();
            match self.report_target(target, &window, cancel.clone()).await {
                Ok((path, location_summary)) => {
                    summary.written.push(path);
                    summary.summaries.push(location_summary);
                }
                Err(e) => {
                    error!(location = %label, error = %format!("{:#}", e), "Location report failed");
                    summary.failed += 1;
                    summary.summaries.push(LocationSummary::failed(label));
                }
            }
            if cancel.is_cancelled() {
                warn!("Cycle cancelled, skipping remaining locations");
                break;
            }
        }

        info!(
            written = summary.written.len(),
            failed = summary.failed,
            "Report cycle complete"
        );
        Ok(summary)
    }

    async fn report_target(
        &self,
        target: &Target,
        window: &ForecastWindow,
        cancel: CancellationToken,
    ) -> Result<(PathBuf, LocationSummary)> {
        let label = target.label();
        let cell = self.resolve_cell(target)?;
        info!(location = %label, cell = %cell, "Fetching series");

        let progress_label = label.clone();
        let sink = move |p: Progress| {
            info!(location = %progress_label, completed = p.completed, total = p.total, "Progress");
        };

        let series = self
            .aggregator
            .build_series_with_cancel(
                cell,
                window,
                &self.settings.variables,
                Some(&sink as &dyn ProgressSink),
                cancel,
            )
            .await;
        series.ensure_data()?;

        let rows = rows_from_series(&series);
        let path = self.settings.output_path(target);
        ensure_parent(&path)?;
        write_json(&path, &rows)?;

        Ok((path, LocationSummary::from_rows(label, &rows)))
    }

    /// Repeat cycles every interval until `shutdown` fires.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            let cancel = CancellationToken::new();
            let cycle = self.run_at(kst_now(), cancel.clone());
            tokio::pin!(cycle);

            let outcome = tokio::select! {
                outcome = &mut cycle => Some(outcome),
                _ = shutdown.recv() => None,
            };

            match outcome {
                Some(Ok(summary)) => println!("{}", summary.markdown()),
                Some(Err(e)) => error!(error = %format!("{:#}", e), "Report cycle failed"),
                None => {
                    cancel.cancel();
                    // Locations already reported keep their output.
                    match cycle.await {
                        Ok(summary) => info!(
                            written = summary.written.len(),
                            failed = summary.failed,
                            "Interrupted cycle finished"
                        ),
                        Err(e) => warn!(
                            error = %format!("{:#}", e),
                            "Interrupted cycle failed"
                        ),
                    }
                    info!("Shutting down runner");
                    return Ok(());
                }
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down runner");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::config::ReportConfig;
    use async_trait::async_trait;
    use clap::Parser;
    use grid_fetcher::{FetchError, GridFetcher, GridSource, RetryPolicy, SampleRequest};
    use kma_common::{parse_tm, Variable};
    use std::sync::Arc;
    use test_utils::locations;
    use timeseries::{AggregatorConfig, ReportRow};

    /// TMP 5.0, SKY 1, PTY 0 at (67, 101); no data elsewhere.
    struct FixedSource;

    #[async_trait]
    impl GridSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_value(&self, request: &SampleRequest) -> grid_fetcher::Result<f64> {
            let no_data = FetchError::NoData {
                variable: request.variable,
                effective_time: format_tm(request.effective_time),
            };
            if request.cell != GridCell::new(67, 101) {
                return Err(no_data);
            }
            match request.variable {
                Variable::Tmp => Ok(5.0),
                Variable::Sky => Ok(1.0),
                Variable::Pty => Ok(0.0),
                _ => Err(no_data),
            }
        }
    }

    /// Never answers.
    struct HangingSource;

    #[async_trait]
    impl GridSource for HangingSource {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn fetch_value(&self, _request: &SampleRequest) -> grid_fetcher::Result<f64> {
            std::future::pending().await
        }
    }

    /// Collects formatted log output.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn runner(argv: &[&str]) -> Runner {
        runner_with(Arc::new(FixedSource), argv)
    }

    fn runner_with(source: Arc<dyn GridSource>, argv: &[&str]) -> Runner {
        let mut full = vec!["forecast-report"];
        full.extend_from_slice(argv);
        let settings = Settings::resolve(&Args::parse_from(full), ReportConfig::default()).unwrap();
        let table = LocationTable::from_json(locations::SAMPLE_TABLE).unwrap();
        let fetcher = GridFetcher::new(source, RetryPolicy::none());
        let aggregator = SeriesAggregator::new(fetcher, AggregatorConfig::default()).unwrap();
        Runner::new(settings, aggregator, Some(table))
    }

    #[test]
    fn test_resolve_cells() {
        let runner = runner(&["--location", "A"]);
        assert_eq!(
            runner.resolve_cell(&Target::Named("A".to_string())).unwrap(),
            GridCell::new(67, 101)
        );
        assert!(runner.resolve_cell(&Target::Named("nowhere".to_string())).is_err());
        assert_eq!(
            runner
                .resolve_cell(&Target::Coordinate { lat: 36.3725, lon: 127.3605 })
                .unwrap(),
            GridCell::new(67, 101)
        );
        assert!(runner
            .resolve_cell(&Target::Coordinate { lat: 10.0, lon: 100.0 })
            .is_err());
    }

    #[tokio::test]
    async fn test_cycle_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("{location}.json");
        let runner = runner(&[
            "--location",
            "A",
            "--location",
            "부산광역시 해운대구 우제1동",
            "--hours",
            "3",
            "--output",
            output.to_str().unwrap(),
        ]);

        let now = parse_tm("202501010400").unwrap();
        let summary = tokio_test::assert_ok!(runner.run_at(now, CancellationToken::new()).await);

        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_failed());

        let text = std::fs::read_to_string(dir.path().join("A.json")).unwrap();
        let rows: Vec<ReportRow> = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].time, "04:00");
        assert_eq!(rows[0].temp, Some(5.0));
        assert_eq!(rows[0].sky.as_deref(), Some("Clear"));
        assert_eq!(rows[0].pty, Some(0));
        assert_eq!(rows[0].wind, None);

        let markdown = summary.markdown();
        assert!(markdown.contains("| A | 04:00 | 5℃ | Clear | None | - |"));
        assert!(markdown.contains("| 부산광역시 해운대구 우제1동 | Fetch Failed | - | - | - | - |"));
    }

    #[tokio::test]
    async fn test_all_failed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let runner = runner(&[
            "--location",
            "nowhere",
            "--output",
            output.to_str().unwrap(),
        ]);

        let summary = runner
            .run_at(parse_tm("202501010400").unwrap(), CancellationToken::new())
            .await
            .unwrap();
        assert!(summary.all_failed());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_forever_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let runner = runner(&[
            "--location",
            "A",
            "--hours",
            "1",
            "--interval-secs",
            "3600",
            "--output",
            output.to_str().unwrap(),
        ]);

        let (tx, rx) = broadcast::channel(1);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            tx.send(()).ok();
        });

        tokio::time::timeout(std::time::Duration::from_secs(5), runner.run_forever(rx))
            .await
            .expect("runner should stop")
            .unwrap();
        stopper.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_mid_cycle_reports_interrupted_cycle() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.json");
        let runner = runner_with(
            Arc::new(HangingSource),
            &["--location", "A", "--hours", "2", "--output", output.to_str().unwrap()],
        );

        let (tx, rx) = broadcast::channel(1);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            tx.send(()).ok();
        });

        tokio::time::timeout(std::time::Duration::from_secs(5), runner.run_forever(rx))
            .await
            .expect("runner should stop")
            .unwrap();

        let text = logs.contents();
        assert!(text.contains("Interrupted cycle finished"), "{}", text);
        assert!(text.contains("Shutting down runner"));
        assert!(!output.exists());
    }
}
