use crate::index::summary::{InfoIndexer, SummaryIndexer};
use crate::workflow::config::WorkflowConfig;
use crate::workflow::datalist::{read_datalist, DatalistEntry};
use crate::workflow::staleness::is_up_to_date;
use anyhow::Context;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use swathcore::codec::{codec_for_format, create_writer, open_reader, PingCodec, ReadStatus};
use swathcore::swath::SwathRecord;
use swathcore::telemetry::MetricsSnapshot;
use swathcore::{AuxiliaryData, CorrectionConfig, PingPipeline, ProcessError};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    Processed(MetricsSnapshot),
    UpToDate,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub up_to_date: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    fn record(&mut self, input: PathBuf, outcome: anyhow::Result<InputOutcome>) {
        match outcome {
            Ok(InputOutcome::Processed(_)) => self.processed += 1,
            Ok(InputOutcome::UpToDate) => self.up_to_date += 1,
            Err(err) => {
                error!("{}: {:#}", input.display(), err);
                self.failed.push((input, format!("{:#}", err)));
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-input header; the datalist weight is reported but does not change the corrections.
fn status_line(entry: &DatalistEntry, output: &Path) -> String {
    format!(
        "{} -> {} (weight {:.2})",
        entry.path.display(),
        output.display(),
        entry.weight
    )
}

fn part_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    cancel: Arc<AtomicBool>,
    indexer: Arc<dyn SummaryIndexer>,
}

impl Runner {
    pub fn new(config: WorkflowConfig, cancel: Arc<AtomicBool>) -> Self {
        Self {
            config,
            cancel,
            indexer: Arc::new(InfoIndexer),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Explicit inputs first, then datalist entries in list order.
    pub fn entries(&self) -> anyhow::Result<Vec<DatalistEntry>> {
        let mut entries = self
            .config
            .inputs
            .iter()
            .cloned()
            .map(DatalistEntry::new)
            .collect::<Vec<_>>();
        if let Some(list) = &self.config.datalist {
            entries.extend(read_datalist(list)?);
        }
        Ok(entries)
    }

    /// Corrects one input into its output file.
    pub fn process_input(&self, entry: &DatalistEntry) -> anyhow::Result<InputOutcome> {
        let input = &entry.path;
        let mut config = CorrectionConfig::load(input)
            .with_context(|| format!("loading correction configuration for {}", input.display()))?;
        config.verbose = config.verbose.max(self.config.verbose);
        config.format = config.format.or(entry.format);

        if self.config.check_up_to_date && is_up_to_date(&config)? {
            info!("{} is up to date, skipping", config.output.display());
            return Ok(InputOutcome::UpToDate);
        }

        let codec = codec_for_format(config.format).context("selecting record codec")?;
        let aux = AuxiliaryData::load(&config).context("loading auxiliary data")?;
        let mut pipeline = PingPipeline::new(&config, aux, codec).context("initializing correction pipeline")?;
        pipeline.logger().record(&status_line(entry, &config.output));

        let part = part_path(&config.output);
        if let Err(err) = self.stream(&config, &mut pipeline, &part) {
            if let Err(cleanup) = fs::remove_file(&part) {
                warn!("could not remove {}: {}", part.display(), cleanup);
            }
            return Err(err);
        }
        fs::rename(&part, &config.output)
            .with_context(|| format!("renaming {} to {}", part.display(), config.output.display()))?;
        pipeline.finish();

        if self.config.summary {
            self.indexer
                .index(&config.output)
                .with_context(|| format!("indexing {}", config.output.display()))?;
        }
        Ok(InputOutcome::Processed(pipeline.metrics().snapshot()))
    }

    fn stream<C>(&self, config: &CorrectionConfig, pipeline: &mut PingPipeline<C>, part: &Path) -> anyhow::Result<()>
    where
        C: PingCodec + Clone + Send + 'static,
    {
        let mut reader = open_reader(&config.input).context("opening input stream")?;
        let mut writer = create_writer(part).context("creating output stream")?;
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ProcessError::Cancelled.into());
            }
            let mut record = match reader.read_record().context("reading record")? {
                ReadStatus::Eof => break,
                ReadStatus::Notice(notice) => {
                    pipeline.metrics().record_notice(notice);
                    continue;
                }
                ReadStatus::Record(record) => record,
            };
            pipeline.metrics().record_read();
            match &mut record {
                SwathRecord::Ping(ping) => pipeline.process(ping).context("correcting ping")?,
                SwathRecord::Navigation(kinematics) => pipeline
                    .process_navigation(kinematics)
                    .context("correcting navigation record")?,
                SwathRecord::Comment { .. } => {
                    pipeline.metrics().record_comment();
                    if self.config.strip_comments {
                        continue;
                    }
                }
                SwathRecord::Other { .. } => {}
            }
            writer.write_record(&record).context("writing record")?;
            pipeline.metrics().record_written();
        }
        writer.finish().context("flushing output stream")?;
        Ok(())
    }

    /// Inputs one after another on the calling thread.
    pub fn run_sequential(&self, entries: Vec<DatalistEntry>) -> BatchReport {
        let mut report = BatchReport::default();
        for entry in entries {
            if self.cancel.load(Ordering::Relaxed) {
                report.record(entry.path, Err(ProcessError::Cancelled.into()));
                continue;
            }
            let outcome = self.process_input(&entry);
            report.record(entry.path, outcome);
        }
        report
    }

    /// Inputs on blocking workers, at most `jobs` at a time.
    pub async fn run_batch(&self, entries: Vec<DatalistEntry>) -> BatchReport {
        let permits = Arc::new(Semaphore::new(self.config.worker_count()));
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            let permits = Arc::clone(&permits);
            let runner = self.clone();
            let path = entry.path.clone();
            let handle = tokio::spawn(run_worker(runner, entry, permits));
            handles.push((path, handle));
        }

        let mut report = BatchReport::default();
        for (path, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => Err(anyhow::Error::new(err).context("worker task failed")),
            };
            report.record(path, outcome);
        }
        report
    }
}

async fn run_worker(runner: Runner, entry: DatalistEntry, permits: Arc<Semaphore>) -> anyhow::Result<InputOutcome> {
    let _permit = permits
        .acquire_owned()
        .await
        .context("acquiring worker slot")?;
    if runner.cancel.load(Ordering::Relaxed) {
        return Err(ProcessError::Cancelled.into());
    }
    tokio::task::spawn_blocking(move || runner.process_input(&entry))
        .await
        .context("joining worker")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use swathcore::swath::{Beam, Kinematics, Ping};
    use tempfile::TempDir;

    fn write_input(path: &Path, comment: bool) {
        let mut writer = create_writer(path).unwrap();
        if comment {
            writer
                .write_record(&SwathRecord::Comment { text: "raw".into() })
                .unwrap();
        }
        let ping = Ping {
            kinematics: Kinematics {
                time: 100.0,
                lon: 10.0,
                lat: 50.0,
                draft: 2.0,
                ..Default::default()
            },
            beams: vec![Beam::new(50.0, 0.0, 0.0)],
            ..Default::default()
        };
        writer.write_record(&SwathRecord::Ping(ping)).unwrap();
        writer.finish().unwrap();
    }

    fn read_output(path: &Path) -> Vec<SwathRecord> {
        let mut reader = open_reader(path).unwrap();
        let mut records = Vec::new();
        while let ReadStatus::Record(record) = reader.read_record().unwrap() {
            records.push(record);
        }
        records
    }

    fn runner(config: WorkflowConfig) -> Runner {
        Runner::new(config, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn status_line_reports_datalist_weight() {
        let entry = DatalistEntry {
            weight: 2.5,
            ..DatalistEntry::new("survey/line.jsonl")
        };
        let line = status_line(&entry, Path::new("survey/line_p.jsonl"));
        assert_eq!(line, "survey/line.jsonl -> survey/line_p.jsonl (weight 2.50)");
    }

    #[test]
    fn runner_writes_output_and_index() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.jsonl");
        write_input(&input, true);
        fs::write(dir.path().join("line.jsonl.par"), "DRAFTMODE 1\nDRAFTOFFSET 0.5\n").unwrap();

        let runner = runner(WorkflowConfig::default());
        let outcome = runner.process_input(&DatalistEntry::new(&input)).unwrap();
        let InputOutcome::Processed(totals) = outcome else {
            panic!("expected the input to be processed");
        };
        assert_eq!(totals.records_read, 2);
        assert_eq!(totals.records_written, 2);

        let output = dir.path().join("line_p.jsonl");
        assert!(!dir.path().join("line_p.jsonl.part").exists());
        assert!(dir.path().join("line_p.jsonl.inf").exists());
        let records = read_output(&output);
        assert_eq!(records.len(), 2);
        match &records[1] {
            SwathRecord::Ping(ping) => {
                assert_abs_diff_eq!(ping.kinematics.draft, 2.5, epsilon = 1e-9);
                assert_abs_diff_eq!(ping.beams[0].depth, 50.5, epsilon = 1e-9);
            }
            other => panic!("expected a ping, got {:?}", other),
        }
    }

    #[test]
    fn comments_can_be_stripped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.jsonl");
        write_input(&input, true);
        let runner = runner(WorkflowConfig {
            strip_comments: true,
            summary: false,
            ..Default::default()
        });
        runner.process_input(&DatalistEntry::new(&input)).unwrap();
        let records = read_output(&dir.path().join("line_p.jsonl"));
        assert_eq!(records.len(), 1);
        assert!(!dir.path().join("line_p.jsonl.inf").exists());
    }

    #[test]
    fn up_to_date_output_is_skipped() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.jsonl");
        write_input(&input, false);
        let first = runner(WorkflowConfig::default());
        first.process_input(&DatalistEntry::new(&input)).unwrap();
        let output = dir.path().join("line_p.jsonl");
        let before = fs::read(&output).unwrap();
        let stamp = fs::metadata(&output).unwrap().modified().unwrap();

        let checking = runner(WorkflowConfig {
            check_up_to_date: true,
            ..Default::default()
        });
        let outcome = checking.process_input(&DatalistEntry::new(&input)).unwrap();
        assert_eq!(outcome, InputOutcome::UpToDate);
        assert_eq!(fs::read(&output).unwrap(), before);
        assert_eq!(fs::metadata(&output).unwrap().modified().unwrap(), stamp);
    }

    #[test]
    fn missing_auxiliary_file_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.jsonl");
        write_input(&input, false);
        fs::write(dir.path().join("line.jsonl.par"), "SVPFILE missing.svp\n").unwrap();
        let err = runner(WorkflowConfig::default())
            .process_input(&DatalistEntry::new(&input))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("missing auxiliary data"));
        assert!(!dir.path().join("line_p.jsonl").exists());
        assert!(!dir.path().join("line_p.jsonl.part").exists());
    }

    #[test]
    fn cancelled_run_discards_partial_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.jsonl");
        write_input(&input, false);
        let runner = Runner::new(WorkflowConfig::default(), Arc::new(AtomicBool::new(true)));
        let err = runner.process_input(&DatalistEntry::new(&input)).unwrap_err();
        assert!(err.downcast_ref::<ProcessError>().is_some());
        assert!(!dir.path().join("line_p.jsonl").exists());
        assert!(!dir.path().join("line_p.jsonl.part").exists());
    }

    #[test]
    fn batch_continues_past_failed_inputs() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.jsonl");
        write_input(&good, false);
        let bad = dir.path().join("absent.jsonl");
        let runner = runner(WorkflowConfig {
            jobs: 2,
            ..Default::default()
        });
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let report = runtime.block_on(runner.run_batch(vec![DatalistEntry::new(&bad), DatalistEntry::new(&good)]));
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert!(!report.succeeded());
        assert!(dir.path().join("good_p.jsonl").exists());
    }
}
