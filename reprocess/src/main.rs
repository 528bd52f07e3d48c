use anyhow::Context;
use clap::{ArgAction, Parser};
use generator::survey::{write_survey, SurveyConfig};
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::{BatchReport, Runner};

mod generator;
mod index;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Reprocess swath bathymetry with navigation, attitude, sound speed and edit corrections")]
struct Args {
    /// Input record streams; each reads its corrections from `<input>.par`
    inputs: Vec<PathBuf>,
    /// Datalist of inputs, one `path [format [weight]]` per line
    #[arg(long, short = 'I')]
    datalist: Option<PathBuf>,
    /// Skip inputs whose output is newer than the input and every file it depends on
    #[arg(long, default_value_t = false)]
    check: bool,
    /// Drop comment records from the outputs
    #[arg(long, default_value_t = false)]
    strip_comments: bool,
    /// Inputs processed concurrently
    #[arg(long, short = 'j', default_value_t = 1)]
    jobs: usize,
    /// Load the batch settings from YAML; inputs given here are appended
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Do not write `<output>.inf` summary indexes
    #[arg(long, default_value_t = false)]
    no_summary: bool,
    /// Write a seeded synthetic survey line into DIR and add it to the inputs
    #[arg(long, value_name = "DIR")]
    synthesize: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(args: Args) -> anyhow::Result<BatchReport> {
    let mut workflow_config = if let Some(path) = &args.workflow {
        let mut config = WorkflowConfig::load(path)?;
        config.inputs.extend(args.inputs.iter().cloned());
        config.datalist = args.datalist.clone().or(config.datalist);
        config.check_up_to_date |= args.check;
        config.strip_comments |= args.strip_comments;
        config.summary &= !args.no_summary;
        config.verbose = config.verbose.max(args.verbose);
        config
    } else {
        WorkflowConfig::from_args(
            args.inputs.clone(),
            args.datalist.clone(),
            args.check,
            args.strip_comments,
            args.jobs,
            !args.no_summary,
            args.verbose,
        )
    };

    if let Some(dir) = &args.synthesize {
        let survey = SurveyConfig {
            seed: args.seed,
            ..Default::default()
        };
        let files = write_survey(dir, &survey).context("writing synthetic survey")?;
        info!("synthetic survey written to {}", files.stream.display());
        workflow_config.inputs.push(files.stream);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let runner = Runner::new(workflow_config, Arc::clone(&cancel));
    let entries = runner.entries().context("collecting inputs")?;
    if entries.is_empty() {
        warn!("no inputs given");
        return Ok(BatchReport::default());
    }

    let workers = runner.config().worker_count();
    let runtime = TokioBuilder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("creating runtime for batch processing")?;
    let report = runtime.block_on(async {
        let flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("interrupted, discarding unfinished outputs");
                flag.store(true, Ordering::Relaxed);
            }
        });
        if workers > 1 {
            runner.run_batch(entries).await
        } else {
            let runner = runner.clone();
            match tokio::task::spawn_blocking(move || runner.run_sequential(entries)).await {
                Ok(report) => report,
                Err(err) => {
                    warn!("sequential worker failed: {}", err);
                    BatchReport {
                        failed: vec![(PathBuf::new(), err.to_string())],
                        ..Default::default()
                    }
                }
            }
        }
    });
    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(report) => {
            info!(
                "{} processed, {} up to date, {} failed",
                report.processed,
                report.up_to_date,
                report.failed.len()
            );
            if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
