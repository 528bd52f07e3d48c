use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Batch settings shared by every input of one run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub inputs: Vec<PathBuf>,
    pub datalist: Option<PathBuf>,
    /// Skip inputs whose output is newer than everything it depends on.
    pub check_up_to_date: bool,
    pub strip_comments: bool,
    pub jobs: usize,
    pub summary: bool,
    pub verbose: u8,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            datalist: None,
            check_up_to_date: false,
            strip_comments: false,
            jobs: 1,
            summary: true,
            verbose: 0,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let mut config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        let base = path_ref.parent().unwrap_or_else(|| Path::new(""));
        for input in config.inputs.iter_mut().chain(config.datalist.iter_mut()) {
            if input.is_relative() {
                *input = base.join(&*input);
            }
        }
        Ok(config)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_args(
        inputs: Vec<PathBuf>,
        datalist: Option<PathBuf>,
        check_up_to_date: bool,
        strip_comments: bool,
        jobs: usize,
        summary: bool,
        verbose: u8,
    ) -> Self {
        Self {
            inputs,
            datalist,
            check_up_to_date,
            strip_comments,
            jobs,
            summary,
            verbose,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.jobs.max(1)
    }
}
