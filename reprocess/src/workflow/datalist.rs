use anyhow::{bail, Context};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Format id marking an entry that is itself a datalist.
const NESTED_LIST: i32 = -1;
const MAX_NESTING: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct DatalistEntry {
    pub path: PathBuf,
    pub format: Option<i32>,
    /// Grid weight; nested lists multiply it. Only reported when correcting.
    pub weight: f64,
}

impl DatalistEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: None,
            weight: 1.0,
        }
    }
}

/// Reads `path [format [weight]]` lines, descending into nested lists.
pub fn read_datalist<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<DatalistEntry>> {
    let mut entries = Vec::new();
    collect(path.as_ref(), 1.0, 0, &mut entries)?;
    Ok(entries)
}

fn collect(path: &Path, weight: f64, depth: usize, entries: &mut Vec<DatalistEntry>) -> anyhow::Result<()> {
    if depth >= MAX_NESTING {
        bail!("datalist {} nests more than {} levels", path.display(), MAX_NESTING);
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading datalist {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(raw) = fields.next() else {
            continue;
        };
        let format = fields
            .next()
            .map(|raw| raw.parse::<i32>())
            .transpose()
            .with_context(|| format!("{}:{} bad format id", path.display(), number + 1))?;
        let entry_weight = fields
            .next()
            .map(|raw| raw.parse::<f64>())
            .transpose()
            .with_context(|| format!("{}:{} bad weight", path.display(), number + 1))?
            .unwrap_or(1.0);

        let entry_path = if Path::new(raw).is_absolute() {
            PathBuf::from(raw)
        } else {
            base.join(raw)
        };
        if format == Some(NESTED_LIST) {
            debug!("descending into datalist {}", entry_path.display());
            collect(&entry_path, weight * entry_weight, depth + 1, entries)?;
        } else {
            entries.push(DatalistEntry {
                path: entry_path,
                format,
                weight: weight * entry_weight,
            });
        }
    }
    Ok(())
}
