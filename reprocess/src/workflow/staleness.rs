use anyhow::Context;
use log::debug;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use swathcore::CorrectionConfig;

fn modified(path: &Path) -> anyhow::Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("reading modification time of {}", path.display()))
}

/// True when the output exists and is not older than the input, the parameter
/// file or any auxiliary file an enabled correction reads.
pub fn is_up_to_date(config: &CorrectionConfig) -> anyhow::Result<bool> {
    let Ok(output_time) = modified(&config.output) else {
        return Ok(false);
    };

    let sources = std::iter::once(config.input.as_path())
        .chain(config.parameter_file.as_deref())
        .chain(config.auxiliary_files());
    for source in sources {
        if !source.exists() {
            // Let the run report the missing file.
            return Ok(false);
        }
        if modified(source)? > output_time {
            debug!(
                "{} is newer than {}",
                source.display(),
                config.output.display()
            );
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use swathcore::config::SvpMode;
    use tempfile::TempDir;

    fn touch(path: &Path, at: SystemTime) {
        fs::write(path, b"x").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(at)
            .unwrap();
    }

    fn setup(dir: &TempDir) -> (CorrectionConfig, SystemTime) {
        let base = SystemTime::now() - Duration::from_secs(3600);
        let input = dir.path().join("line.jsonl");
        let svp = dir.path().join("line.svp");
        touch(&input, base);
        touch(&svp, base);
        let mut config = CorrectionConfig::for_input(&input);
        config.svp.mode = SvpMode::RayTrace;
        config.svp.file = Some(svp);
        (config, base)
    }

    #[test]
    fn missing_output_is_stale() {
        let dir = TempDir::new().unwrap();
        let (config, _) = setup(&dir);
        assert!(!is_up_to_date(&config).unwrap());
    }

    #[test]
    fn newer_output_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let (config, base) = setup(&dir);
        touch(&config.output, base + Duration::from_secs(60));
        assert!(is_up_to_date(&config).unwrap());
    }

    #[test]
    fn touched_profile_forces_reprocessing() {
        let dir = TempDir::new().unwrap();
        let (config, base) = setup(&dir);
        touch(&config.output, base + Duration::from_secs(60));
        touch(config.svp.file.as_deref().unwrap(), base + Duration::from_secs(120));
        assert!(!is_up_to_date(&config).unwrap());
    }

    #[test]
    fn disabled_auxiliary_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let (mut config, base) = setup(&dir);
        let tide = dir.path().join("line.tide");
        touch(&tide, base + Duration::from_secs(600));
        config.tide.file = Some(tide);
        touch(&config.output, base + Duration::from_secs(60));
        assert!(is_up_to_date(&config).unwrap());
    }
}
