use log::info;
use std::path::{Path, PathBuf};

use super::{AdjustedNavMode, CorrectionConfig, SvpMode};

/// `dir/stem.ext` becomes `dir/stem_p.ext`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_p.{}", stem, ext.to_string_lossy()),
        None => format!("{}_p", stem),
    };
    input.with_file_name(name)
}

fn sibling(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Builds a configuration from conventionally named files next to `input`.
///
/// Looks for adjusted navigation `.na9` down to `.na0`, edited navigation
/// `.nve`, saved edits `.esf` then `.mbesf`, and a profile `.svp` then `_001.svp`.
pub fn infer_default(input: &Path) -> CorrectionConfig {
    let mut config = CorrectionConfig::for_input(input);

    if let Some(navadj) = (0..10)
        .rev()
        .map(|n| sibling(input, &format!(".na{}", n)))
        .find(|path| path.exists())
    {
        info!("using adjusted navigation {}", navadj.display());
        config.adjusted_nav.mode = AdjustedNavMode::LonLatDepth;
        config.adjusted_nav.file = Some(navadj);
    }

    let nav = sibling(input, ".nve");
    if nav.exists() {
        info!("using edited navigation {}", nav.display());
        let settings = &mut config.navigation;
        settings.enabled = true;
        settings.file = Some(nav);
        settings.format = 9;
        settings.heading = true;
        settings.speed = true;
        settings.draft = true;
        settings.attitude = true;
    }

    if let Some(edits) = [".esf", ".mbesf"]
        .iter()
        .map(|suffix| sibling(input, suffix))
        .find(|path| path.exists())
    {
        info!("using saved edits {}", edits.display());
        config.edits.enabled = true;
        config.edits.file = Some(edits);
    }

    let stem_svp = input.with_file_name(format!(
        "{}_001.svp",
        input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    if let Some(svp) = [sibling(input, ".svp"), stem_svp]
        .into_iter()
        .find(|path| path.exists())
    {
        info!("using sound velocity profile {}", svp.display());
        config.svp.mode = SvpMode::RayTrace;
        config.svp.file = Some(svp);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn output_name_gains_suffix() {
        assert_eq!(
            default_output_path(Path::new("/survey/line01.mb88")),
            PathBuf::from("/survey/line01_p.mb88")
        );
        assert_eq!(
            default_output_path(Path::new("line01")),
            PathBuf::from("line01_p")
        );
    }

    #[test]
    fn inference_prefers_highest_adjusted_navigation() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("line.mb");
        fs::write(dir.path().join("line.mb.na0"), "").unwrap();
        fs::write(dir.path().join("line.mb.na3"), "").unwrap();
        fs::write(dir.path().join("line.mb.mbesf"), "").unwrap();
        fs::write(dir.path().join("line.mb_001.svp"), "").unwrap();

        let config = infer_default(&input);
        assert_eq!(config.adjusted_nav.mode, AdjustedNavMode::LonLatDepth);
        assert_eq!(config.adjusted_nav.file, Some(dir.path().join("line.mb.na3")));
        assert!(!config.navigation.enabled);
        assert_eq!(config.edits.file, Some(dir.path().join("line.mb.mbesf")));
        assert_eq!(config.svp.file, Some(dir.path().join("line.mb_001.svp")));
    }

    #[test]
    fn inference_without_siblings_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let config = infer_default(&dir.path().join("line.mb"));
        assert!(config.recalc_mode().is_none());
        assert!(config.auxiliary_files().is_empty());
    }
}
