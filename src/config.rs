use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use crate::document::BraceCounting;

/// Settings of a fixing run. Every field can be omitted from a configuration file, in which
/// case its default is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// Whether nodes with mirrored scale get their mesh geometry corrected.
    pub mirror_geometry: bool,
    /// How block depth is derived from brace characters.
    pub brace_counting: BraceCounting,
    /// Whether `Lcl Rotation` is moved into `GeometricRotation`.
    pub relocate_rotation: bool,
    /// Whether `Lcl Scaling` is moved into `GeometricScaling`.
    pub relocate_scale: bool,
    /// The suffix appended to the stem of output files. Inputs whose stem already ends with it
    /// are skipped.
    pub output_suffix: String,
}

impl FixerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read the configuration file {:?}", path))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse the configuration file {:?}", path))
    }
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            mirror_geometry: true,
            brace_counting: BraceCounting::Legacy,
            relocate_rotation: true,
            relocate_scale: true,
            output_suffix: String::from("_fixed"),
        }
    }
}

/// A named preset that can be picked interactively.
pub struct Mode {
    /// The display name of the preset.
    pub name: &'static str,
    apply: fn(&mut FixerConfig),
}

impl Mode {
    pub fn apply(&self, config: &mut FixerConfig) {
        (self.apply)(config)
    }
}

/// Returns all processing modes available.
pub fn modes() -> Vec<Mode> {
    vec![
        Mode {
            name: "Relocate transforms and mirror geometry",
            apply: |config| config.mirror_geometry = true,
        },
        Mode {
            name: "Relocate transforms only",
            apply: |config| config.mirror_geometry = false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_json() {
        let config: FixerConfig =
            serde_json::from_str(r#"{ "mirror_geometry": false, "brace_counting": "quote_aware" }"#)
                .unwrap();

        assert_eq!(
            FixerConfig {
                mirror_geometry: false,
                brace_counting: BraceCounting::QuoteAware,
                ..Default::default()
            },
            config
        );
    }

    #[test]
    fn from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geomfix.json");
        fs::write(&path, r#"{ "output_suffix": "_baked" }"#).unwrap();

        let config = FixerConfig::from_file(&path).unwrap();

        assert_eq!("_baked", config.output_suffix);
        assert!(config.mirror_geometry);
        assert!(FixerConfig::from_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn mode_toggles_mirroring() {
        let mut config = FixerConfig::default();
        modes()[1].apply(&mut config);
        assert!(!config.mirror_geometry);

        modes()[0].apply(&mut config);
        assert!(config.mirror_geometry);
    }
}
