use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// An input file loaded in memory.
pub struct Asset {
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Asset {
    pub fn new(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Self {
        Self {
            bytes,
            path: path.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Self::new(bytes, path))
    }

    /// Returns the file name without its extension.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
    }

    /// Returns whether the asset is itself the output of an earlier run.
    pub fn is_fixed(&self, suffix: &str) -> bool {
        self.name().ends_with(suffix)
    }

    /// Returns the path of the output file, which sits beside the asset.
    pub fn fixed_path(&self, suffix: &str) -> PathBuf {
        let file_name = if self.extension().is_empty() {
            format!("{}{}", self.name(), suffix)
        } else {
            format!("{}{}.{}", self.name(), suffix, self.extension())
        };
        self.path.with_file_name(file_name)
    }

    /// Returns the contents of the asset as text.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .with_context(|| format!("{:?} is not valid UTF-8 text", self.path))
    }
}
