use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::{
    asset::Asset,
    config::FixerConfig,
    document::Document,
    error::FixError,
    format::{patchers, Patcher},
};

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The patched document was written to the given path.
    Written(PathBuf),
    /// Nothing in the file needed patching.
    Unchanged,
    /// The file was left alone for the given reason.
    Skipped(String),
}

/// Counts of the outcomes of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Patches every supported file found in a set of paths.
pub struct Fixer {
    config: FixerConfig,
    patchers: Vec<Box<dyn Patcher>>,
}

impl Fixer {
    pub fn new(config: FixerConfig) -> Self {
        let patchers = patchers(&config);
        Self { config, patchers }
    }

    /// Patches the given files and every supported file under the given directories. A file that
    /// fails is reported and the run moves on to the next one.
    pub fn run(&self, paths: &[PathBuf]) -> RunSummary {
        let mut summary = RunSummary::default();

        for file in self.collect_files(paths) {
            match self.fix_file(&file) {
                Ok(Outcome::Written(output)) => {
                    info!("Wrote {:?}", output);
                    summary.written += 1;
                }
                Ok(Outcome::Unchanged) => {
                    info!("{:?} needs no changes", file);
                    summary.unchanged += 1;
                }
                Ok(Outcome::Skipped(reason)) => {
                    debug!("Skipped {:?}: {}", file, reason);
                    summary.skipped += 1;
                }
                Err(err) => {
                    error!("Failed to fix {:?}: {:#}", file, err);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Expands directories into the supported files they contain, recursively. Explicit files are
    /// kept as long as their extension is supported.
    pub fn collect_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in paths {
            if !path.is_dir() {
                match self.patcher_for(path) {
                    Some(_) => files.push(path.clone()),
                    None => warn!("Skipped {:?}: unsupported extension", path),
                }
                continue;
            }

            for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && self.patcher_for(entry.path()).is_some() {
                            files.push(entry.into_path());
                        }
                    }
                    Err(err) => warn!("Failed to read a directory entry: {}", err),
                }
            }
        }

        files
    }

    /// Patches one file and writes the result beside it.
    pub fn fix_file(&self, path: &Path) -> Result<Outcome> {
        let suffix = &self.config.output_suffix;
        let patcher = self.patcher_for(path).ok_or_else(|| {
            let extension = path.extension().unwrap_or_default().to_string_lossy();
            FixError::UnsupportedExtension(extension.into_owned())
        })?;

        let asset = Asset::from_path(path)?;
        if asset.is_fixed(suffix) {
            return Ok(Outcome::Skipped(format!("already ends with {}", suffix)));
        }

        match patcher.inspect(path) {
            Ok(()) => {}
            Err(err @ FixError::BinaryFbx { .. }) => {
                info!("Skipped {:?}: {}", path, err);
                return Ok(Outcome::Skipped(err.to_string()));
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to inspect {:?}", path)),
        }

        let mut document = Document::parse(asset.text()?);

        let report = patcher.patch(&mut document);
        if !report.is_modified() {
            return Ok(Outcome::Unchanged);
        }
        info!(
            "\"{}\": {} relocated, {} corrected, {} reset",
            asset.name(),
            report.relocated,
            report.corrected,
            report.reset
        );

        let output = asset.fixed_path(suffix);
        fs::write(&output, document.to_text())
            .with_context(|| format!("Failed to write {:?}", output))?;

        Ok(Outcome::Written(output))
    }

    fn patcher_for(&self, path: &Path) -> Option<&dyn Patcher> {
        let extension = path.extension()?.to_str()?;
        self.patchers
            .iter()
            .find(|patcher| {
                patcher
                    .extensions()
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|patcher| &**patcher)
    }
}
