use std::path::Path;

use crate::{config::FixerConfig, document::Document, error::FixError};

pub use self::{fbx::FbxPatcher, prefab::PrefabPatcher};

pub mod fbx;
pub mod prefab;

/// Defines a type that rewrites the transforms of text assets in place.
#[allow(unused_variables)]
pub trait Patcher {
    /// Inspects the file before it is loaded. An error means the file must be left untouched.
    fn inspect(&self, path: &Path) -> Result<(), FixError> {
        Ok(())
    }
    /// Patches a document and reports what was changed. Patching is best-effort: anything that
    /// cannot be matched is left as it is.
    fn patch(&self, document: &mut Document) -> PatchReport;
    /// Returns the file extensions supported by the patcher. These extensions are used to
    /// select the appropriate patcher given an input file.
    ///
    /// The extension should not include the period (e.g "fbx", not ".fbx").
    fn extensions(&self) -> &[&str];
}

/// A summary of the edits applied to one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchReport {
    /// The number of local properties moved into their geometric counterparts.
    pub relocated: usize,
    /// The number of nodes whose geometry was corrected for a mirrored scale.
    pub corrected: usize,
    /// The number of mappings reset to identity.
    pub reset: usize,
}

impl PatchReport {
    pub fn is_modified(&self) -> bool {
        self.relocated > 0 || self.corrected > 0 || self.reset > 0
    }
}

/// Returns all patchers available.
pub fn patchers(config: &FixerConfig) -> Vec<Box<dyn Patcher>> {
    vec![
        Box::new(FbxPatcher::new(config.clone())),
        Box::new(PrefabPatcher::default()),
    ]
}
