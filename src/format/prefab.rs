use log::{debug, info, warn};

use crate::document::{indentation, Document};

use super::{PatchReport, Patcher};

const TRANSFORM: &str = "Transform:";
const DOCUMENT_SEPARATOR: &str = "---";

/// The transform fields that are reset and the identity mapping they are reset to.
const RESETS: [(&str, &str); 2] = [
    ("m_LocalRotation", "{x: 0, y: 0, z: 0, w: 1}"),
    ("m_LocalScale", "{x: 1, y: 1, z: 1}"),
];

/// Resets the local rotation and scale of every `Transform` component of a Unity prefab, so
/// that the transforms moved into the geometry of the companion FBX are not applied twice.
#[derive(Default)]
pub struct PrefabPatcher {}

impl Patcher for PrefabPatcher {
    fn patch(&self, document: &mut Document) -> PatchReport {
        let mut report = PatchReport::default();
        let mut in_transform = false;

        let mut index = 0;
        while index < document.len() {
            let line = document.line(index);

            if line.starts_with(DOCUMENT_SEPARATOR) {
                in_transform = false;
            } else if !line.trim().is_empty() && indentation(line).is_empty() {
                in_transform = line.trim_end() == TRANSFORM;
                if in_transform {
                    debug!("Transform component at line {}", index + 1);
                }
            } else if in_transform && reset_field(document, index) {
                report.reset += 1;
            }

            index += 1;
        }

        report
    }

    fn extensions(&self) -> &[&str] {
        &["prefab"]
    }
}

/// Resets the mapping on `line` if it is one of the transform fields. A mapping that spans
/// several lines is collapsed onto the first one. Returns whether the document changed.
fn reset_field(document: &mut Document, line: usize) -> bool {
    let text = document.line(line);
    let indent = indentation(text);
    let (key, value) = match text[indent.len()..].split_once(':') {
        Some(field) => field,
        None => return false,
    };
    let identity = match RESETS.iter().find(|(name, _)| *name == key) {
        Some((_, identity)) => *identity,
        None => return false,
    };
    if !value.trim_start().starts_with('{') {
        return false;
    }

    let last = match (line..document.len()).find(|&index| document.line(index).contains('}')) {
        Some(last) => last,
        None => {
            warn!("{} at line {} is never closed", key, line + 1);
            return false;
        }
    };

    let reset = format!("{}{}: {}", indent, key, identity);
    if last == line && document.line(line) == reset {
        return false;
    }

    info!("Reset {} at line {}", key, line + 1);
    document.replace_line(line, reset);
    document.remove_lines(line + 1..last + 1);
    true
}
